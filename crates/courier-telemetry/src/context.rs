//! Request correlation: a small identifier + span bundle attached to a unit
//! of work (an inbound message, a connector turn) so every log line it
//! produces can be grepped back together.

use std::fmt;
use tracing::Span;
use uuid::Uuid;

/// A correlation identifier plus the component and operation it belongs to.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: Uuid,
    component: String,
    operation: Option<String>,
}

impl RequestContext {
    /// Start a new context for the given component name, e.g. `"connector"`.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            component: component.into(),
            operation: None,
        }
    }

    /// Attach an operation name, e.g. `"spawn_turn"`.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// The correlation id, suitable for including in error messages returned
    /// to callers.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Build the `tracing` span for this context. Entering it attaches
    /// `request_id`, `component`, and (if set) `operation` to every event
    /// emitted while the span is active.
    #[must_use]
    pub fn span(&self) -> Span {
        match &self.operation {
            Some(operation) => tracing::info_span!(
                "request",
                request_id = %self.id,
                component = %self.component,
                operation = %operation,
            ),
            None => tracing::info_span!(
                "request",
                request_id = %self.id,
                component = %self.component,
            ),
        }
    }

    /// Enter the span for the remainder of the current scope, returning a
    /// guard that exits it on drop.
    #[must_use]
    pub fn enter(&self) -> RequestGuard {
        RequestGuard {
            _entered: self.span().entered(),
        }
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operation {
            Some(operation) => write!(f, "{}[{}]/{}", self.component, self.id, operation),
            None => write!(f, "{}[{}]", self.component, self.id),
        }
    }
}

/// An entered [`RequestContext`] span; exits the span on drop.
pub struct RequestGuard {
    _entered: tracing::span::EnteredSpan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_component_and_operation() {
        let ctx = RequestContext::new("connector").with_operation("spawn_turn");
        let rendered = ctx.to_string();
        assert!(rendered.starts_with("connector["));
        assert!(rendered.ends_with("/spawn_turn"));
    }

    #[test]
    fn each_context_gets_a_distinct_id() {
        let a = RequestContext::new("orchestrator");
        let b = RequestContext::new("orchestrator");
        assert_ne!(a.id(), b.id());
    }
}
