//! Process exit codes: `0` success, `1` configuration error,
//! `2` runtime error, `3` another instance already holds the daemon lock.

/// Map a top-level command failure to the process exit code it should
/// produce, following the existing `astrid-cli`'s practice of mapping
/// error kinds to distinct codes rather than always exiting `1`.
#[must_use]
pub fn code_for_kernel_error(err: &courier_kernel::KernelError) -> i32 {
    match err {
        courier_kernel::KernelError::Config(_) => 1,
        courier_kernel::KernelError::AlreadyRunning(_) => 3,
        _ => 2,
    }
}

/// Same mapping for a bare [`courier_config::ConfigError`], surfaced by the
/// `config` subcommands which never touch the kernel.
#[must_use]
pub fn code_for_config_error(_err: &courier_config::ConfigError) -> i32 {
    1
}
