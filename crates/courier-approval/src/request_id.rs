//! Short, URL-safe approval ids: typeable back from a phone
//! keyboard in a reply, unlike a full UUID.

use courier_core::ApprovalId;
use rand::Rng;

const ALPHABET: &[u8] = b"23456789abcdefghjkmnpqrstuvwxyz";
const LENGTH: usize = 8;

/// Generate a fresh random id drawn from a reduced alphabet that excludes
/// characters easily confused on a small screen (`0`/`o`, `1`/`l`/`i`).
#[must_use]
pub fn generate() -> ApprovalId {
    let mut rng = rand::rngs::OsRng;
    let id: String = (0..LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect();
    ApprovalId::from_str_lossy(&id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_use_only_the_reduced_alphabet() {
        for _ in 0..50 {
            let id = generate();
            assert_eq!(id.0.len(), LENGTH);
            assert!(id.0.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn generated_ids_are_not_trivially_repeated() {
        let a = generate();
        let b = generate();
        assert_ne!(a.0, b.0);
    }
}
