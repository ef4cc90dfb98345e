//! Cache key derivation.

use sha2::{Digest, Sha256};
use thirdvoice_core::{AnalysisRequest, Depth, Operation};

/// Bytes of the SHA-256 digest kept in the key (128 bits).
const KEY_BYTES: usize = 16;

/// Digest of (message, context, operation, depth) as 32 lowercase hex chars.
///
/// Each field is length-prefixed, so moving text from one field into its
/// neighbour always changes the key.
pub fn cache_key(message: &str, context: &str, operation: Operation, depth: Depth) -> String {
    let mut hasher = Sha256::new();
    for field in [message, context, operation.as_str(), depth.as_str()] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..KEY_BYTES])
}

pub fn request_key(request: &AnalysisRequest) -> String {
    cache_key(
        request.message(),
        request.context(),
        request.operation(),
        request.depth(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_deterministic_hex() {
        let a = cache_key("hello", "friend", Operation::Interpret, Depth::Quick);
        let b = cache_key("hello", "friend", Operation::Interpret, Depth::Quick);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn depth_changes_the_key() {
        let quick = cache_key("hello", "friend", Operation::Interpret, Depth::Quick);
        let deep = cache_key("hello", "friend", Operation::Interpret, Depth::Deep);
        assert_ne!(quick, deep);
    }

    #[test]
    fn every_field_participates() {
        let base = cache_key("m", "c", Operation::Rewrite, Depth::Quick);
        assert_ne!(base, cache_key("m2", "c", Operation::Rewrite, Depth::Quick));
        assert_ne!(base, cache_key("m", "c2", Operation::Rewrite, Depth::Quick));
        assert_ne!(base, cache_key("m", "c", Operation::Interpret, Depth::Quick));
    }

    #[test]
    fn field_boundaries_matter() {
        assert_ne!(
            cache_key("ab", "c", Operation::Rewrite, Depth::Quick),
            cache_key("a", "bc", Operation::Rewrite, Depth::Quick)
        );
    }

    #[test]
    fn request_key_ignores_owner_ids() {
        let plain = AnalysisRequest::new("hi", "friend", Operation::Interpret, Depth::Quick);
        let owned = plain.clone().with_subject("contact-9").with_requester("user-3");
        assert_eq!(request_key(&plain), request_key(&owned));
    }
}
