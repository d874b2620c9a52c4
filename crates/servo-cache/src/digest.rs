use sha1::{Digest, Sha1};

/// SHA-1 rendered as lowercase hex. The workflow peer sends references in
/// this form.
pub const DIGEST_HEX_LEN: usize = 40;

/// Content digest of `value`'s UTF-8 bytes.
pub fn digest(value: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// `true` when the whole string is exactly one digest (either case).
///
/// A payload that merely contains a digest-like run is still a literal.
pub fn looks_like_digest(candidate: &str) -> bool {
    candidate.len() == DIGEST_HEX_LEN && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_of_empty_string_is_known_vector() {
        assert_eq!(digest(""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn digest_matches_its_own_pattern() {
        let d = digest("<LoadBalancer/>");
        assert_eq!(d.len(), DIGEST_HEX_LEN);
        assert!(looks_like_digest(&d));
        assert!(looks_like_digest(&d.to_ascii_uppercase()));
    }

    #[test]
    fn embedded_or_short_hex_is_literal() {
        let d = digest("x");
        assert!(!looks_like_digest(&format!(" {d}")));
        assert!(!looks_like_digest(&d[..39]));
        assert!(!looks_like_digest(&format!("{d}0")));
        assert!(!looks_like_digest(&format!("g{}", &d[1..])));
        let sha256_digest = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert!(!looks_like_digest(sha256_digest));
    }
}
