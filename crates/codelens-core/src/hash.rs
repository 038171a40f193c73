//! Content hashing (§4.3): a cheap change token attached to every row
//! written during one analysis pass. MD5 is chosen for speed, not for
//! security — the only property we rely on is that equal bytes hash equal.

/// Hashes raw source bytes to 32 lowercase hex characters.
pub fn hash(source: &[u8]) -> String {
    format!("{:x}", md5::compute(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_32_lowercase_hex_chars() {
        let digest = hash(b"defmodule Foo do\nend\n");
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn equal_bytes_yield_equal_hashes() {
        assert_eq!(hash(b"same"), hash(b"same"));
        assert_ne!(hash(b"same"), hash(b"different"));
    }

    #[test]
    fn empty_input_hashes_to_known_constant() {
        assert_eq!(hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }
}
