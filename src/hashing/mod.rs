//! Key hashing for the file tier.
//!
//! Keys are opaque caller strings and may contain path separators, so the file
//! tier never uses them as file names directly. It names each entry after the
//! BLAKE3 digest of the key and stores the key itself inside the record.

#[inline]
pub fn hash_key(key: &str) -> [u8; 32] {
    *blake3::hash(key.as_bytes()).as_bytes()
}

/// Returns the lowercase hex digest used as the file stem for `key`.
///
/// Always 64 ASCII characters, safe on every filesystem we target.
#[inline]
pub fn key_file_stem(key: &str) -> String {
    blake3::hash(key.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hash_key_determinism() {
        let key = "dQw4w9WgXcQ";

        assert_eq!(hash_key(key), hash_key(key));
        assert_eq!(key_file_stem(key), key_file_stem(key));
    }

    #[test]
    fn test_hash_key_uniqueness() {
        let keys = ["video-1", "video-2", "VIDEO-1", "video-1 "];

        let stems: HashSet<_> = keys.iter().map(|k| key_file_stem(k)).collect();

        assert_eq!(stems.len(), keys.len());
    }

    #[test]
    fn test_file_stem_is_filesystem_safe() {
        let stem = key_file_stem("../../etc/passwd");

        assert_eq!(stem.len(), 64);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_file_stem_matches_raw_hash() {
        let key = "some/key?with=query";
        let raw = hash_key(key);
        let hex: String = raw.iter().map(|b| format!("{:02x}", b)).collect();

        assert_eq!(key_file_stem(key), hex);
    }
}
