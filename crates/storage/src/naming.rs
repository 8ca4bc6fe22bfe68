//! Object key derivation.

use sha2::{Digest, Sha256};

/// Hex characters of the content digest kept in object names.
const DIGEST_PREFIX_LEN: usize = 12;

/// Content-addressed object name: `<sha256 prefix>-<filename>`.
///
/// Two different photos uploaded under the same filename get distinct
/// objects, and re-uploading identical bytes maps to the same object.
pub fn object_name(filename: &str, bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let hex: String = digest
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
        .chars()
        .take(DIGEST_PREFIX_LEN)
        .collect();
    format!("{hex}-{filename}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_same_name() {
        assert_eq!(object_name("cat.jpg", b"abc"), object_name("cat.jpg", b"abc"));
    }

    #[test]
    fn different_bytes_different_name() {
        assert_ne!(object_name("cat.jpg", b"abc"), object_name("cat.jpg", b"abd"));
    }

    #[test]
    fn filename_is_kept_as_suffix() {
        let name = object_name("cat.jpg", b"abc");
        // sha256("abc") = ba7816bf8f01...
        assert_eq!(name, "ba7816bf8f01-cat.jpg");
    }
}
