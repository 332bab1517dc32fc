pub mod machine_id;
pub mod secret;

use hub_domain::Result;

/// Holds the derived AES-256 key in memory for the lifetime of the
/// process, built once at bootstrap from the machine identifier and the
/// stored salt (spec.md §4.1). Cheap to clone — wraps a fixed-size array.
#[derive(Clone)]
pub struct CipherSuite {
    key: [u8; 32],
}

impl CipherSuite {
    /// Resolves the machine identifier and derives the key from it and
    /// `salt`. Called once during bootstrap; the result is cached for the
    /// rest of the process lifetime (re-deriving per call would be
    /// wasteful — PBKDF2 at 480k iterations is deliberately slow).
    pub fn from_salt(salt: &[u8]) -> Result<Self> {
        let machine_id = machine_id::resolve_non_empty()?;
        Ok(Self {
            key: secret::derive_key(&machine_id, salt),
        })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        secret::encrypt(&self.key, plaintext)
    }

    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>> {
        secret::decrypt(&self.key, blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_suite_roundtrips() {
        let salt = secret::generate_salt();
        let suite = CipherSuite::from_salt(&salt).unwrap();
        let blob = suite.encrypt(b"hello").unwrap();
        assert_eq!(suite.decrypt(&blob).unwrap(), b"hello");
    }
}
