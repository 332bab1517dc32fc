use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use hub_domain::{Error, Result};

/// ≥480k iterations of HMAC-SHA-256, per spec.md §4.1.
pub const KDF_ITERATIONS: u32 = 480_000;

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Generates a fresh random 32-byte salt, persisted as a `SystemConfig`
/// secret row. Rotating the salt invalidates every secret encrypted under
/// the old one — treat as destructive (spec.md §4.1).
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    use rand::RngCore;
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derives a 256-bit AES key from the machine identifier and the stored
/// salt via PBKDF2-HMAC-SHA256.
pub fn derive_key(machine_id: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(machine_id.as_bytes(), salt, KDF_ITERATIONS, &mut key);
    key
}

/// Encrypts `plaintext` with AES-256-GCM, returning `nonce || ciphertext`.
/// The nonce is generated fresh per call and prepended so `decrypt` is
/// self-contained given only the key.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("encrypt failed: {e}")))?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a blob produced by [`encrypt`]. Fails if the blob is shorter
/// than the nonce, or if the AEAD tag doesn't verify (tampering, wrong
/// key, or salt rotation since encryption).
pub fn decrypt(key: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_LEN {
        return Err(Error::Crypto("ciphertext shorter than nonce".into()));
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| Error::Crypto("decrypt failed: invalid key or tampered ciphertext".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let key = derive_key("machine-abc", b"some-salt-bytes-123456789012345");
        let blob = encrypt(&key, b"super secret token").unwrap();
        let plain = decrypt(&key, &blob).unwrap();
        assert_eq!(plain, b"super secret token");
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let key_a = derive_key("machine-a", b"saltsaltsaltsaltsaltsaltsaltsalt");
        let key_b = derive_key("machine-b", b"saltsaltsaltsaltsaltsaltsaltsalt");
        let blob = encrypt(&key_a, b"payload").unwrap();
        assert!(decrypt(&key_b, &blob).is_err());
    }

    #[test]
    fn rotated_salt_invalidates_secret() {
        let salt_old = b"old-salt-old-salt-old-salt-old1".to_vec();
        let salt_new = b"new-salt-new-salt-new-salt-new2".to_vec();
        let key_old = derive_key("machine-x", &salt_old);
        let key_new = derive_key("machine-x", &salt_new);
        let blob = encrypt(&key_old, b"token").unwrap();
        assert!(decrypt(&key_new, &blob).is_err());
    }

    #[test]
    fn derive_key_is_deterministic() {
        let a = derive_key("machine-abc", b"fixed-salt-fixed-salt-fixed-sal");
        let b = derive_key("machine-abc", b"fixed-salt-fixed-salt-fixed-sal");
        assert_eq!(a, b);
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = derive_key("machine-abc", b"fixed-salt-fixed-salt-fixed-sal");
        let mut blob = encrypt(&key, b"payload").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        assert!(decrypt(&key, &blob).is_err());
    }
}
