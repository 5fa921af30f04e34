//! Symmetric obfuscation for tenant secrets at rest.
//!
//! This is deliberately not authenticated encryption: it mirrors the XOR
//! scheme the system was ported from, not a security upgrade.

use crate::error::Error;
use base64::{engine::general_purpose::URL_SAFE, Engine};
use sha2::{Digest, Sha256};

pub const PASSPHRASE_ENV: &str = "TENANT_SECRET_PASSPHRASE";

fn derive_key(passphrase: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(passphrase.as_bytes());
    hasher.finalize().into()
}

fn xor_with_key(data: &[u8], key: &[u8; 32]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}

fn passphrase() -> Result<String, Error> {
    std::env::var(PASSPHRASE_ENV).map_err(|_| {
        Error::Misconfigured(format!(
            "{PASSPHRASE_ENV} must be set to store credentials securely"
        ))
    })
}

/// Encrypt a tenant secret for storage.
pub fn encrypt_secret(secret: &str) -> Result<String, Error> {
    let key = derive_key(&passphrase()?);
    let encrypted = xor_with_key(secret.as_bytes(), &key);
    Ok(URL_SAFE.encode(encrypted))
}

/// Decrypt a tenant secret read from storage.
pub fn decrypt_secret(token: &str) -> Result<String, Error> {
    let key = derive_key(&passphrase()?);
    let data = URL_SAFE
        .decode(token)
        .map_err(|e| Error::Misconfigured(format!("invalid stored secret: {e}")))?;
    let decrypted = xor_with_key(&data, &key);
    String::from_utf8(decrypted)
        .map_err(|e| Error::Misconfigured(format!("invalid stored secret: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn round_trips_with_passphrase_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(PASSPHRASE_ENV, "correct-horse-battery-staple");
        let token = encrypt_secret("super-secret-value").unwrap();
        assert_ne!(token, "super-secret-value");
        let back = decrypt_secret(&token).unwrap();
        assert_eq!(back, "super-secret-value");
        std::env::remove_var(PASSPHRASE_ENV);
    }

    #[test]
    fn fails_closed_without_passphrase() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var(PASSPHRASE_ENV);
        let err = encrypt_secret("whatever").unwrap_err();
        assert!(matches!(err, Error::Misconfigured(_)));
    }
}
