//! Per-file access tokens.
//!
//! A file token binds a caller's session token to one file path. The key
//! for each path is derived by HKDF-SHA256 from the process secret with
//! `info = "file-token" || path`; the session token is sealed with
//! ChaCha20-Poly1305 under a random 12-byte nonce and the whole
//! `nonce || ciphertext` blob is URL-safe base64 without padding.
//!
//! Verification derives the key from the *requested* path, so a token
//! issued for another file fails the AEAD open; that failure is
//! indistinguishable from a forged token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

const NONCE_SIZE: usize = 12;
const KEY_LEN: usize = 32;
const INFO_PREFIX: &[u8] = b"file-token";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FileTokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token or wrong file path")]
    Invalid,
}

#[derive(Serialize, Deserialize)]
struct FileTokenPayload {
    login_token: String,
}

/// Issues and verifies path-bound file tokens from the process secret.
pub struct FileTokenService {
    secret: Vec<u8>,
}

impl FileTokenService {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    fn derive_key(&self, file_path: &str) -> [u8; KEY_LEN] {
        let hkdf = Hkdf::<Sha256>::new(None, &self.secret);
        let mut info = Vec::with_capacity(INFO_PREFIX.len() + file_path.len());
        info.extend_from_slice(INFO_PREFIX);
        info.extend_from_slice(file_path.as_bytes());
        let mut key = [0u8; KEY_LEN];
        hkdf.expand(&info, &mut key)
            .expect("32 bytes is a valid HKDF output length");
        key
    }

    /// Issue a token binding `login_token` to `file_path`.
    pub fn generate(&self, login_token: &str, file_path: &str) -> String {
        let key = self.derive_key(file_path);
        let aead = ChaCha20Poly1305::new(Key::from_slice(&key));
        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let payload = FileTokenPayload {
            login_token: login_token.to_string(),
        };
        let plaintext = serde_json::to_vec(&payload).expect("payload serializes");
        let ciphertext = aead
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .expect("encryption cannot fail with a fresh nonce");

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        URL_SAFE_NO_PAD.encode(blob)
    }

    /// Open a token against a path; returns the sealed session token.
    pub fn verify(&self, token: &str, file_path: &str) -> Result<String, FileTokenError> {
        let blob = URL_SAFE_NO_PAD
            .decode(token.trim_end_matches('='))
            .map_err(|_| FileTokenError::Malformed)?;
        // 16 is the minimal AEAD tag length.
        if blob.len() < NONCE_SIZE + 16 {
            return Err(FileTokenError::Malformed);
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);

        let key = self.derive_key(file_path);
        let aead = ChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = aead
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| FileTokenError::Invalid)?;

        let payload: FileTokenPayload =
            serde_json::from_slice(&plaintext).map_err(|_| FileTokenError::Malformed)?;
        Ok(payload.login_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> FileTokenService {
        FileTokenService::new(b"test-process-secret".to_vec())
    }

    #[test]
    fn test_round_trip() {
        let svc = service();
        let token = svc.generate("session-abc", "/files/archives/x/photos/a.jpg");
        let login = svc
            .verify(&token, "/files/archives/x/photos/a.jpg")
            .unwrap();
        assert_eq!(login, "session-abc");
    }

    #[test]
    fn test_wrong_path_rejected() {
        let svc = service();
        let token = svc.generate("session-abc", "/files/archives/x/photos/b.jpg");
        let err = svc
            .verify(&token, "/files/archives/x/photos/a.jpg")
            .unwrap_err();
        assert_eq!(err, FileTokenError::Invalid);
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let svc = service();
        assert_eq!(
            svc.verify("%%% not base64", "/p").unwrap_err(),
            FileTokenError::Malformed
        );
        assert_eq!(
            svc.verify("c2hvcnQ", "/p").unwrap_err(),
            FileTokenError::Malformed
        );
    }

    #[test]
    fn test_tampered_token_rejected() {
        let svc = service();
        let token = svc.generate("session-abc", "/p");
        let mut bytes = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(bytes);
        assert_eq!(svc.verify(&tampered, "/p").unwrap_err(), FileTokenError::Invalid);
    }

    #[test]
    fn test_tokens_are_nonce_randomized() {
        let svc = service();
        let a = svc.generate("t", "/p");
        let b = svc.generate("t", "/p");
        assert_ne!(a, b);
    }
}
