//! Invite-link share tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;

pub const TOKEN_LEN: usize = 32;

/// Generate a URL-safe random token of exactly [`TOKEN_LEN`] characters.
///
/// 32 CSPRNG bytes encode to 43 characters; the first 32 keep 192 bits.
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    rand::rng().fill_bytes(&mut bytes);
    let mut encoded = URL_SAFE_NO_PAD.encode(bytes);
    encoded.truncate(TOKEN_LEN);
    encoded
}

pub fn is_valid(token: &str) -> bool {
    token.len() == TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
