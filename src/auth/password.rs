use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64ct::{Base64, Encoding};
use rand::rngs::OsRng;
use tracing::{error, warn};

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Decodes a stored value only when it survives a base64 round trip unchanged.
fn legacy_decode(stored: &str) -> Option<String> {
    let bytes = Base64::decode_vec(stored).ok()?;
    if Base64::encode_string(&bytes) != stored {
        return None;
    }
    String::from_utf8(bytes).ok()
}

/// Checks `plain` against a stored password: an Argon2 PHC string, or a legacy
/// base64-encoded / plaintext value written by older clients.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    if stored.starts_with("$argon2") {
        return match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                error!(error = %e, "argon2 parse hash error");
                false
            }
        };
    }
    warn!("stored password uses the legacy reversible encoding");
    match legacy_decode(stored) {
        Some(decoded) => decoded == plain,
        None => stored == plain,
    }
}

/// The reversible encoding older clients stored.
#[cfg(test)]
pub fn legacy_encode(plain: &str) -> String {
    Base64::encode_string(plain.as_bytes())
}
