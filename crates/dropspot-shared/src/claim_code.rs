//! Human-presentable claim codes of the form `XXXX-XXXX-XXXX`.
//!
//! Each symbol is drawn independently from the OS random source over
//! `A-Z0-9`. The generator does not know which codes are already taken;
//! callers check persisted codes and draw again on a collision.

use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{CLAIM_CODE_GROUPS, CLAIM_CODE_GROUP_LEN};
use crate::error::SharedError;

pub const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Total length including the two hyphens.
pub const CODE_LEN: usize = CLAIM_CODE_GROUPS * CLAIM_CODE_GROUP_LEN + CLAIM_CODE_GROUPS - 1;

/// A claim code known to match `^[A-Z0-9]{4}-[A-Z0-9]{4}-[A-Z0-9]{4}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClaimCode(String);

impl ClaimCode {
    /// Draw a fresh code from the OS random source.
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut code = String::with_capacity(CODE_LEN);
        for group in 0..CLAIM_CODE_GROUPS {
            if group > 0 {
                code.push('-');
            }
            for _ in 0..CLAIM_CODE_GROUP_LEN {
                let idx = rng.gen_range(0..CODE_ALPHABET.len());
                code.push(CODE_ALPHABET[idx] as char);
            }
        }
        Self(code)
    }

    pub fn parse(s: &str) -> Result<Self, SharedError> {
        if is_valid_format(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(SharedError::InvalidClaimCode(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClaimCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ClaimCode {
    type Error = SharedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid_format(&value) {
            Ok(Self(value))
        } else {
            Err(SharedError::InvalidClaimCode(value))
        }
    }
}

impl From<ClaimCode> for String {
    fn from(code: ClaimCode) -> Self {
        code.0
    }
}

/// Check the `XXXX-XXXX-XXXX` shape over uppercase alphanumerics.
pub fn is_valid_format(code: &str) -> bool {
    let bytes = code.as_bytes();
    if bytes.len() != CODE_LEN {
        return false;
    }

    bytes.iter().enumerate().all(|(i, &b)| {
        if (i + 1) % (CLAIM_CODE_GROUP_LEN + 1) == 0 {
            b == b'-'
        } else {
            b.is_ascii_uppercase() || b.is_ascii_digit()
        }
    })
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where the claim ledger draws candidate codes from.
pub trait ClaimCodeSource: Send + Sync {
    fn next_code(&self) -> ClaimCode;
}

/// Production source backed by the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomCodes;

impl ClaimCodeSource for OsRandomCodes {
    fn next_code(&self) -> ClaimCode {
        ClaimCode::generate()
    }
}
