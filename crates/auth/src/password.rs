//! Password policy: validation, strength scoring, and Argon2id hashing.
//!
//! Validation evaluates every rule so the caller can report all violations at
//! once. Scoring is independent of validity.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Serialize;
use thiserror::Error;

pub const MIN_LENGTH: usize = 12;
pub const MAX_LENGTH: usize = 128;

/// The fixed punctuation set that counts as the symbol class.
pub const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:'\",.<>?/`~\\";

/// Keyboard-adjacency runs rejected as substrings (case-insensitive).
const KEYBOARD_SEQUENCES: &[&str] = &[
    "qwerty", "asdf", "zxcv", "1234", "4321", "abcd", "9876",
];

/// Common passwords rejected as substrings (case-insensitive).
const COMMON_PASSWORDS: &[&str] = &[
    "password", "letmein", "welcome", "iloveyou", "monkey", "dragon", "sunshine", "princess",
    "football", "admin123",
];

/// One violated validation rule.
///
/// Carries no candidate text: responses report field-level detail only, never
/// the offending value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordViolation {
    TooShort,
    TooLong,
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
    MissingSymbol,
    RepeatedCharacters,
    KeyboardSequence,
    CommonPassword,
}

impl PasswordViolation {
    pub fn message(&self) -> &'static str {
        match self {
            PasswordViolation::TooShort => "Password must be at least 12 characters",
            PasswordViolation::TooLong => "Password must be at most 128 characters",
            PasswordViolation::MissingUppercase => "Password must contain an uppercase letter",
            PasswordViolation::MissingLowercase => "Password must contain a lowercase letter",
            PasswordViolation::MissingDigit => "Password must contain a digit",
            PasswordViolation::MissingSymbol => "Password must contain a symbol",
            PasswordViolation::RepeatedCharacters => {
                "Password must not repeat a character three or more times in a row"
            }
            PasswordViolation::KeyboardSequence => {
                "Password must not contain a keyboard sequence"
            }
            PasswordViolation::CommonPassword => "Password must not contain a common password",
        }
    }
}

/// Result of validating a candidate password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCheck {
    pub is_valid: bool,
    pub errors: Vec<PasswordViolation>,
    pub score: u8,
}

/// Validate a candidate against every policy rule and score it.
pub fn validate(candidate: &str) -> PasswordCheck {
    let mut errors = Vec::new();
    let length = candidate.chars().count();

    if length < MIN_LENGTH {
        errors.push(PasswordViolation::TooShort);
    }
    if length > MAX_LENGTH {
        errors.push(PasswordViolation::TooLong);
    }

    if !candidate.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push(PasswordViolation::MissingUppercase);
    }
    if !candidate.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push(PasswordViolation::MissingLowercase);
    }
    if !candidate.chars().any(|c| c.is_ascii_digit()) {
        errors.push(PasswordViolation::MissingDigit);
    }
    if !candidate.chars().any(|c| SYMBOLS.contains(c)) {
        errors.push(PasswordViolation::MissingSymbol);
    }

    if has_triple_repeat(candidate) {
        errors.push(PasswordViolation::RepeatedCharacters);
    }

    let lowered = candidate.to_lowercase();
    if KEYBOARD_SEQUENCES.iter().any(|seq| lowered.contains(seq)) {
        errors.push(PasswordViolation::KeyboardSequence);
    }
    if COMMON_PASSWORDS.iter().any(|word| lowered.contains(word)) {
        errors.push(PasswordViolation::CommonPassword);
    }

    PasswordCheck {
        is_valid: errors.is_empty(),
        errors,
        score: score(candidate),
    }
}

fn has_triple_repeat(candidate: &str) -> bool {
    let chars: Vec<char> = candidate.chars().collect();
    chars.windows(3).any(|w| w[0] == w[1] && w[1] == w[2])
}

/// Strength score in 0..=100, independent of validity.
pub fn score(candidate: &str) -> u8 {
    let length = candidate.chars().count();
    let mut score: u32 = 0;

    if length >= 12 {
        score += 20;
    }
    if length >= 16 {
        score += 10;
    }
    if length >= 20 {
        score += 10;
    }

    let classes = [
        candidate.chars().any(|c| c.is_ascii_uppercase()),
        candidate.chars().any(|c| c.is_ascii_lowercase()),
        candidate.chars().any(|c| c.is_ascii_digit()),
        candidate.chars().any(|c| SYMBOLS.contains(c)),
    ];
    score += classes.iter().filter(|present| **present).count() as u32 * 15;

    if length > 0 {
        let distinct: std::collections::HashSet<char> = candidate.chars().collect();
        if distinct.len() as f64 / length as f64 >= 0.6 {
            score += 10;
        }
    }

    score.min(100) as u8
}

#[derive(Debug, Error)]
pub enum PasswordHashError {
    /// Hashing failed (never surfaced with detail to a caller).
    #[error("failed to hash password")]
    Hash(String),

    /// A stored digest could not be parsed as a PHC string.
    #[error("stored password digest is malformed")]
    MalformedDigest(String),
}

/// Hash a plaintext with Argon2id at default (strong) parameters.
///
/// Returns the PHC-formatted string carrying salt and parameters.
pub fn hash(plaintext: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|digest| digest.to_string())
        .map_err(|e| PasswordHashError::Hash(e.to_string()))
}

/// Verify a plaintext against a PHC digest.
///
/// The comparison is delegated to the hashing primitive, which is safe
/// against timing probes.
pub fn verify(plaintext: &str, digest: &str) -> Result<bool, PasswordHashError> {
    let parsed = PasswordHash::new(digest)
        .map_err(|e| PasswordHashError::MalformedDigest(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_password_fails_even_with_full_variety() {
        let check = validate("Aa1!bcde");
        assert!(!check.is_valid);
        assert_eq!(check.errors, vec![PasswordViolation::TooShort]);
    }

    #[test]
    fn strong_passphrase_passes_cleanly() {
        let check = validate("Tr0ub4dor&3Zephyr!");
        assert!(check.is_valid, "unexpected errors: {:?}", check.errors);
        assert!(check.errors.is_empty());
    }

    #[test]
    fn all_violations_are_reported_at_once() {
        // Lowercase-only, too short, keyboard run, no digit/symbol/upper.
        let check = validate("qwertyzz");
        assert!(check.errors.contains(&PasswordViolation::TooShort));
        assert!(check.errors.contains(&PasswordViolation::MissingUppercase));
        assert!(check.errors.contains(&PasswordViolation::MissingDigit));
        assert!(check.errors.contains(&PasswordViolation::MissingSymbol));
        assert!(check.errors.contains(&PasswordViolation::KeyboardSequence));
    }

    #[test]
    fn triple_repeats_are_rejected() {
        let check = validate("Baaa1!xyzQrst");
        assert!(check.errors.contains(&PasswordViolation::RepeatedCharacters));
    }

    #[test]
    fn common_passwords_are_rejected_case_insensitively() {
        let check = validate("MyPaSsWoRd11!x");
        assert!(check.errors.contains(&PasswordViolation::CommonPassword));
    }

    #[test]
    fn score_rewards_length_classes_and_uniqueness() {
        // 12 chars, all four classes, high distinct ratio: 20 + 60 + 10.
        assert_eq!(score("Abcdefg1!jkm"), 90);
        // 20+ chars caps at 100.
        assert_eq!(score("Abcdefg1!jkmRstuv234"), 100);
        // Scoring is independent of validity.
        let check = validate("aaaa");
        assert!(!check.is_valid);
        assert_eq!(check.score, 15);
    }

    #[test]
    fn hash_verify_round_trip() {
        let digest = hash("correct-horse-battery-staple").unwrap();
        assert!(digest.starts_with("$argon2"));
        assert!(verify("correct-horse-battery-staple", &digest).unwrap());
        assert!(!verify("wrong-password", &digest).unwrap());
    }

    #[test]
    fn same_password_salts_differently() {
        let a = hash("same-password").unwrap();
        let b = hash("same-password").unwrap();
        assert_ne!(a, b);
        assert!(verify("same-password", &a).unwrap());
        assert!(verify("same-password", &b).unwrap());
    }

    #[test]
    fn malformed_digest_is_an_error_not_a_mismatch() {
        assert!(verify("password", "not-a-valid-hash").is_err());
    }
}
