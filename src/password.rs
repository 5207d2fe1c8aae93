//! Password Hashing and Strength Policy
//!
//! Argon2id hashing plus the strength rules applied at registration.
//! Policy checks never short-circuit; every violated rule is reported so
//! the caller can surface them all at once.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::fmt;

use crate::error::ApiError;

// ============================================
// Hashing
// ============================================

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    Ok(hash)
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| ApiError::Internal)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

// ============================================
// Strength Policy
// ============================================

/// Account attributes a password is compared against
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountAttributes<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// One violated password rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    /// Password resembles one of the account's own attributes
    TooSimilar { attribute: &'static str },
    /// Password is shorter than the configured minimum
    TooShort { min_length: usize },
    /// Password appears on the common password list
    TooCommon,
    /// Password consists only of digits
    EntirelyNumeric,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooSimilar { attribute } => {
                write!(f, "The password is too similar to the {}.", attribute)
            }
            Self::TooShort { min_length } => write!(
                f,
                "This password is too short. It must contain at least {} characters.",
                min_length
            ),
            Self::TooCommon => write!(f, "This password is too common."),
            Self::EntirelyNumeric => write!(f, "This password is entirely numeric."),
        }
    }
}

/// Password strength policy
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    /// Minimum password length
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl PasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Check a candidate password against every rule
    ///
    /// Returns all violated rules, ordered similarity, length, common list,
    /// numeric. An empty vec means the password is acceptable.
    pub fn validate(&self, password: &str, attributes: &AccountAttributes) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();
        let password_lower = password.to_lowercase();

        let email_local = attributes.email.split('@').next().unwrap_or("");
        let similarity_checks = [
            (attributes.username, "username"),
            (email_local, "email address"),
            (attributes.first_name, "first name"),
            (attributes.last_name, "last name"),
        ];
        for (value, attribute) in similarity_checks {
            if is_too_similar(&password_lower, &value.to_lowercase()) {
                violations.push(PolicyViolation::TooSimilar { attribute });
            }
        }

        if password.chars().count() < self.min_length {
            violations.push(PolicyViolation::TooShort {
                min_length: self.min_length,
            });
        }

        if is_common_password(&password_lower) {
            violations.push(PolicyViolation::TooCommon);
        }

        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            violations.push(PolicyViolation::EntirelyNumeric);
        }

        violations
    }
}

/// Case-insensitive containment in either direction
///
/// Values shorter than 3 characters are skipped to avoid matching on
/// initials and single letters.
fn is_too_similar(password_lower: &str, attribute_lower: &str) -> bool {
    if attribute_lower.len() < 3 {
        return false;
    }

    if password_lower.contains(attribute_lower) {
        return true;
    }

    password_lower.len() >= 3 && attribute_lower.contains(password_lower)
}

// ============================================
// Common Password List
// ============================================

/// Check a lowercased password against the denylist
///
/// Matches the list directly, or a listed base of 4+ characters with only
/// digits appended ("password2024" matches "password").
fn is_common_password(password_lower: &str) -> bool {
    if COMMON_PASSWORDS.contains(&password_lower) {
        return true;
    }

    for common in COMMON_PASSWORDS {
        if common.len() >= 4 && password_lower.starts_with(common) {
            let suffix = &password_lower[common.len()..];
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
                return true;
            }
        }
    }

    false
}

/// Compact denylist drawn from the usual leaked-password rankings
static COMMON_PASSWORDS: &[&str] = &[
    "123456", "12345678", "123456789", "1234567890", "12345", "1234", "123123", "111111",
    "11111111", "121212", "654321", "666666", "000000", "112233", "123321", "159753", "987654321",
    "password", "passwort", "passw0rd", "password1", "qwerty", "qwertyuiop", "qwerty123",
    "1qaz2wsx", "1q2w3e4r", "qazwsx", "zxcvbnm", "asdfgh", "asdfghjkl", "abc123", "letmein",
    "welcome", "welcome1", "monkey", "dragon", "master", "shadow", "sunshine", "princess",
    "iloveyou", "lovely", "flower", "superman", "batman", "trustno1", "freedom", "whatever",
    "starwars", "pokemon", "naruto", "football", "baseball", "soccer", "hockey", "jordan",
    "michael", "jennifer", "charlie", "daniel", "matthew", "michelle", "jessica", "ashley",
    "nicole", "hannah", "thomas", "robert", "george", "andrew", "joshua", "amanda", "hunter",
    "tigger", "pepper", "ginger", "cookie", "cheese", "banana", "summer", "winter", "secret",
    "admin", "admin123", "administrator", "root", "toor", "guest", "login", "access", "test",
    "test123", "testing", "changeme", "default", "internet", "computer", "samsung", "google",
    "killer", "mustang", "harley", "ranger", "buster", "hello", "hello123", "hottie", "zaq12wsx",
];

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn violation_messages(violations: &[PolicyViolation]) -> Vec<String> {
        violations.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery staple").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("samepassword").unwrap();
        let second = hash_password("samepassword").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(verify_password("anything", "not a phc string").is_err());
    }

    #[test]
    fn test_acceptable_password_has_no_violations() {
        let policy = PasswordPolicy::default();
        let attributes = AccountAttributes {
            username: "alice",
            email: "a@x.com",
            ..Default::default()
        };

        assert!(policy.validate("Tr0ub4dor&3", &attributes).is_empty());
    }

    #[test]
    fn test_too_short() {
        let policy = PasswordPolicy::default();
        let violations = policy.validate("abcdefg", &AccountAttributes::default());

        assert_eq!(
            violations,
            vec![PolicyViolation::TooShort { min_length: 8 }]
        );
        assert_eq!(
            violation_messages(&violations)[0],
            "This password is too short. It must contain at least 8 characters."
        );
    }

    #[test]
    fn test_entirely_numeric_at_full_length() {
        let policy = PasswordPolicy::default();
        let violations = policy.validate("12345678", &AccountAttributes::default());

        // Long enough, but still numeric (and on the common list)
        assert!(!violations.contains(&PolicyViolation::TooShort { min_length: 8 }));
        assert!(violations.contains(&PolicyViolation::EntirelyNumeric));
        assert!(violations.contains(&PolicyViolation::TooCommon));
    }

    #[test]
    fn test_short_numeric_reports_both_rules() {
        let policy = PasswordPolicy::default();
        let violations = policy.validate("4711", &AccountAttributes::default());

        assert!(violations.contains(&PolicyViolation::TooShort { min_length: 8 }));
        assert!(violations.contains(&PolicyViolation::EntirelyNumeric));
    }

    #[test]
    fn test_common_password() {
        let policy = PasswordPolicy::default();

        let violations = policy.validate("password123", &AccountAttributes::default());
        assert!(violations.contains(&PolicyViolation::TooCommon));

        // Case insensitive
        let violations = policy.validate("QWERTY123", &AccountAttributes::default());
        assert!(violations.contains(&PolicyViolation::TooCommon));
    }

    #[test]
    fn test_similar_to_username() {
        let policy = PasswordPolicy::default();
        let attributes = AccountAttributes {
            username: "johndoe",
            ..Default::default()
        };

        let violations = policy.validate("JohnDoe2024!", &attributes);
        assert!(violations.contains(&PolicyViolation::TooSimilar {
            attribute: "username"
        }));
        assert!(violation_messages(&violations)
            .contains(&"The password is too similar to the username.".to_string()));
    }

    #[test]
    fn test_similar_to_email_local_part() {
        let policy = PasswordPolicy::default();
        let attributes = AccountAttributes {
            email: "marianne@example.com",
            ..Default::default()
        };

        let violations = policy.validate("marianne!!", &attributes);
        assert!(violations.contains(&PolicyViolation::TooSimilar {
            attribute: "email address"
        }));
    }

    #[test]
    fn test_password_inside_attribute_is_flagged() {
        let policy = PasswordPolicy::default();
        let attributes = AccountAttributes {
            first_name: "Konstantin",
            ..Default::default()
        };

        let violations = policy.validate("onstantin", &attributes);
        assert!(violations.contains(&PolicyViolation::TooSimilar {
            attribute: "first name"
        }));
    }

    #[test]
    fn test_short_attributes_are_skipped() {
        let policy = PasswordPolicy::default();
        let attributes = AccountAttributes {
            username: "al",
            email: "a@x.com",
            ..Default::default()
        };

        let violations = policy.validate("salamander7", &attributes);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_configured_min_length() {
        let policy = PasswordPolicy::new(12);
        let violations = policy.validate("elevenchars", &AccountAttributes::default());

        assert!(violations.contains(&PolicyViolation::TooShort { min_length: 12 }));
    }
}
