//! Self-validating value objects for the identity context.
//!
//! Every constructor validates its input and returns a typed error; no
//! instance can exist in an invalid state. `Username` and `Email` also
//! re-validate when deserialized, so a malformed stored payload is rejected
//! instead of producing an invalid aggregate.

use std::fmt;
use std::sync::LazyLock;

use gatekeeper_core::error::DomainError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("Invalid regex pattern"));

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("Invalid regex pattern")
});

const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Reasons a username is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    /// Empty or whitespace only.
    #[error("username cannot be blank")]
    Blank,
    /// Fewer than [`Username::MIN_LENGTH`] characters.
    #[error("username must be at least {min} characters long")]
    TooShort {
        /// Minimum accepted length.
        min: usize,
    },
    /// More than [`Username::MAX_LENGTH`] characters.
    #[error("username cannot be longer than {max} characters")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// Contains characters outside `[A-Za-z0-9._-]`.
    #[error("username can only contain letters, numbers, dots, underscores, and hyphens")]
    InvalidFormat,
}

/// Reasons an email address is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailError {
    /// Empty or whitespace only.
    #[error("email cannot be blank")]
    Blank,
    /// Not of the form `local@domain.tld`.
    #[error("invalid email format: {0}")]
    InvalidFormat(String),
}

/// Reasons a password is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    /// Fewer than [`Password::MIN_LENGTH`] characters.
    #[error("password must be at least {min} characters long, got {actual}")]
    TooShort {
        /// Length of the rejected input.
        actual: usize,
        /// Minimum accepted length.
        min: usize,
    },
    /// More than [`Password::MAX_LENGTH`] characters.
    #[error("password cannot be longer than {max} characters, got {actual}")]
    TooLong {
        /// Length of the rejected input.
        actual: usize,
        /// Maximum accepted length.
        max: usize,
    },
    /// Missing an uppercase letter, lowercase letter, digit or special
    /// character.
    #[error(
        "password must contain at least one uppercase letter, one lowercase letter, one number, and one special character"
    )]
    InvalidFormat,
}

impl From<UsernameError> for DomainError {
    fn from(err: UsernameError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EmailError> for DomainError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PasswordError> for DomainError {
    fn from(err: PasswordError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// A login name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Shortest accepted username.
    pub const MIN_LENGTH: usize = 3;
    /// Longest accepted username.
    pub const MAX_LENGTH: usize = 50;

    /// Validates and wraps a username.
    ///
    /// # Errors
    ///
    /// Returns a [`UsernameError`] describing the first rule the input breaks.
    pub fn new(value: impl Into<String>) -> Result<Self, UsernameError> {
        let value = value.into();
        let length = value.chars().count();
        if value.trim().is_empty() {
            return Err(UsernameError::Blank);
        }
        if length < Self::MIN_LENGTH {
            return Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if length > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !USERNAME_REGEX.is_match(&value) {
            return Err(UsernameError::InvalidFormat);
        }
        Ok(Self(value))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validates and wraps an email address.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Blank`] for blank input and
    /// [`EmailError::InvalidFormat`] for anything not shaped like
    /// `local@domain.tld`.
    pub fn new(value: impl Into<String>) -> Result<Self, EmailError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(EmailError::Blank);
        }
        if !EMAIL_REGEX.is_match(&value) {
            return Err(EmailError::InvalidFormat(value));
        }
        Ok(Self(value))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A plain-text password that satisfies the strength policy.
///
/// Never serialized and never printed: `Debug` and `Display` mask it. The
/// secret is only handed to the user directory through [`Password::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Shortest accepted password.
    pub const MIN_LENGTH: usize = 8;
    /// Longest accepted password.
    pub const MAX_LENGTH: usize = 64;

    /// Validates a password against the strength policy.
    ///
    /// # Errors
    ///
    /// Returns a [`PasswordError`] when the length is out of range or a
    /// required character class is missing.
    pub fn new(value: impl Into<String>) -> Result<Self, PasswordError> {
        let value = value.into();
        let actual = value.chars().count();
        if actual < Self::MIN_LENGTH {
            return Err(PasswordError::TooShort {
                actual,
                min: Self::MIN_LENGTH,
            });
        }
        if actual > Self::MAX_LENGTH {
            return Err(PasswordError::TooLong {
                actual,
                max: Self::MAX_LENGTH,
            });
        }

        let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = value.chars().any(|c| c.is_ascii_lowercase());
        let has_digit = value.chars().any(|c| c.is_ascii_digit());
        let has_special = value.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c));
        if !(has_upper && has_lower && has_digit && has_special) {
            return Err(PasswordError::InvalidFormat);
        }
        Ok(Self(value))
    }

    /// Returns the secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(********)")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}
