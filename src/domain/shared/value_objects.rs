//! Shared value objects used across multiple bounded contexts

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-assigned call identifier (Twilio CallSid)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallSid(String);

impl CallSid {
    pub const MAX_LEN: usize = 64;

    /// Validate a provider call id. Ids become a path segment of provider
    /// API URLs, so only `[A-Za-z0-9_-]` is allowed.
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() || value.len() > Self::MAX_LEN {
            return Err(DomainError::MalformedInput(format!(
                "call id must be 1..={} characters",
                Self::MAX_LEN
            )));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        {
            return Err(DomainError::MalformedInput(format!(
                "call id contains invalid characters: {:?}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a single-active-call slot in the session tracker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub const DEFAULT: &'static str = "active";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Validate a key received from outside. Keys travel inside callback
    /// URLs, so only `[A-Za-z0-9_.-]` is allowed.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        if value.is_empty() || value.len() > 64 {
            return Err(DomainError::MalformedInput(format!(
                "session key must be 1..=64 characters: {:?}",
                value
            )));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(DomainError::MalformedInput(format!(
                "session key contains invalid characters: {:?}",
                value
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Destination phone number in E.164 form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Length of a national number without country code
    pub const NATIONAL_DIGITS: usize = 10;

    /// Parse a destination number.
    ///
    /// Accepts `+<8..15 digits>` as-is, or a bare ten-digit national number
    /// which gets `default_country_code` prepended. Spaces, dashes, dots and
    /// parentheses are ignored.
    pub fn parse(raw: &str, default_country_code: &str) -> Result<Self, DomainError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
            .collect();

        if let Some(digits) = cleaned.strip_prefix('+') {
            if (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
                return Ok(Self(cleaned));
            }
            return Err(DomainError::MalformedInput(format!(
                "invalid E.164 number: {}",
                raw
            )));
        }

        if cleaned.len() == Self::NATIONAL_DIGITS && cleaned.chars().all(|c| c.is_ascii_digit()) {
            let code = default_country_code.trim_start_matches('+');
            if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
                return Err(DomainError::Configuration(format!(
                    "invalid default country code: {}",
                    default_country_code
                )));
            }
            return Ok(Self(format!("+{}{}", code, cleaned)));
        }

        Err(DomainError::MalformedInput(format!(
            "phone number must be E.164 or {} digits: {}",
            Self::NATIONAL_DIGITS,
            raw
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
