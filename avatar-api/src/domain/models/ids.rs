use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::AvatarError;

/// An opaque account identifier.
///
/// Storage keys and profile records are derived from it, so it may not
/// contain path separators, `..` or control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn parse(id: impl Into<String>) -> Result<Self, AvatarError> {
        let id = id.into();

        let invalid = id.trim().is_empty()
            || id.len() > 128
            || id.contains(['/', '\\'])
            || id.contains("..")
            || id.chars().any(|c| c.is_control() || c.is_whitespace());

        if invalid {
            return Err(AvatarError::InvalidUserId(id));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for UserId {
    type Err = AvatarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = AvatarError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::parse(id)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}
