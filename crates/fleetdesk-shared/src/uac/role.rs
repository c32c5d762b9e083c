use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::errors::ConversionError;

/// Name of the role assigned to a user (eg. `admin`, `manager`, `staff`)
///
/// Roles are compared ignoring ASCII case because the Auth API capitalizes
/// them while route definitions tend not to. [`TryFrom`] checks locally
/// typed input, values sent by the Auth API are taken as they are
#[derive(Debug, Serialize, Deserialize, Clone, Eq)]
#[serde(transparent)]
pub struct RoleName(String);

impl RoleName {
    pub const MAX_LENGTH: usize = 32;

    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq for RoleName {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl TryFrom<String> for RoleName {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(ConversionError::Empty);
        }
        if value.len() > Self::MAX_LENGTH {
            return Err(ConversionError::MaxExceeded {
                max: Self::MAX_LENGTH,
                actual: value.len(),
            });
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for RoleName {
    type Error = ConversionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.to_string().try_into()
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
