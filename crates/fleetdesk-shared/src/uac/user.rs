use std::fmt::Display;

use serde_aux::field_attributes::deserialize_string_from_number;

use crate::errors::ConversionError;

use super::{Permission, Permissions, RoleName};

/// Identifier assigned by the Auth API. Accepted as either a JSON number or
/// string and always kept as a string
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct UserId(#[serde(deserialize_with = "deserialize_string_from_number")] String);

/// An email address. [`TryFrom`] checks locally typed input, values sent by
/// the Auth API are taken as they are
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

#[derive(Default, Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

/// Stores the user info that is returned on login and refresh and cached
/// between page loads
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: UserId,
    pub email: Email,
    #[serde(rename = "fullName", alias = "displayName")]
    pub display_name: DisplayName,
    pub role: RoleName,
    #[serde(default)]
    pub preferred_language: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
}

impl UserInfo {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.matches(role)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|role| self.has_role(role.as_ref()))
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }
}

impl UserId {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }
}

impl Email {
    pub const MAX_LENGTH: usize = 254;
}

impl DisplayName {
    pub const MAX_LENGTH: usize = 100;
}

impl TryFrom<String> for Email {
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
        match value.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(Self(value)),
            _ => Err(ConversionError::NotAnEmail(value)),
        }
    }
}

impl TryFrom<&str> for Email {
    type Error = ConversionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.to_string().try_into()
    }
}

impl TryFrom<String> for DisplayName {
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

impl TryFrom<&str> for DisplayName {
    type Error = ConversionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.to_string().try_into()
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
