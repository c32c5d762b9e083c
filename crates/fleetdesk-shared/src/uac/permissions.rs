use std::{collections::BTreeSet, fmt::Display};

/// A single capability claim carried on the user record (eg. `vehicles.edit`)
///
/// Which screens need which permission is decided by the route definitions,
/// this type only carries the claim
#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
#[serde(transparent)]
pub struct Permission(String);

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Permissions(pub BTreeSet<Permission>);

impl Permission {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Permissions {
    pub fn contains(&self, permission: &Permission) -> bool {
        self.0.contains(permission)
    }

    /// Returns true only if every one of `perms` is held
    pub fn includes(&self, perms: &[Permission]) -> bool {
        perms.iter().all(|x| self.0.contains(x))
    }

    /// Returns the subset of `perms` that is not held
    pub fn missing<'a>(&self, perms: &'a [Permission]) -> Vec<&'a Permission> {
        perms.iter().filter(|x| !self.0.contains(x)).collect()
    }
}

impl From<Vec<Permission>> for Permissions {
    fn from(value: Vec<Permission>) -> Self {
        Self(value.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for Permissions {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        Self(iter.into_iter().map(Permission::from).collect())
    }
}
