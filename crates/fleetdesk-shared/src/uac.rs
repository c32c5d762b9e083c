//! Shared items related to user account control

mod permissions;
mod role;
mod user;

pub use permissions::{Permission, Permissions};
pub use role::RoleName;
pub use user::{DisplayName, Email, UserId, UserInfo};
