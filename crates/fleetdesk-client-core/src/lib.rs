//! Client side authentication session pipeline for the fleet dashboard
//!
//! Holds the session, issues and refreshes credentials, attaches them to
//! outgoing requests and gates navigation on role and permission claims.
//! NB: The assumption is made that the async runtime has already been started
//! before any functions from this library are called

#![warn(unused_crate_dependencies)]


pub mod configuration;
mod errors;
pub mod navigation;
mod session;
mod transport;

pub use configuration::{ApiSettings, ClientSettings, RouteSettings, StorageSettings};
pub use errors::{RequestError, SessionError};
pub use navigation::{
    guards::{CanDeactivate, GuardOutcome, RouteData, RouteGuards},
    HistoryNavigator, NavigationTarget, Navigator,
};
pub use session::{
    credentials::CredentialStore,
    state::{LoadingGuard, Session, SessionSnapshot},
    storage::{KeyValueStore, MemoryStore, StoreOp},
    SessionManager,
};
pub use transport::{
    authorizer::{ApiRequest, MultipartPart, RequestAuthorizer, RequestBody},
    HttpReply,
};

#[cfg(not(target_arch = "wasm32"))]
pub use session::storage::FileStore;
#[cfg(target_arch = "wasm32")]
pub use session::storage::LocalStorageStore;
