//! Predicates evaluated before a route is activated
//!
//! The `check_*` functions are pure and only decide. [`RouteGuards`] reads the
//! current session, runs them and performs the redirect they ask for

use fleetdesk_shared::{
    const_config::route::ROUTE_QUERY_RETURN_URL,
    uac::{Permission, UserInfo},
};
use tracing::{debug, info};

use super::NavigationTarget;
use crate::{RouteSettings, SessionManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    /// Stay on the current route without going anywhere else
    Deny,
    Redirect(NavigationTarget),
}

impl GuardOutcome {
    /// Returns `true` if the guard outcome is [`Allow`].
    ///
    /// [`Allow`]: GuardOutcome::Allow
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Access requirements declared on a route definition
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteData {
    /// Treated as `true` when not set
    pub requires_auth: Option<bool>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl RouteData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requires_auth(mut self, value: bool) -> Self {
        self.requires_auth = Some(value);
        self
    }

    pub fn roles<S: Into<String>>(mut self, roles: impl IntoIterator<Item = S>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn permissions<S: Into<String>>(mut self, perms: impl IntoIterator<Item = S>) -> Self {
        self.permissions = perms.into_iter().map(Permission::new).collect();
        self
    }

    /// Declaring roles or permissions implies the route needs a session
    fn needs_session(&self) -> bool {
        self.requires_auth.unwrap_or(true) || !self.roles.is_empty() || !self.permissions.is_empty()
    }
}

/// Implemented by views that may want to block leaving them (eg. a form
/// with unsaved changes)
pub trait CanDeactivate {
    fn can_deactivate(&self) -> bool;
}

pub fn check_auth(user: Option<&UserInfo>, attempted_url: &str, routes: &RouteSettings) -> GuardOutcome {
    if user.is_some() {
        GuardOutcome::Allow
    } else {
        GuardOutcome::Redirect(login_redirect(attempted_url, routes))
    }
}

pub fn check_guest(user: Option<&UserInfo>, routes: &RouteSettings) -> GuardOutcome {
    if user.is_some() {
        GuardOutcome::Redirect(NavigationTarget::push(&routes.dashboard))
    } else {
        GuardOutcome::Allow
    }
}

/// An empty `allowed_roles` admits any authenticated user
pub fn check_roles<S: AsRef<str>>(
    user: Option<&UserInfo>,
    allowed_roles: &[S],
    attempted_url: &str,
    routes: &RouteSettings,
) -> GuardOutcome {
    let Some(user) = user else {
        return GuardOutcome::Redirect(login_redirect(attempted_url, routes));
    };
    if allowed_roles.is_empty() || user.has_any_role(allowed_roles) {
        GuardOutcome::Allow
    } else {
        debug!(role = %user.role, "role not allowed");
        GuardOutcome::Redirect(NavigationTarget::push(&routes.unauthorized))
    }
}

/// Every one of `required` must be held
pub fn check_permissions(
    user: Option<&UserInfo>,
    required: &[Permission],
    attempted_url: &str,
    routes: &RouteSettings,
) -> GuardOutcome {
    let Some(user) = user else {
        return GuardOutcome::Redirect(login_redirect(attempted_url, routes));
    };
    if user.permissions.includes(required) {
        GuardOutcome::Allow
    } else {
        debug!(missing = ?user.permissions.missing(required), "missing permissions");
        GuardOutcome::Redirect(NavigationTarget::push(&routes.unauthorized))
    }
}

/// Authentication, then roles, then permissions. Stops at the first failure
pub fn check_route_data(
    user: Option<&UserInfo>,
    data: &RouteData,
    attempted_url: &str,
    routes: &RouteSettings,
) -> GuardOutcome {
    if !data.needs_session() {
        return GuardOutcome::Allow;
    }
    match check_auth(user, attempted_url, routes) {
        GuardOutcome::Allow => {}
        outcome => return outcome,
    }
    match check_roles(user, &data.roles, attempted_url, routes) {
        GuardOutcome::Allow => {}
        outcome => return outcome,
    }
    check_permissions(user, &data.permissions, attempted_url, routes)
}

pub fn check_can_deactivate(component: Option<&dyn CanDeactivate>) -> GuardOutcome {
    match component {
        Some(component) if !component.can_deactivate() => GuardOutcome::Deny,
        _ => GuardOutcome::Allow,
    }
}

/// Where to go once login succeeds. Only same origin relative paths are
/// accepted from the `returnUrl` parameter
pub fn return_target(login_url: &str, routes: &RouteSettings) -> NavigationTarget {
    let login = NavigationTarget::parse(login_url);
    let candidate = login
        .query_param(ROUTE_QUERY_RETURN_URL)
        .filter(|url| is_local_path(url))
        .map(NavigationTarget::parse)
        .filter(|target| target.path != routes.login);
    let mut target = candidate.unwrap_or_else(|| NavigationTarget::push(&routes.dashboard));
    target.replace_url = true;
    target
}

fn is_local_path(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.contains('\\')
}

fn login_redirect(attempted_url: &str, routes: &RouteSettings) -> NavigationTarget {
    NavigationTarget::replace(&routes.login).with_query(ROUTE_QUERY_RETURN_URL, attempted_url)
}

/// The guards bound to a session. Each call reads the session as it is at
/// that moment and never waits on the network
#[derive(Debug, Clone)]
pub struct RouteGuards {
    session: SessionManager,
}

impl RouteGuards {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn auth_guard(&self, attempted_url: &str) -> GuardOutcome {
        let user = self.session.current_user();
        self.apply(check_auth(user.as_deref(), attempted_url, self.routes()))
    }

    pub fn guest_guard(&self) -> GuardOutcome {
        let user = self.session.current_user();
        self.apply(check_guest(user.as_deref(), self.routes()))
    }

    pub fn role_guard<S: AsRef<str>>(&self, allowed_roles: &[S], attempted_url: &str) -> GuardOutcome {
        let user = self.session.current_user();
        self.apply(check_roles(
            user.as_deref(),
            allowed_roles,
            attempted_url,
            self.routes(),
        ))
    }

    pub fn permission_guard(&self, required: &[Permission], attempted_url: &str) -> GuardOutcome {
        let user = self.session.current_user();
        self.apply(check_permissions(
            user.as_deref(),
            required,
            attempted_url,
            self.routes(),
        ))
    }

    pub fn route_data_guard(&self, data: &RouteData, attempted_url: &str) -> GuardOutcome {
        let user = self.session.current_user();
        self.apply(check_route_data(
            user.as_deref(),
            data,
            attempted_url,
            self.routes(),
        ))
    }

    pub fn can_deactivate_guard(&self, component: Option<&dyn CanDeactivate>) -> GuardOutcome {
        check_can_deactivate(component)
    }

    /// See [`return_target`]
    pub fn post_login_target(&self, login_url: &str) -> NavigationTarget {
        return_target(login_url, self.routes())
    }

    fn routes(&self) -> &RouteSettings {
        &self.session.settings().routes
    }

    fn apply(&self, outcome: GuardOutcome) -> GuardOutcome {
        if let GuardOutcome::Redirect(target) = &outcome {
            info!(to = %target.to_url(), "navigation redirected by guard");
            self.session.navigator().navigate(target.clone());
        }
        outcome
    }
}
