//! Stores settings that are not expected to need to change but grouped together
//! for discoverability and reuse. Each constant should be prefixed by the module
//! name to allow importing the constant only and still be readable

pub mod client {
    use fleetdesk_time::Seconds;

    pub const CLIENT_DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
    pub const CLIENT_DEFAULT_LANGUAGE: &str = "en";
    /// Applied to every request so a hung connection surfaces as a network error
    pub const CLIENT_REQUEST_TIMEOUT: Seconds = Seconds::new(30);
}

pub mod storage {
    pub const STORAGE_ACCESS_TOKEN_KEY: &str = "fleetdesk_access_token";
    pub const STORAGE_REFRESH_TOKEN_KEY: &str = "fleetdesk_refresh_token";
    pub const STORAGE_USER_KEY: &str = "fleetdesk_user";
    pub const STORAGE_LANGUAGE_KEY: &str = "fleetdesk_language";
    pub const STORAGE_DEFAULT_FILE_PATH: &str = ".fleetdesk/session.json";
}

pub mod route {
    pub const ROUTE_LOGIN: &str = "/auth/login";
    pub const ROUTE_DASHBOARD: &str = "/dashboard";
    pub const ROUTE_UNAUTHORIZED: &str = "/unauthorized";
    /// Query parameter the login page reads to know where to go after login
    pub const ROUTE_QUERY_RETURN_URL: &str = "returnUrl";
}

pub mod path {
    mod path_spec;
    pub use path_spec::PathSpec;

    pub const PATH_AUTH_FORGOT_PASSWORD: PathSpec = PathSpec::post("/auth/forgot-password");
    pub const PATH_AUTH_LOGIN: PathSpec = PathSpec::post("/auth/login");
    pub const PATH_AUTH_LOGOUT: PathSpec = PathSpec::post("/auth/logout");
    pub const PATH_AUTH_REFRESH: PathSpec = PathSpec::post("/auth/refresh");
    pub const PATH_AUTH_REGISTER: PathSpec = PathSpec::post("/auth/register");
    pub const PATH_PUBLIC_PREFIX: &str = "/public"; // Everything under here is served without a session

    /// Endpoints that must never carry a bearer token and whose 401s are not
    /// retried
    pub const PATHS_ANONYMOUS: [&PathSpec; 4] = [
        &PATH_AUTH_LOGIN,
        &PATH_AUTH_REGISTER,
        &PATH_AUTH_REFRESH,
        &PATH_AUTH_FORGOT_PASSWORD,
    ];

    /// Returns true if `path` (relative to the API base url, query string
    /// allowed) is served without authorization
    pub fn is_anonymous(path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };
        if PATHS_ANONYMOUS.iter().any(|spec| spec.path == path) {
            return true;
        }
        match path.strip_prefix(PATH_PUBLIC_PREFIX) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}
