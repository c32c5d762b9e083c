//! Handle to whatever is doing the routing (browser history, a terminal UI,
//! a test recorder). The session pipeline only ever asks it to go somewhere

use std::{fmt::Debug, sync::Mutex};

use url::form_urlencoded;

pub mod guards;

/// A location inside the dashboard, relative to its root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Replace the current history entry instead of pushing a new one
    pub replace_url: bool,
}

impl NavigationTarget {
    pub fn push<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            query: vec![],
            replace_url: false,
        }
    }

    pub fn replace<S: Into<String>>(path: S) -> Self {
        Self {
            replace_url: true,
            ..Self::push(path)
        }
    }

    pub fn with_query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// First value of the query parameter `key`
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }

    pub fn to_url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{query}", self.path)
    }

    /// Splits a url as produced by [`Self::to_url`] (or typed by a user).
    /// Any fragment is dropped
    pub fn parse(url: &str) -> Self {
        let url = url.split('#').next().unwrap_or_default();
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        Self {
            path: path.to_string(),
            query: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            replace_url: false,
        }
    }
}

pub trait Navigator: Debug + Send + Sync {
    fn navigate(&self, target: NavigationTarget);
}

/// Keeps the visited urls in memory. Used by the cli and in tests
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    entries: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<String> {
        self.entries.lock().expect("mutex poisoned").last().cloned()
    }

    pub fn history(&self) -> Vec<String> {
        self.entries.lock().expect("mutex poisoned").clone()
    }
}

impl Navigator for HistoryNavigator {
    #[tracing::instrument(skip(self))]
    fn navigate(&self, destination: NavigationTarget) {
        let mut entries = self.entries.lock().expect("mutex poisoned");
        if destination.replace_url {
            entries.pop();
        }
        entries.push(destination.to_url());
    }
}
