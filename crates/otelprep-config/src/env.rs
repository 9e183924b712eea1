//! Environment variable snapshots.
//!
//! The resolver never reads `std::env` directly. It receives an
//! [`Environment`] captured once at startup, which keeps resolution a pure
//! function of its inputs and lets tests supply variables without touching
//! the process environment.
//!
//! Values meant for the processes started after otelprep go the other way,
//! rendered as a `.env` file by [`render_dotenv`].

use std::collections::HashMap;
use std::path::Path;

use crate::ConfigError;

/// An immutable snapshot of environment variables.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// An empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    /// Capture the process environment on top of a `.env` file.
    ///
    /// Entries from the file only fill in variables the process does not
    /// already define. The process environment itself is left untouched.
    pub fn from_process_with_dotenv(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let entries = dotenvy::from_path_iter(path)
            .map_err(|e| ConfigError::parse_failure(path.display().to_string(), e.to_string()))?;

        let mut vars = HashMap::new();
        for entry in entries {
            let (key, value) = entry
                .map_err(|e| ConfigError::parse_failure(path.display().to_string(), e.to_string()))?;
            vars.insert(key, value);
        }
        vars.extend(Self::from_process().vars);

        Ok(Self { vars })
    }

    /// Add or replace a variable.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// The value of `key`, if it is set to something non-empty.
    ///
    /// An empty value counts as unset, so it never overrides a file value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Whether `key` is set to something non-empty.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Render variables as `.env` lines that `dotenvy` reads back unchanged.
///
/// Every value is double quoted. Backslashes, quotes, `$` and newlines are
/// escaped.
pub fn render_dotenv<K: AsRef<str>, V: AsRef<str>>(vars: &[(K, V)]) -> String {
    let mut out = String::new();
    for (key, value) in vars {
        out.push_str(key.as_ref());
        out.push_str("=\"");
        for c in value.as_ref().chars() {
            match c {
                '\\' | '"' | '$' => {
                    out.push('\\');
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                _ => out.push(c),
            }
        }
        out.push_str("\"\n");
    }
    out
}
