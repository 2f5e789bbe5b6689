use crate::error::ConfigError;
use std::{collections::HashMap, fs, path::Path};
use tracing::debug;

/// Name of the variable selecting environment-specific data files.
pub const DATAFILES_PREFIX: &str = "DATAFILES_PREFIX";

const SENSITIVE_PATTERNS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "key",
    "credential",
    "auth",
];

/// Variables available to `${NAME}` placeholders: the process environment,
/// overlaid by any `.env` files loaded afterwards.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    pub fn from_process() -> Self {
        EnvVars {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        EnvVars {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Loads `KEY=VALUE` lines from `path`. Blank lines and `#` comments are
    /// ignored; values may be single- or double-quoted.
    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&content).map_err(|(line, reason)| ConfigError::EnvFile {
            path: path.to_path_buf(),
            line,
            reason,
        })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// The data-file prefix, if one is set and non-empty.
    pub fn datafiles_prefix(&self) -> Option<&str> {
        self.get(DATAFILES_PREFIX)
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
    }

    /// Replaces every `${NAME}` in `text`. `$` not followed by `{` is kept,
    /// so query parameters such as `$rows` pass through.
    pub fn substitute(&self, text: &str) -> Result<String, ConfigError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| ConfigError::UnterminatedPlaceholder(text.to_string()))?;
            let name = after[..end].trim();
            let value = self
                .get(name)
                .ok_or_else(|| ConfigError::UnresolvedVariable(name.to_string()))?;

            if is_sensitive(name) {
                debug!(name, "Resolved placeholder (redacted)");
            } else {
                debug!(name, value, "Resolved placeholder");
            }
            out.push_str(value);
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    fn parse(&mut self, content: &str) -> Result<(), (usize, String)> {
        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                return Err((i + 1, "expected KEY=VALUE".to_string()));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err((i + 1, "empty key".to_string()));
            }
            self.vars.insert(key.to_string(), unquote(value.trim()).to_string());
        }
        Ok(())
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

pub fn is_sensitive(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| name.contains(p))
}
