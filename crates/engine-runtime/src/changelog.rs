use crate::{env::EnvVars, error::ConfigError};
use connectors::storage::azure::{DEFAULT_DIRECTORY, DEFAULT_SHARE};
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};
use tracing::info;

/// An ordered list of change sets plus the connections they run against.
///
/// ```toml
/// [graph]
/// host = "${NEO4J_HOST}"
/// credentials = "${NEO4J_CREDENTIALS}"
///
/// [storage]
/// kind = "azure-file-share"
/// account = "${AZURE_STORAGE_NAME}"
/// sas_token = "${AZURE_STORAGE_SAS}"
///
/// [[change]]
/// id = "load-genes"
/// kind = "file-query"
/// file_name = "genes.zip"
/// file_type = "TSV"
/// query = "UNWIND $rows AS row MERGE (g:Gene {id: row.id})"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Changelog {
    pub graph: GraphSection,
    #[serde(default)]
    pub storage: Option<StorageSection>,
    #[serde(default)]
    pub staging: StagingSection,
    #[serde(default, rename = "change")]
    pub changes: Vec<ChangeSet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphSection {
    pub host: String,
    /// `user,password`
    pub credentials: String,
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StorageSection {
    AzureFileShare {
        account: String,
        #[serde(default)]
        sas_token: Option<String>,
        #[serde(default = "default_share")]
        share: String,
        #[serde(default = "default_directory")]
        directory: String,
    },
    LocalDir {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StagingSection {
    /// Where data files are downloaded and extracted.
    #[serde(default)]
    pub local_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeSet {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub change: Change,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Change {
    FileQuery(FileQueryChange),
    ConditionQuery(ConditionQueryChange),
}

/// Loads a packaged data file through a write query, chunk by chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct FileQueryChange {
    pub query: String,
    pub file_name: String,
    pub file_type: String,
    /// Line index to start from; line 0 is the header.
    #[serde(default = "default_start_at")]
    pub start_at: u64,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub tx_timeout_secs: Option<u64>,
    /// Keep the extracted data file after a successful load.
    #[serde(default)]
    pub keep_files: bool,
    #[serde(default)]
    pub local_dir: Option<PathBuf>,
}

/// Repeats `query` until `condition_query` returns zero.
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionQueryChange {
    pub query: String,
    pub condition_query: String,
    #[serde(default)]
    pub max_iterations: Option<u64>,
    #[serde(default = "default_fail_on_stall")]
    pub fail_on_stall: bool,
    #[serde(default)]
    pub tx_timeout_secs: Option<u64>,
}

fn default_share() -> String {
    DEFAULT_SHARE.to_string()
}

fn default_directory() -> String {
    DEFAULT_DIRECTORY.to_string()
}

fn default_start_at() -> u64 {
    1
}

fn default_fail_on_stall() -> bool {
    true
}

impl Changelog {
    pub fn from_file(path: &Path, env: &EnvVars) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let changelog = Self::parse(&contents, env)?;
        info!(
            path = %path.display(),
            changes = changelog.changes.len(),
            "Loaded changelog"
        );
        Ok(changelog)
    }

    /// Parses TOML, resolving `${NAME}` placeholders in every string value.
    pub fn parse(contents: &str, env: &EnvVars) -> Result<Self, ConfigError> {
        let mut value = toml::Value::Table(contents.parse::<toml::Table>()?);
        resolve(&mut value, env)?;
        let changelog: Changelog = value.try_into()?;
        Ok(changelog)
    }

    pub fn change(&self, id: &str) -> Option<&ChangeSet> {
        self.changes.iter().find(|c| c.id == id)
    }
}

fn resolve(value: &mut toml::Value, env: &EnvVars) -> Result<(), ConfigError> {
    match value {
        toml::Value::String(s) => *s = env.substitute(s)?,
        toml::Value::Array(items) => {
            for item in items {
                resolve(item, env)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                resolve(item, env)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANGELOG: &str = r#"
[graph]
host = "${NEO4J_HOST}"
credentials = "${NEO4J_CREDENTIALS}"
database = "lifelike"

[storage]
kind = "azure-file-share"
account = "${AZURE_STORAGE_NAME}"
sas_token = "sv=2024"

[staging]
local_dir = "/tmp/migration"

[[change]]
id = "load-genes"
author = "data-team"
kind = "file-query"
query = "UNWIND $rows AS row MERGE (g:Gene {id: row.id})"
file_name = "genes.zip"
file_type = "TSV"
start_at = 2001
chunk_size = 1000

[[change]]
id = "drop-orphans"
kind = "condition-query"
condition_query = "MATCH (n:Orphan) RETURN count(n)"
query = "MATCH (n:Orphan) WITH n LIMIT 5000 DETACH DELETE n"
max_iterations = 50
"#;

    fn env() -> EnvVars {
        EnvVars::from_pairs([
            ("NEO4J_HOST", "http://localhost:7474"),
            ("NEO4J_CREDENTIALS", "neo4j,password"),
            ("AZURE_STORAGE_NAME", "kgstore"),
        ])
    }

    #[test]
    fn parses_full_changelog() {
        let changelog = Changelog::parse(CHANGELOG, &env()).unwrap();

        assert_eq!(changelog.graph.host, "http://localhost:7474");
        assert_eq!(changelog.graph.database.as_deref(), Some("lifelike"));
        assert_eq!(
            changelog.staging.local_dir,
            Some(PathBuf::from("/tmp/migration"))
        );
        match changelog.storage {
            Some(StorageSection::AzureFileShare {
                ref account,
                ref share,
                ref directory,
                ..
            }) => {
                assert_eq!(account, "kgstore");
                assert_eq!(share, "knowledge-graph");
                assert_eq!(directory, "migration");
            }
            ref other => panic!("unexpected storage: {other:?}"),
        }

        assert_eq!(changelog.changes.len(), 2);
        match &changelog.changes[0].change {
            Change::FileQuery(file) => {
                assert_eq!(file.start_at, 2001);
                assert_eq!(file.chunk_size, Some(1000));
                assert!(file.query.contains("$rows"));
                assert!(!file.keep_files);
            }
            other => panic!("unexpected change: {other:?}"),
        }
        match &changelog.change("drop-orphans").unwrap().change {
            Change::ConditionQuery(cond) => {
                assert_eq!(cond.max_iterations, Some(50));
                assert!(cond.fail_on_stall);
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }

    #[test]
    fn start_at_defaults_to_first_data_line() {
        let changelog = Changelog::parse(
            r#"
[graph]
host = "http://h:7474"
credentials = "a,b"

[[change]]
id = "x"
kind = "file-query"
query = "q"
file_name = "f.zip"
file_type = "CSV"
"#,
            &EnvVars::default(),
        )
        .unwrap();

        let Change::FileQuery(file) = &changelog.changes[0].change else {
            panic!("expected a file query");
        };
        assert_eq!(file.start_at, 1);
        assert!(changelog.storage.is_none());
    }

    #[test]
    fn missing_variable_fails_parsing() {
        let err = Changelog::parse(CHANGELOG, &EnvVars::default()).unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedVariable(_)));
    }

    #[test]
    fn unknown_change_kind_is_rejected() {
        let err = Changelog::parse(
            r#"
[graph]
host = "http://h:7474"
credentials = "a,b"

[[change]]
id = "x"
kind = "sql-query"
query = "q"
"#,
            &EnvVars::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
