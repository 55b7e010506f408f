use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::keyfile::{split_value_list, KeyFile};

/// File extension of configuration files.
pub const CONFIG_FILE_EXTENSION: &str = ".conf";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The key simply isn't configured anywhere. Callers demote this to
    /// debug logging; a rules-only deployment is not an error.
    #[error("key `{key}` not found in group `{section}`")]
    #[diagnostic(code(pkla::config::key_absent))]
    KeyAbsent { section: String, key: String },

    #[error("cannot read configuration directory `{directory}`: {reason}")]
    #[diagnostic(code(pkla::config::load))]
    Load { directory: String, reason: String },
}

/// A merged key/value view over a directory of `.conf` key files.
///
/// Files load once, in lexicographic name order; a later file's value for
/// the same (section, key) overrides an earlier one. Unreadable or
/// malformed files are warned and skipped.
#[derive(Debug)]
pub struct ConfigSource {
    directory: PathBuf,
    values: HashMap<(String, String), String>,
    load_error: Option<String>,
}

impl ConfigSource {
    pub fn new(directory: &Path) -> ConfigSource {
        let mut source = ConfigSource {
            directory: directory.to_path_buf(),
            values: HashMap::new(),
            load_error: None,
        };

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(err) => {
                // Absent configuration is an expected deployment state.
                if err.kind() == io::ErrorKind::NotFound {
                    tracing::debug!(
                        directory = %directory.display(),
                        "no configuration directory"
                    );
                } else {
                    tracing::warn!(
                        directory = %directory.display(),
                        error = %err,
                        "error enumerating configuration directory"
                    );
                }
                source.load_error = Some(err.to_string());
                return source;
            }
        };

        let wanted = CONFIG_FILE_EXTENSION.trim_start_matches('.');
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().map(|ext| ext == wanted).unwrap_or(false)
            })
            .collect();
        files.sort();

        for path in &files {
            source.load_config_file(path);
        }

        tracing::debug!(
            directory = %directory.display(),
            files = files.len(),
            "loaded configuration"
        );
        source
    }

    fn load_config_file(&mut self, path: &Path) {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "error reading config file");
                return;
            }
        };
        let keyfile = match KeyFile::parse(&contents) {
            Ok(keyfile) => keyfile,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping malformed config file");
                return;
            }
        };
        for section in keyfile.sections() {
            for (key, value) in section.entries() {
                self.values.insert(
                    (section.name().to_string(), key.clone()),
                    value.clone(),
                );
            }
        }
    }

    pub fn get_string(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        match self
            .values
            .get(&(section.to_string(), key.to_string()))
        {
            Some(value) => Ok(value),
            None => {
                if let Some(reason) = &self.load_error {
                    return Err(ConfigError::Load {
                        directory: self.directory.display().to_string(),
                        reason: reason.clone(),
                    });
                }
                Err(ConfigError::KeyAbsent {
                    section: section.to_string(),
                    key: key.to_string(),
                })
            }
        }
    }

    /// The value split on `;` or `,`, with empty items dropped.
    pub fn get_string_list(&self, section: &str, key: &str) -> Result<Vec<String>, ConfigError> {
        let value = self.get_string(section, key)?;
        Ok(split_value_list(value)
            .into_iter()
            .map(str::to_string)
            .collect())
    }
}
