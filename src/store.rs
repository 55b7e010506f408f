use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::AuthorityError;
use crate::identity::{Identity, ImplicitAuthorization};
use crate::keyfile::KeyFile;
use crate::nss::UnixDatabase;
use crate::rules::{AuthorizationRule, Details};

/// File extension of authorization rule files.
pub const RULE_FILE_EXTENSION: &str = ".pkla";

/// One directory of rule files, parsed once at construction.
///
/// Rules keep (file-name, in-file) order; files are read in lexicographic
/// order. Construction never fails: unreadable directories yield an empty
/// store, malformed files and rules are warned and skipped. The store never
/// re-reads its directory; invalidation happens by rebuilding the whole
/// [`StoreSet`].
#[derive(Debug)]
pub struct AuthorizationStore {
    rules: Vec<AuthorizationRule>,
}

impl AuthorizationStore {
    pub fn new(directory: &Path, extension: &str) -> AuthorizationStore {
        let mut store = AuthorizationStore { rules: Vec::new() };
        let wanted = extension.trim_start_matches('.');

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(
                    directory = %directory.display(),
                    error = %err,
                    "error enumerating authorization store"
                );
                return store;
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().map(|ext| ext == wanted).unwrap_or(false)
            })
            .collect();
        files.sort();

        for path in &files {
            match load_rule_file(path) {
                Ok(mut rules) => store.rules.append(&mut rules),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping rule file")
                }
            }
        }

        tracing::debug!(
            directory = %directory.display(),
            files = files.len(),
            rules = store.rules.len(),
            "loaded authorization store"
        );
        store
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// The `(any, inactive, active)` outcomes of the last rule matching the
    /// query, or `None` when nothing matches. `probe == None` consults
    /// default rules.
    pub fn lookup(
        &self,
        probe: Option<&Identity>,
        action_id: &str,
        details: &Details,
        db: &dyn UnixDatabase,
    ) -> Option<(
        ImplicitAuthorization,
        ImplicitAuthorization,
        ImplicitAuthorization,
    )> {
        let mut found = None;
        for rule in &self.rules {
            if rule.matches(probe, action_id, details, db) {
                found = Some(rule.results());
            }
        }
        found
    }
}

/// Parse every rule section of one file, in order. A malformed rule skips
/// just that section; an unreadable or syntactically broken file fails as a
/// whole (and is skipped by the caller).
fn load_rule_file(path: &Path) -> Result<Vec<AuthorizationRule>, AuthorityError> {
    let contents = fs::read_to_string(path).map_err(|source| AuthorityError::RuleFileLoad {
        path: path.display().to_string(),
        source,
    })?;
    let keyfile = KeyFile::parse(&contents)?;

    let mut rules = Vec::new();
    for section in keyfile.sections() {
        match AuthorizationRule::from_section(section) {
            Ok(rule) => rules.push(rule),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping malformed rule")
            }
        }
    }
    Ok(rules)
}

/// The ordered aggregation of stores across all configured top-level paths.
#[derive(Debug, Default)]
pub struct StoreSet {
    stores: Vec<StoreEntry>,
}

#[derive(Debug)]
struct StoreEntry {
    sort_key: String,
    store: AuthorizationStore,
}

impl StoreSet {
    /// Enumerate the direct subdirectories of every top-level path, order
    /// them by the byte-wise `"{name}-{index}"` sort key, and load one store
    /// per subdirectory. A subdirectory of the same name in an earlier
    /// top-level sorts before one in a later top-level; different names
    /// interleave by name. Enumeration errors skip that top-level.
    pub fn build(paths: &[PathBuf]) -> StoreSet {
        let mut tagged: Vec<(String, PathBuf)> = Vec::new();

        for (index, toplevel) in paths.iter().enumerate() {
            let entries = match fs::read_dir(toplevel) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(
                        path = %toplevel.display(),
                        error = %err,
                        "error enumerating authorization store path"
                    );
                    continue;
                }
            };
            for entry in entries {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        tracing::warn!(
                            path = %toplevel.display(),
                            error = %err,
                            "error enumerating authorization store path"
                        );
                        break;
                    }
                };
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                tagged.push((format!("{name}-{index}"), path));
            }
        }

        tagged.sort_by(|a, b| a.0.cmp(&b.0));

        let stores = tagged
            .into_iter()
            .map(|(sort_key, directory)| {
                tracing::debug!(directory = %directory.display(), "added local authorization store");
                StoreEntry {
                    sort_key,
                    store: AuthorizationStore::new(&directory, RULE_FILE_EXTENSION),
                }
            })
            .collect();

        StoreSet { stores }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuthorizationStore> {
        self.stores.iter().map(|entry| &entry.store)
    }

    #[cfg(test)]
    fn sort_keys(&self) -> Vec<&str> {
        self.stores.iter().map(|e| e.sort_key.as_str()).collect()
    }
}
