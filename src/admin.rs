//! Resolution of the administrator identities named in configuration.

use crate::config::{ConfigError, ConfigSource};
use crate::identity::Identity;
use crate::nss::UnixDatabase;

/// Configuration group and key holding the admin identity list.
pub const CONFIGURATION_GROUP: &str = "Configuration";
pub const ADMIN_IDENTITIES_KEY: &str = "AdminIdentities";

/// The `AdminIdentities` entries as configured, in config order. Malformed
/// entries are warned and skipped; an absent key yields an empty list after
/// a debug log (the configuration may simply not be present).
pub fn configured_admin_identities(config: &ConfigSource) -> Vec<Identity> {
    let entries = match config.get_string_list(CONFIGURATION_GROUP, ADMIN_IDENTITIES_KEY) {
        Ok(entries) => entries,
        Err(err @ ConfigError::KeyAbsent { .. }) => {
            tracing::debug!(error = %err, "no admin identities configured");
            return Vec::new();
        }
        Err(err) => {
            tracing::warn!(error = %err, "error getting admin identities configuration item");
            return Vec::new();
        }
    };

    let mut identities = Vec::new();
    for entry in &entries {
        match entry.parse::<Identity>() {
            Ok(identity) => identities.push(identity),
            Err(err) => {
                tracing::warn!(entry = entry.as_str(), error = %err, "error parsing identity")
            }
        }
    }
    identities
}

/// The concrete users allowed to authenticate for admin prompts: configured
/// users as-is, groups and netgroups expanded through `db` with the literal
/// `root` member excluded. Falls back to uid 0 when nothing usable is
/// configured.
pub fn get_admin_identities(config: &ConfigSource, db: &dyn UnixDatabase) -> Vec<Identity> {
    let mut users = Vec::new();

    for identity in configured_admin_identities(config) {
        match &identity {
            Identity::UnixUser(_) => users.push(identity),
            Identity::UnixGroup(_) => users.extend(db.users_in_group(&identity, false)),
            Identity::UnixNetgroup(name) => {
                users.extend(db.users_in_netgroup(name, false))
            }
        }
    }

    if users.is_empty() {
        users.push(Identity::user_id(0));
    }
    users
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    struct StaticDb;

    impl UnixDatabase for StaticDb {
        fn groups_of_user(&self, _user: &Identity) -> Vec<Identity> {
            Vec::new()
        }
        fn users_in_group(&self, group: &Identity, include_root: bool) -> Vec<Identity> {
            assert!(!include_root);
            if *group == Identity::group_name("admin") {
                vec![Identity::user_name("alice"), Identity::user_name("bob")]
            } else {
                Vec::new()
            }
        }
        fn users_in_netgroup(&self, netgroup: &str, include_root: bool) -> Vec<Identity> {
            assert!(!include_root);
            if netgroup == "bar" {
                vec![Identity::user_name("carol")]
            } else {
                Vec::new()
            }
        }
        fn netgroup_contains_user(&self, _netgroup: &str, _user: &Identity) -> bool {
            false
        }
    }

    fn config_with(contents: &str) -> (tempfile::TempDir, ConfigSource) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("50-localauthority.conf"), contents).unwrap();
        let source = ConfigSource::new(dir.path());
        (dir, source)
    }

    #[test]
    fn test_configured_identities_keep_config_order() {
        let (_dir, config) = config_with(
            "[Configuration]\nAdminIdentities=unix-user:root;unix-netgroup:bar;unix-group:admin\n",
        );
        let identities = configured_admin_identities(&config);
        let strings: Vec<String> = identities.iter().map(Identity::to_string).collect();
        assert_eq!(
            strings,
            vec!["unix-user:root", "unix-netgroup:bar", "unix-group:admin"]
        );
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let (_dir, config) = config_with(
            "[Configuration]\nAdminIdentities=bogus;unix-user:root;unix-pony:x\n",
        );
        assert_eq!(
            configured_admin_identities(&config),
            vec![Identity::user_name("root")]
        );
    }

    #[test]
    fn test_expansion_order() {
        let (_dir, config) = config_with(
            "[Configuration]\nAdminIdentities=unix-user:root;unix-netgroup:bar;unix-group:admin\n",
        );
        let users = get_admin_identities(&config, &StaticDb);
        assert_eq!(
            users,
            vec![
                Identity::user_name("root"),
                Identity::user_name("carol"),
                Identity::user_name("alice"),
                Identity::user_name("bob"),
            ]
        );
    }

    #[test]
    fn test_absent_key_falls_back_to_root() {
        let (_dir, config) = config_with("[Configuration]\nOther=1\n");
        assert_eq!(
            get_admin_identities(&config, &StaticDb),
            vec![Identity::user_id(0)]
        );
    }

    #[test]
    fn test_missing_directory_falls_back_to_root() {
        let config = ConfigSource::new(Path::new("/nonexistent/localauthority.conf.d"));
        assert_eq!(
            get_admin_identities(&config, &StaticDb),
            vec![Identity::user_id(0)]
        );
    }

    #[test]
    fn test_empty_expansion_falls_back_to_root() {
        let (_dir, config) =
            config_with("[Configuration]\nAdminIdentities=unix-group:nosuch\n");
        assert_eq!(
            get_admin_identities(&config, &StaticDb),
            vec![Identity::user_id(0)]
        );
    }
}
