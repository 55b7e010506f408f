use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use pkla::identity::{Identity, IdentityValue};
use pkla::nss::UnixDatabase;

/// In-memory [`UnixDatabase`] so tests control group and netgroup
/// membership instead of the host's NSS databases.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    groups_by_user: HashMap<String, Vec<String>>,
    members_by_group: HashMap<String, Vec<String>>,
    netgroups: HashMap<String, Vec<String>>,
}

impl MemoryDatabase {
    pub fn new() -> MemoryDatabase {
        MemoryDatabase::default()
    }

    pub fn with_user_groups(mut self, user: &str, groups: &[&str]) -> MemoryDatabase {
        self.groups_by_user
            .insert(user.to_string(), groups.iter().map(|g| g.to_string()).collect());
        self
    }

    pub fn with_group(mut self, group: &str, members: &[&str]) -> MemoryDatabase {
        self.members_by_group
            .insert(group.to_string(), members.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn with_netgroup(mut self, netgroup: &str, users: &[&str]) -> MemoryDatabase {
        self.netgroups
            .insert(netgroup.to_string(), users.iter().map(|u| u.to_string()).collect());
        self
    }
}

impl UnixDatabase for MemoryDatabase {
    fn groups_of_user(&self, user: &Identity) -> Vec<Identity> {
        let Identity::UnixUser(IdentityValue::Name(name)) = user else {
            return Vec::new();
        };
        self.groups_by_user
            .get(name)
            .map(|groups| {
                groups
                    .iter()
                    .map(|g| Identity::group_name(g.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn users_in_group(&self, group: &Identity, include_root: bool) -> Vec<Identity> {
        let Identity::UnixGroup(IdentityValue::Name(name)) = group else {
            return Vec::new();
        };
        self.members_by_group
            .get(name)
            .map(|members| filter_users(members, include_root))
            .unwrap_or_default()
    }

    fn users_in_netgroup(&self, netgroup: &str, include_root: bool) -> Vec<Identity> {
        self.netgroups
            .get(netgroup)
            .map(|users| filter_users(users, include_root))
            .unwrap_or_default()
    }

    fn netgroup_contains_user(&self, netgroup: &str, user: &Identity) -> bool {
        let Identity::UnixUser(IdentityValue::Name(name)) = user else {
            return false;
        };
        self.netgroups
            .get(netgroup)
            .map(|users| users.iter().any(|u| u == name))
            .unwrap_or(false)
    }
}

fn filter_users(names: &[String], include_root: bool) -> Vec<Identity> {
    names
        .iter()
        .filter(|name| include_root || name.as_str() != "root")
        .map(|name| Identity::user_name(name.as_str()))
        .collect()
}

/// Writes `.pkla` and `.conf` fixture trees under a tempdir.
pub struct FixtureDir {
    root: tempfile::TempDir,
}

impl FixtureDir {
    pub fn new() -> FixtureDir {
        FixtureDir {
            root: tempfile::tempdir().expect("create fixture dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// A top-level store path under this fixture.
    pub fn toplevel(&self, name: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::create_dir_all(&path).expect("create toplevel");
        path
    }

    pub fn write_rules(&self, toplevel: &str, subdir: &str, file: &str, contents: &str) {
        let dir = self.root.path().join(toplevel).join(subdir);
        fs::create_dir_all(&dir).expect("create store dir");
        fs::write(dir.join(file), contents).expect("write rule file");
    }

    /// A config directory containing one `50-localauthority.conf`.
    pub fn write_config(&self, contents: &str) -> PathBuf {
        let dir = self.root.path().join("localauthority.conf.d");
        fs::create_dir_all(&dir).expect("create config dir");
        fs::write(dir.join("50-localauthority.conf"), contents).expect("write config file");
        dir
    }
}
