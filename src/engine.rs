use crate::identity::{Identity, ImplicitAuthorization};
use crate::nss::UnixDatabase;
use crate::rules::Details;
use crate::store::StoreSet;

/// Decide the implicit authorization for one query.
///
/// Three probe passes run across every store in order: default rules first,
/// then each of the user's groups, then the user itself, so defaults lose to
/// group matches and group matches lose to user-specific matches. Within a
/// pass, later stores override earlier ones. Each matching rule contributes
/// its `active` outcome only when the subject is local and active, its
/// `inactive` outcome when local but inactive, and its `any` outcome
/// otherwise; `Unknown` never overwrites an accumulated value.
///
/// Starts from the host-supplied `implicit` outcome and can never fail: if
/// nothing matches (or the group lookup comes back empty), `implicit` is
/// returned unchanged.
#[allow(clippy::too_many_arguments)]
pub fn check_authorization_sync(
    stores: &StoreSet,
    db: &dyn UnixDatabase,
    user_for_subject: &Identity,
    subject_is_local: bool,
    subject_is_active: bool,
    action_id: &str,
    details: &Details,
    implicit: ImplicitAuthorization,
) -> ImplicitAuthorization {
    let mut ret = implicit;

    tracing::debug!(
        user = %user_for_subject,
        action_id,
        subject_is_local,
        subject_is_active,
        "checking implicit authorization"
    );

    let mut probes: Vec<Option<Identity>> = vec![None];
    probes.extend(db.groups_of_user(user_for_subject).into_iter().map(Some));
    probes.push(Some(user_for_subject.clone()));

    for probe in &probes {
        for store in stores.iter() {
            if let Some((any, inactive, active)) =
                store.lookup(probe.as_ref(), action_id, details, db)
            {
                let pick = if subject_is_local && subject_is_active {
                    active
                } else if subject_is_local {
                    inactive
                } else {
                    any
                };
                if !pick.is_unknown() {
                    ret = pick;
                }
            }
        }
    }

    tracing::debug!(result = %ret, "implicit authorization decided");
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    struct Groups(HashMap<String, Vec<String>>);

    impl Groups {
        fn new(pairs: &[(&str, &[&str])]) -> Groups {
            Groups(
                pairs
                    .iter()
                    .map(|(user, groups)| {
                        (
                            user.to_string(),
                            groups.iter().map(|g| g.to_string()).collect(),
                        )
                    })
                    .collect(),
            )
        }
    }

    impl UnixDatabase for Groups {
        fn groups_of_user(&self, user: &Identity) -> Vec<Identity> {
            let Identity::UnixUser(value) = user else {
                return Vec::new();
            };
            self.0
                .get(&value.to_string())
                .map(|groups| groups.iter().map(|g| Identity::group_name(g.as_str())).collect())
                .unwrap_or_default()
        }
        fn users_in_group(&self, _group: &Identity, _include_root: bool) -> Vec<Identity> {
            Vec::new()
        }
        fn users_in_netgroup(&self, _netgroup: &str, _include_root: bool) -> Vec<Identity> {
            Vec::new()
        }
        fn netgroup_contains_user(&self, _netgroup: &str, _user: &Identity) -> bool {
            false
        }
    }

    fn store_set(files: &[(&str, &str, &str)]) -> (tempfile::TempDir, StoreSet) {
        let top = tempfile::tempdir().unwrap();
        for (subdir, file, contents) in files {
            let dir = top.path().join(subdir);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(file), contents).unwrap();
        }
        let set = StoreSet::build(&[top.path().to_path_buf()]);
        (top, set)
    }

    #[test]
    fn test_empty_store_set_returns_implicit() {
        let set = StoreSet::build(&[] as &[PathBuf]);
        let db = Groups::new(&[]);
        let sally = Identity::user_name("sally");
        let ret = check_authorization_sync(
            &set,
            &db,
            &sally,
            true,
            true,
            "com.example.foo",
            &Details::new(),
            ImplicitAuthorization::AuthenticationRequired,
        );
        assert_eq!(ret, ImplicitAuthorization::AuthenticationRequired);
    }

    #[test]
    fn test_group_match_overrides_default() {
        let (_top, set) = store_set(&[(
            "10-vendor",
            "defaults.pkla",
            "[Default]\nIdentity=default\nAction=com.example.foo\nResultActive=auth_self\n\
             \n[Admins]\nIdentity=unix-group:admins\nAction=com.example.foo\nResultActive=auth_admin\n",
        )]);
        let db = Groups::new(&[("jane", &["admins"]), ("sally", &[])]);
        let details = Details::new();

        let jane = Identity::user_name("jane");
        let ret = check_authorization_sync(
            &set,
            &db,
            &jane,
            true,
            true,
            "com.example.foo",
            &details,
            ImplicitAuthorization::Unknown,
        );
        assert_eq!(
            ret,
            ImplicitAuthorization::AdministratorAuthenticationRequired
        );

        let sally = Identity::user_name("sally");
        let ret = check_authorization_sync(
            &set,
            &db,
            &sally,
            true,
            true,
            "com.example.foo",
            &details,
            ImplicitAuthorization::Unknown,
        );
        assert_eq!(ret, ImplicitAuthorization::AuthenticationRequired);
    }

    #[test]
    fn test_user_match_overrides_group() {
        let (_top, set) = store_set(&[(
            "10-vendor",
            "rules.pkla",
            "[Admins]\nIdentity=unix-group:admins\nAction=com.example.foo\nResultActive=auth_admin\n\
             \n[Jane]\nIdentity=unix-user:jane\nAction=com.example.foo\nResultActive=yes\n",
        )]);
        let db = Groups::new(&[("jane", &["admins"])]);

        let jane = Identity::user_name("jane");
        let ret = check_authorization_sync(
            &set,
            &db,
            &jane,
            true,
            true,
            "com.example.foo",
            &Details::new(),
            ImplicitAuthorization::Unknown,
        );
        assert_eq!(ret, ImplicitAuthorization::Authorized);
    }

    #[test]
    fn test_locality_slot_selection() {
        let (_top, set) = store_set(&[(
            "10-vendor",
            "rules.pkla",
            "[Root]\nIdentity=unix-user:root\nAction=com.example.foo\n\
             ResultAny=no\nResultInactive=auth_self\nResultActive=yes\n",
        )]);
        let db = Groups::new(&[]);
        let root = Identity::user_name("root");
        let details = Details::new();

        let cases = [
            (true, true, ImplicitAuthorization::Authorized),
            (true, false, ImplicitAuthorization::AuthenticationRequired),
            (false, false, ImplicitAuthorization::NotAuthorized),
            (false, true, ImplicitAuthorization::NotAuthorized),
        ];
        for (local, active, expected) in cases {
            let ret = check_authorization_sync(
                &set,
                &db,
                &root,
                local,
                active,
                "com.example.foo",
                &details,
                ImplicitAuthorization::Unknown,
            );
            assert_eq!(ret, expected, "local={local} active={active}");
        }
    }

    #[test]
    fn test_unknown_slot_keeps_accumulated_value() {
        // The second rule matches but its active slot is unknown; the first
        // rule's decision must survive.
        let (_top, set) = store_set(&[(
            "10-vendor",
            "rules.pkla",
            "[Allow]\nIdentity=unix-user:root\nAction=com.example.foo\nResultActive=yes\n\
             \n[AnyOnly]\nIdentity=unix-user:root\nAction=com.example.foo\nResultAny=no\n",
        )]);
        let db = Groups::new(&[]);
        let root = Identity::user_name("root");

        let ret = check_authorization_sync(
            &set,
            &db,
            &root,
            true,
            true,
            "com.example.foo",
            &Details::new(),
            ImplicitAuthorization::Unknown,
        );
        assert_eq!(ret, ImplicitAuthorization::Authorized);
    }

    #[test]
    fn test_unknown_user_skips_groups_pass() {
        let (_top, set) = store_set(&[(
            "10-vendor",
            "rules.pkla",
            "[User]\nIdentity=unix-user:ghost\nAction=com.example.foo\nResultActive=yes\n",
        )]);
        // No group data at all; the user pass must still run.
        let db = Groups::new(&[]);
        let ghost = Identity::user_name("ghost");

        let ret = check_authorization_sync(
            &set,
            &db,
            &ghost,
            true,
            true,
            "com.example.foo",
            &Details::new(),
            ImplicitAuthorization::Unknown,
        );
        assert_eq!(ret, ImplicitAuthorization::Authorized);
    }
}
