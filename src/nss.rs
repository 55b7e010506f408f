//! Unix user/group/netgroup database lookups.
//!
//! The decision engine and the admin-identity resolver consume these as
//! typed operations on [`UnixDatabase`]; [`NssDatabase`] is the real,
//! libc-backed implementation. Every operation fails soft: OS errors are
//! logged as warnings and produce empty results, never query failures.

use std::ffi::{CStr, CString};

use crate::identity::{Identity, IdentityValue};

pub trait UnixDatabase: Send + Sync {
    /// The user's primary and supplementary groups. Empty (after a warning)
    /// when the user or its group list cannot be resolved.
    fn groups_of_user(&self, user: &Identity) -> Vec<Identity>;

    /// The members of a group, by name. `include_root == false` drops the
    /// literal member `root`.
    fn users_in_group(&self, group: &Identity, include_root: bool) -> Vec<Identity>;

    /// The users named in a netgroup's triples. Empty and `-` user fields
    /// are skipped; host and domain fields are ignored.
    fn users_in_netgroup(&self, netgroup: &str, include_root: bool) -> Vec<Identity>;

    /// Whether `user` is a member of the netgroup.
    fn netgroup_contains_user(&self, netgroup: &str, user: &Identity) -> bool;
}

/// [`UnixDatabase`] backed by the system's NSS databases.
///
/// Uses the non-reentrant lookup functions; the enclosing authority
/// serializes queries onto one thread. Results are not cached between
/// calls. TODO: cache group lists per authority rebuild.
#[derive(Debug, Clone, Copy, Default)]
pub struct NssDatabase;

impl UnixDatabase for NssDatabase {
    fn groups_of_user(&self, user: &Identity) -> Vec<Identity> {
        let Identity::UnixUser(value) = user else {
            tracing::warn!(identity = %user, "cannot resolve groups for a non-user identity");
            return Vec::new();
        };
        let Some((name, primary_gid)) = lookup_passwd(value) else {
            tracing::warn!(identity = %user, "no such user in the password database");
            return Vec::new();
        };
        group_list(&name, primary_gid)
            .into_iter()
            .map(|gid| Identity::UnixGroup(group_value_for_gid(gid)))
            .collect()
    }

    fn users_in_group(&self, group: &Identity, include_root: bool) -> Vec<Identity> {
        let Identity::UnixGroup(value) = group else {
            tracing::warn!(identity = %group, "cannot expand a non-group identity");
            return Vec::new();
        };

        let mut users = Vec::new();
        unsafe {
            let grp = match value {
                IdentityValue::Id(gid) => libc::getgrgid(*gid as libc::gid_t),
                IdentityValue::Name(name) => {
                    let Ok(cname) = CString::new(name.as_str()) else {
                        return users;
                    };
                    libc::getgrnam(cname.as_ptr())
                }
            };
            if grp.is_null() {
                tracing::warn!(identity = %group, "error looking up group");
                return users;
            }
            let mut member = (*grp).gr_mem;
            while !member.is_null() && !(*member).is_null() {
                let name = CStr::from_ptr(*member).to_string_lossy().into_owned();
                member = member.add(1);
                if !include_root && name == "root" {
                    continue;
                }
                users.push(Identity::UnixUser(IdentityValue::Name(name)));
            }
        }
        users
    }

    fn users_in_netgroup(&self, netgroup: &str, include_root: bool) -> Vec<Identity> {
        netgroup_users(netgroup, include_root)
    }

    fn netgroup_contains_user(&self, netgroup: &str, user: &Identity) -> bool {
        let Some(name) = user_name(user) else {
            return false;
        };
        innetgr(netgroup, &name)
    }
}

fn lookup_passwd(value: &IdentityValue) -> Option<(String, libc::gid_t)> {
    unsafe {
        let pw = match value {
            IdentityValue::Id(uid) => libc::getpwuid(*uid as libc::uid_t),
            IdentityValue::Name(name) => {
                let cname = CString::new(name.as_str()).ok()?;
                libc::getpwnam(cname.as_ptr())
            }
        };
        if pw.is_null() {
            return None;
        }
        let name = CStr::from_ptr((*pw).pw_name).to_string_lossy().into_owned();
        Some((name, (*pw).pw_gid))
    }
}

fn user_name(user: &Identity) -> Option<String> {
    match user {
        Identity::UnixUser(IdentityValue::Name(name)) => Some(name.clone()),
        Identity::UnixUser(value @ IdentityValue::Id(_)) => {
            lookup_passwd(value).map(|(name, _)| name)
        }
        _ => None,
    }
}

fn group_list(name: &str, primary_gid: libc::gid_t) -> Vec<libc::gid_t> {
    let Ok(cname) = CString::new(name) else {
        return Vec::new();
    };
    let mut ngroups: libc::c_int = 64;
    loop {
        let mut gids = vec![0 as libc::gid_t; ngroups as usize];
        let rc = unsafe {
            libc::getgrouplist(cname.as_ptr(), primary_gid, gids.as_mut_ptr(), &mut ngroups)
        };
        if rc >= 0 {
            gids.truncate(ngroups as usize);
            return gids;
        }
        if ngroups as usize <= gids.len() {
            tracing::warn!(user = name, "error looking up group list");
            return Vec::new();
        }
        // ngroups now holds the required size; retry with a larger buffer.
    }
}

fn group_value_for_gid(gid: libc::gid_t) -> IdentityValue {
    unsafe {
        let grp = libc::getgrgid(gid);
        if grp.is_null() {
            IdentityValue::Id(gid as u32)
        } else {
            IdentityValue::Name(CStr::from_ptr((*grp).gr_name).to_string_lossy().into_owned())
        }
    }
}

#[cfg(target_os = "linux")]
mod netgr {
    use libc::{c_char, c_int};

    extern "C" {
        pub fn setnetgrent(netgroup: *const c_char) -> c_int;
        pub fn getnetgrent(
            host: *mut *mut c_char,
            user: *mut *mut c_char,
            domain: *mut *mut c_char,
        ) -> c_int;
        pub fn endnetgrent();
        pub fn innetgr(
            netgroup: *const c_char,
            host: *const c_char,
            user: *const c_char,
            domain: *const c_char,
        ) -> c_int;
    }
}

#[cfg(target_os = "linux")]
fn netgroup_users(netgroup: &str, include_root: bool) -> Vec<Identity> {
    let Ok(cname) = CString::new(netgroup) else {
        return Vec::new();
    };
    let mut users = Vec::new();
    unsafe {
        if netgr::setnetgrent(cname.as_ptr()) == 0 {
            tracing::warn!(netgroup, "error looking up netgroup");
            netgr::endnetgrent();
            return users;
        }
        loop {
            let mut host: *mut libc::c_char = std::ptr::null_mut();
            let mut user: *mut libc::c_char = std::ptr::null_mut();
            let mut domain: *mut libc::c_char = std::ptr::null_mut();
            if netgr::getnetgrent(&mut host, &mut user, &mut domain) == 0 {
                break;
            }
            if user.is_null() {
                continue;
            }
            let name = CStr::from_ptr(user).to_string_lossy().into_owned();
            // "-" means "no match ever" in netgroup land.
            if name.is_empty() || name == "-" {
                continue;
            }
            if !include_root && name == "root" {
                continue;
            }
            users.push(Identity::UnixUser(IdentityValue::Name(name)));
        }
        netgr::endnetgrent();
    }
    users
}

#[cfg(not(target_os = "linux"))]
fn netgroup_users(netgroup: &str, _include_root: bool) -> Vec<Identity> {
    tracing::warn!(netgroup, "netgroups are not supported on this platform");
    Vec::new()
}

#[cfg(target_os = "linux")]
fn innetgr(netgroup: &str, user: &str) -> bool {
    let (Ok(cgroup), Ok(cuser)) = (CString::new(netgroup), CString::new(user)) else {
        return false;
    };
    unsafe {
        netgr::innetgr(
            cgroup.as_ptr(),
            std::ptr::null(),
            cuser.as_ptr(),
            std::ptr::null(),
        ) != 0
    }
}

#[cfg(not(target_os = "linux"))]
fn innetgr(_netgroup: &str, _user: &str) -> bool {
    false
}
