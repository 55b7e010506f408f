use std::fmt;
use std::str::FromStr;

use crate::errors::AuthorityError;

/// A POSIX principal: a user, a group, or a netgroup.
///
/// Users and groups may be named either by id or by name; the name is not
/// validated against the OS databases at parse time. The canonical string
/// form is `<kind>:<value>` and round-trips through parsing and display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    UnixUser(IdentityValue),
    UnixGroup(IdentityValue),
    UnixNetgroup(String),
}

/// The value part of a user or group identity: a numeric id or a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityValue {
    Id(u32),
    Name(String),
}

impl Identity {
    pub fn user_id(uid: u32) -> Identity {
        Identity::UnixUser(IdentityValue::Id(uid))
    }

    pub fn user_name(name: impl Into<String>) -> Identity {
        Identity::UnixUser(IdentityValue::Name(name.into()))
    }

    pub fn group_id(gid: u32) -> Identity {
        Identity::UnixGroup(IdentityValue::Id(gid))
    }

    pub fn group_name(name: impl Into<String>) -> Identity {
        Identity::UnixGroup(IdentityValue::Name(name.into()))
    }

    pub fn netgroup(name: impl Into<String>) -> Identity {
        Identity::UnixNetgroup(name.into())
    }

    pub fn is_unix_user(&self) -> bool {
        matches!(self, Identity::UnixUser(_))
    }
}

impl IdentityValue {
    fn parse(value: &str) -> IdentityValue {
        // All-digit values are ids; everything else, including numbers too
        // large for a uid/gid, is kept as a name.
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = value.parse::<u32>() {
                return IdentityValue::Id(id);
            }
        }
        IdentityValue::Name(value.to_string())
    }
}

impl FromStr for Identity {
    type Err = AuthorityError;

    fn from_str(s: &str) -> Result<Identity, AuthorityError> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| AuthorityError::InvalidIdentity(s.to_string()))?;
        if value.is_empty() {
            return Err(AuthorityError::InvalidIdentity(s.to_string()));
        }
        match kind {
            "unix-user" => Ok(Identity::UnixUser(IdentityValue::parse(value))),
            "unix-group" => Ok(Identity::UnixGroup(IdentityValue::parse(value))),
            "unix-netgroup" => Ok(Identity::UnixNetgroup(value.to_string())),
            _ => Err(AuthorityError::InvalidIdentity(s.to_string())),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::UnixUser(value) => write!(f, "unix-user:{value}"),
            Identity::UnixGroup(value) => write!(f, "unix-group:{value}"),
            Identity::UnixNetgroup(name) => write!(f, "unix-netgroup:{name}"),
        }
    }
}

impl fmt::Display for IdentityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityValue::Id(id) => write!(f, "{id}"),
            IdentityValue::Name(name) => write!(f, "{name}"),
        }
    }
}

/// The outcome of an implicit-authorization decision.
///
/// `Unknown` is the sentinel for "no opinion"; the decision engine only lets
/// non-`Unknown` values overwrite an accumulated result. The `*Retained`
/// variants are the session-persistent forms of the authentication outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImplicitAuthorization {
    Unknown,
    NotAuthorized,
    AuthenticationRequired,
    AdministratorAuthenticationRequired,
    AuthenticationRequiredRetained,
    AdministratorAuthenticationRequiredRetained,
    Authorized,
}

impl ImplicitAuthorization {
    pub fn is_unknown(self) -> bool {
        self == ImplicitAuthorization::Unknown
    }

    /// The wire token used in rule files and CLI output.
    pub fn as_token(self) -> &'static str {
        match self {
            ImplicitAuthorization::Unknown => "unknown",
            ImplicitAuthorization::NotAuthorized => "no",
            ImplicitAuthorization::AuthenticationRequired => "auth_self",
            ImplicitAuthorization::AdministratorAuthenticationRequired => "auth_admin",
            ImplicitAuthorization::AuthenticationRequiredRetained => "auth_self_keep",
            ImplicitAuthorization::AdministratorAuthenticationRequiredRetained => {
                "auth_admin_keep"
            }
            ImplicitAuthorization::Authorized => "yes",
        }
    }
}

impl FromStr for ImplicitAuthorization {
    type Err = AuthorityError;

    fn from_str(s: &str) -> Result<ImplicitAuthorization, AuthorityError> {
        match s {
            "unknown" => Ok(ImplicitAuthorization::Unknown),
            "no" => Ok(ImplicitAuthorization::NotAuthorized),
            "auth_self" => Ok(ImplicitAuthorization::AuthenticationRequired),
            "auth_admin" => Ok(ImplicitAuthorization::AdministratorAuthenticationRequired),
            "auth_self_keep" => Ok(ImplicitAuthorization::AuthenticationRequiredRetained),
            "auth_admin_keep" => {
                Ok(ImplicitAuthorization::AdministratorAuthenticationRequiredRetained)
            }
            "yes" => Ok(ImplicitAuthorization::Authorized),
            _ => Err(AuthorityError::InvalidResultValue(s.to_string())),
        }
    }
}

impl fmt::Display for ImplicitAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}
