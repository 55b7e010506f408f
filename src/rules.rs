use std::collections::HashMap;
use std::str::FromStr;

use globset::{Glob, GlobMatcher};

use crate::errors::AuthorityError;
use crate::identity::{Identity, ImplicitAuthorization};
use crate::keyfile::{split_value_list, Section};
use crate::nss::UnixDatabase;

/// Detail key/value pairs attached to an authorization query.
pub type Details = HashMap<String, String>;

/// The identity list of a rule: the literal `default` entry or a concrete
/// identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySpec {
    Default,
    Identity(Identity),
}

const DEFAULT_ENTRY: &str = "default";
const DETAIL_KEY_PREFIX: &str = "Detail.";

/// One rule from a `.pkla` file: who it applies to, which action ids it
/// covers, optional detail constraints, and the outcome for each
/// locality/activity slot.
#[derive(Debug, Clone)]
pub struct AuthorizationRule {
    section: String,
    identities: Vec<IdentitySpec>,
    actions: Vec<GlobMatcher>,
    details: Vec<(String, String)>,
    pub result_any: ImplicitAuthorization,
    pub result_inactive: ImplicitAuthorization,
    pub result_active: ImplicitAuthorization,
}

impl AuthorizationRule {
    /// Lift a key-file section into a rule. Unparseable identity entries are
    /// warned and dropped; a rule without any usable identity or action, or
    /// with an unrecognized result value, is malformed as a whole.
    pub fn from_section(section: &Section) -> Result<AuthorizationRule, AuthorityError> {
        let name = section.name().to_string();
        let malformed = |reason: &str| AuthorityError::InvalidRule {
            section: name.clone(),
            reason: reason.to_string(),
        };

        let identity_value = section
            .get("Identity")
            .ok_or_else(|| malformed("missing `Identity` entry"))?;
        let mut identities = Vec::new();
        for entry in split_value_list(identity_value) {
            if entry == DEFAULT_ENTRY {
                identities.push(IdentitySpec::Default);
                continue;
            }
            match Identity::from_str(entry) {
                Ok(identity) => identities.push(IdentitySpec::Identity(identity)),
                Err(err) => {
                    tracing::warn!(section = %name, entry, error = %err, "skipping rule identity")
                }
            }
        }
        if identities.is_empty() {
            return Err(malformed("no usable `Identity` entries"));
        }

        let action_value = section
            .get("Action")
            .ok_or_else(|| malformed("missing `Action` entry"))?;
        let mut actions = Vec::new();
        for pattern in split_value_list(action_value) {
            let glob = Glob::new(pattern).map_err(|err| AuthorityError::InvalidRule {
                section: name.clone(),
                reason: format!("bad action pattern `{pattern}`: {err}"),
            })?;
            actions.push(glob.compile_matcher());
        }
        if actions.is_empty() {
            return Err(malformed("no usable `Action` entries"));
        }

        let mut rule = AuthorizationRule {
            section: name.clone(),
            identities,
            actions,
            details: Vec::new(),
            result_any: ImplicitAuthorization::Unknown,
            result_inactive: ImplicitAuthorization::Unknown,
            result_active: ImplicitAuthorization::Unknown,
        };

        for (key, value) in section.entries() {
            match key.as_str() {
                "Identity" | "Action" => {}
                "ResultAny" => rule.result_any = value.parse()?,
                "ResultInactive" => rule.result_inactive = value.parse()?,
                "ResultActive" => rule.result_active = value.parse()?,
                key if key.starts_with(DETAIL_KEY_PREFIX) => {
                    let detail = &key[DETAIL_KEY_PREFIX.len()..];
                    if detail.is_empty() {
                        return Err(malformed("empty detail constraint name"));
                    }
                    rule.details.push((detail.to_string(), value.clone()));
                }
                other => {
                    tracing::warn!(section = %name, key = other, "ignoring unknown rule entry")
                }
            }
        }

        Ok(rule)
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    /// Whether this rule applies to the query. `probe == None` asks for
    /// default rules. A `unix-netgroup:` entry also matches a user probe
    /// that is a member of the netgroup.
    pub fn matches(
        &self,
        probe: Option<&Identity>,
        action_id: &str,
        details: &Details,
        db: &dyn UnixDatabase,
    ) -> bool {
        let identity_matched = self.identities.iter().any(|spec| match (spec, probe) {
            (IdentitySpec::Default, None) => true,
            (IdentitySpec::Identity(entry), Some(identity)) => {
                entry == identity
                    || matches!(
                        entry,
                        Identity::UnixNetgroup(name)
                            if identity.is_unix_user()
                                && db.netgroup_contains_user(name, identity)
                    )
            }
            _ => false,
        });
        if !identity_matched {
            return false;
        }

        if !self.actions.iter().any(|glob| glob.is_match(action_id)) {
            return false;
        }

        self.details
            .iter()
            .all(|(key, value)| details.get(key).is_some_and(|v| v == value))
    }

    pub fn results(
        &self,
    ) -> (
        ImplicitAuthorization,
        ImplicitAuthorization,
        ImplicitAuthorization,
    ) {
        (self.result_any, self.result_inactive, self.result_active)
    }
}
