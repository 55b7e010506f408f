//! pkla - local authorization authority
//!
//! Decides implicit authorization outcomes for desktop privilege requests by
//! consulting `.pkla` rule files under the configured store paths, and
//! resolves the administrator identities named in `localauthority.conf.d`
//! configuration. The host-facing surface is [`PolicyAuthority`] with its
//! two operations; everything else is the supporting machinery (rule store,
//! store ordering, change monitoring, unix database lookups).

pub mod admin;
pub mod authority;
pub mod config;
pub mod engine;
pub mod errors;
pub mod identity;
pub mod keyfile;
pub mod monitor;
pub mod nss;
pub mod rules;
pub mod store;

pub use authority::{Authority, AuthorityBuilder, PolicyAuthority};
pub use errors::AuthorityError;
pub use identity::{Identity, ImplicitAuthorization};
pub use rules::Details;
