use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthorityError {
    #[error("failed to load rule file `{path}`")]
    #[diagnostic(
        code(pkla::store::rule_file_load),
        help("Check that the file exists and is readable")
    )]
    RuleFileLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed key file: {0}")]
    #[diagnostic(
        code(pkla::keyfile::parse),
        help("Expected `[section]` headers followed by `key=value` entries")
    )]
    KeyFileParse(String),

    #[error("malformed identity `{0}`")]
    #[diagnostic(
        code(pkla::identity::parse),
        help("Identities look like unix-user:<name|uid>, unix-group:<name|gid> or unix-netgroup:<name>")
    )]
    InvalidIdentity(String),

    #[error("malformed rule in `[{section}]`: {reason}")]
    #[diagnostic(
        code(pkla::store::invalid_rule),
        help("A rule needs `Identity=` and `Action=` entries and optional `Result*` outcomes")
    )]
    InvalidRule { section: String, reason: String },

    #[error("unrecognized authorization result `{0}`")]
    #[diagnostic(
        code(pkla::store::invalid_result),
        help("Valid values: yes, no, auth_self, auth_admin, auth_self_keep, auth_admin_keep")
    )]
    InvalidResultValue(String),
}
