//! Resolved credentials for a live connection

use std::fmt;

/// Separator between the owning account login and a sub-account login
pub const SUB_ACCOUNT_SEPARATOR: &str = "/";

/// Decrypted secret that never shows up in `Debug` output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(plaintext: impl Into<String>) -> Self {
        Self(plaintext.into())
    }

    /// Exposes the plaintext; callers must not log the result
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Endpoint, login and secret needed to open a live connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_url: Option<String>,
    pub account: String,
    pub secret: Secret,
}

/// Composes the login for a registration under its owning account
///
/// A non-empty `own` login that differs from `owner` is addressed as a
/// sub-account (`owner/own`); otherwise the owner's login is used as is.
pub fn compose_account(owner: &str, own: &str) -> String {
    if !own.is_empty() && own != owner {
        format!("{owner}{SUB_ACCOUNT_SEPARATOR}{own}")
    } else {
        owner.to_string()
    }
}
