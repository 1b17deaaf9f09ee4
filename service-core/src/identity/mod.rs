//! Trusted-header identity model.
//!
//! An upstream gateway authenticates requests and forwards the username in
//! the `x-forwarded-user` header. No token verification happens here; the
//! boundary middleware turns the header into an [`AuthenticatedIdentity`]
//! exactly once and every downstream call receives it explicitly.

use std::collections::HashSet;

/// Header carrying the authenticated username, set by the upstream gateway.
pub const FORWARDED_USER_HEADER: &str = "x-forwarded-user";

/// Identity of the caller, resolved once at the request boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub username: String,
    pub is_admin: bool,
}

/// Admin allowlist resolved once at process start from the `ADMIN_USERS`
/// comma-separated configuration value.
#[derive(Debug, Clone, Default)]
pub struct AdminList {
    usernames: HashSet<String>,
}

impl AdminList {
    pub fn from_csv(csv: &str) -> Self {
        let usernames = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { usernames }
    }

    pub fn is_admin(&self, username: &str) -> bool {
        self.usernames.contains(username)
    }

    /// Build the identity value for a forwarded username.
    pub fn identify(&self, username: &str) -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            username: username.to_string(),
            is_admin: self.is_admin(username),
        }
    }
}
