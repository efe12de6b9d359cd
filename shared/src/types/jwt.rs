use serde::{Deserialize, Serialize};

/// Prefix carried by every role string inside a token and by every granted
/// authority derived from one.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Claims embedded in every session token issued by the server.
///
/// Tokens are stateless: there is no session row behind them. Validity is
/// decided from the HMAC signature and `exp` alone, so a token stays usable
/// until it expires (no revocation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Standard JWT subject: the account email.
    pub sub: String,

    /// Granted authorities, each already carrying the `ROLE_` prefix.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Issued-at (Unix timestamp, seconds).
    pub iat: u64,

    /// Standard JWT expiry (Unix timestamp, seconds).
    pub exp: u64,
}

impl SessionClaims {
    /// Build claims for `email`, prefixing each role name with `ROLE_`.
    pub fn new<I, S>(email: &str, roles: I, iat: u64, ttl_secs: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            sub: email.to_string(),
            roles: roles
                .into_iter()
                .map(|role| format!("{}{}", ROLE_PREFIX, role.as_ref()))
                .collect(),
            iat,
            exp: iat.saturating_add(ttl_secs),
        }
    }

    /// True when `exp` is at or before `now`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.exp <= now
    }

    /// True when the claims carry no subject.
    pub fn is_empty(&self) -> bool {
        self.sub.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_prefixes_roles_and_sets_expiry() {
        let c = SessionClaims::new("a@b.io", ["USER", "ADMIN"], 1_000, 259_200);
        assert_eq!(c.roles, vec!["ROLE_USER", "ROLE_ADMIN"]);
        assert_eq!(c.exp, 260_200);
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let c = SessionClaims::new("a@b.io", Vec::<String>::new(), 100, 10);
        assert!(!c.is_expired_at(109));
        assert!(c.is_expired_at(110));
    }
}
