use shared::types::Role;

/// Caller identity derived from a verified session token.
///
/// Lives only as long as the request that carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    email: String,
    authorities: Vec<String>,
}

impl Principal {
    /// `authorities` are expected to already carry the `ROLE_` prefix.
    pub fn new(email: String, authorities: Vec<String>) -> Self {
        Self { email, authorities }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.has_authority(&role.authority())
    }
}

/// Per-request authentication state.
///
/// The authentication filter inserts exactly one of these into each
/// request's extensions; downstream layers and handlers read it from there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Authentication {
    #[default]
    Anonymous,
    Authenticated(Principal),
}

impl Authentication {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(p) => Some(p),
            Self::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Read the state attached to a request. A request the filter never saw
    /// is anonymous.
    pub fn of(extensions: &http::Extensions) -> Authentication {
        extensions
            .get::<Authentication>()
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Principal {
        Principal::new(
            "root@example.com".into(),
            vec!["ROLE_ADMIN".into(), "ROLE_USER".into()],
        )
    }

    #[test]
    fn role_checks_use_prefixed_authorities() {
        let p = admin();
        assert!(p.has_role(Role::Admin));
        assert!(p.has_authority("ROLE_USER"));
        assert!(!p.has_authority("ADMIN"));
    }

    #[test]
    fn unprefixed_authority_does_not_grant_role() {
        let p = Principal::new("x@example.com".into(), vec!["ADMIN".into()]);
        assert!(!p.has_role(Role::Admin));
    }

    #[test]
    fn missing_extension_reads_as_anonymous() {
        let ext = http::Extensions::new();
        assert_eq!(Authentication::of(&ext), Authentication::Anonymous);
    }

    #[test]
    fn principal_accessor_matches_variant() {
        let auth = Authentication::Authenticated(admin());
        assert!(auth.is_authenticated());
        assert_eq!(auth.principal().unwrap().email(), "root@example.com");
        assert!(Authentication::Anonymous.principal().is_none());
    }
}
