use std::fmt;

use serde::Deserialize;

/// Registration request body.
///
/// `roles` are kept as raw strings here; they are parsed into
/// [`Role`](super::Role) during validation so that every bad name can be
/// reported alongside the other field errors.
#[derive(Clone, Deserialize)]
pub struct RegistrationData {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl fmt::Debug for RegistrationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationData")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}
