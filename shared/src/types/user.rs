use serde::{Deserialize, Serialize};

use super::Role;

/// Public projection of a stored identity. The password hash never leaves
/// the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub email: String,
    pub roles: Vec<Role>,
}
