pub mod json_error;
pub mod jwt;
pub mod login;
pub mod register;
pub mod role;
pub mod server_config;
pub mod user;

pub use self::json_error::ErrorResponse;
pub use self::jwt::{ROLE_PREFIX, SessionClaims};
pub use self::login::{LoginData, TokenResponse};
pub use self::register::RegistrationData;
pub use self::role::{Role, UnknownRole};
pub use self::user::UserView;
