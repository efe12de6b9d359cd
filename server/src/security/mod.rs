pub mod access;
pub mod filter;
pub mod principal;
pub mod token;

pub use access::{AccessLayer, AccessPolicy};
pub use filter::AuthFilterLayer;
pub use principal::{Authentication, Principal};
pub use token::{TokenError, TokenService};
