pub mod auth;
pub mod ping;
pub mod routes;
pub mod user;
pub mod utils;

pub use routes::{Router, RouterService, build_router};
