pub mod json_body;
pub mod json_response;

pub use json_body::parse_json;
pub use json_response::{ResponseBody, deliver_serialized_json, deliver_success_json, full};
