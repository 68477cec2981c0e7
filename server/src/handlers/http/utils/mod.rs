pub mod json_response;
pub mod request;

pub use json_response::*;
pub use request::*;
