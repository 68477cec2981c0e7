pub mod http;

pub use self::http::routes::{Router, build_api_router};
