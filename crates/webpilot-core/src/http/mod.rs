pub mod api;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod router;
pub mod server;
pub mod ws;

pub use error::ApiError;
pub use extract::ApiJson;
pub use router::build_router;
pub use server::{HttpConfig, HttpServer};
