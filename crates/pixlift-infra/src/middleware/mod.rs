//! Shared HTTP middleware for Pixlift

pub mod request_id;
pub mod security_headers;

pub use request_id::{request_id_middleware, RequestId};
pub use security_headers::security_headers_middleware;
