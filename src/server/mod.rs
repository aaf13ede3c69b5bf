//! # Server Module
//!
//! Request and response values exchanged between the transport and the
//! router, plus paced body emission.
//!
//! The router does not own a socket. Whatever accepts connections builds a
//! [`Request`], calls [`crate::router::Router::dispatch`] and writes the
//! returned [`Response`] with [`Response::send`], passing a
//! [`ConnectionState`] so throttled bodies stop when the client disconnects.

pub mod headers;
pub mod request;
pub mod response;
pub mod throttle;

pub use headers::{HeaderVec, Headers, MAX_INLINE_HEADERS};
pub use request::Request;
pub use response::{status_reason, Response};
pub use throttle::{Connected, ConnectionState, Emission, Throttle, DEFAULT_CHUNK_SIZE};
