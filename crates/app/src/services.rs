//! Application services — the request surface clients talk to.
//!
//! Each service accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod client_session;
pub mod request_gateway;
