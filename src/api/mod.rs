//! Client side of the host application's remote command API.

pub mod favorites;
pub mod schema;
pub mod transport;
