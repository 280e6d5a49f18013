//! OVH API access: signed transport, wire models, typed client.

pub mod models;

mod client;
mod transport;

pub use client::DediClient;
pub use transport::Api;
