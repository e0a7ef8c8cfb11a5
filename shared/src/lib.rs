//! Types shared between the n-pong server and its browser client.

pub mod config;
pub mod protocol;
pub mod vec3;
