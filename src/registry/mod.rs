//! Support for downloading container images from a registry server

mod auth;
pub mod blob;
mod client;
mod default;

pub use auth::AccessToken;
pub use client::*;
pub use default::*;
