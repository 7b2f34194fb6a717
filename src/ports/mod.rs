//! Port traits implemented by [`crate::adapters`].

pub mod asset_port;
pub mod config_port;
