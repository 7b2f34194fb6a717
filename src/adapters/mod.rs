//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
pub mod tdx_reader;
pub mod tdx_repository;
