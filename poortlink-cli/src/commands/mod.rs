//! CLI command implementations.
//!
//! - [`config`] - show the effective configuration
//! - [`init`] - configuration initialization
//! - [`simulate`] - scripted queue session against a zone
//! - [`zones`] - nearby zone discovery

pub mod common;
pub mod config;
pub mod init;
pub mod simulate;
pub mod zones;
