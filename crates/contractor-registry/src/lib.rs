//! Contractor registry core: employer identity resolution plus the configuration,
//! telemetry and error plumbing shared by the service binaries.

pub mod config;
pub mod error;
pub mod identity;
pub mod telemetry;
