//! Relying-party gateway to the identity provider
//!
//! HTTP calls to the provider's three RP operations (`auth`, `sign`,
//! `collect`). The gateway holds no session state and never retries;
//! retry and polling discipline belong to the orchestrator so timeout
//! accounting stays centralized.

pub mod client;
pub mod types;

pub use client::{RpClient, RpClientBuildError};
