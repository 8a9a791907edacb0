//! # IdPort Core
//!
//! Pure orchestration logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The session orchestrator state machine
//! - The rotating authentication code generator
//! - The session secret store
//! - Port interfaces (traits) implemented by infrastructure
//!
//! ## Architecture Principles
//! - Only depends on `idport-domain`
//! - No HTTP or platform code
//! - All external dependencies via traits
//! - Pure, testable orchestration logic

pub mod qr;
pub mod secrets;
pub mod session;

pub use qr::{animated_qr_data, autostart_url};
pub use secrets::SessionSecretStore;
pub use session::orchestrator::{SessionOrchestrator, StartOptions};
pub use session::ports::{QrImageEncoder, RelyingPartyGateway};
pub use session::state::SessionSnapshot;
