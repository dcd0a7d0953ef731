pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod proxy;
pub mod session;

pub use error::{MaskfleetError, Result};
pub use fingerprint::{Fingerprint, FingerprintGenerator, FingerprintOverrides};
pub use session::{LaunchOptions, SessionInfo, SessionOrchestrator};
