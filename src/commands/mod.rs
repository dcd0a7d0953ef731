pub mod browsers;
pub mod config;
pub mod fingerprint;
pub mod session;
