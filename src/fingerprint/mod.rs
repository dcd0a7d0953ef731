pub mod generator;
pub mod model;
pub mod pools;
pub mod validator;

pub use generator::FingerprintGenerator;
pub use model::{
    AudioContextFingerprint, BatteryHint, CanvasFingerprint, ConnectionHint, Fingerprint,
    FingerprintOverrides, Platform, WebRtcConfig, WebRtcMode,
};
pub use validator::{similarity, uniqueness, validate, ValidationIssue, ValidationReport};
