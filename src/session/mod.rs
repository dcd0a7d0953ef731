//! Session lifecycle: browser discovery, launch, fingerprint installation,
//! and teardown.

pub mod control;
pub mod discovery;
pub mod injection;
pub mod launcher;
pub mod orchestrator;
pub mod records;

pub use control::{CdpChannel, ControlChannel, PageInfo};
pub use discovery::{discover_all, resolve_browser, BrowserInstall, BrowserKind};
pub use injection::build_injection_script;
pub use launcher::LaunchOptions;
pub use orchestrator::{
    BrowserBackend, BrowserHandle, ChromiumBackend, SessionInfo, SessionOrchestrator,
};
pub use records::{check_status, RecordStore, SessionRecord, SessionStatus};
