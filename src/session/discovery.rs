//! Browser executable discovery.
//!
//! Order of precedence: explicit config/env path, then PATH lookup over
//! candidate binary names, then per-OS well-known install locations.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{MaskfleetError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Brave,
    Edge,
    Chromium,
}

impl BrowserKind {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "Google Chrome",
            BrowserKind::Brave => "Brave",
            BrowserKind::Edge => "Microsoft Edge",
            BrowserKind::Chromium => "Chromium",
        }
    }

    fn path_names(&self) -> &'static [&'static str] {
        match self {
            BrowserKind::Chrome => &["google-chrome", "google-chrome-stable", "chrome"],
            BrowserKind::Brave => &["brave-browser", "brave"],
            BrowserKind::Edge => &["microsoft-edge", "microsoft-edge-stable", "msedge"],
            BrowserKind::Chromium => &["chromium", "chromium-browser"],
        }
    }
}

const ALL_KINDS: &[BrowserKind] = &[
    BrowserKind::Chrome,
    BrowserKind::Brave,
    BrowserKind::Edge,
    BrowserKind::Chromium,
];

#[derive(Debug, Clone)]
pub struct BrowserInstall {
    pub kind: BrowserKind,
    pub path: PathBuf,
    pub version: Option<String>,
}

impl BrowserInstall {
    pub fn new(kind: BrowserKind, path: PathBuf) -> Self {
        Self {
            kind,
            path,
            version: None,
        }
    }

    pub fn with_version(mut self) -> Self {
        self.version = detect_version(&self.path);
        self
    }
}

/// Resolve the executable to launch. `explicit` wins when given.
pub fn resolve_browser(explicit: Option<&str>) -> Result<BrowserInstall> {
    if let Some(path) = explicit {
        let path = PathBuf::from(shellexpand::tilde(path).to_string());
        if !path.exists() {
            return Err(MaskfleetError::BrowserNotFound(format!(
                "configured path does not exist: {}",
                path.display()
            )));
        }
        return Ok(BrowserInstall::new(BrowserKind::Chromium, path).with_version());
    }

    discover_all()
        .into_iter()
        .next()
        .ok_or_else(|| {
            MaskfleetError::BrowserNotFound(
                "no Chromium-family browser found; install Chrome, Brave, or Edge, or set browser.path"
                    .to_string(),
            )
        })
}

/// Every browser install we can find, in priority order.
pub fn discover_all() -> Vec<BrowserInstall> {
    let mut found = Vec::new();

    for kind in ALL_KINDS {
        // PATH first: respects whatever the user has made primary.
        let from_path = kind
            .path_names()
            .iter()
            .find_map(|name| which::which(name).ok());

        let path = from_path.or_else(|| {
            well_known_paths(*kind)
                .iter()
                .map(|p| PathBuf::from(shellexpand::tilde(p).to_string()))
                .find(|p| p.exists())
        });

        if let Some(path) = path {
            found.push(BrowserInstall::new(*kind, path).with_version());
        }
    }

    found
}

fn well_known_paths(kind: BrowserKind) -> &'static [&'static str] {
    #[cfg(target_os = "macos")]
    {
        match kind {
            BrowserKind::Chrome => &[
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            ],
            BrowserKind::Brave => &[
                "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
                "~/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
            ],
            BrowserKind::Edge => &[
                "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
            ],
            BrowserKind::Chromium => &[
                "/Applications/Chromium.app/Contents/MacOS/Chromium",
            ],
        }
    }

    #[cfg(target_os = "linux")]
    {
        match kind {
            BrowserKind::Chrome => &[
                "/usr/bin/google-chrome",
                "/usr/bin/google-chrome-stable",
                "/opt/google/chrome/chrome",
            ],
            BrowserKind::Brave => &["/usr/bin/brave-browser", "/usr/bin/brave"],
            BrowserKind::Edge => &["/usr/bin/microsoft-edge", "/usr/bin/microsoft-edge-stable"],
            BrowserKind::Chromium => &[
                "/usr/bin/chromium",
                "/usr/bin/chromium-browser",
                "/snap/bin/chromium",
            ],
        }
    }

    #[cfg(target_os = "windows")]
    {
        match kind {
            BrowserKind::Chrome => &[
                r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            ],
            BrowserKind::Brave => &[
                r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
            ],
            BrowserKind::Edge => &[
                r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
                r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
            ],
            BrowserKind::Chromium => &[],
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        let _ = kind;
        &[]
    }
}

/// Best-effort version string via `--version`.
fn detect_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout);
    let version = version.trim();
    // "Google Chrome 131.0.6778.85" -> "131.0.6778.85"
    match version.rfind(' ') {
        Some(idx) => Some(version[idx + 1..].to_string()),
        None => Some(version.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_missing_path_is_browser_not_found() {
        let result = resolve_browser(Some("/definitely/not/a/browser"));
        assert!(matches!(result, Err(MaskfleetError::BrowserNotFound(_))));
    }

    #[test]
    fn discover_all_returns_existing_paths() {
        for install in discover_all() {
            assert!(install.path.exists());
        }
    }

    #[test]
    fn kinds_have_path_candidates() {
        for kind in ALL_KINDS {
            assert!(!kind.path_names().is_empty());
            assert!(!kind.name().is_empty());
        }
    }
}
