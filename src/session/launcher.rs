//! Process side of a session: argument assembly, spawn, control-channel
//! discovery, and termination.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::time::sleep;

use crate::error::{MaskfleetError, Result};
use crate::fingerprint::{Fingerprint, WebRtcMode};
use crate::proxy::ProxySettings;

/// Caller-supplied launch options for one profile.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub profile_id: String,
    /// Browser state directory; defaults to the configured profiles dir.
    pub work_dir: Option<PathBuf>,
    pub proxy: Option<ProxySettings>,
    pub headless: bool,
    pub extension_paths: Vec<PathBuf>,
    /// Appended last: callers can override earlier flags by position.
    pub extra_args: Vec<String>,
}

impl LaunchOptions {
    pub fn new(profile_id: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            ..Default::default()
        }
    }
}

/// Deterministic argument set from the fingerprint and options. The proxy
/// endpoint, when present, is the broker's anonymized endpoint; raw
/// credentials never enter this function.
pub fn build_args(
    fingerprint: &Fingerprint,
    options: &LaunchOptions,
    debug_port: u16,
    work_dir: &std::path::Path,
    proxy_endpoint: Option<&str>,
) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", debug_port),
        format!("--user-data-dir={}", work_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
    ];

    if let Some((w, h)) = fingerprint.screen_size() {
        args.push(format!("--window-size={},{}", w, h));
    }
    args.push(format!("--user-agent={}", fingerprint.user_agent));
    args.push(format!("--lang={}", fingerprint.language));

    match fingerprint.webrtc.mode {
        WebRtcMode::Disabled => {
            args.push("--webrtc-ip-handling-policy=disable_non_proxied_udp".to_string());
            args.push("--force-webrtc-ip-handling-policy".to_string());
        }
        WebRtcMode::Fake => {
            args.push("--webrtc-ip-handling-policy=default_public_interface_only".to_string());
            args.push("--force-webrtc-ip-handling-policy".to_string());
        }
        WebRtcMode::Real => {}
    }

    if let Some(endpoint) = proxy_endpoint {
        args.push(format!("--proxy-server={}", endpoint));
    }

    if !options.extension_paths.is_empty() {
        let joined = options
            .extension_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(",");
        args.push(format!("--load-extension={}", joined));
    }

    if options.headless {
        args.push("--headless=new".to_string());
    }

    args.extend(options.extra_args.iter().cloned());
    args
}

/// Bind an ephemeral loopback port and release it. Small race window with
/// the browser grabbing it later, acceptable for concurrent session counts
/// this tool sees.
pub fn allocate_debug_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Spawn the browser detached from this process so launched sessions
/// survive CLI exit. The fingerprint's timezone rides in as TZ; Chromium
/// has no flag for it and the channel sets the override per page as well.
pub fn spawn_browser(
    executable: &std::path::Path,
    args: &[String],
    timezone: &str,
) -> Result<Child> {
    let mut cmd = Command::new(executable);
    cmd.args(args)
        .env("TZ", timezone)
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // New session group: the browser must not die with the CLI.
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }
    }

    let child = cmd.spawn().map_err(|e| {
        MaskfleetError::Other(format!(
            "failed to spawn {}: {}",
            executable.display(),
            e
        ))
    })?;

    Ok(child)
}

/// Poll the local introspection endpoint until the browser exposes its
/// control channel, bounded by `timeout`. Returns the browser WebSocket URL.
pub async fn wait_for_devtools(
    debug_port: u16,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<String> {
    let url = format!("http://127.0.0.1:{}/json/version", debug_port);
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let deadline = tokio::time::Instant::now() + timeout;
    let mut attempt = 0u32;

    loop {
        if tokio::time::Instant::now() >= deadline {
            return Err(MaskfleetError::LaunchTimeout(format!(
                "control channel on port {} not ready within {:?}",
                debug_port, timeout
            )));
        }
        sleep(poll_interval).await;
        attempt += 1;

        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let json: serde_json::Value = match response.json().await {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::debug!(attempt, "malformed /json/version response: {}", e);
                        continue;
                    }
                };
                if let Some(ws_url) = json.get("webSocketDebuggerUrl").and_then(|v| v.as_str()) {
                    tracing::debug!(port = debug_port, "control channel ready at {}", ws_url);
                    return Ok(ws_url.to_string());
                }
            }
            Ok(_) => tracing::trace!(attempt, "control channel not ready yet"),
            Err(e) => tracing::trace!(attempt, "discovery attempt failed: {}", e),
        }
    }
}

/// Is the process still alive?
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
pub fn process_alive(pid: u32) -> bool {
    // Fallback: query the debug port instead on non-unix platforms.
    let _ = pid;
    false
}

/// Force-terminate a browser process: SIGTERM, bounded wait, then SIGKILL.
/// Termination of an already-dead process is swallowed, not surfaced.
#[cfg(unix)]
pub async fn terminate_process(pid: u32) -> Result<()> {
    let pid = pid as libc::pid_t;

    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
        // ESRCH: the process raced us and is already gone.
        return Ok(());
    }

    for _ in 0..30 {
        sleep(Duration::from_millis(100)).await;
        if unsafe { libc::kill(pid, 0) } != 0 {
            return Ok(());
        }
    }

    tracing::warn!(pid, "process ignored SIGTERM, sending SIGKILL");
    unsafe { libc::kill(pid, libc::SIGKILL) };
    Ok(())
}

#[cfg(not(unix))]
pub async fn terminate_process(pid: u32) -> Result<()> {
    let _ = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .output();
    Ok(())
}
