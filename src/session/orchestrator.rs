//! Session orchestration.
//!
//! One orchestrator owns the table of live sessions, keyed by profile id.
//! Launching runs through a fixed sequence: single-flight guard, proxy
//! resolution, process spawn, control-channel attach, new-page script
//! registration, then a sweep over pages that already exist. The sweep runs
//! after registration so no page created in between escapes injection.
//!
//! The process and transport sides sit behind [`BrowserBackend`] so the
//! sequencing can be exercised without a real browser.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{MaskfleetError, Result};
use crate::fingerprint::Fingerprint;
use crate::proxy::{ProxyBroker, ProxyLease};
use crate::session::control::{CdpChannel, ControlChannel};
use crate::session::injection::build_injection_script;
use crate::session::launcher::{self, LaunchOptions};
use crate::session::records::{RecordStore, SessionRecord};

/// Identity of a spawned browser process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserHandle {
    pub pid: u32,
    pub debug_port: u16,
}

/// Process and transport side of a session: spawn the browser, attach its
/// control channel, tear it down.
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    async fn spawn(
        &self,
        fingerprint: &Fingerprint,
        options: &LaunchOptions,
        proxy_endpoint: Option<&str>,
    ) -> Result<BrowserHandle>;

    /// Attach the control channel, bounded by the backend's launch timeout.
    async fn connect(&self, handle: &BrowserHandle) -> Result<Arc<dyn ControlChannel>>;

    async fn terminate(&self, handle: &BrowserHandle) -> Result<()>;
}

/// Real backend: Chromium-family process plus CDP channel.
pub struct ChromiumBackend {
    config: Config,
    executable: std::path::PathBuf,
}

impl ChromiumBackend {
    pub fn new(config: Config, executable: std::path::PathBuf) -> Self {
        Self { config, executable }
    }
}

#[async_trait]
impl BrowserBackend for ChromiumBackend {
    async fn spawn(
        &self,
        fingerprint: &Fingerprint,
        options: &LaunchOptions,
        proxy_endpoint: Option<&str>,
    ) -> Result<BrowserHandle> {
        let work_dir = options
            .work_dir
            .clone()
            .unwrap_or_else(|| self.config.profile_dir(&options.profile_id));
        std::fs::create_dir_all(&work_dir)?;

        let debug_port = launcher::allocate_debug_port()?;
        let args = launcher::build_args(fingerprint, options, debug_port, &work_dir, proxy_endpoint);

        tracing::info!(
            profile_id = %options.profile_id,
            port = debug_port,
            browser = %self.executable.display(),
            "spawning browser"
        );
        let child = launcher::spawn_browser(&self.executable, &args, &fingerprint.timezone)?;

        Ok(BrowserHandle {
            pid: child.id(),
            debug_port,
        })
    }

    async fn connect(&self, handle: &BrowserHandle) -> Result<Arc<dyn ControlChannel>> {
        let ws_url = launcher::wait_for_devtools(
            handle.debug_port,
            self.config.launch_timeout(),
            self.config.poll_interval(),
        )
        .await?;
        Ok(Arc::new(CdpChannel::new(handle.debug_port, ws_url)))
    }

    async fn terminate(&self, handle: &BrowserHandle) -> Result<()> {
        launcher::terminate_process(handle.pid).await
    }
}

/// What callers get back from a successful launch or lookup.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub profile_id: String,
    pub control_endpoint: String,
    pub process_id: u32,
}

struct SessionEntry {
    handle: BrowserHandle,
    channel: Arc<dyn ControlChannel>,
    /// Held for the session's lifetime; dropping it tears down any local
    /// proxy forwarder backing the endpoint.
    proxy: Option<ProxyLease>,
}

enum SessionSlot {
    /// Launch in flight; cancelling the token aborts it.
    Launching(CancellationToken),
    Running(SessionEntry),
}

pub struct SessionOrchestrator {
    backend: Arc<dyn BrowserBackend>,
    broker: Arc<dyn ProxyBroker>,
    records: Option<RecordStore>,
    sessions: Mutex<HashMap<String, SessionSlot>>,
}

impl SessionOrchestrator {
    pub fn new(backend: Arc<dyn BrowserBackend>, broker: Arc<dyn ProxyBroker>) -> Self {
        Self {
            backend,
            broker,
            records: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Persist session records for cross-invocation lookup.
    pub fn with_record_store(mut self, store: RecordStore) -> Self {
        self.records = Some(store);
        self
    }

    /// Launch a session for `options.profile_id` with `fingerprint` as its
    /// identity. At most one session per profile: a second launch while one
    /// is running or still launching fails with `AlreadyRunning`.
    pub async fn launch(
        &self,
        fingerprint: &Fingerprint,
        options: LaunchOptions,
    ) -> Result<SessionInfo> {
        let profile_id = options.profile_id.clone();
        let cancel = CancellationToken::new();

        {
            let mut sessions = self.sessions.lock().await;
            if sessions.contains_key(&profile_id) {
                return Err(MaskfleetError::AlreadyRunning {
                    profile_id: profile_id.clone(),
                });
            }
            sessions.insert(profile_id.clone(), SessionSlot::Launching(cancel.clone()));
        }

        // The sequence runs on its own task so a cancel cannot drop it
        // mid-flight: a handle produced between spawn and attach stays
        // reachable and gets reaped below instead of leaking a process.
        let mut task = tokio::spawn(launch_sequence(
            Arc::clone(&self.backend),
            Arc::clone(&self.broker),
            fingerprint.clone(),
            options,
        ));

        let outcome = tokio::select! {
            joined = &mut task => joined.unwrap_or_else(|e| {
                Err(MaskfleetError::Other(format!("launch task failed: {}", e)))
            }),
            _ = cancel.cancelled() => {
                // The sequence keeps running in the background; whatever
                // browser it ends up with is terminated on arrival.
                let backend = Arc::clone(&self.backend);
                tokio::spawn(async move {
                    if let Ok(Ok(entry)) = task.await {
                        let _ = backend.terminate(&entry.handle).await;
                    }
                });
                Err(MaskfleetError::LaunchCancelled {
                    profile_id: profile_id.clone(),
                })
            }
        };

        match outcome {
            Ok(entry) => {
                let info = SessionInfo {
                    profile_id: profile_id.clone(),
                    control_endpoint: entry.channel.endpoint(),
                    process_id: entry.handle.pid,
                };

                let mut sessions = self.sessions.lock().await;
                match sessions.get(&profile_id) {
                    Some(SessionSlot::Launching(_)) => {
                        if let Some(store) = &self.records {
                            let record = SessionRecord::new(
                                &profile_id,
                                entry.handle.pid,
                                entry.handle.debug_port,
                                &info.control_endpoint,
                            );
                            if let Err(e) = store.save(&record) {
                                tracing::warn!(profile_id = %profile_id, "record save failed: {}", e);
                            }
                        }
                        sessions.insert(profile_id.clone(), SessionSlot::Running(entry));
                        tracing::info!(profile_id = %profile_id, pid = info.process_id, "session running");
                        Ok(info)
                    }
                    _ => {
                        // Closed while we were finishing up: reap the browser
                        // we just brought up.
                        drop(sessions);
                        let _ = self.backend.terminate(&entry.handle).await;
                        Err(MaskfleetError::LaunchCancelled { profile_id })
                    }
                }
            }
            Err(e) => {
                let mut sessions = self.sessions.lock().await;
                if matches!(sessions.get(&profile_id), Some(SessionSlot::Launching(_))) {
                    sessions.remove(&profile_id);
                }
                Err(e)
            }
        }
    }

    /// Close one session. Returns `Ok(false)` when nothing was running for
    /// the profile; closing is idempotent.
    pub async fn close(&self, profile_id: &str) -> Result<bool> {
        let slot = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(profile_id)
        };

        match slot {
            None => Ok(false),
            Some(SessionSlot::Launching(cancel)) => {
                tracing::info!(profile_id, "cancelling in-flight launch");
                cancel.cancel();
                Ok(true)
            }
            Some(SessionSlot::Running(entry)) => {
                // Graceful first; the process kill below covers a browser
                // that ignores it or a channel that is already gone.
                if let Err(e) = entry.channel.close_browser().await {
                    tracing::debug!(profile_id, "graceful close failed: {}", e);
                }
                self.backend.terminate(&entry.handle).await?;

                if let Some(store) = &self.records {
                    if let Err(e) = store.remove(profile_id) {
                        tracing::warn!(profile_id, "record removal failed: {}", e);
                    }
                }
                tracing::info!(profile_id, "session closed");
                Ok(true)
            }
        }
    }

    /// Close every session, concurrently. The first error is surfaced after
    /// all closes have been attempted. Returns how many sessions were closed.
    pub async fn close_all(&self) -> Result<usize> {
        let profile_ids: Vec<String> = {
            let sessions = self.sessions.lock().await;
            sessions.keys().cloned().collect()
        };

        let results =
            futures::future::join_all(profile_ids.iter().map(|id| self.close(id))).await;

        let mut closed = 0;
        let mut first_err = None;
        for result in results {
            match result {
                Ok(true) => closed += 1,
                Ok(false) => {}
                Err(e) => first_err = first_err.or(Some(e)),
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(closed),
        }
    }

    pub async fn get_session(&self, profile_id: &str) -> Option<SessionInfo> {
        let sessions = self.sessions.lock().await;
        match sessions.get(profile_id) {
            Some(SessionSlot::Running(entry)) => Some(SessionInfo {
                profile_id: profile_id.to_string(),
                control_endpoint: entry.channel.endpoint(),
                process_id: entry.handle.pid,
            }),
            _ => None,
        }
    }

    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.lock().await;
        let mut infos: Vec<SessionInfo> = sessions
            .iter()
            .filter_map(|(profile_id, slot)| match slot {
                SessionSlot::Running(entry) => Some(SessionInfo {
                    profile_id: profile_id.clone(),
                    control_endpoint: entry.channel.endpoint(),
                    process_id: entry.handle.pid,
                }),
                SessionSlot::Launching(_) => None,
            })
            .collect();
        infos.sort_by(|a, b| a.profile_id.cmp(&b.profile_id));
        infos
    }

    /// Raw method on a running session's control channel.
    pub async fn execute(
        &self,
        profile_id: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let channel = {
            let sessions = self.sessions.lock().await;
            match sessions.get(profile_id) {
                Some(SessionSlot::Running(entry)) => Arc::clone(&entry.channel),
                _ => {
                    return Err(MaskfleetError::SessionNotFound(profile_id.to_string()));
                }
            }
        };
        channel.execute(method, params).await
    }
}

async fn launch_sequence(
    backend: Arc<dyn BrowserBackend>,
    broker: Arc<dyn ProxyBroker>,
    fingerprint: Fingerprint,
    options: LaunchOptions,
) -> Result<SessionEntry> {
    let proxy = match &options.proxy {
        Some(settings) => {
            tracing::debug!(proxy = %settings, "resolving proxy endpoint");
            Some(broker.resolve(settings).await?)
        }
        None => None,
    };

    let handle = backend
        .spawn(&fingerprint, &options, proxy.as_ref().map(|l| l.endpoint()))
        .await?;

    // From here on the process exists: any failure must reap it before
    // surfacing, so a failed launch leaves no orphan behind.
    let channel = match backend.connect(&handle).await {
        Ok(channel) => channel,
        Err(e) => {
            tracing::warn!(pid = handle.pid, "attach failed, terminating browser: {}", e);
            let _ = backend.terminate(&handle).await;
            return Err(e);
        }
    };

    if let Err(e) = install_fingerprint(&*channel, &fingerprint).await {
        let _ = backend.terminate(&handle).await;
        return Err(e);
    }

    Ok(SessionEntry {
        handle,
        channel,
        proxy,
    })
}

/// Arm future pages, then sweep the ones already open. Order matters:
/// registration first means a page created mid-sweep still gets the
/// script through the new-page path.
async fn install_fingerprint(channel: &dyn ControlChannel, fingerprint: &Fingerprint) -> Result<()> {
    let script = build_injection_script(fingerprint);
    channel.register_new_page_script(&script).await?;

    let viewport = fingerprint.screen_size();
    for page in channel.pages().await? {
        channel.apply_to_page(&page, &script).await?;
        if let Some((w, h)) = viewport {
            channel.set_viewport(&page, w, h).await?;
        }
        channel.set_timezone(&page, &fingerprint.timezone).await?;
    }
    Ok(())
}
