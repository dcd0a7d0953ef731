use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{Cli, SessionCommands};
use crate::config::Config;
use crate::error::{MaskfleetError, Result};
use crate::fingerprint::Fingerprint;
use crate::proxy::{LocalForwarder, ProxySettings};
use crate::session::{
    check_status, resolve_browser, CdpChannel, ChromiumBackend, ControlChannel, LaunchOptions,
    RecordStore, SessionOrchestrator, SessionStatus,
};

pub async fn run(cli: &Cli, command: &SessionCommands) -> Result<()> {
    match command {
        SessionCommands::Launch {
            profile,
            fingerprint,
            proxy,
            proxy_user,
            proxy_pass_env,
            headless,
            work_dir,
            extensions,
            args,
            attach,
        } => {
            launch(
                cli,
                profile,
                fingerprint,
                proxy.as_deref(),
                proxy_user.as_deref(),
                proxy_pass_env.as_deref(),
                *headless,
                work_dir.clone(),
                extensions.clone(),
                args.clone(),
                *attach,
            )
            .await
        }
        SessionCommands::Close { profile } => close(cli, profile).await,
        SessionCommands::CloseAll => close_all(cli).await,
        SessionCommands::List => list(cli).await,
        SessionCommands::Status { profile } => status(cli, profile).await,
    }
}

fn load_fingerprint(path: &Path) -> Result<Fingerprint> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MaskfleetError::InvalidFingerprint(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        MaskfleetError::InvalidFingerprint(format!("cannot parse {}: {}", path.display(), e))
    })
}

/// Assemble proxy settings; the password comes only from the named
/// environment variable, never from a flag value.
fn build_proxy(
    server: Option<&str>,
    user: Option<&str>,
    pass_env: Option<&str>,
) -> Result<Option<ProxySettings>> {
    let Some(server) = server else {
        if user.is_some() || pass_env.is_some() {
            return Err(MaskfleetError::ConfigError(
                "--proxy-user/--proxy-pass-env require --proxy".to_string(),
            ));
        }
        return Ok(None);
    };

    let password = match pass_env {
        Some(var) => Some(std::env::var(var).map_err(|_| {
            MaskfleetError::ConfigError(format!(
                "proxy password environment variable {} is not set",
                var
            ))
        })?),
        None => None,
    };

    Ok(Some(ProxySettings {
        server: server.to_string(),
        username: user.map(str::to_string),
        password,
    }))
}

#[allow(clippy::too_many_arguments)]
async fn launch(
    cli: &Cli,
    profile: &str,
    fingerprint_path: &Path,
    proxy: Option<&str>,
    proxy_user: Option<&str>,
    proxy_pass_env: Option<&str>,
    headless: bool,
    work_dir: Option<PathBuf>,
    extensions: Vec<PathBuf>,
    extra_args: Vec<String>,
    attach: bool,
) -> Result<()> {
    let config = Config::load()?;
    let fingerprint = load_fingerprint(fingerprint_path)?;

    let browser_path = cli.browser_path.as_deref().or(config.browser.path.as_deref());
    let install = resolve_browser(browser_path)?;

    let mut options = LaunchOptions::new(profile);
    options.proxy = build_proxy(proxy, proxy_user, proxy_pass_env)?;
    options.headless = headless || config.browser.headless;
    options.work_dir = work_dir;
    options.extension_paths = extensions;
    options.extra_args = extra_args;

    let backend = Arc::new(ChromiumBackend::new(config.clone(), install.path.clone()));
    let orchestrator = SessionOrchestrator::new(backend, Arc::new(LocalForwarder))
        .with_record_store(RecordStore::new(config.sessions.dir.clone()));

    let spinner = if cli.json {
        None
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!("Launching {} for profile {}...", install.kind.name(), profile));
        bar.enable_steady_tick(Duration::from_millis(100));
        Some(bar)
    };

    let result = orchestrator.launch(&fingerprint, options).await;
    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }
    let info = result?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "profileId": info.profile_id,
                "controlEndpoint": info.control_endpoint,
                "processId": info.process_id,
            })
        );
    } else {
        println!("{} Session running for profile {}", "✓".green(), profile.bold());
        println!("  endpoint: {}", info.control_endpoint.dimmed());
        println!("  pid:      {}", info.process_id);
    }

    if attach {
        if !cli.json {
            println!("  {}", "attached; Ctrl-C closes the session".dimmed());
        }
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| MaskfleetError::Other(format!("signal handler failed: {}", e)))?;
        orchestrator.close(profile).await?;
        if !cli.json {
            println!("{} Session closed", "✓".green());
        }
    }

    Ok(())
}

/// Close a session recorded by an earlier invocation: graceful shutdown over
/// its control channel, then process termination, then record removal.
async fn close_recorded(record: &crate::session::SessionRecord) -> Result<()> {
    let channel = CdpChannel::new(record.debug_port, record.control_endpoint.clone());
    if let Err(e) = channel.close_browser().await {
        tracing::debug!(profile_id = %record.profile_id, "graceful close failed: {}", e);
    }
    crate::session::launcher::terminate_process(record.pid).await
}

async fn close(cli: &Cli, profile: &str) -> Result<()> {
    let config = Config::load()?;
    let store = RecordStore::new(config.sessions.dir.clone());

    match store.load(profile)? {
        Some(record) => {
            close_recorded(&record).await?;
            store.remove(profile)?;
            if cli.json {
                println!("{}", serde_json::json!({ "status": "closed", "profileId": profile }));
            } else {
                println!("{} Closed session for profile {}", "✓".green(), profile.bold());
            }
        }
        None => {
            if cli.json {
                println!("{}", serde_json::json!({ "status": "not_found", "profileId": profile }));
            } else {
                println!("{} No session recorded for profile {}", "!".yellow(), profile);
            }
        }
    }

    Ok(())
}

async fn close_all(cli: &Cli) -> Result<()> {
    let config = Config::load()?;
    let store = RecordStore::new(config.sessions.dir.clone());

    let records = store.list()?;
    let mut closed = 0usize;
    for record in &records {
        close_recorded(record).await?;
        store.remove(&record.profile_id)?;
        closed += 1;
    }

    if cli.json {
        println!("{}", serde_json::json!({ "closed": closed }));
    } else if closed == 0 {
        println!("{}", "No recorded sessions.".dimmed());
    } else {
        println!("{} Closed {} session(s)", "✓".green(), closed);
    }

    Ok(())
}

async fn list(cli: &Cli) -> Result<()> {
    let config = Config::load()?;
    let store = RecordStore::new(config.sessions.dir.clone());
    let records = store.list()?;

    if cli.json {
        let mut entries = Vec::new();
        for record in &records {
            let state = check_status(record).await;
            entries.push(serde_json::json!({
                "profileId": record.profile_id,
                "pid": record.pid,
                "controlEndpoint": record.control_endpoint,
                "startedAt": record.started_at,
                "status": state.as_str(),
            }));
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", "No recorded sessions.".dimmed());
        return Ok(());
    }

    for record in &records {
        let state = check_status(record).await;
        let marker = match state {
            SessionStatus::Running => "✓".green(),
            SessionStatus::Stale => "!".yellow(),
            SessionStatus::NotRunning => "✗".red(),
        };
        println!(
            "{} {} pid {} {} ({})",
            marker,
            record.profile_id.bold(),
            record.pid,
            record.control_endpoint.dimmed(),
            state.as_str()
        );
    }

    Ok(())
}

async fn status(cli: &Cli, profile: &str) -> Result<()> {
    let config = Config::load()?;
    let store = RecordStore::new(config.sessions.dir.clone());

    let Some(record) = store.load(profile)? else {
        if cli.json {
            println!("{}", serde_json::json!({ "profileId": profile, "status": "not recorded" }));
        } else {
            println!("{} No session recorded for profile {}", "!".yellow(), profile);
        }
        return Ok(());
    };

    let state = check_status(&record).await;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "profileId": record.profile_id,
                "pid": record.pid,
                "controlEndpoint": record.control_endpoint,
                "startedAt": record.started_at,
                "status": state.as_str(),
            })
        );
    } else {
        let marker = match state {
            SessionStatus::Running => "✓".green(),
            SessionStatus::Stale => "!".yellow(),
            SessionStatus::NotRunning => "✗".red(),
        };
        println!("{} Profile {} is {}", marker, record.profile_id.bold(), state.as_str());
        println!("  pid:      {}", record.pid);
        println!("  endpoint: {}", record.control_endpoint.dimmed());
    }

    Ok(())
}
