//! Control channel to a running browser.
//!
//! The orchestrator talks to the browser through the [`ControlChannel`]
//! trait so tests can substitute a fake transport. The real implementation
//! speaks CDP: page enumeration over the /json/list HTTP endpoint, commands
//! and target events over WebSockets.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{MaskfleetError, Result};

/// Page info from the /json/list endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type")]
    pub page_type: String,
    pub web_socket_debugger_url: Option<String>,
}

/// Capability set the orchestrator needs from any browser transport:
/// enumerate pages, subscribe to page creation, install a script that runs
/// in every new document before page script, adjust viewport and timezone,
/// and execute a raw method.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Browser-level endpoint URL for callers that attach their own tooling.
    fn endpoint(&self) -> String;

    async fn pages(&self) -> Result<Vec<PageInfo>>;

    /// Register `source` to run in every future page before its own script
    /// executes. Must be called before sweeping existing pages so no page
    /// created in between slips through unpatched.
    async fn register_new_page_script(&self, source: &str) -> Result<()>;

    /// Install `source` on a page that already exists at attach time.
    async fn apply_to_page(&self, page: &PageInfo, source: &str) -> Result<()>;

    async fn set_viewport(&self, page: &PageInfo, width: u32, height: u32) -> Result<()>;

    async fn set_timezone(&self, page: &PageInfo, timezone: &str) -> Result<()>;

    /// Escape hatch: raw method on the browser connection.
    async fn execute(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value>;

    /// Graceful browser shutdown.
    async fn close_browser(&self) -> Result<()>;
}

/// CDP-backed control channel.
pub struct CdpChannel {
    debug_port: u16,
    browser_ws_url: String,
    client: reqwest::Client,
}

impl CdpChannel {
    pub fn new(debug_port: u16, browser_ws_url: String) -> Self {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            debug_port,
            browser_ws_url,
            client,
        }
    }

    /// One-shot command over a fresh WebSocket: send, wait for the matching
    /// response id, return its result.
    async fn send_on(
        ws_url: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let (mut ws, _) = connect_async(ws_url).await.map_err(|e| {
            MaskfleetError::ControlChannel(format!("WebSocket connection failed: {}", e))
        })?;

        let cmd = serde_json::json!({
            "id": 1,
            "method": method,
            "params": params
        });

        ws.send(Message::Text(cmd.to_string().into()))
            .await
            .map_err(|e| MaskfleetError::ControlChannel(format!("send failed: {}", e)))?;

        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let response: serde_json::Value = serde_json::from_str(text.as_str())?;
                    if response.get("id") == Some(&serde_json::json!(1)) {
                        if let Some(error) = response.get("error") {
                            return Err(MaskfleetError::ControlChannel(format!(
                                "{} failed: {}",
                                method, error
                            )));
                        }
                        return Ok(response
                            .get("result")
                            .cloned()
                            .unwrap_or(serde_json::Value::Null));
                    }
                }
                Ok(_) => continue,
                Err(e) => {
                    return Err(MaskfleetError::ControlChannel(format!(
                        "WebSocket error: {}",
                        e
                    )))
                }
            }
        }

        Err(MaskfleetError::ControlChannel(format!(
            "no response to {}",
            method
        )))
    }

    async fn page_ws_url(&self, page_id: &str) -> Result<String> {
        let pages = self.pages().await?;
        pages
            .into_iter()
            .find(|p| p.id == page_id)
            .and_then(|p| p.web_socket_debugger_url)
            .ok_or_else(|| {
                MaskfleetError::ControlChannel(format!("page {} has no WebSocket URL", page_id))
            })
    }
}

#[async_trait]
impl ControlChannel for CdpChannel {
    fn endpoint(&self) -> String {
        self.browser_ws_url.clone()
    }

    async fn pages(&self) -> Result<Vec<PageInfo>> {
        let url = format!("http://127.0.0.1:{}/json/list", self.debug_port);
        let response = self.client.get(&url).send().await.map_err(|e| {
            MaskfleetError::ControlChannel(format!("failed to list pages: {}", e))
        })?;

        let pages: Vec<PageInfo> = response.json().await.map_err(|e| {
            MaskfleetError::ControlChannel(format!("failed to parse page list: {}", e))
        })?;

        Ok(pages.into_iter().filter(|p| p.page_type == "page").collect())
    }

    async fn register_new_page_script(&self, source: &str) -> Result<()> {
        let (mut ws, _) = connect_async(&self.browser_ws_url).await.map_err(|e| {
            MaskfleetError::ControlChannel(format!("browser WebSocket failed: {}", e))
        })?;

        // Auto-attach with waitForDebuggerOnStart: the browser holds every
        // new page's first document until we release it, so the script is
        // always in place before any page script runs.
        let auto_attach = serde_json::json!({
            "id": 1,
            "method": "Target.setAutoAttach",
            "params": {
                "autoAttach": true,
                "waitForDebuggerOnStart": true,
                "flatten": true
            }
        });
        ws.send(Message::Text(auto_attach.to_string().into()))
            .await
            .map_err(|e| MaskfleetError::ControlChannel(format!("send failed: {}", e)))?;

        let source = source.to_string();

        // Watcher owns the browser socket for the session's lifetime. Each
        // attached page gets the script installed, then gets released.
        tokio::spawn(async move {
            let mut next_id: u64 = 2;
            while let Some(msg) = ws.next().await {
                let Ok(Message::Text(text)) = msg else { continue };
                let Ok(event) = serde_json::from_str::<serde_json::Value>(text.as_str()) else {
                    continue;
                };
                let Some((install, resume)) = attach_commands(&event, &source, next_id) else {
                    continue;
                };
                next_id += 2;
                for cmd in [install, resume] {
                    if let Err(e) = ws.send(Message::Text(cmd.to_string().into())).await {
                        tracing::debug!("target watcher send failed: {}", e);
                        return;
                    }
                }
            }
            tracing::debug!("target watcher ended");
        });

        Ok(())
    }

    async fn apply_to_page(&self, page: &PageInfo, source: &str) -> Result<()> {
        let ws_url = match &page.web_socket_debugger_url {
            Some(url) => url.clone(),
            None => self.page_ws_url(&page.id).await?,
        };

        // Arm future documents of this page, then patch the document that is
        // already loaded.
        Self::send_on(
            &ws_url,
            "Page.addScriptToEvaluateOnNewDocument",
            serde_json::json!({ "source": source }),
        )
        .await?;
        Self::send_on(
            &ws_url,
            "Runtime.evaluate",
            serde_json::json!({ "expression": source }),
        )
        .await?;

        Ok(())
    }

    async fn set_viewport(&self, page: &PageInfo, width: u32, height: u32) -> Result<()> {
        let ws_url = match &page.web_socket_debugger_url {
            Some(url) => url.clone(),
            None => self.page_ws_url(&page.id).await?,
        };
        Self::send_on(
            &ws_url,
            "Emulation.setDeviceMetricsOverride",
            serde_json::json!({
                "width": width,
                "height": height,
                "deviceScaleFactor": 0,
                "mobile": false
            }),
        )
        .await?;
        Ok(())
    }

    async fn set_timezone(&self, page: &PageInfo, timezone: &str) -> Result<()> {
        let ws_url = match &page.web_socket_debugger_url {
            Some(url) => url.clone(),
            None => self.page_ws_url(&page.id).await?,
        };
        Self::send_on(
            &ws_url,
            "Emulation.setTimezoneOverride",
            serde_json::json!({ "timezoneId": timezone }),
        )
        .await?;
        Ok(())
    }

    async fn execute(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        Self::send_on(&self.browser_ws_url, method, params).await
    }

    async fn close_browser(&self) -> Result<()> {
        Self::send_on(&self.browser_ws_url, "Browser.close", serde_json::json!({})).await?;
        Ok(())
    }
}

/// Session commands for one `Target.attachedToTarget` event: install the
/// script in the attached page, then release its held first document.
/// Non-page targets and other events yield nothing.
fn attach_commands(
    event: &serde_json::Value,
    source: &str,
    next_id: u64,
) -> Option<(serde_json::Value, serde_json::Value)> {
    if event.get("method").and_then(|m| m.as_str()) != Some("Target.attachedToTarget") {
        return None;
    }
    let params = event.get("params")?;
    let session_id = params.get("sessionId").and_then(|s| s.as_str())?;
    let target_type = params
        .get("targetInfo")
        .and_then(|i| i.get("type"))
        .and_then(|t| t.as_str());
    if target_type != Some("page") {
        return None;
    }

    let install = serde_json::json!({
        "id": next_id,
        "sessionId": session_id,
        "method": "Page.addScriptToEvaluateOnNewDocument",
        "params": { "source": source }
    });
    let resume = serde_json::json!({
        "id": next_id + 1,
        "sessionId": session_id,
        "method": "Runtime.runIfWaitingForDebugger",
        "params": {}
    });
    Some((install, resume))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attached_page_gets_script_then_release() {
        let event = serde_json::json!({
            "method": "Target.attachedToTarget",
            "params": {
                "sessionId": "SESSION1",
                "waitingForDebugger": true,
                "targetInfo": { "targetId": "T1", "type": "page" }
            }
        });
        let (install, resume) = attach_commands(&event, "void 0;", 2).unwrap();

        assert_eq!(install["method"], "Page.addScriptToEvaluateOnNewDocument");
        assert_eq!(install["sessionId"], "SESSION1");
        assert_eq!(install["params"]["source"], "void 0;");
        assert_eq!(resume["method"], "Runtime.runIfWaitingForDebugger");
        assert_eq!(resume["sessionId"], "SESSION1");
        // The release must be sequenced after the install on the session.
        assert!(install["id"].as_u64().unwrap() < resume["id"].as_u64().unwrap());
    }

    #[test]
    fn non_page_targets_and_other_events_are_ignored() {
        let worker = serde_json::json!({
            "method": "Target.attachedToTarget",
            "params": {
                "sessionId": "S",
                "targetInfo": { "targetId": "W", "type": "service_worker" }
            }
        });
        assert!(attach_commands(&worker, "x", 2).is_none());

        let unrelated = serde_json::json!({
            "method": "Target.targetInfoChanged",
            "params": { "targetInfo": { "type": "page" } }
        });
        assert!(attach_commands(&unrelated, "x", 2).is_none());

        let response = serde_json::json!({ "id": 1, "result": {} });
        assert!(attach_commands(&response, "x", 2).is_none());
    }

    #[test]
    fn page_info_parses_json_list_entry() {
        let raw = r#"{
            "id": "ABC123",
            "title": "New Tab",
            "url": "chrome://newtab/",
            "type": "page",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/ABC123"
        }"#;
        let info: PageInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.id, "ABC123");
        assert_eq!(info.page_type, "page");
        assert!(info.web_socket_debugger_url.unwrap().contains("ABC123"));
    }

    #[test]
    fn page_info_tolerates_missing_optional_fields() {
        let raw = r#"{ "id": "X", "type": "background_page" }"#;
        let info: PageInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.page_type, "background_page");
        assert!(info.web_socket_debugger_url.is_none());
        assert!(info.title.is_empty());
    }

    #[tokio::test]
    async fn pages_fails_cleanly_when_port_is_dead() {
        let channel = CdpChannel::new(19996, "ws://127.0.0.1:19996/devtools/browser/x".into());
        let err = channel.pages().await.unwrap_err();
        assert!(matches!(err, MaskfleetError::ControlChannel(_)));
    }
}
