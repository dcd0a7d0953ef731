//! Proxy broker boundary.
//!
//! A [`ProxyBroker`] turns proxy credentials into a connectable endpoint the
//! launched browser can be pointed at. When credentials are present the
//! returned endpoint is a local forwarder that injects authentication
//! upstream, so usernames and passwords never reach the browser's argv, the
//! process table, or any log line.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{MaskfleetError, Result};

/// Proxy assignment for one profile. `Display` redacts credentials so the
/// struct can be logged safely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxySettings {
    /// host:port, optionally scheme-prefixed
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProxySettings {
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }

    /// host:port with any scheme prefix stripped.
    pub fn host_port(&self) -> &str {
        self.server
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.server)
    }
}

impl fmt::Display for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_credentials() {
            write!(f, "{} (authenticated)", self.server)
        } else {
            write!(f, "{}", self.server)
        }
    }
}

/// A resolved proxy endpoint plus whatever is backing it. For a forwarded
/// endpoint the lease owns the forwarder task; dropping the lease aborts it,
/// so closing a session also closes its loopback listener.
#[derive(Debug)]
pub struct ProxyLease {
    endpoint: String,
    forwarder: Option<tokio::task::JoinHandle<()>>,
}

impl ProxyLease {
    /// Endpoint that needs nothing running behind it.
    pub fn passthrough(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            forwarder: None,
        }
    }

    /// Endpoint suitable for a browser `--proxy-server` flag.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Drop for ProxyLease {
    fn drop(&mut self) {
        if let Some(task) = self.forwarder.take() {
            task.abort();
        }
    }
}

impl fmt::Display for ProxyLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)
    }
}

/// External collaborator boundary: resolve proxy credentials into a leased
/// endpoint the launched browser can be pointed at.
#[async_trait]
pub trait ProxyBroker: Send + Sync {
    async fn resolve(&self, proxy: &ProxySettings) -> Result<ProxyLease>;
}

/// Default broker. Credential-less proxies pass through unchanged; for
/// authenticated proxies it stands up a loopback TCP forwarder that injects
/// a Proxy-Authorization header into each tunneled HTTP request.
pub struct LocalForwarder;

#[async_trait]
impl ProxyBroker for LocalForwarder {
    async fn resolve(&self, proxy: &ProxySettings) -> Result<ProxyLease> {
        if !proxy.has_credentials() {
            return Ok(ProxyLease::passthrough(proxy.server.clone()));
        }

        let upstream = proxy.host_port().to_string();
        let auth = basic_auth_header(
            proxy.username.as_deref().unwrap_or(""),
            proxy.password.as_deref().unwrap_or(""),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.map_err(|e| {
            MaskfleetError::ProxyResolutionFailed(format!("cannot bind local forwarder: {}", e))
        })?;
        let local_addr = listener.local_addr().map_err(|e| {
            MaskfleetError::ProxyResolutionFailed(format!("no local address: {}", e))
        })?;

        // Fail launch up front if the upstream proxy is unreachable, rather
        // than letting every browser request die later.
        TcpStream::connect(&upstream).await.map_err(|e| {
            MaskfleetError::ProxyResolutionFailed(format!(
                "upstream proxy {} unreachable: {}",
                upstream, e
            ))
        })?;

        let auth = Arc::new(auth);
        let upstream = Arc::new(upstream);
        let accept_loop = tokio::spawn(async move {
            loop {
                let (client, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::debug!("forwarder accept failed: {}", e);
                        break;
                    }
                };
                let auth = Arc::clone(&auth);
                let upstream = Arc::clone(&upstream);
                tokio::spawn(async move {
                    if let Err(e) = forward(client, &upstream, &auth).await {
                        tracing::debug!("forwarder connection ended: {}", e);
                    }
                });
            }
        });

        tracing::debug!(port = local_addr.port(), "local proxy forwarder ready");
        Ok(ProxyLease {
            endpoint: format!("http://{}", local_addr),
            forwarder: Some(accept_loop),
        })
    }
}

fn basic_auth_header(username: &str, password: &str) -> String {
    let token =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
    format!("Proxy-Authorization: Basic {}", token)
}

/// Pipe one client connection to the upstream proxy, injecting the auth
/// header into the first request's header block.
async fn forward(mut client: TcpStream, upstream: &str, auth_header: &str) -> Result<()> {
    let mut server = TcpStream::connect(upstream).await?;

    let mut first = vec![0u8; 16 * 1024];
    let n = client.read(&mut first).await?;
    if n == 0 {
        return Ok(());
    }
    first.truncate(n);

    let patched = inject_header(&first, auth_header);
    server.write_all(&patched).await?;

    tokio::io::copy_bidirectional(&mut client, &mut server).await?;
    Ok(())
}

/// Insert the header before the end of the first header block. Requests
/// without a recognizable header block pass through untouched.
fn inject_header(request: &[u8], header: &str) -> Vec<u8> {
    match request.windows(4).position(|w| w == b"\r\n\r\n") {
        Some(pos) => {
            let mut out = Vec::with_capacity(request.len() + header.len() + 2);
            out.extend_from_slice(&request[..pos]);
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(header.as_bytes());
            out.extend_from_slice(&request[pos..]);
            out
        }
        None => request.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authed() -> ProxySettings {
        ProxySettings {
            server: "http://proxy.example.com:8080".to_string(),
            username: Some("alice".to_string()),
            password: Some("hunter2".to_string()),
        }
    }

    #[test]
    fn display_never_contains_credentials() {
        let proxy = authed();
        let shown = proxy.to_string();
        assert!(!shown.contains("alice"));
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("proxy.example.com"));
    }

    #[test]
    fn host_port_strips_scheme() {
        assert_eq!(authed().host_port(), "proxy.example.com:8080");
        let bare = ProxySettings {
            server: "10.1.2.3:3128".to_string(),
            username: None,
            password: None,
        };
        assert_eq!(bare.host_port(), "10.1.2.3:3128");
    }

    #[test]
    fn inject_header_places_auth_before_terminator() {
        let req = b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n";
        let out = inject_header(req, "Proxy-Authorization: Basic abc");
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Proxy-Authorization: Basic abc\r\n\r\n"));
        assert!(text.starts_with("CONNECT example.com:443"));
    }

    #[test]
    fn inject_header_passes_through_non_http() {
        let raw = b"\x16\x03\x01\x02\x00";
        assert_eq!(inject_header(raw, "X: y"), raw.to_vec());
    }

    #[tokio::test]
    async fn credential_less_proxy_passes_through() {
        let proxy = ProxySettings {
            server: "http://203.0.113.1:3128".to_string(),
            username: None,
            password: None,
        };
        let lease = LocalForwarder.resolve(&proxy).await.unwrap();
        assert_eq!(lease.endpoint(), "http://203.0.113.1:3128");
    }

    #[tokio::test]
    async fn unreachable_authenticated_proxy_fails_resolution() {
        let proxy = ProxySettings {
            // Nothing listens here.
            server: "127.0.0.1:1".to_string(),
            username: Some("u".to_string()),
            password: Some("p".to_string()),
        };
        let err = LocalForwarder.resolve(&proxy).await.unwrap_err();
        assert!(matches!(err, MaskfleetError::ProxyResolutionFailed(_)));
    }

    #[tokio::test]
    async fn authenticated_proxy_yields_loopback_endpoint() {
        // Stand in for the upstream proxy with a plain listener.
        let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = upstream.accept().await else { break };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = sock.read(&mut buf).await.unwrap_or(0);
                    // Echo back what we saw so the test can assert on it.
                    let _ = sock.write_all(&buf[..n]).await;
                });
            }
        });

        let proxy = ProxySettings {
            server: format!("http://{}", upstream_addr),
            username: Some("alice".to_string()),
            password: Some("hunter2".to_string()),
        };
        let lease = LocalForwarder.resolve(&proxy).await.unwrap();
        assert!(lease.endpoint().starts_with("http://127.0.0.1:"));
        assert!(!lease.endpoint().contains("alice"));

        // Connect through the forwarder and verify the auth header arrives.
        let addr = lease.endpoint().trim_start_matches("http://").to_string();
        let mut conn = TcpStream::connect(&addr).await.unwrap();
        conn.write_all(b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n")
            .await
            .unwrap();
        let mut buf = vec![0u8; 4096];
        let n = conn.read(&mut buf).await.unwrap();
        let echoed = String::from_utf8_lossy(&buf[..n]).to_string();
        assert!(echoed.contains("Proxy-Authorization: Basic"));
    }

    #[tokio::test]
    async fn dropping_the_lease_stops_the_forwarder() {
        let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok(_pair) = upstream.accept().await else { break };
            }
        });

        let proxy = ProxySettings {
            server: format!("http://{}", upstream_addr),
            username: Some("u".to_string()),
            password: Some("p".to_string()),
        };
        let lease = LocalForwarder.resolve(&proxy).await.unwrap();
        let addr = lease.endpoint().trim_start_matches("http://").to_string();

        // Listening while held.
        assert!(TcpStream::connect(&addr).await.is_ok());

        drop(lease);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // Gone once released.
        assert!(TcpStream::connect(&addr).await.is_err());
    }
}
