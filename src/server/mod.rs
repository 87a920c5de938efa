// src/server/mod.rs

//! Local development server.
//!
//! Proxies the site's real origin and injects a small client that reloads the
//! page whenever a watch-triggered run produces new output.
//!
//! - [`proxy`] builds the axum router (forwarding, script injection, SSE).
//! - [`browser`] opens the proxied site in the default browser.

pub mod browser;
pub mod proxy;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::errors::{PipelineError, Result};

/// Server-sent reload events.
pub const EVENTS_PATH: &str = "/__assetpipe/events";
pub const CLIENT_PATH: &str = "/__assetpipe/client.js";

/// Fan-out of reload notifications to every connected browser.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<String>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Ask connected browsers to reload. Returns how many were notified.
    pub fn reload(&self, reason: impl Into<String>) -> usize {
        let reason = reason.into();
        match self.tx.send(reason.clone()) {
            Ok(n) => {
                info!(reason = %reason, browsers = n, "reloading browsers");
                n
            }
            Err(_) => {
                debug!(reason = %reason, "no browsers connected; nothing to reload");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

/// Reverse proxy in front of the site's upstream origin.
#[derive(Debug, Clone)]
pub struct ProxyServer {
    upstream: reqwest::Url,
    port: u16,
    hub: ReloadHub,
}

/// A started server.
#[derive(Debug)]
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub handle: JoinHandle<()>,
}

impl RunningProxy {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl ProxyServer {
    /// `port` 0 picks a free port.
    pub fn new(upstream: &str, port: u16, hub: ReloadHub) -> Result<Self> {
        let upstream = reqwest::Url::parse(upstream)
            .map_err(|e| PipelineError::Server(format!("invalid upstream url {upstream:?}: {e}")))?;
        Ok(Self {
            upstream,
            port,
            hub,
        })
    }

    /// Bind to `127.0.0.1:<port>` and serve in the background.
    pub async fn start(self, open_browser: bool) -> Result<RunningProxy> {
        let listener = TcpListener::bind(("127.0.0.1", self.port))
            .await
            .map_err(|e| PipelineError::Server(format!("binding port {}: {e}", self.port)))?;
        let addr = listener.local_addr()?;

        let app = proxy::router(self.upstream.clone(), self.hub.clone())?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "proxy server stopped");
            }
        });

        let running = RunningProxy { addr, handle };
        info!(
            local = %running.url(),
            upstream = %self.upstream,
            "proxy server listening"
        );

        if open_browser {
            browser::open(&running.url());
        }
        Ok(running)
    }
}
