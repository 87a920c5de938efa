// src/server/proxy.rs

use std::convert::Infallible;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, StatusCode, Uri, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use super::{CLIENT_PATH, EVENTS_PATH, ReloadHub};
use crate::errors::{PipelineError, Result};

/// Upper bound on buffered request bodies.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

const CLIENT_JS: &str = r#"(function () {
  if (!window.EventSource) { return; }
  var source = new EventSource('/__assetpipe/events');
  source.addEventListener('reload', function () {
    window.location.reload();
  });
})();
"#;

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Clone)]
struct ProxyState {
    client: reqwest::Client,
    upstream: reqwest::Url,
    hub: ReloadHub,
}

pub fn router(upstream: reqwest::Url, hub: ReloadHub) -> Result<Router> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| PipelineError::Server(format!("building HTTP client: {e}")))?;

    let state = ProxyState {
        client,
        upstream,
        hub,
    };

    Ok(Router::new()
        .route(EVENTS_PATH, get(reload_events))
        .route(CLIENT_PATH, get(client_script))
        .fallback(forward)
        .with_state(state))
}

/// The `<script>` tag injected into proxied pages.
pub fn client_tag() -> String {
    format!(r#"<script src="{CLIENT_PATH}" async></script>"#)
}

/// Insert the reload client before the last `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    let tag = client_tag();
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..idx]);
            out.push_str(&tag);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_JS,
    )
}

async fn reload_events(
    State(state): State<ProxyState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    debug!("browser subscribed to reload events");
    let stream = BroadcastStream::new(state.hub.subscribe()).filter_map(|msg| match msg {
        Ok(reason) => Some(Ok(Event::default().event("reload").data(reason))),
        // A lagging browser only needs one reload anyway.
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// `uri` resolved below the upstream's own path, so a `site_url` such as
/// `http://host/site/` keeps its prefix.
fn upstream_url(upstream: &reqwest::Url, uri: &Uri) -> reqwest::Url {
    let mut url = upstream.clone();
    let prefix = upstream.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}{}", uri.path()));
    url.set_query(uri.query());
    url
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

fn forwarded_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        // Bodies are rewritten, so ask the upstream for identity encoding.
        if is_hop_by_hop(name) || *name == header::HOST || *name == header::ACCEPT_ENCODING {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

async fn forward(State(state): State<ProxyState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    let url = upstream_url(&state.upstream, &parts.uri);

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %parts.uri, error = %e, "could not read request body");
            return (StatusCode::BAD_REQUEST, "unreadable request body").into_response();
        }
    };

    debug!(method = %parts.method, url = %url, "forwarding request");
    let upstream = state
        .client
        .request(parts.method.clone(), url.clone())
        .headers(forwarded_request_headers(&parts.headers))
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(resp) => resp,
        Err(e) => {
            warn!(url = %url, error = %e, "upstream request failed");
            return (
                StatusCode::BAD_GATEWAY,
                format!("upstream {} unavailable: {e}", state.upstream),
            )
                .into_response();
        }
    };

    let status = upstream.status();
    let headers = upstream.headers().clone();
    let is_html = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));

    let bytes = match upstream.bytes().await {
        Ok(b) => b,
        Err(e) => {
            warn!(url = %url, error = %e, "reading upstream response failed");
            return (StatusCode::BAD_GATEWAY, "upstream response interrupted").into_response();
        }
    };

    let body = if is_html {
        Body::from(inject_client(&String::from_utf8_lossy(&bytes)))
    } else {
        Body::from(bytes)
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    for (name, value) in &headers {
        if is_hop_by_hop(name) || *name == header::CONTENT_LENGTH {
            continue;
        }
        response.headers_mut().append(name.clone(), value.clone());
    }
    response
}
