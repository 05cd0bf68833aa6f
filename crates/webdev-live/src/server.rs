//! HTTP routes for the live reload event stream and its browser client.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_stream::{Stream, StreamExt};

use crate::hub::{LiveHub, Subscription};
use crate::DEFAULT_NAMESPACE;

const CLIENT_SCRIPT: &str = include_str!("../assets/live-reload.js");
const LIVE_PATH_PLACEHOLDER: &str = "__LIVE_PATH__";
const EVENT_STREAM: &str = "text/event-stream";

/// Period of the SSE comment written to spot clients that went away.
const LIVENESS_PERIOD: Duration = Duration::from_secs(1);
const LIVENESS_FRAME: &str = ":\n\n";

/// Paths the live routes are mounted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveRoutes {
    /// Event stream endpoint (`/web-bundler/live`).
    pub live_path: String,
    /// Browser client (`/web-bundler/live-reload.js`).
    pub script_path: String,
}

impl LiveRoutes {
    pub fn for_namespace(namespace: &str) -> Self {
        let namespace = namespace.trim_matches('/');
        Self {
            live_path: format!("/{namespace}/live"),
            script_path: format!("/{namespace}/live-reload.js"),
        }
    }

    pub fn with_live_path(mut self, live_path: impl Into<String>) -> Self {
        self.live_path = live_path.into();
        self
    }
}

impl Default for LiveRoutes {
    fn default() -> Self {
        Self::for_namespace(DEFAULT_NAMESPACE)
    }
}

#[derive(Clone)]
struct LiveState {
    hub: LiveHub,
    script: Arc<str>,
}

/// Router serving the event stream and the client script.
///
/// Merge it into the application router; it carries its own state.
pub fn live_router(hub: LiveHub, routes: &LiveRoutes) -> Router {
    let script: Arc<str> = CLIENT_SCRIPT
        .replace(LIVE_PATH_PLACEHOLDER, &routes.live_path)
        .into();

    Router::new()
        .route(&routes.live_path, get(handle_live))
        .route(&routes.script_path, get(handle_script))
        .with_state(LiveState { hub, script })
}

/// Open an event stream, or answer a plain request with an empty 200.
///
/// - too many sessions: `429`
/// - no `Accept: text/event-stream`: `200` with an empty body
async fn handle_live(State(state): State<LiveState>, headers: HeaderMap) -> Response {
    if state.hub.is_full() {
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }
    if !accepts_event_stream(&headers) {
        return StatusCode::OK.into_response();
    }

    let subscription = match state.hub.open() {
        Ok(subscription) => subscription,
        // Lost the race for the last slot.
        Err(_) => return StatusCode::TOO_MANY_REQUESTS.into_response(),
    };

    let body = Body::from_stream(LiveBody::new(subscription).map(Ok::<_, Infallible>));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, EVENT_STREAM),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response()
}

/// Response body of one session.
///
/// Between events it writes an SSE comment every [`LIVENESS_PERIOD`]. A
/// client that disconnected makes that write fail, which drops the body and
/// with it the [`Subscription`], freeing the slot long before the next ping.
/// Browsers ignore comments. The body ends when the subscription does.
struct LiveBody {
    subscription: Subscription,
    liveness: Interval,
}

impl LiveBody {
    fn new(subscription: Subscription) -> Self {
        let mut liveness =
            tokio::time::interval_at(Instant::now() + LIVENESS_PERIOD, LIVENESS_PERIOD);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            subscription,
            liveness,
        }
    }
}

impl Stream for LiveBody {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Poll::Ready(frame) = Pin::new(&mut self.subscription).poll_next(cx) {
            return Poll::Ready(frame);
        }
        match self.liveness.poll_tick(cx) {
            Poll::Ready(_) => Poll::Ready(Some(LIVENESS_FRAME.to_string())),
            Poll::Pending => Poll::Pending,
        }
    }
}

async fn handle_script(State(state): State<LiveState>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        state.script.to_string(),
    )
}

/// True when one of the `Accept` media ranges is `text/event-stream`.
fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|range| range.split(';').next())
        .any(|media| media.trim().eq_ignore_ascii_case(EVENT_STREAM))
}
