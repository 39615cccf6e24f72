//! `WebSocket` upgrade handler for live update streaming.
//!
//! Viewers connect to `GET /ws?lastMod=<hex nanos>`. Each accepted
//! connection becomes one session (see [`crate::session`]) that streams
//! poll results until either side goes away. An absent, repeated or
//! unreadable `lastMod` never blocks the upgrade; the first value wins and
//! anything unparseable falls back to the zero timestamp.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::session::handle_session;
use crate::state::AppState;

/// Query parameter carrying the hex nanosecond timestamp of the viewer's
/// last update.
pub const LAST_MOD_PARAM: &str = "lastMod";

/// Raw `key=value` pairs of the upgrade request, in order.
pub type UpgradeQuery = Vec<(String, String)>;

/// First `lastMod` value of the upgrade query, if any.
pub fn last_mod_param(query: Result<Query<UpgradeQuery>, QueryRejection>) -> Option<String> {
    match query {
        Ok(Query(pairs)) => pairs
            .into_iter()
            .find(|(key, _)| key == LAST_MOD_PARAM)
            .map(|(_, value)| value),
        Err(rejection) => {
            debug!(error = %rejection, "Ignoring unreadable upgrade query");
            None
        }
    }
}

/// Upgrade an HTTP request to a `WebSocket` connection and start a
/// session.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_updates(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    query: Result<Query<UpgradeQuery>, QueryRejection>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => {
            // A plain HTTP request hitting the socket URL is routine; a
            // handshake the server cannot complete is not.
            if matches!(rejection, WebSocketUpgradeRejection::ConnectionNotUpgradable(_)) {
                warn!(error = %rejection, "WebSocket upgrade rejected");
            } else {
                debug!(error = %rejection, "Not a WebSocket handshake");
            }
            return rejection.into_response();
        }
    };

    let last_mod = last_mod_param(query);
    let poller = state.poller.clone();
    let timings = state.timings;
    ws.max_message_size(timings.max_message_size())
        .on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| async move {
            handle_session(socket, poller, timings, last_mod).await;
        })
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::extract::FromRequestParts;
    use axum::http::Request;

    use super::*;

    async fn extract(uri: &str) -> Option<String> {
        let (mut parts, ()) = Request::get(uri).body(()).unwrap().into_parts();
        let query = Query::<UpgradeQuery>::from_request_parts(&mut parts, &()).await;
        last_mod_param(query)
    }

    #[tokio::test]
    async fn first_last_mod_wins() {
        assert_eq!(extract("/ws?lastMod=1&lastMod=2").await.as_deref(), Some("1"));
        assert_eq!(extract("/ws?x=y&lastMod=ff").await.as_deref(), Some("ff"));
    }

    #[tokio::test]
    async fn absent_last_mod_is_none() {
        assert_eq!(extract("/ws").await, None);
        assert_eq!(extract("/ws?other=1").await, None);
    }

    #[tokio::test]
    async fn garbage_value_is_passed_through_for_parsing() {
        assert_eq!(extract("/ws?lastMod=zz").await.as_deref(), Some("zz"));
    }
}
