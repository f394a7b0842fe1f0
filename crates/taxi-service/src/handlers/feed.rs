//! WebSocket change-feed handlers.
//!
//! Each socket gets its own subscription and a filter; events that pass the
//! filter are sent as JSON text frames. Clients treat every frame as a hint
//! to re-read.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;

use crate::auth::AuthDriver;
use crate::error::ApiError;
use crate::feed::{ChangeEvent, FeedSubscription};
use crate::handlers::public::CustomerQuery;
use crate::state::AppState;

/// Trip changes for the authenticated driver.
pub async fn driver_trip_feed(
    State(state): State<Arc<AppState>>,
    auth: AuthDriver,
    ws: WebSocketUpgrade,
) -> Response {
    let subscription = state.feed.subscribe();
    let owner = auth.driver_id;
    ws.on_upgrade(move |socket| {
        forward(socket, subscription, move |event| event.concerns_owner(&owner))
    })
}

/// Trip changes for one customer token.
pub async fn customer_trip_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CustomerQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = query.token()?;
    let subscription = state.feed.subscribe();
    Ok(ws.on_upgrade(move |socket| {
        forward(socket, subscription, move |event| event.concerns_customer(&token))
    }))
}

/// Driver profile changes, for the public driver listing.
pub async fn driver_listing_feed(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    let subscription = state.feed.subscribe();
    ws.on_upgrade(move |socket| {
        forward(socket, subscription, ChangeEvent::concerns_driver_listing)
    })
}

async fn forward<F>(mut socket: WebSocket, mut subscription: FeedSubscription, wants: F)
where
    F: Fn(&ChangeEvent) -> bool + Send + 'static,
{
    loop {
        tokio::select! {
            event = subscription.next() => {
                let Some(event) = event else { break };
                if !wants(&event) {
                    continue;
                }
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode change event");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    tracing::debug!("Feed socket closed");
}
