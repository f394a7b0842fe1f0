//! Change-feed sockets.
//!
//! The service pushes [`FeedEvent`]s as JSON text frames. A feed ends when
//! the socket closes or errors; callers fall back to polling from there.

use futures::stream::BoxStream;
use futures::{future, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use crate::error::ClientError;
use crate::types::FeedEvent;

/// Events from one feed socket, ending when the socket does.
pub type FeedStream = BoxStream<'static, FeedEvent>;

/// Open a feed socket at `url` (`ws://` or `wss://`).
pub(crate) async fn open(url: &str) -> Result<FeedStream, ClientError> {
    let (socket, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| ClientError::WebSocket(Box::new(e)))?;
    tracing::debug!(url, "Feed socket opened");

    let events = socket
        .take_while(|message| future::ready(matches!(message, Ok(m) if !m.is_close())))
        .filter_map(|message| future::ready(message.ok().and_then(decode)))
        .boxed();

    Ok(events)
}

fn decode(message: Message) -> Option<FeedEvent> {
    let Message::Text(text) = message else {
        return None;
    };
    match serde_json::from_str(&text) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping unreadable feed frame");
            None
        }
    }
}

/// Turn an HTTP base URL into its WebSocket counterpart.
pub(crate) fn socket_base(base_url: &str) -> Result<String, ClientError> {
    if let Some(rest) = base_url.strip_prefix("https://") {
        Ok(format!("wss://{rest}"))
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        Ok(format!("ws://{rest}"))
    } else {
        Err(ClientError::Configuration(format!(
            "base URL must be http(s): {base_url}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_base_swaps_scheme() {
        assert_eq!(socket_base("http://localhost:8080").unwrap(), "ws://localhost:8080");
        assert_eq!(socket_base("https://taxi.test").unwrap(), "wss://taxi.test");
        assert!(matches!(
            socket_base("ftp://taxi.test"),
            Err(ClientError::Configuration(_))
        ));
    }

    #[test]
    fn decodes_text_frames_only() {
        let resync = decode(Message::Text(r#"{"kind":"resync"}"#.into()));
        assert_eq!(resync, Some(FeedEvent::Resync));

        let driver = decode(Message::Text(
            r#"{"kind":"driver","owner_id":"6f9619ff-8b86-d011-b42d-00c04fc964ff","available":true}"#
                .into(),
        ));
        assert!(matches!(driver, Some(FeedEvent::Driver { available: true, .. })));

        assert_eq!(decode(Message::Text("not json".into())), None);
        assert_eq!(decode(Message::Ping(vec![1])), None);
    }
}
