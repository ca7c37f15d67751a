/*
[INPUT]:  Raw frames read from the connection
[OUTPUT]: Decoded events handed to the registry, everything else logged
[POS]:    WebSocket layer - inbound frame routing
[UPDATE]: When adding frame kinds or changing decode logging
*/

use std::sync::Arc;
use std::time::Duration;

use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::ws::message::InboundMessage;
use crate::ws::registry::SubscriptionRegistry;

const RAW_LOG_MAX_BYTES: usize = 1024;

/// Route one frame. Text frames are decoded on their own task so a slow
/// decode never stalls the read loop.
pub(crate) fn route_frame(
    frame: Message,
    registry: &Arc<SubscriptionRegistry>,
    delivery_timeout: Duration,
) {
    match frame {
        Message::Text(text) => {
            let registry = Arc::clone(registry);
            tokio::spawn(async move {
                handle_text(text.as_str(), &registry, delivery_timeout);
            });
        }
        Message::Binary(bytes) => {
            debug!(bytes = bytes.len(), "ws binary frame ignored");
        }
        Message::Ping(_) | Message::Pong(_) => {
            debug!("ws control frame ignored");
        }
        Message::Close(frame) => {
            info!(frame = ?frame, "ws close frame received");
        }
        Message::Frame(_) => {
            debug!("ws raw frame ignored");
        }
    }
}

/// Decode a text frame and deliver it. Returns the number of deliveries scheduled.
pub(crate) fn handle_text(
    text: &str,
    registry: &SubscriptionRegistry,
    delivery_timeout: Duration,
) -> usize {
    match InboundMessage::parse(text) {
        Ok(InboundMessage::Welcome(_)) => {
            info!("ws welcome received");
            0
        }
        Ok(InboundMessage::Error(data)) => {
            error!(data = %data, "ws server error");
            0
        }
        Ok(InboundMessage::Unrecognized { tag, .. }) => {
            error!(tag = %tag, "ws message type unrecognized");
            debug!(message = %truncate_for_log(text, RAW_LOG_MAX_BYTES), "ws message type unrecognized");
            0
        }
        Ok(InboundMessage::Event(event)) => registry.fan_out(event, delivery_timeout),
        Err(err) => {
            warn!(error = %err, bytes = text.len(), "ws message parse failed");
            debug!(
                error = %err,
                message = %truncate_for_log(text, RAW_LOG_MAX_BYTES),
                "ws message parse failed"
            );
            0
        }
    }
}

pub(crate) fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::message::{Category, WsEvent};
    use tokio::sync::mpsc::error::TryRecvError;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn test_control_and_unknown_frames_schedule_nothing() {
        let registry = SubscriptionRegistry::new(8);
        let mut receivers: Vec<_> = Category::ALL
            .iter()
            .map(|category| registry.new_channel(*category))
            .collect();

        for text in [
            r#"{"type":"WELCOME","data":null}"#,
            r#"{"type":"ERROR","data":{"message":"bad key"}}"#,
            r#"{"type":"FOO_DATA","data":{}}"#,
            r#"{"type":42,"data":{}}"#,
            "not json",
        ] {
            assert_eq!(handle_text(text, &registry, TIMEOUT), 0, "{text}");
        }

        tokio::task::yield_now().await;
        for receiver in &mut receivers {
            assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
        }
    }

    #[tokio::test]
    async fn test_price_frame_is_delivered() {
        let registry = SubscriptionRegistry::new(8);
        let mut receiver = registry.new_channel(Category::Price);
        let text = r#"{"type":"PRICE_DATA","data":{"o":1.0,"h":2.0,"l":0.5,"c":1.5,"eventType":"ohlcv","type":"1m","unixTime":1700000000,"v":10.0,"symbol":"SOL","address":"X"}}"#;

        assert_eq!(handle_text(text, &registry, TIMEOUT), 1);
        match receiver.recv().await {
            Some(WsEvent::Price(price)) => {
                assert_eq!(price.c, 1.5);
                assert_eq!(price.symbol, "SOL");
            }
            other => panic!("Expected price event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_route_frame_ignores_non_text() {
        let registry = Arc::new(SubscriptionRegistry::new(8));
        let mut receiver = registry.new_channel(Category::Price);

        route_frame(Message::binary(vec![1u8, 2, 3]), &registry, TIMEOUT);
        route_frame(Message::Ping(Default::default()), &registry, TIMEOUT);
        route_frame(Message::Close(None), &registry, TIMEOUT);

        tokio::task::yield_now().await;
        assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("abcdef", 3), "abc...");
        assert_eq!(truncate_for_log("ééé", 3), "é...");
    }
}
