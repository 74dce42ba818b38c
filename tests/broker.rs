use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex as ParkingMutex;
use shadowscope::broker::{
    BusMessage, EventBroker, HandlerError, MemoryBroker, TOPIC_ALERTS, TOPIC_TRAFFIC, TopicHandler,
};
use shadowscope::flow::{FlowEvent, Protocol};

/// Test handler capturing every delivered message.
#[derive(Clone, Default)]
struct RecordingHandler {
    messages: Arc<ParkingMutex<Vec<BusMessage>>>,
}

impl RecordingHandler {
    fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Vec<BusMessage> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl TopicHandler for RecordingHandler {
    async fn handle(&self, message: BusMessage) -> Result<(), HandlerError> {
        self.messages.lock().push(message);
        Ok(())
    }

    fn name(&self) -> String {
        "recording".to_string()
    }
}

/// Handler that fails on every message but counts deliveries.
struct FailingHandler {
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl TopicHandler for FailingHandler {
    async fn handle(&self, _message: BusMessage) -> Result<(), HandlerError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(HandlerError::other("boom"))
    }
}

fn traffic_event(port: u16) -> FlowEvent {
    FlowEvent::new("192.168.1.10", 40000, "1.2.3.4", port, Protocol::Tcp)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

#[tokio::test]
async fn delivers_in_publish_order_per_subscriber() {
    let broker = MemoryBroker::new();
    let handler = RecordingHandler::new();
    broker
        .subscribe(TOPIC_TRAFFIC, Arc::new(handler.clone()))
        .await
        .unwrap();
    broker.start().await.unwrap();

    for port in 1000..1020 {
        broker
            .publish(TOPIC_TRAFFIC, BusMessage::flow(traffic_event(port)))
            .await
            .unwrap();
    }
    settle().await;
    broker.stop().await.unwrap();

    let received = handler.snapshot();
    assert_eq!(received.len(), 20);
    for (idx, message) in received.iter().enumerate() {
        let BusMessage::Flow(payload) = message else {
            panic!("expected flow message, got {message:?}");
        };
        let event = payload.clone().into_event().unwrap();
        assert_eq!(event.destination_port, 1000 + idx as u16);
    }
}

#[tokio::test]
async fn each_message_delivered_at_most_once_per_subscriber() {
    let broker = MemoryBroker::new();
    let first = RecordingHandler::new();
    let second = RecordingHandler::new();
    broker
        .subscribe(TOPIC_TRAFFIC, Arc::new(first.clone()))
        .await
        .unwrap();
    broker
        .subscribe(TOPIC_TRAFFIC, Arc::new(second.clone()))
        .await
        .unwrap();
    broker.start().await.unwrap();

    broker
        .publish(TOPIC_TRAFFIC, BusMessage::flow(traffic_event(443)))
        .await
        .unwrap();
    settle().await;
    broker.stop().await.unwrap();

    assert_eq!(first.snapshot().len(), 1);
    assert_eq!(second.snapshot().len(), 1);
}

#[tokio::test]
async fn failing_handler_is_skipped_without_redelivery() {
    let broker = MemoryBroker::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let healthy = RecordingHandler::new();
    broker
        .subscribe(
            TOPIC_TRAFFIC,
            Arc::new(FailingHandler {
                attempts: Arc::clone(&attempts),
            }),
        )
        .await
        .unwrap();
    broker
        .subscribe(TOPIC_TRAFFIC, Arc::new(healthy.clone()))
        .await
        .unwrap();
    broker.start().await.unwrap();

    broker
        .publish(TOPIC_TRAFFIC, BusMessage::flow(traffic_event(22)))
        .await
        .unwrap();
    broker
        .publish(TOPIC_TRAFFIC, BusMessage::flow(traffic_event(23)))
        .await
        .unwrap();
    settle().await;
    broker.stop().await.unwrap();

    // One attempt per message, no retries, and the healthy subscriber saw
    // everything despite its neighbor failing.
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(healthy.snapshot().len(), 2);
}

#[tokio::test]
async fn publishes_before_start_are_buffered_not_lost() {
    let broker = MemoryBroker::new();
    let handler = RecordingHandler::new();
    broker
        .subscribe(TOPIC_TRAFFIC, Arc::new(handler.clone()))
        .await
        .unwrap();

    broker
        .publish(TOPIC_TRAFFIC, BusMessage::flow(traffic_event(8080)))
        .await
        .unwrap();
    assert_eq!(broker.backlog(TOPIC_TRAFFIC), 1);

    broker.start().await.unwrap();
    settle().await;
    broker.stop().await.unwrap();

    assert_eq!(handler.snapshot().len(), 1);
}

#[tokio::test]
async fn topics_are_isolated() {
    let broker = MemoryBroker::new();
    let traffic = RecordingHandler::new();
    let alerts = RecordingHandler::new();
    broker
        .subscribe(TOPIC_TRAFFIC, Arc::new(traffic.clone()))
        .await
        .unwrap();
    broker
        .subscribe(TOPIC_ALERTS, Arc::new(alerts.clone()))
        .await
        .unwrap();
    broker.start().await.unwrap();

    broker
        .publish(TOPIC_TRAFFIC, BusMessage::flow(traffic_event(443)))
        .await
        .unwrap();
    settle().await;
    broker.stop().await.unwrap();

    assert_eq!(traffic.snapshot().len(), 1);
    assert!(alerts.snapshot().is_empty());
}

#[tokio::test]
async fn subscribe_while_running_receives_future_publishes() {
    let broker = MemoryBroker::new();
    broker.start().await.unwrap();

    broker
        .publish(TOPIC_TRAFFIC, BusMessage::flow(traffic_event(1)))
        .await
        .unwrap();
    settle().await;

    let late = RecordingHandler::new();
    broker
        .subscribe(TOPIC_TRAFFIC, Arc::new(late.clone()))
        .await
        .unwrap();
    broker
        .publish(TOPIC_TRAFFIC, BusMessage::flow(traffic_event(2)))
        .await
        .unwrap();
    settle().await;
    broker.stop().await.unwrap();

    // Only the publish that happened after subscription is delivered.
    let received = late.snapshot();
    assert_eq!(received.len(), 1);
    let BusMessage::Flow(payload) = &received[0] else {
        panic!("expected flow message");
    };
    assert_eq!(payload.clone().into_event().unwrap().destination_port, 2);
}

#[tokio::test]
async fn stop_drains_buffered_messages() {
    let broker = MemoryBroker::new();
    let handler = RecordingHandler::new();
    broker
        .subscribe(TOPIC_TRAFFIC, Arc::new(handler.clone()))
        .await
        .unwrap();
    broker.start().await.unwrap();

    for port in 0..50 {
        broker
            .publish(TOPIC_TRAFFIC, BusMessage::flow(traffic_event(port)))
            .await
            .unwrap();
    }
    // Stop immediately; the drain pass should still flush the queue.
    broker.stop().await.unwrap();

    assert_eq!(handler.snapshot().len(), 50);
}

#[tokio::test]
async fn restart_cycle_keeps_working() {
    let broker = MemoryBroker::new();
    let handler = RecordingHandler::new();
    broker
        .subscribe(TOPIC_TRAFFIC, Arc::new(handler.clone()))
        .await
        .unwrap();

    broker.start().await.unwrap();
    broker
        .publish(TOPIC_TRAFFIC, BusMessage::flow(traffic_event(1)))
        .await
        .unwrap();
    settle().await;
    broker.stop().await.unwrap();

    broker.start().await.unwrap();
    broker
        .publish(TOPIC_TRAFFIC, BusMessage::flow(traffic_event(2)))
        .await
        .unwrap();
    settle().await;
    broker.stop().await.unwrap();

    assert_eq!(handler.snapshot().len(), 2);
}

#[tokio::test]
async fn double_start_and_stop_are_idempotent() {
    let broker = MemoryBroker::new();
    broker.start().await.unwrap();
    broker.start().await.unwrap();
    broker.stop().await.unwrap();
    broker.stop().await.unwrap();
}

#[test]
fn bus_message_round_trips_through_json() {
    let event = traffic_event(443)
        .with_metadata("host", "chatgpt.com")
        .with_metadata("ja3_hash", "cd08e31494f9531f560d64c695473da9")
        .with_bytes(2048, 512)
        .with_payload("GET / HTTP/1.1");
    let message = BusMessage::flow(event);

    let json = serde_json::to_string(&message).unwrap();
    let decoded: BusMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, message);

    // Protocol enums cross the wire as stable strings, never ordinals.
    assert!(json.contains("\"protocol\":\"TCP\""));
}
