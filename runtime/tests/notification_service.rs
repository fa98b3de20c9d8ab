//! Integration tests for the in-memory notification service
//!
//! Exercises registration, fan-out, isolation of failed connections and
//! targeted delivery through the public service API, using mock transports.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use bankadmin_core::{
    AdminId, CancellationToken, Clock, Connection, Notification, NotificationError,
    NotificationProducer, NotificationService, NotificationType, Severity,
};
use bankadmin_runtime::InMemoryNotificationService;
use bankadmin_testing::{init_tracing, test_clock, MockTransport, TransportProbe};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_millis(200);
const SILENCE: Duration = Duration::from_millis(50);

// ============================================================================
// Test Fixtures
// ============================================================================

fn service() -> Arc<InMemoryNotificationService> {
    init_tracing();
    Arc::new(InMemoryNotificationService::new(Arc::new(test_clock())))
}

fn admin(name: &str) -> AdminId {
    AdminId::new(name).unwrap()
}

fn alert(title: &str) -> Notification {
    Notification::new(&test_clock(), NotificationType::Alert, title, "body")
}

/// Subscribe a fresh mock connection and consume its welcome.
async fn connect(
    service: &InMemoryNotificationService,
    admin_id: &AdminId,
) -> (Arc<Connection>, TransportProbe) {
    let (transport, mut probe) = MockTransport::new();
    let connection = Arc::new(Connection::new(
        admin_id.clone(),
        Box::new(transport),
        Duration::from_secs(1),
    ));
    service
        .subscribe(admin_id, Arc::clone(&connection))
        .await
        .expect("subscribe");
    let welcome = probe.next_notification(WAIT).await.expect("welcome");
    assert_eq!(welcome.title, "Connected");
    (connection, probe)
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_concurrent_subscribe_and_unsubscribe_balance() {
    let service = service();

    let mut handles = Vec::new();
    for i in 0..50 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let admin_id = admin(&format!("admin-{}", i % 5));
            let (connection, _probe) = connect(&service, &admin_id).await;
            if i % 2 == 0 {
                service.unsubscribe(&admin_id, &connection).await;
            }
            connection
        }));
    }

    let mut kept = Vec::new();
    for handle in handles {
        kept.push(handle.await.unwrap());
    }

    assert_eq!(service.connection_count().await, 25);

    for connection in &kept {
        service.unsubscribe(connection.admin_id(), connection).await;
    }
    assert_eq!(service.connection_count().await, 0);
    assert_eq!(service.admin_count().await, 0);
}

#[tokio::test]
async fn test_unsubscribe_removes_only_that_instance() {
    let service = service();
    let alice = admin("alice");
    let (laptop, mut laptop_probe) = connect(&service, &alice).await;
    let (_phone, mut phone_probe) = connect(&service, &alice).await;

    service.unsubscribe(&alice, &laptop).await;
    service.unsubscribe(&alice, &laptop).await;
    assert_eq!(service.connection_count().await, 1);

    service
        .send_to_admin(&CancellationToken::new(), &alice, &alert("after"))
        .await
        .unwrap();

    assert_eq!(phone_probe.next_notification(WAIT).await.unwrap().title, "after");
    assert!(laptop_probe.stays_silent(SILENCE).await);
}

#[tokio::test]
async fn test_welcome_precedes_any_broadcast() {
    let service = service();
    let producer = Arc::clone(&service);
    let cancel = CancellationToken::new();
    let flood_cancel = cancel.clone();

    let flood = tokio::spawn(async move {
        while !flood_cancel.is_cancelled() {
            producer
                .broadcast(&CancellationToken::new(), &alert("flood"))
                .await
                .unwrap();
            tokio::task::yield_now().await;
        }
    });

    for i in 0..20 {
        let (transport, mut probe) = MockTransport::new();
        let admin_id = admin(&format!("late-{i}"));
        let connection = Arc::new(Connection::new(
            admin_id.clone(),
            Box::new(transport),
            Duration::from_secs(1),
        ));
        service.subscribe(&admin_id, connection).await.unwrap();

        let first = probe.next_notification(WAIT).await.expect("first frame");
        assert_eq!(first.kind, NotificationType::System);
        assert_eq!(first.title, "Connected");
    }

    cancel.cancel();
    flood.await.unwrap();
}

// ============================================================================
// Fan-out
// ============================================================================

#[tokio::test]
async fn test_broadcast_reaches_every_connection_once() {
    let service = service();
    let mut probes = Vec::new();
    for name in ["a", "b", "b", "c"] {
        let (_conn, probe) = connect(&service, &admin(name)).await;
        probes.push(probe);
    }

    let notification = alert("maintenance").with_severity(Severity::Warning);
    service
        .broadcast(&CancellationToken::new(), &notification)
        .await
        .unwrap();

    for probe in &mut probes {
        let received = probe.next_notification(WAIT).await.expect("delivered");
        assert_eq!(received.id, notification.id);
        assert_eq!(received.kind, NotificationType::Alert);
        assert_eq!(received.title, "maintenance");
        assert_eq!(received.message, notification.message);
        assert_eq!(received.severity, Severity::Warning);
        assert!(probe.stays_silent(SILENCE).await);
    }
}

#[tokio::test]
async fn test_failed_connection_does_not_affect_others() {
    let service = service();
    let (_healthy, mut healthy_probe) = connect(&service, &admin("healthy")).await;
    let (_broken, broken_probe) = connect(&service, &admin("broken")).await;
    broken_probe.break_transport();

    let result = service
        .broadcast(&CancellationToken::new(), &alert("still here"))
        .await;

    assert!(result.is_ok());
    assert_eq!(
        healthy_probe.next_notification(WAIT).await.unwrap().title,
        "still here"
    );
    // Removal is left to the connection's lifecycle manager.
    assert_eq!(service.connection_count().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_connection_is_bounded_by_write_deadline() {
    let service = service();
    let (_healthy, mut healthy_probe) = connect(&service, &admin("healthy")).await;
    let (_stalled, stalled_probe) = connect(&service, &admin("stalled")).await;
    stalled_probe.stall();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        service.broadcast(&CancellationToken::new(), &alert("ping")),
    )
    .await;

    assert!(matches!(result, Ok(Ok(()))));
    assert_eq!(
        healthy_probe.next_notification(WAIT).await.unwrap().title,
        "ping"
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_fan_out() {
    let service = service();
    let (_stalled, stalled_probe) = connect(&service, &admin("stalled")).await;
    stalled_probe.stall();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = service.broadcast(&cancel, &alert("slow")).await;
    assert!(matches!(result, Err(NotificationError::Cancelled)));
}

#[tokio::test]
async fn test_broadcast_with_no_connections_succeeds() {
    let service = service();
    let result = service
        .broadcast(&CancellationToken::new(), &alert("nobody"))
        .await;
    assert!(result.is_ok());
}

// ============================================================================
// Targeted delivery
// ============================================================================

#[tokio::test]
async fn test_send_to_admin_reaches_only_that_admin() {
    let service = service();
    let alice = admin("alice");
    let (_a1, mut alice_one) = connect(&service, &alice).await;
    let (_a2, mut alice_two) = connect(&service, &alice).await;
    let (_b, mut bob) = connect(&service, &admin("bob")).await;

    service
        .send_to_admin(&CancellationToken::new(), &alice, &alert("for alice"))
        .await
        .unwrap();

    assert_eq!(alice_one.next_notification(WAIT).await.unwrap().title, "for alice");
    assert_eq!(alice_two.next_notification(WAIT).await.unwrap().title, "for alice");
    assert!(bob.stays_silent(SILENCE).await);
}

#[tokio::test]
async fn test_send_to_admin_respects_cancellation() {
    let service = service();
    let alice = admin("alice");
    let (_conn, mut probe) = connect(&service, &alice).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = service.send_to_admin(&cancel, &alice, &alert("too late")).await;

    assert!(matches!(result, Err(NotificationError::Cancelled)));
    assert!(probe.stays_silent(SILENCE).await);
}

// ============================================================================
// Producers
// ============================================================================

#[tokio::test]
async fn test_system_alert_payload() {
    let service = service();
    let (_conn, mut probe) = connect(&service, &admin("ops")).await;

    service
        .broadcast_system_alert(
            Severity::Critical,
            "System Error",
            "Database connection failed",
            "database",
        )
        .await
        .unwrap();

    let received = probe.next_notification(WAIT).await.unwrap();
    assert_eq!(received.kind, NotificationType::Alert);
    assert_eq!(received.severity, Severity::Critical);
    assert_eq!(received.message, "Database connection failed");
    assert_eq!(received.data.unwrap()["source"], json!("database"));
    assert_eq!(received.timestamp, test_clock().now());
}

#[tokio::test]
async fn test_user_activity_payload() {
    let service = service();
    let (_conn, mut probe) = connect(&service, &admin("ops")).await;

    service
        .broadcast_user_activity("u-42", "password_reset", json!({"ip": "10.0.0.1"}))
        .await
        .unwrap();

    let received = probe.next_notification(WAIT).await.unwrap();
    assert_eq!(received.kind, NotificationType::UserActivity);
    assert_eq!(received.title, "User Activity");
    assert_eq!(received.message, "User u-42 performed password_reset");
    let data = received.data.unwrap();
    assert_eq!(data["user_id"], json!("u-42"));
    assert_eq!(data["action"], json!("password_reset"));
    assert_eq!(data["details"]["ip"], json!("10.0.0.1"));
}

#[tokio::test]
async fn test_transaction_event_severity() {
    let service = service();
    let (_conn, mut probe) = connect(&service, &admin("ops")).await;

    service
        .broadcast_transaction_event("tx-1", "flagged", "1500.00")
        .await
        .unwrap();
    service
        .broadcast_transaction_event("tx-2", "completed", "20.00")
        .await
        .unwrap();

    let flagged = probe.next_notification(WAIT).await.unwrap();
    assert_eq!(flagged.kind, NotificationType::Transaction);
    assert_eq!(flagged.severity, Severity::Warning);
    assert_eq!(flagged.data.unwrap()["amount"], json!("1500.00"));

    let completed = probe.next_notification(WAIT).await.unwrap();
    assert_eq!(completed.severity, Severity::Info);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_count_matches_live_connections(
        ops in prop::collection::vec((0u8..4, any::<bool>()), 1..40)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let service = service();
            let mut live: Vec<Arc<Connection>> = Vec::new();
            let mut probes = Vec::new();

            for (admin_index, add) in ops {
                if add || live.is_empty() {
                    let admin_id = admin(&format!("admin-{admin_index}"));
                    let (transport, probe) = MockTransport::new();
                    let connection = Arc::new(Connection::new(
                        admin_id.clone(),
                        Box::new(transport),
                        Duration::from_secs(1),
                    ));
                    service.subscribe(&admin_id, Arc::clone(&connection)).await.unwrap();
                    live.push(connection);
                    probes.push(probe);
                } else {
                    let index = usize::from(admin_index) % live.len();
                    let connection = live.swap_remove(index);
                    service.unsubscribe(connection.admin_id(), &connection).await;
                }

                assert_eq!(service.connection_count().await, live.len());
            }
        });
    }
}
