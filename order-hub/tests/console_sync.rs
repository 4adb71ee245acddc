//! Console reconciliation against a live hub (in-process and over TCP)

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{InProcessHub, TO_READY, advance, manager, order_request};
use console_client::{ConnectionState, ConsoleClient, ConsoleConfig, OrderView, TcpConnector};
use order_hub::PushServer;
use shared::order::{Actor, DriverRef, OrderStatus, OrderType};
use shared::request::StatusUpdateRequest;
use tokio::net::TcpListener;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn config() -> ConsoleConfig {
    ConsoleConfig::new("http://unused", "unused:0")
        .with_reconnect_delay(Duration::from_millis(20))
        .with_max_reconnect_attempts(50)
        .with_poll_interval(Duration::from_secs(3600))
}

async fn wait_state(client: &ConsoleClient, f: impl FnMut(&ConnectionState) -> bool) {
    let mut rx = client.state();
    timeout(WAIT, rx.wait_for(f)).await.unwrap().unwrap();
}

async fn wait_view(client: &ConsoleClient, f: impl FnMut(&OrderView) -> bool) {
    let mut rx = client.view();
    timeout(WAIT, rx.wait_for(f)).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_snapshot_on_reconnect_matches_store() {
    let m = manager();
    m.create_order(order_request("ORD-1", OrderType::Delivery)).unwrap();
    let hub = InProcessHub::new(m.clone());

    let client = ConsoleClient::with_parts(&config(), hub.clone(), hub.clone());
    wait_state(&client, |s| s.is_connected()).await;
    wait_view(&client, |v| v.len() == 1).await;
    assert_eq!(m.broadcaster().connected_count(), 1);

    hub.set_online(false);
    hub.drop_links();
    wait_state(&client, |s| matches!(s, ConnectionState::Reconnecting { .. })).await;

    // Missed while disconnected
    m.create_order(order_request("ORD-2", OrderType::Pickup)).unwrap();
    advance(&m, "ORD-1", TO_READY);
    assert_eq!(client.snapshot().get("ORD-1").unwrap().status, OrderStatus::Pending);

    hub.set_online(true);
    wait_state(&client, |s| s.is_connected()).await;

    let server = m.list_orders().unwrap();
    wait_view(&client, |v| v.orders() == server.as_slice()).await;
    assert_eq!(m.broadcaster().connected_count(), 1);

    client.shutdown().await;
}

#[tokio::test]
async fn test_pushed_changes_reach_every_console() {
    let m = manager();
    let hub = InProcessHub::new(m.clone());

    let kitchen = ConsoleClient::with_parts(&config().kitchen(), hub.clone(), hub.clone());
    let driver = ConsoleClient::with_parts(&config().driver("D1", "Marta"), hub.clone(), hub.clone());
    wait_state(&kitchen, |s| s.is_connected()).await;
    wait_state(&driver, |s| s.is_connected()).await;

    m.create_order(order_request("ORD-1", OrderType::Delivery)).unwrap();
    wait_view(&kitchen, |v| v.get("ORD-1").is_some()).await;
    assert!(kitchen.visible_orders().is_empty());

    m.apply_transition("ORD-1", StatusUpdateRequest::new(OrderStatus::Confirmed), &Actor::Kitchen)
        .unwrap();
    wait_view(&kitchen, |v| {
        v.get("ORD-1").map(|o| o.status) == Some(OrderStatus::Confirmed)
    })
    .await;
    assert_eq!(kitchen.visible_orders().len(), 1);

    advance(&m, "ORD-1", &TO_READY[1..]);
    m.assign_driver("ORD-1", Some(DriverRef::new("D2", "Joan")), &Actor::Admin)
        .unwrap();
    wait_view(&driver, |v| {
        v.get("ORD-1").and_then(|o| o.assigned_driver_id.clone()) == Some("D2".to_string())
    })
    .await;
    assert_eq!(driver.snapshot().len(), 1);
    assert!(driver.visible_orders().is_empty());

    kitchen.shutdown().await;
    driver.shutdown().await;
    assert_eq!(m.broadcaster().connected_count(), 0);
}

#[tokio::test]
async fn test_offline_console_converges_through_pull() {
    let m = manager();
    let hub = InProcessHub::new(m.clone());
    hub.set_online(false);

    let config = config()
        .with_max_reconnect_attempts(1)
        .with_poll_interval(Duration::from_millis(20));
    let client = ConsoleClient::with_parts(&config, hub.clone(), hub.clone());
    wait_state(&client, |s| s.is_offline()).await;

    m.create_order(order_request("LATE", OrderType::Pickup)).unwrap();
    wait_view(&client, |v| v.get("LATE").is_some()).await;
    assert!(client.connection_state().is_offline());

    hub.set_online(true);
    assert_eq!(client.refresh().await.unwrap(), 1);
    wait_state(&client, |s| s.is_connected()).await;
    client.shutdown().await;
}

#[tokio::test]
async fn test_console_over_tcp_push_server() {
    let m = manager();
    m.create_order(order_request("ORD-1", OrderType::Pickup)).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let server = tokio::spawn(PushServer::new(m.clone(), addr.clone()).serve(listener));

    let hub = InProcessHub::new(m.clone());
    let client = ConsoleClient::with_parts(&config(), Arc::new(TcpConnector::new(addr)), hub);
    wait_state(&client, |s| s.is_connected()).await;
    wait_view(&client, |v| v.len() == 1).await;

    m.create_order(order_request("ORD-2", OrderType::Delivery)).unwrap();
    wait_view(&client, |v| v.orders().first().map(|o| o.order_id.as_str()) == Some("ORD-2")).await;

    client.shutdown().await;
    m.broadcaster().stop();
    timeout(WAIT, server).await.unwrap().unwrap();
}
