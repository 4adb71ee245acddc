//! 控制台同步客户端
//!
//! Two independent tasks feed one [`OrderView`]:
//!
//! | Task | Drives | Stops on |
//! |------|--------|----------|
//! | push | connect → pump events → reconnect / Offline | shutdown |
//! | pull | `fetch_orders` every `poll_interval` | shutdown |
//!
//! The pull task keeps running in every connection state, so an `Offline`
//! console still converges. A pull that was in flight while a push event
//! landed is merged rather than swapped in, so it cannot roll the view back. Dropping the client cancels both tasks, which
//! drops the push stream and releases the hub-side subscriber.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use shared::message::OrderEvent;
use shared::order::{ConsoleView, Order};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use super::connection::{ConnectionState, ReconnectPolicy};
use super::view::OrderView;
use crate::config::ConsoleConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::{HttpClient, OrderSource};
use crate::message::{PushConnector, PushStream, TcpConnector};

enum PumpExit {
    Cancelled,
    Refresh,
    Lost(ClientError),
}

struct SyncCore {
    connector: Arc<dyn PushConnector>,
    source: Arc<dyn OrderSource>,
    policy: ReconnectPolicy,
    poll_interval: Duration,
    view_tx: watch::Sender<OrderView>,
    state_tx: watch::Sender<ConnectionState>,
    reconnect: Notify,
    /// Bumped for every push event applied to the view
    pushed: AtomicU64,
    cancel: CancellationToken,
}

impl SyncCore {
    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            tracing::debug!(from = %current, to = %state, "Connection state changed");
            *current = state;
            true
        });
    }

    fn apply(&self, event: &OrderEvent) {
        if let OrderEvent::Connected { connection_id } = event {
            tracing::info!(connection_id = %connection_id, "Subscribed to order hub");
        }
        self.view_tx.send_if_modified(|view| {
            if !matches!(event, OrderEvent::Connected { .. }) {
                self.pushed.fetch_add(1, Ordering::AcqRel);
            }
            view.apply_event(event)
        });
    }

    async fn pull_once(&self) -> ClientResult<usize> {
        let generation = self.pushed.load(Ordering::Acquire);
        let orders = self.source.fetch_orders().await?;
        let count = orders.len();
        self.view_tx.send_if_modified(|view| {
            if self.pushed.load(Ordering::Acquire) == generation {
                view.apply_snapshot(orders)
            } else {
                tracing::debug!("Push landed during pull, merging instead of replacing");
                view.merge_snapshot(orders)
            }
        });
        Ok(count)
    }

    async fn pump(&self, mut stream: Box<dyn PushStream>) -> PumpExit {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return PumpExit::Cancelled,
                _ = self.reconnect.notified() => return PumpExit::Refresh,
                event = stream.next_event() => match event {
                    Ok(event) => self.apply(&event),
                    Err(e) => return PumpExit::Lost(e),
                },
            }
        }
    }

    async fn run_push(self: Arc<Self>) {
        let mut failures: u32 = 0;
        loop {
            self.set_state(if failures == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting { attempt: failures }
            });

            // A refresh during connect is served by the connection in flight
            let connect = self.connector.connect();
            tokio::pin!(connect);
            let mut refreshed = false;
            let connected = loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => break None,
                    _ = self.reconnect.notified() => {
                        tracing::debug!("Refresh while connecting, keeping attempt");
                        refreshed = true;
                    }
                    result = &mut connect => break Some(result),
                }
            };
            let Some(connected) = connected else { break };
            match connected {
                Ok(stream) => {
                    failures = 0;
                    self.set_state(ConnectionState::Connected);
                    match self.pump(stream).await {
                        PumpExit::Cancelled => break,
                        PumpExit::Refresh => {
                            tracing::info!("Manual refresh, re-establishing push channel");
                            continue;
                        }
                        PumpExit::Lost(e) => tracing::warn!(error = %e, "Push channel lost"),
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt = failures, error = %e, "Push connect failed");
                    if refreshed {
                        failures = 0;
                        continue;
                    }
                }
            }

            failures += 1;
            let next = self.policy.after_failures(failures);
            self.set_state(next);
            if next.is_offline() {
                tracing::warn!(
                    attempts = self.policy.max_attempts,
                    "Reconnect attempts exhausted, console offline (pull continues)"
                );
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.reconnect.notified() => failures = 0,
                _ = backoff(next, self.policy.delay) => {}
            }
        }
        tracing::debug!("Push task stopped");
    }

    async fn run_pull(self: Arc<Self>) {
        let mut ticker = interval(self.poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.pull_once() => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "Order pull failed");
                    }
                }
            }
        }
        tracing::debug!("Pull task stopped");
    }
}

/// Fixed delay while retrying; `Offline` waits for refresh or shutdown only
async fn backoff(state: ConnectionState, delay: Duration) {
    if state.is_offline() {
        std::future::pending::<()>().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}

/// 控制台客户端
///
/// ```ignore
/// let config = ConsoleConfig::new("http://127.0.0.1:3000", "127.0.0.1:8081").kitchen();
/// let console = ConsoleClient::start(&config)?;
/// let mut view = console.view();
/// while view.changed().await.is_ok() {
///     render(console.visible_orders());
/// }
/// ```
pub struct ConsoleClient {
    core: Arc<SyncCore>,
    console_view: ConsoleView,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for ConsoleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleClient")
            .field("console_view", &self.console_view)
            .field("state", &*self.core.state_tx.borrow())
            .finish_non_exhaustive()
    }
}

impl ConsoleClient {
    /// TCP push + HTTP pull against a running hub
    pub fn start(config: &ConsoleConfig) -> ClientResult<Self> {
        let connector = Arc::new(TcpConnector::new(config.push_addr.clone()));
        let source = Arc::new(HttpClient::new(config)?);
        Ok(Self::with_parts(config, connector, source))
    }

    /// Start with explicit push and pull backends
    pub fn with_parts(
        config: &ConsoleConfig,
        connector: Arc<dyn PushConnector>,
        source: Arc<dyn OrderSource>,
    ) -> Self {
        let (view_tx, _) = watch::channel(OrderView::new());
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        let core = Arc::new(SyncCore {
            connector,
            source,
            policy: ReconnectPolicy::new(config.reconnect_delay, config.max_reconnect_attempts),
            poll_interval: config.poll_interval,
            view_tx,
            state_tx,
            reconnect: Notify::new(),
            pushed: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        });

        let tasks = vec![
            tokio::spawn(core.clone().run_push()),
            tokio::spawn(core.clone().run_pull()),
        ];
        tracing::info!(view = ?config.view, "Console client started");

        Self {
            core,
            console_view: config.view.clone(),
            tasks,
        }
    }

    /// Watch the full local order set
    pub fn view(&self) -> watch::Receiver<OrderView> {
        self.core.view_tx.subscribe()
    }

    /// Watch the push channel state
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.core.state_tx.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.core.state_tx.borrow()
    }

    pub fn console_view(&self) -> &ConsoleView {
        &self.console_view
    }

    pub fn snapshot(&self) -> OrderView {
        self.core.view_tx.borrow().clone()
    }

    /// Orders this console renders, newest first
    pub fn visible_orders(&self) -> Vec<Order> {
        self.core
            .view_tx
            .borrow()
            .visible(&self.console_view)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Manual refresh: re-establish the push channel and pull once now
    ///
    /// Works from any state, including `Offline`. Returns the pulled count.
    pub async fn refresh(&self) -> ClientResult<usize> {
        tracing::info!(state = %self.connection_state(), "Manual refresh requested");
        self.core.reconnect.notify_one();
        self.core.pull_once().await
    }

    /// Cancel both tasks and wait for them to finish
    pub async fn shutdown(mut self) {
        self.core.cancel.cancel();
        for handle in std::mem::take(&mut self.tasks) {
            if let Err(e) = handle.await {
                tracing::error!(error = ?e, "Console task join failed");
            }
        }
        tracing::info!("Console client stopped");
    }
}

impl Drop for ConsoleClient {
    fn drop(&mut self) {
        self.core.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared::order::{Customer, OrderStatus, OrderType};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    fn order(id: &str) -> Order {
        Order {
            order_id: id.to_string(),
            customer: Customer {
                name: "Ana".to_string(),
                phone: "600".to_string(),
                address: "Calle 1".to_string(),
                email: None,
                notes: None,
            },
            items: vec![],
            total: 0.0,
            status: OrderStatus::Pending,
            order_type: OrderType::Delivery,
            payment_method: "cash".to_string(),
            assigned_driver_id: None,
            assigned_driver: None,
            created_at: 0,
            updated_at: 0,
            delivered_at: None,
            assigned_at: None,
            cancel_reason: None,
        }
    }

    #[derive(Debug, Default)]
    struct FakeSource {
        orders: Mutex<Vec<Order>>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OrderSource for FakeSource {
        async fn fetch_orders(&self) -> ClientResult<Vec<Order>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.orders.lock().unwrap().clone())
        }
    }

    #[derive(Debug)]
    struct ChannelStream(mpsc::Receiver<OrderEvent>);

    #[async_trait]
    impl PushStream for ChannelStream {
        async fn next_event(&mut self) -> ClientResult<OrderEvent> {
            self.0.recv().await.ok_or(ClientError::Closed)
        }
    }

    /// Captures its rows on entry, then answers only once released
    #[derive(Debug, Default)]
    struct SlowSource {
        orders: Vec<Order>,
        entered: Notify,
        release: Notify,
        answered: AtomicBool,
    }

    #[async_trait]
    impl OrderSource for SlowSource {
        async fn fetch_orders(&self) -> ClientResult<Vec<Order>> {
            let rows = self.orders.clone();
            self.entered.notify_one();
            self.release.notified().await;
            self.answered.store(true, Ordering::SeqCst);
            Ok(rows)
        }
    }

    /// Refuses connections until switched online; each stream opens with a snapshot
    ///
    /// With `hold` set, the next connect parks until `release` is notified.
    #[derive(Debug, Default)]
    struct FakeHub {
        online: AtomicBool,
        hold: AtomicBool,
        entered: Notify,
        release: Notify,
        attempts: AtomicUsize,
        snapshot: Mutex<Vec<Order>>,
        streams: Mutex<Vec<mpsc::Sender<OrderEvent>>>,
    }

    impl FakeHub {
        fn online(snapshot: Vec<Order>) -> Self {
            let hub = Self::default();
            hub.online.store(true, Ordering::SeqCst);
            *hub.snapshot.lock().unwrap() = snapshot;
            hub
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        fn latest(&self) -> mpsc::Sender<OrderEvent> {
            self.streams.lock().unwrap().last().cloned().unwrap()
        }

        fn hang_up(&self) {
            self.streams.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl PushConnector for FakeHub {
        async fn connect(&self) -> ClientResult<Box<dyn PushStream>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.hold.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            if !self.online.load(Ordering::SeqCst) {
                return Err(ClientError::Connection("refused".into()));
            }
            let (tx, rx) = mpsc::channel(16);
            tx.try_send(OrderEvent::Connected {
                connection_id: format!("c-{}", self.attempts()),
            })
            .unwrap();
            tx.try_send(OrderEvent::Initial(self.snapshot.lock().unwrap().clone()))
                .unwrap();
            self.streams.lock().unwrap().push(tx);
            Ok(Box::new(ChannelStream(rx)))
        }
    }

    fn config(max_attempts: u32, poll: Duration) -> ConsoleConfig {
        ConsoleConfig::new("http://unused", "unused:0")
            .with_reconnect_delay(Duration::from_millis(10))
            .with_max_reconnect_attempts(max_attempts)
            .with_poll_interval(poll)
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
    async fn test_exhausted_reconnect_goes_offline_and_pull_continues() {
        let hub = Arc::new(FakeHub::default());
        let source = Arc::new(FakeSource::default());
        *source.orders.lock().unwrap() = vec![order("A")];

        let client = ConsoleClient::with_parts(
            &config(2, Duration::from_millis(20)),
            hub.clone(),
            source.clone(),
        );

        wait_state(&client, |s| s.is_offline()).await;
        assert_eq!(hub.attempts(), 3);

        wait_view(&client, |v| v.len() == 1).await;
        let pulls = source.calls();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(source.calls() > pulls);

        assert_eq!(hub.attempts(), 3);
        assert!(client.connection_state().is_offline());
        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresh_from_offline_reconnects_and_pulls() {
        let hub = Arc::new(FakeHub::default());
        let source = Arc::new(FakeSource::default());
        *source.orders.lock().unwrap() = vec![order("A")];

        let client = ConsoleClient::with_parts(
            &config(0, Duration::from_secs(3600)),
            hub.clone(),
            source.clone(),
        );
        wait_state(&client, |s| s.is_offline()).await;
        wait_view(&client, |v| v.len() == 1).await;
        let pulls = source.calls();

        *hub.snapshot.lock().unwrap() = vec![order("B"), order("A")];
        hub.online.store(true, Ordering::SeqCst);
        assert_eq!(client.refresh().await.unwrap(), 1);
        assert_eq!(source.calls(), pulls + 1);

        wait_state(&client, |s| s.is_connected()).await;
        wait_view(&client, |v| v.len() == 2).await;
        client.shutdown().await;
    }

    async fn wait_first_pull(source: &FakeSource) {
        timeout(WAIT, async {
            while source.calls() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_pushed_events_are_deduplicated() {
        let hub = Arc::new(FakeHub::online(vec![order("A")]));
        let source = Arc::new(FakeSource::default());
        *source.orders.lock().unwrap() = vec![order("A")];
        let client = ConsoleClient::with_parts(
            &config(3, Duration::from_secs(3600)),
            hub.clone(),
            source.clone(),
        );
        wait_state(&client, |s| s.is_connected()).await;
        wait_first_pull(&source).await;
        wait_view(&client, |v| v.len() == 1).await;

        let tx = hub.latest();
        tx.send(OrderEvent::created(order("C"))).await.unwrap();
        tx.send(OrderEvent::created(order("C"))).await.unwrap();
        tx.send(OrderEvent::updated(order("Z"))).await.unwrap();
        tx.send(OrderEvent::created(order("D"))).await.unwrap();

        wait_view(&client, |v| v.get("D").is_some()).await;
        let view = client.snapshot();
        let ids: Vec<&str> = view.orders().iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["D", "C", "A"]);
        client.shutdown().await;
    }

    fn stamped(id: &str, status: OrderStatus, updated_at: i64) -> Order {
        let mut o = order(id);
        o.status = status;
        o.updated_at = updated_at;
        o
    }

    #[tokio::test]
    async fn test_pull_in_flight_does_not_roll_back_pushes() {
        let a1 = stamped("A", OrderStatus::Pending, 1);
        let hub = Arc::new(FakeHub::online(vec![a1.clone()]));
        let source = Arc::new(SlowSource {
            orders: vec![a1],
            ..Default::default()
        });
        let client = ConsoleClient::with_parts(
            &config(3, Duration::from_secs(3600)),
            hub.clone(),
            source.clone(),
        );
        wait_state(&client, |s| s.is_connected()).await;
        wait_view(&client, |v| v.len() == 1).await;
        timeout(WAIT, source.entered.notified()).await.unwrap();

        let tx = hub.latest();
        tx.send(OrderEvent::updated(stamped("A", OrderStatus::Confirmed, 2)))
            .await
            .unwrap();
        tx.send(OrderEvent::created(stamped("C", OrderStatus::Pending, 3)))
            .await
            .unwrap();
        wait_view(&client, |v| v.get("C").is_some()).await;

        source.release.notify_one();
        timeout(WAIT, async {
            while !source.answered.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let view = client.snapshot();
        let ids: Vec<&str> = view.orders().iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A"]);
        assert_eq!(view.get("A").unwrap().status, OrderStatus::Confirmed);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresh_during_connect_opens_one_channel() {
        let hub = Arc::new(FakeHub::online(vec![order("A")]));
        hub.hold.store(true, Ordering::SeqCst);
        let client = ConsoleClient::with_parts(
            &config(3, Duration::from_secs(3600)),
            hub.clone(),
            Arc::new(FakeSource::default()),
        );
        timeout(WAIT, hub.entered.notified()).await.unwrap();

        client.refresh().await.unwrap();
        hub.release.notify_one();

        wait_state(&client, |s| s.is_connected()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hub.attempts(), 1);
        assert!(client.connection_state().is_connected());
        assert_eq!(hub.streams.lock().unwrap().len(), 1);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_lost_channel_reconnects_with_fresh_snapshot() {
        let hub = Arc::new(FakeHub::online(vec![order("A")]));
        let client = ConsoleClient::with_parts(
            &config(3, Duration::from_secs(3600)),
            hub.clone(),
            Arc::new(FakeSource::default()),
        );
        wait_state(&client, |s| s.is_connected()).await;

        *hub.snapshot.lock().unwrap() = vec![order("B"), order("A")];
        hub.hang_up();
        wait_state(&client, |s| matches!(s, ConnectionState::Reconnecting { attempt: 1 })).await;
        wait_state(&client, |s| s.is_connected()).await;
        wait_view(&client, |v| v.len() == 2).await;
        assert_eq!(hub.attempts(), 2);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_teardown_releases_channel_and_stops_polling() {
        let hub = Arc::new(FakeHub::online(vec![]));
        let source = Arc::new(FakeSource::default());
        let client = ConsoleClient::with_parts(
            &config(3, Duration::from_millis(10)),
            hub.clone(),
            source.clone(),
        );
        wait_state(&client, |s| s.is_connected()).await;
        let tx = hub.latest();

        client.shutdown().await;
        assert!(tx.is_closed());

        let pulls = source.calls();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.calls(), pulls);
    }

    #[tokio::test]
    async fn test_drop_cancels_tasks() {
        let hub = Arc::new(FakeHub::online(vec![]));
        let client = ConsoleClient::with_parts(
            &config(3, Duration::from_secs(3600)),
            hub.clone(),
            Arc::new(FakeSource::default()),
        );
        wait_state(&client, |s| s.is_connected()).await;
        let tx = hub.latest();

        drop(client);
        timeout(WAIT, tx.closed()).await.unwrap();
    }
}
