//! Network Session
//!
//! Binds one account to one network: a live connection, the new-block watch
//! loop, and the sweep state (IgnoreSet + SweepLock) that outlives any single
//! connection.
//!
//! Created: 2026-10-16
//!
//! Notes:
//!     - Each new block is handled in its own task; handlers for consecutive
//!       blocks may overlap, the SweepLock serialises transfers
//!     - Heights that are not strictly newer than the last seen are skipped
//!     - When the block stream ends the session reconnects after a fixed
//!       delay, giving up after MAX_RECONNECTS consecutive failures

use crate::chain::{ChainClient, ChainConnector, Connection};
use crate::error::SweepResult;
use crate::notify::{OutcomeKind, OutcomeRecord, OutcomeSink};
use crate::sweep::{SessionState, SweepContext};
use crate::types::NetworkIdentity;
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Delay between reconnect attempts
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Consecutive failed reconnects before a session gives up
pub const MAX_RECONNECTS: u32 = 50;

/// Reacts to session events. Implemented by the SweepEngine.
#[async_trait]
pub trait BlockHandler: Send + Sync {
    /// Called once per strictly newer block height
    async fn on_new_block(&self, ctx: SweepContext, height: u64);

    /// Called after every successful (re)connect
    async fn on_connected(&self, _ctx: SweepContext) {}
}

#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: RECONNECT_DELAY,
            max_attempts: MAX_RECONNECTS,
        }
    }
}

/// Collaborators shared by every session of the agent
#[derive(Clone)]
pub struct SessionRuntime {
    pub connector: Arc<dyn ChainConnector>,
    pub handler: Arc<dyn BlockHandler>,
    pub sink: Arc<dyn OutcomeSink>,
    pub reconnect: ReconnectPolicy,
}

/// State shared between the session handle and its watch task
struct SessionShared {
    account_index: usize,
    address: Address,
    network: NetworkIdentity,
    endpoint: String,
    state: Arc<SessionState>,
    client: RwLock<Arc<dyn ChainClient>>,
    closed: AtomicBool,
    sink: Arc<dyn OutcomeSink>,
}

impl SessionShared {
    fn label(&self) -> String {
        format!("[Account {}][{}]", self.account_index, self.network)
    }

    fn report(&self, kind: OutcomeKind, message: String) {
        self.sink.report(OutcomeRecord::new(kind, message));
    }

    fn client(&self) -> Arc<dyn ChainClient> {
        self.client
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn replace_client(&self, client: Arc<dyn ChainClient>) {
        *self.client.write().unwrap_or_else(|e| e.into_inner()) = client;
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn context(&self) -> SweepContext {
        SweepContext {
            account_index: self.account_index,
            address: self.address,
            network: self.network,
            client: self.client(),
            state: self.state.clone(),
        }
    }
}

pub struct NetworkSession {
    shared: Arc<SessionShared>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkSession {
    /// Connect to `endpoint` and start watching new blocks.
    ///
    /// A connection failure is reported to the sink and returned; the caller
    /// decides whether it is fatal.
    pub async fn open(
        runtime: &SessionRuntime,
        account_index: usize,
        signer: &PrivateKeySigner,
        endpoint: &str,
        network: NetworkIdentity,
    ) -> SweepResult<Self> {
        let label = format!("[Account {}][{}]", account_index, network);
        runtime.sink.report(OutcomeRecord::new(
            OutcomeKind::Connecting,
            format!("🔄 {} Connecting...", label),
        ));

        let Connection { client, blocks } = match runtime.connector.connect(endpoint, network, signer).await {
            Ok(connection) => connection,
            Err(e) => {
                runtime.sink.report(OutcomeRecord::new(
                    OutcomeKind::ConnectionFailed,
                    format!("❌ {} Connection failed: {}", label, e),
                ));
                return Err(e);
            }
        };

        let shared = Arc::new(SessionShared {
            account_index,
            address: signer.address(),
            network,
            endpoint: endpoint.to_string(),
            state: Arc::new(SessionState::new()),
            client: RwLock::new(client),
            closed: AtomicBool::new(false),
            sink: runtime.sink.clone(),
        });
        shared.report(OutcomeKind::Connected, format!("✅ {} Connected", label));

        let watcher = tokio::spawn(watch_blocks(
            shared.clone(),
            runtime.clone(),
            signer.clone(),
            blocks,
        ));

        Ok(Self {
            shared,
            watcher: Mutex::new(Some(watcher)),
        })
    }

    pub fn network(&self) -> NetworkIdentity {
        self.shared.network
    }

    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    pub fn state(&self) -> Arc<SessionState> {
        self.shared.state.clone()
    }

    /// Best-effort balance read: failures yield zero
    pub async fn balance_of(&self, address: Address) -> U256 {
        self.shared.context().balance_of(address).await
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Stop watching and release the connection. Idempotent.
    ///
    /// In-flight block handlers are not awaited; they finish on the client
    /// handle they already hold.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = watcher {
            handle.abort();
        }
        info!("{} session closed", self.shared.label());
    }
}

impl Drop for NetworkSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn dispatch_connected(shared: &SessionShared, handler: &Arc<dyn BlockHandler>) {
    let ctx = shared.context();
    let handler = handler.clone();
    tokio::spawn(async move { handler.on_connected(ctx).await });
}

/// Watch loop: one task per session, runs until closed or reconnects are exhausted
async fn watch_blocks(
    shared: Arc<SessionShared>,
    runtime: SessionRuntime,
    signer: PrivateKeySigner,
    mut blocks: BoxStream<'static, u64>,
) {
    let label = shared.label();
    let mut last_block: Option<u64> = None;

    dispatch_connected(&shared, &runtime.handler);

    loop {
        while let Some(height) = blocks.next().await {
            if shared.is_closed() {
                return;
            }
            if last_block.is_some_and(|last| height <= last) {
                debug!("{} skipping block {} (last seen {:?})", label, height, last_block);
                continue;
            }
            last_block = Some(height);

            let ctx = shared.context();
            let handler = runtime.handler.clone();
            tokio::spawn(async move { handler.on_new_block(ctx, height).await });
        }

        if shared.is_closed() {
            return;
        }
        shared.report(
            OutcomeKind::ConnectionLost,
            format!("⚠️ {} Connection lost, reconnecting...", label),
        );

        // Reconnect loop: ignored balances and the lock are kept across connections
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if attempts > runtime.reconnect.max_attempts {
                error!(
                    "{} {} reconnects exhausted, giving up",
                    label, runtime.reconnect.max_attempts
                );
                shared.report(
                    OutcomeKind::ConnectionFailed,
                    format!(
                        "❌ {} Gave up after {} reconnect attempts",
                        label, runtime.reconnect.max_attempts
                    ),
                );
                return;
            }

            tokio::time::sleep(runtime.reconnect.delay).await;
            if shared.is_closed() {
                return;
            }

            match runtime
                .connector
                .connect(&shared.endpoint, shared.network, &signer)
                .await
            {
                Ok(connection) => {
                    shared.replace_client(connection.client);
                    blocks = connection.blocks;
                    shared.report(OutcomeKind::Connected, format!("✅ {} Reconnected", label));
                    dispatch_connected(&shared, &runtime.handler);
                    break;
                }
                Err(e) => {
                    warn!(
                        "{} reconnect {}/{} failed: {}, retrying in {:?}",
                        label, attempts, runtime.reconnect.max_attempts, e, runtime.reconnect.delay
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::{test_signer, MockConnector};
    use crate::notify::NotificationLog;
    use std::sync::atomic::AtomicUsize;

    const ENDPOINT: &str = "wss://eth-test";

    #[derive(Default)]
    struct Recorder {
        heights: Mutex<Vec<u64>>,
        connected: AtomicUsize,
    }

    impl Recorder {
        fn heights(&self) -> Vec<u64> {
            let mut heights = self.heights.lock().unwrap().clone();
            heights.sort_unstable();
            heights
        }
    }

    #[async_trait]
    impl BlockHandler for Recorder {
        async fn on_new_block(&self, _ctx: SweepContext, height: u64) {
            self.heights.lock().unwrap().push(height);
        }

        async fn on_connected(&self, _ctx: SweepContext) {
            self.connected.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn runtime(
        connector: Arc<MockConnector>,
        recorder: Arc<Recorder>,
        log: Arc<NotificationLog>,
    ) -> SessionRuntime {
        SessionRuntime {
            connector,
            handler: recorder,
            sink: log,
            reconnect: ReconnectPolicy {
                delay: Duration::from_millis(10),
                max_attempts: 3,
            },
        }
    }

    async fn wait_until(check: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    fn kinds(log: &NotificationLog) -> Vec<OutcomeKind> {
        log.recent().into_iter().rev().map(|n| n.kind).collect()
    }

    #[tokio::test]
    async fn test_open_failure_is_reported() {
        let connector = MockConnector::new();
        connector.fail_endpoint(ENDPOINT);
        let log = Arc::new(NotificationLog::new());
        let rt = runtime(connector, Arc::new(Recorder::default()), log.clone());

        let result = NetworkSession::open(&rt, 1, &test_signer(), ENDPOINT, NetworkIdentity::ETHEREUM).await;

        assert!(result.is_err());
        assert_eq!(kinds(&log), vec![OutcomeKind::Connecting, OutcomeKind::ConnectionFailed]);
    }

    #[tokio::test]
    async fn test_blocks_dispatched_once_per_newer_height() {
        let connector = MockConnector::new();
        let recorder = Arc::new(Recorder::default());
        let log = Arc::new(NotificationLog::new());
        let rt = runtime(connector.clone(), recorder.clone(), log.clone());

        let session = NetworkSession::open(&rt, 1, &test_signer(), ENDPOINT, NetworkIdentity::ETHEREUM)
            .await
            .unwrap();
        assert_eq!(kinds(&log), vec![OutcomeKind::Connecting, OutcomeKind::Connected]);

        for height in [10, 11, 11, 9, 12] {
            connector.push_block(ENDPOINT, height).await;
        }

        wait_until(|| recorder.heights().len() == 3).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(recorder.heights(), vec![10, 11, 12]);
        assert_eq!(recorder.connected.load(Ordering::SeqCst), 1);

        session.close();
    }

    #[tokio::test]
    async fn test_balance_of_is_best_effort() {
        let connector = MockConnector::new();
        let rt = runtime(connector.clone(), Arc::new(Recorder::default()), Arc::new(NotificationLog::new()));
        let session = NetworkSession::open(&rt, 1, &test_signer(), ENDPOINT, NetworkIdentity::BSC)
            .await
            .unwrap();

        let chain = connector.chain(ENDPOINT);
        chain.set_balance(U256::from(42u64));
        assert_eq!(session.balance_of(Address::ZERO).await, U256::from(42u64));

        chain.fail_balance_queries(true);
        assert_eq!(session.balance_of(Address::ZERO).await, U256::ZERO);
    }

    #[tokio::test]
    async fn test_reconnect_keeps_state() {
        let connector = MockConnector::new();
        let recorder = Arc::new(Recorder::default());
        let log = Arc::new(NotificationLog::new());
        let rt = runtime(connector.clone(), recorder.clone(), log.clone());

        let session = NetworkSession::open(&rt, 1, &test_signer(), ENDPOINT, NetworkIdentity::ETHEREUM)
            .await
            .unwrap();
        let state = session.state();
        state.ignored.mark_ignored(U256::from(7u64));

        connector.push_block(ENDPOINT, 1).await;
        wait_until(|| recorder.heights() == vec![1]).await;

        connector.drop_connection(ENDPOINT);
        wait_until(|| connector.connect_count() == 2).await;
        wait_until(|| recorder.connected.load(Ordering::SeqCst) == 2).await;

        connector.push_block(ENDPOINT, 2).await;
        wait_until(|| recorder.heights() == vec![1, 2]).await;

        assert!(Arc::ptr_eq(&state, &session.state()));
        assert!(session.state().ignored.is_ignored(&U256::from(7u64)));
        assert!(kinds(&log).contains(&OutcomeKind::ConnectionLost));

        session.close();
    }

    #[tokio::test]
    async fn test_gives_up_after_max_reconnects() {
        let connector = MockConnector::new();
        let log = Arc::new(NotificationLog::new());
        let rt = runtime(connector.clone(), Arc::new(Recorder::default()), log.clone());

        let _session = NetworkSession::open(&rt, 1, &test_signer(), ENDPOINT, NetworkIdentity::ETHEREUM)
            .await
            .unwrap();

        connector.fail_endpoint(ENDPOINT);
        connector.drop_connection(ENDPOINT);

        wait_until(|| log.recent().first().map(|n| n.kind) == Some(OutcomeKind::ConnectionFailed)).await;
        // initial connect + 3 attempts
        assert_eq!(connector.connect_count(), 4);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_stops_dispatch() {
        let connector = MockConnector::new();
        let recorder = Arc::new(Recorder::default());
        let rt = runtime(connector.clone(), recorder.clone(), Arc::new(NotificationLog::new()));

        let session = NetworkSession::open(&rt, 1, &test_signer(), ENDPOINT, NetworkIdentity::ETHEREUM)
            .await
            .unwrap();

        session.close();
        session.close();
        assert!(session.is_closed());

        connector.push_block(ENDPOINT, 5).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(recorder.heights().is_empty());
        // closed sessions never reconnect
        assert_eq!(connector.connect_count(), 1);
    }
}
