use super::handler::FeedHandler;
use super::message::FeedEvent;
use super::reconnect::{CLOSE_ABNORMAL, CLOSE_NO_STATUS, CLOSE_NORMAL, CloseDecision, ConnectionMachine};
use crate::config::ReconnectPolicy;
use crate::models::ConnectionStatus;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type HandlerSlot = Arc<RwLock<Arc<dyn FeedHandler>>>;
type FeedSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Real-time price feed client. Call [`RealtimeClient::mount`] to start it.
pub struct RealtimeClient {
    url: String,
    policy: ReconnectPolicy,
    handler: HandlerSlot,
}

impl RealtimeClient {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy, handler: Arc<dyn FeedHandler>) -> Self {
        Self {
            url: url.into(),
            policy,
            handler: Arc::new(RwLock::new(handler)),
        }
    }

    /// Spawn the connection task and return the handle that owns it.
    pub fn mount(self) -> FeedHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mounted = Arc::new(AtomicBool::new(true));
        let dispatcher = Dispatcher {
            handler: self.handler.clone(),
            mounted: mounted.clone(),
            status: ConnectionStatus::default(),
        };
        let task = tokio::spawn(run(self.url, self.policy, dispatcher, shutdown_rx));
        FeedHandle {
            handler: self.handler,
            mounted,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }
}

/// Owner of a mounted client. Dropping it has the same effect as
/// [`FeedHandle::unmount`] without waiting for the task to finish.
pub struct FeedHandle {
    handler: HandlerSlot,
    mounted: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// Replace the callbacks without touching the connection.
    pub fn set_handler(&self, handler: Arc<dyn FeedHandler>) {
        match self.handler.write() {
            Ok(mut slot) => *slot = handler,
            Err(_) => warn!("[FEED] handler slot poisoned, keeping previous handler"),
        }
    }

    /// False once the client stopped on its own (normal close or retries exhausted).
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Close the socket with a normal code and cancel any pending retry.
    /// No callback fires once this returns.
    pub async fn unmount(mut self) {
        self.signal_shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "[FEED] client task ended abnormally");
            }
        }
    }

    fn signal_shutdown(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        let _ = self.shutdown.send(true);
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

/// Routes decoded messages to whatever handler currently sits in the slot.
struct Dispatcher {
    handler: HandlerSlot,
    mounted: Arc<AtomicBool>,
    status: ConnectionStatus,
}

impl Dispatcher {
    fn current(&self) -> Option<Arc<dyn FeedHandler>> {
        if !self.mounted.load(Ordering::SeqCst) {
            return None;
        }
        self.handler.read().ok().map(|slot| slot.clone())
    }

    fn publish_status(&self) {
        if let Some(handler) = self.current() {
            handler.on_status(self.status.clone());
        }
    }

    fn set_connection(&mut self, connected: bool, reconnect_attempts: u32) {
        self.status.connected = connected;
        self.status.reconnect_attempts = reconnect_attempts;
        self.publish_status();
    }

    fn dispatch(&mut self, text: &str) {
        let event = match FeedEvent::parse(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "[FEED] dropping malformed message");
                return;
            }
        };
        let Some(handler) = self.current() else {
            return;
        };
        match event {
            FeedEvent::Initial(data) => {
                if let Some(stocks) = data.stocks {
                    handler.on_stocks(stocks);
                }
                if let Some(points) = data.performance {
                    handler.on_performance(points);
                }
                if let Some(overview) = data.overview {
                    handler.on_overview(overview);
                }
            }
            FeedEvent::PriceUpdate(stocks) => {
                debug!(count = stocks.len(), "[FEED] price update");
                handler.on_stocks(stocks);
            }
            FeedEvent::Unknown(kind) => {
                info!(kind = %kind, "[FEED] ignoring unknown message type");
                return;
            }
        }
        self.status.last_update = Some(chrono::Utc::now());
        self.publish_status();
    }
}

enum SessionEnd {
    Shutdown,
    Closed(u16),
}

async fn run(
    url: String,
    policy: ReconnectPolicy,
    mut dispatcher: Dispatcher,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut machine = ConnectionMachine::new(policy);
    loop {
        if *shutdown.borrow() || !machine.begin_connect() {
            break;
        }
        debug!(url = %url, "[FEED] connecting");
        let connected = tokio::select! {
            res = connect_async(url.as_str()) => res,
            _ = shutdown.changed() => break,
        };
        let code = match connected {
            Ok((socket, _resp)) => {
                machine.opened();
                info!(url = %url, "[FEED] connected");
                dispatcher.set_connection(true, machine.attempts());
                match session(socket, &mut dispatcher, &mut shutdown).await {
                    SessionEnd::Shutdown => {
                        machine.closed(CLOSE_NORMAL);
                        break;
                    }
                    SessionEnd::Closed(code) => code,
                }
            }
            Err(e) => {
                warn!(error = %e, url = %url, "[FEED] connect failed");
                CLOSE_ABNORMAL
            }
        };

        match machine.closed(code) {
            CloseDecision::Retry { delay, attempt } => {
                info!(code, attempt, delay_ms = delay.as_millis() as u64, "[FEED] reconnect scheduled");
                dispatcher.set_connection(false, machine.attempts());
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => break,
                }
            }
            CloseDecision::Stop => {
                info!(code, "[FEED] connection closed, not reconnecting");
                dispatcher.set_connection(false, machine.attempts());
                break;
            }
        }
    }
    debug!("[FEED] client task finished");
}

async fn session(
    socket: FeedSocket,
    dispatcher: &mut Dispatcher,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let (mut write, mut read) = socket.split();
    loop {
        let msg = tokio::select! {
            msg = read.next() => msg,
            _ = shutdown.changed() => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "client unmounted".into(),
                };
                if let Err(e) = write.send(Message::Close(Some(frame))).await {
                    debug!(error = %e, "[FEED] close frame not delivered");
                }
                return SessionEnd::Shutdown;
            }
        };
        match msg {
            Some(Ok(Message::Text(text))) => dispatcher.dispatch(&text),
            Some(Ok(Message::Close(frame))) => {
                let code = frame.map(|f| u16::from(f.code)).unwrap_or(CLOSE_NO_STATUS);
                info!(code, "[FEED] server closed connection");
                return SessionEnd::Closed(code);
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "[FEED] socket error");
                return SessionEnd::Closed(CLOSE_ABNORMAL);
            }
            None => return SessionEnd::Closed(CLOSE_ABNORMAL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::message::{INITIAL, InitialData, PRICE_UPDATE, PriceUpdateData, encode};
    use crate::models::fixtures::stock;
    use crate::models::{MarketOverview, PerformancePoint, Stock};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::{sleep, timeout};

    #[derive(Default)]
    struct Recorder {
        stocks: AtomicUsize,
        performance: AtomicUsize,
        overview: AtomicUsize,
        statuses: Mutex<Vec<ConnectionStatus>>,
    }

    impl Recorder {
        fn stocks(&self) -> usize {
            self.stocks.load(Ordering::SeqCst)
        }

        fn last_status(&self) -> Option<ConnectionStatus> {
            self.statuses.lock().unwrap().last().cloned()
        }
    }

    impl FeedHandler for Recorder {
        fn on_stocks(&self, _stocks: Vec<Stock>) {
            self.stocks.fetch_add(1, Ordering::SeqCst);
        }

        fn on_performance(&self, _points: Vec<PerformancePoint>) {
            self.performance.fetch_add(1, Ordering::SeqCst);
        }

        fn on_overview(&self, _overview: MarketOverview) {
            self.overview.fetch_add(1, Ordering::SeqCst);
        }

        fn on_status(&self, status: ConnectionStatus) {
            self.statuses.lock().unwrap().push(status);
        }
    }

    fn fast_policy() -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(50),
            max_attempts: 5,
        }
    }

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        (listener, format!("ws://{addr}/ws"))
    }

    async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
        let (stream, _) = listener.accept().await.expect("accept");
        tokio_tungstenite::accept_async(stream).await.expect("handshake")
    }

    async fn close_with(mut ws: WebSocketStream<TcpStream>, code: u16) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        let _ = ws.close(Some(frame)).await;
    }

    async fn wait_for(what: &str, cond: impl Fn() -> bool) {
        timeout(Duration::from_secs(3), async {
            while !cond() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
    }

    fn initial_message() -> String {
        let stocks = vec![stock(1, "AAPL", 190.0, 1.0), stock(2, "MSFT", 410.0, -2.0)];
        let data = InitialData {
            overview: Some(MarketOverview::from_stocks(&stocks)),
            stocks: Some(stocks),
            performance: None,
        };
        encode(INITIAL, &data).unwrap()
    }

    #[tokio::test]
    async fn initial_message_fires_each_present_callback_once() {
        let (listener, url) = bind().await;
        let recorder = Arc::new(Recorder::default());
        let handle = RealtimeClient::new(url, fast_policy(), recorder.clone()).mount();

        let mut ws = accept(&listener).await;
        ws.send(Message::Text(initial_message())).await.unwrap();

        wait_for("overview", || recorder.overview.load(Ordering::SeqCst) == 1).await;
        sleep(Duration::from_millis(50)).await;
        assert_eq!(recorder.stocks(), 1);
        assert_eq!(recorder.overview.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.performance.load(Ordering::SeqCst), 0);

        let status = recorder.last_status().unwrap();
        assert!(status.connected);
        assert!(status.last_update.is_some());
        assert_eq!(status.reconnect_attempts, 0);

        handle.unmount().await;
    }

    #[tokio::test]
    async fn malformed_and_unknown_messages_are_dropped() {
        let (listener, url) = bind().await;
        let recorder = Arc::new(Recorder::default());
        let handle = RealtimeClient::new(url, fast_policy(), recorder.clone()).mount();

        let mut ws = accept(&listener).await;
        ws.send(Message::Text("{oops".into())).await.unwrap();
        ws.send(Message::Text(r#"{"type":"heartbeat","data":{}}"#.into()))
            .await
            .unwrap();
        let update = encode(
            PRICE_UPDATE,
            &PriceUpdateData {
                stocks: vec![stock(1, "AAPL", 191.0, 2.0)],
            },
        )
        .unwrap();
        ws.send(Message::Text(update)).await.unwrap();

        wait_for("price update", || recorder.stocks() == 1).await;
        assert!(handle.is_running());
        handle.unmount().await;
    }

    #[tokio::test]
    async fn abnormal_close_reconnects_after_backoff() {
        let (listener, url) = bind().await;
        let recorder = Arc::new(Recorder::default());
        let handle = RealtimeClient::new(url, fast_policy(), recorder.clone()).mount();

        close_with(accept(&listener).await, 4000).await;
        let _second = timeout(Duration::from_secs(2), accept(&listener))
            .await
            .expect("client should reconnect");

        wait_for("reconnected status", || {
            recorder
                .last_status()
                .is_some_and(|s| s.connected && s.reconnect_attempts == 0)
        })
        .await;
        let saw_retry = recorder
            .statuses
            .lock()
            .unwrap()
            .iter()
            .any(|s| !s.connected && s.reconnect_attempts == 1);
        assert!(saw_retry);

        handle.unmount().await;
    }

    #[tokio::test]
    async fn normal_close_ends_the_cycle() {
        let (listener, url) = bind().await;
        let recorder = Arc::new(Recorder::default());
        let handle = RealtimeClient::new(url, fast_policy(), recorder.clone()).mount();

        close_with(accept(&listener).await, 1000).await;

        wait_for("client to stop", || !handle.is_running()).await;
        assert!(timeout(Duration::from_millis(300), listener.accept()).await.is_err());
        let status = recorder.last_status().unwrap();
        assert!(!status.connected);
        assert_eq!(status.reconnect_attempts, 0);
    }

    #[tokio::test]
    async fn gives_up_silently_once_attempts_are_exhausted() {
        let (listener, url) = bind().await;
        drop(listener);
        let recorder = Arc::new(Recorder::default());
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(10),
            max_attempts: 2,
        };
        let handle = RealtimeClient::new(url, policy, recorder.clone()).mount();

        wait_for("client to stop", || !handle.is_running()).await;
        let attempts: Vec<u32> = recorder
            .statuses
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.reconnect_attempts)
            .collect();
        assert_eq!(attempts, vec![1, 2, 0]);
        assert!(!recorder.last_status().unwrap().connected);
    }

    #[tokio::test]
    async fn unmount_cancels_a_pending_reconnect() {
        let (listener, url) = bind().await;
        let recorder = Arc::new(Recorder::default());
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(400),
            max_attempts: 5,
        };
        let handle = RealtimeClient::new(url, policy, recorder.clone()).mount();

        close_with(accept(&listener).await, 4000).await;
        wait_for("retry to be scheduled", || {
            recorder
                .last_status()
                .is_some_and(|s| !s.connected && s.reconnect_attempts == 1)
        })
        .await;
        let statuses_before = recorder.statuses.lock().unwrap().len();

        handle.unmount().await;

        assert!(
            timeout(Duration::from_millis(800), listener.accept())
                .await
                .is_err(),
            "no socket may be opened after unmount"
        );
        assert_eq!(recorder.statuses.lock().unwrap().len(), statuses_before);
    }

    #[tokio::test]
    async fn unmount_closes_socket_with_normal_code() {
        let (listener, url) = bind().await;
        let recorder = Arc::new(Recorder::default());
        let handle = RealtimeClient::new(url, fast_policy(), recorder.clone()).mount();
        let mut ws = accept(&listener).await;
        wait_for("connected", || recorder.last_status().is_some_and(|s| s.connected)).await;

        handle.unmount().await;

        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("close frame")
            .expect("stream open")
            .expect("valid frame");
        match msg {
            Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Normal),
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handler_swap_takes_effect_without_reconnecting() {
        let (listener, url) = bind().await;
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let handle = RealtimeClient::new(url, fast_policy(), first.clone()).mount();
        let mut ws = accept(&listener).await;

        ws.send(Message::Text(initial_message())).await.unwrap();
        wait_for("first handler", || first.stocks() == 1).await;

        handle.set_handler(second.clone());
        ws.send(Message::Text(initial_message())).await.unwrap();
        wait_for("second handler", || second.stocks() == 1).await;

        assert_eq!(first.stocks(), 1);
        assert!(timeout(Duration::from_millis(100), listener.accept()).await.is_err());
        handle.unmount().await;
    }
}
