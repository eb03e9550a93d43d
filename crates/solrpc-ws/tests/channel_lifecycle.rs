//! Subscription channel lifecycle against a scripted socket.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use solrpc_core::error::TransportError;
use solrpc_core::store::{InMemoryStore, MessageStore};
use solrpc_ws::{
    ChannelState, HandlerAction, SocketConnector, SocketEvent, SubscriptionChannel,
    TransportSocket, WsClientConfig,
};

const ENDPOINT: &str = "wss://pubsub.test";
const BODY: &str = r#"{"jsonrpc":"2.0","id":1,"method":"accountSubscribe","params":["abc"]}"#;
const CONFIRMATION: &str = r#"{"jsonrpc":"2.0","result":42,"id":1}"#;

fn notification(n: u64) -> String {
    format!(
        r#"{{"jsonrpc":"2.0","method":"accountNotification","params":{{"result":{{"n":{n}}},"subscription":42}}}}"#
    )
}

// ─── Scripted connector ───────────────────────────────────────────────────────

enum Step {
    Frame(String),
    Close,
}

enum Session {
    Refuse,
    Script { steps: Vec<Step>, answer_pings: bool },
}

fn script(steps: Vec<Step>) -> Session {
    Session::Script {
        steps,
        answer_pings: false,
    }
}

#[derive(Default)]
struct Shared {
    sessions: VecDeque<Session>,
    connects: usize,
    sent: Vec<Vec<String>>,
    pings: Vec<usize>,
}

#[derive(Clone, Default)]
struct MockConnector {
    shared: Arc<Mutex<Shared>>,
}

impl MockConnector {
    fn new(sessions: Vec<Session>) -> Self {
        let shared = Shared {
            sessions: sessions.into(),
            ..Default::default()
        };
        Self {
            shared: Arc::new(Mutex::new(shared)),
        }
    }

    fn connects(&self) -> usize {
        self.shared.lock().unwrap().connects
    }

    fn sent(&self) -> Vec<Vec<String>> {
        self.shared.lock().unwrap().sent.clone()
    }

    fn pings(&self) -> Vec<usize> {
        self.shared.lock().unwrap().pings.clone()
    }
}

#[async_trait]
impl SocketConnector for MockConnector {
    async fn connect(&self, _endpoint: &str) -> Result<Box<dyn TransportSocket>, TransportError> {
        let mut shared = self.shared.lock().unwrap();
        shared.connects += 1;
        match shared.sessions.pop_front() {
            Some(Session::Script {
                steps,
                answer_pings,
            }) => {
                let index = shared.sent.len();
                shared.sent.push(Vec::new());
                shared.pings.push(0);
                Ok(Box::new(MockSocket {
                    shared: Arc::clone(&self.shared),
                    index,
                    steps: steps.into(),
                    answer_pings,
                    pending_pongs: 0,
                }))
            }
            Some(Session::Refuse) | None => {
                Err(TransportError::WebSocket("connection refused".into()))
            }
        }
    }
}

struct MockSocket {
    shared: Arc<Mutex<Shared>>,
    index: usize,
    steps: VecDeque<Step>,
    answer_pings: bool,
    pending_pongs: usize,
}

#[async_trait]
impl TransportSocket for MockSocket {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.shared.lock().unwrap().sent[self.index].push(text);
        Ok(())
    }

    async fn send_ping(&mut self) -> Result<(), TransportError> {
        self.shared.lock().unwrap().pings[self.index] += 1;
        if self.answer_pings {
            self.pending_pongs += 1;
        }
        Ok(())
    }

    async fn next_event(&mut self) -> SocketEvent {
        if self.pending_pongs > 0 {
            self.pending_pongs -= 1;
            return SocketEvent::Pong;
        }
        match self.steps.pop_front() {
            Some(Step::Frame(text)) => SocketEvent::Message(text),
            Some(Step::Close) => SocketEvent::Closed(Some("1006 abnormal".into())),
            None => std::future::pending::<SocketEvent>().await,
        }
    }

    async fn close(&mut self) {}
}

fn fast_config() -> WsClientConfig {
    WsClientConfig::default()
        .with_retry(3, Duration::from_millis(1))
        .with_keepalive(Duration::from_secs(60), 2)
}

fn channel(connector: &MockConnector, config: WsClientConfig) -> SubscriptionChannel {
    SubscriptionChannel::new(ENDPOINT, config)
        .unwrap()
        .with_connector(Arc::new(connector.clone()))
}

// ─── Delivery ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn request_goes_out_before_first_frame_is_handled() {
    let connector = MockConnector::new(vec![script(vec![Step::Frame(CONFIRMATION.into())])]);
    let mut ch = channel(&connector, fast_config());

    let probe = connector.clone();
    let mut sent_before_handler = Vec::new();
    ch.connect(BODY, |_| {
        sent_before_handler = probe.sent()[0].clone();
        HandlerAction::Stop
    })
    .await
    .unwrap();

    assert_eq!(sent_before_handler, vec![BODY.to_string()]);
    assert_eq!(ch.state(), ChannelState::Closed);
}

#[tokio::test]
async fn frames_reach_handler_in_arrival_order() {
    let mut steps = vec![Step::Frame(CONFIRMATION.into())];
    steps.extend((1..=5).map(|n| Step::Frame(notification(n))));
    let connector = MockConnector::new(vec![script(steps)]);
    let mut ch = channel(&connector, fast_config());

    let mut seen = Vec::new();
    ch.connect(BODY, |msg| {
        seen.push(msg.to_string());
        if seen.len() == 6 {
            HandlerAction::Stop
        } else {
            HandlerAction::Continue
        }
    })
    .await
    .unwrap();

    let mut expected = vec![CONFIRMATION.to_string()];
    expected.extend((1..=5).map(notification));
    assert_eq!(seen, expected);
    assert_eq!(ch.handle().map(|h| h.subscription_id), Some(42));
}

// ─── Failure handling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn first_connect_failure_is_returned_without_retry() {
    let connector = MockConnector::new(vec![Session::Refuse, Session::Refuse]);
    let mut ch = channel(&connector, fast_config());

    let mut calls = 0;
    let err = ch.connect(BODY, |_| calls += 1).await.unwrap_err();

    assert!(matches!(err, TransportError::WebSocket(_)));
    assert_eq!(connector.connects(), 1);
    assert_eq!(calls, 0);
    assert_eq!(ch.state(), ChannelState::Closed);
}

#[tokio::test]
async fn drop_after_streaming_reconnects_and_resets_counter() {
    let mut first = vec![Step::Frame(CONFIRMATION.into())];
    first.extend((1..=3).map(|n| Step::Frame(notification(n))));
    first.push(Step::Close);
    let second = vec![
        Step::Frame(r#"{"jsonrpc":"2.0","result":43,"id":1}"#.into()),
        Step::Frame(notification(4)),
    ];
    let connector = MockConnector::new(vec![script(first), script(second)]);
    let mut ch = channel(&connector, fast_config());

    let mut seen = Vec::new();
    ch.connect(BODY, |msg| {
        seen.push(msg.to_string());
        if seen.len() == 6 {
            HandlerAction::Stop
        } else {
            HandlerAction::Continue
        }
    })
    .await
    .unwrap();

    assert_eq!(seen[..4], [CONFIRMATION.to_string(), notification(1), notification(2), notification(3)]);
    assert_eq!(seen[5], notification(4));
    assert_eq!(connector.connects(), 2);
    assert_eq!(ch.retry_count(), 0);
    assert_eq!(ch.handle().map(|h| h.subscription_id), Some(43));
}

#[tokio::test]
async fn repeated_drops_exhaust_retry_budget() {
    let sessions = (0..5).map(|_| script(vec![Step::Close])).collect();
    let connector = MockConnector::new(sessions);
    let mut ch = channel(&connector, fast_config());

    let err = ch.connect(BODY, |_| ()).await.unwrap_err();

    assert!(matches!(err, TransportError::ChannelExhausted { attempts: 4 }));
    assert_eq!(connector.connects(), 4);
    assert_eq!(ch.retry_count(), 4);
    assert_eq!(ch.state(), ChannelState::Closed);
}

#[tokio::test]
async fn reconnect_failures_count_toward_budget() {
    let connector = MockConnector::new(vec![
        script(vec![Step::Close]),
        Session::Refuse,
        Session::Refuse,
        Session::Refuse,
        script(vec![Step::Frame(CONFIRMATION.into())]),
    ]);
    let mut ch = channel(&connector, fast_config());

    let err = ch.connect(BODY, |_| ()).await.unwrap_err();

    assert!(matches!(err, TransportError::ChannelExhausted { attempts: 4 }));
    assert_eq!(connector.connects(), 4);
}

#[tokio::test]
async fn reconnect_resends_original_request() {
    let connector = MockConnector::new(vec![
        script(vec![Step::Close]),
        script(vec![Step::Frame(CONFIRMATION.into())]),
    ]);
    let mut ch = channel(&connector, fast_config().with_unsubscribe_on_stop(false));

    ch.connect(BODY, |_| HandlerAction::Stop).await.unwrap();

    let sent = connector.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], vec![BODY.to_string()]);
    assert_eq!(sent[1], vec![BODY.to_string()]);
}

#[tokio::test]
async fn rejected_subscription_is_not_retried() {
    let rejection = r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid param: WrongSize"},"id":1}"#;
    let connector = MockConnector::new(vec![
        script(vec![Step::Frame(rejection.into())]),
        script(vec![Step::Frame(CONFIRMATION.into())]),
    ]);
    let mut ch = channel(&connector, fast_config());

    let mut calls = 0;
    let err = ch.connect(BODY, |_| calls += 1).await.unwrap_err();

    match err {
        TransportError::Rpc(e) => assert_eq!(e.code, -32602),
        other => panic!("expected rpc error, got {other:?}"),
    }
    assert_eq!(calls, 0);
    assert_eq!(connector.connects(), 1);
    assert_eq!(ch.state(), ChannelState::Closed);
}

// ─── Keepalive ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn unanswered_probes_force_reconnect() {
    let connector = MockConnector::new(vec![
        script(vec![Step::Frame(CONFIRMATION.into())]),
        script(vec![Step::Frame(CONFIRMATION.into())]),
    ]);
    let config = fast_config().with_keepalive(Duration::from_secs(60), 2);
    let mut ch = channel(&connector, config);

    let mut seen = 0;
    ch.connect(BODY, |_| {
        seen += 1;
        if seen == 2 {
            HandlerAction::Stop
        } else {
            HandlerAction::Continue
        }
    })
    .await
    .unwrap();

    assert_eq!(connector.connects(), 2);
    assert_eq!(connector.pings()[0], 2);
}

#[tokio::test(start_paused = true)]
async fn answered_probes_keep_socket_open() {
    let connector = MockConnector::new(vec![Session::Script {
        steps: vec![Step::Frame(CONFIRMATION.into())],
        answer_pings: true,
    }]);
    let config = fast_config().with_keepalive(Duration::from_secs(60), 2);
    let mut ch = channel(&connector, config);

    // Ten keepalive periods with every probe answered.
    let outcome =
        tokio::time::timeout(Duration::from_secs(630), ch.connect(BODY, |_| ())).await;

    assert!(outcome.is_err(), "channel should still be streaming");
    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.pings()[0], 10);
}

// ─── Stop ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stop_sends_unsubscribe() {
    let connector = MockConnector::new(vec![script(vec![
        Step::Frame(CONFIRMATION.into()),
        Step::Frame(notification(1)),
    ])]);
    let mut ch = channel(&connector, fast_config());

    let mut seen = 0;
    ch.connect(BODY, |_| {
        seen += 1;
        if seen == 2 {
            HandlerAction::Stop
        } else {
            HandlerAction::Continue
        }
    })
    .await
    .unwrap();

    let sent = connector.sent();
    assert_eq!(
        sent[0],
        vec![
            BODY.to_string(),
            r#"{"jsonrpc":"2.0","id":1,"method":"accountUnsubscribe","params":[42]}"#.to_string(),
        ]
    );
}

#[tokio::test]
async fn stop_without_unsubscribe_when_disabled() {
    let connector = MockConnector::new(vec![script(vec![Step::Frame(CONFIRMATION.into())])]);
    let mut ch = channel(&connector, fast_config().with_unsubscribe_on_stop(false));

    ch.connect(BODY, |_| HandlerAction::Stop).await.unwrap();

    assert_eq!(connector.sent()[0], vec![BODY.to_string()]);
}

// ─── Store tap ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn inbound_frames_are_appended_to_store() {
    let connector = MockConnector::new(vec![script(vec![
        Step::Frame(CONFIRMATION.into()),
        Step::Frame(notification(1)),
    ])]);
    let store = Arc::new(InMemoryStore::new(None));
    let mut ch = channel(&connector, fast_config()).with_store(store.clone());

    let mut seen = 0;
    ch.connect(BODY, |_| {
        seen += 1;
        if seen == 2 {
            HandlerAction::Stop
        } else {
            HandlerAction::Continue
        }
    })
    .await
    .unwrap();

    assert_eq!(store.len(), 2);
    let (oldest, _) = store.pop_oldest().unwrap().unwrap();
    assert_eq!(oldest, CONFIRMATION);
}
