//! Integration tests for the execution channel lifecycle.
//!
//! Covers run buffering across the ready transition, session filtering
//! through the shared router, and listener cleanup on close.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::mpsc;
use webplayer_channel::{
    ChannelCallbacks, ChannelError, ChannelResult, Delivery, Dispatch, ExecutionChannel, FileMap,
    Frame, MessageRouter, PlayerConfig, RecordingFrame, RunMessage, RuntimeStatus,
};
use webplayer_core::Value;

// =============================================================================
// Test Helpers
// =============================================================================

/// Everything the host callbacks saw.
#[derive(Default)]
struct HostLog {
    errors: Vec<Value>,
    console: Vec<Value>,
    runs: usize,
}

fn callbacks(log: &Rc<RefCell<HostLog>>) -> ChannelCallbacks {
    let errors = log.clone();
    let console = log.clone();
    let runs = log.clone();
    ChannelCallbacks::new()
        .on_error(move |payload| errors.borrow_mut().errors.push(payload.clone()))
        .on_console(move |payload| console.borrow_mut().console.push(payload.clone()))
        .on_run(move || runs.borrow_mut().runs += 1)
}

fn open(router: &MessageRouter, log: &Rc<RefCell<HostLog>>) -> ExecutionChannel<RecordingFrame> {
    ExecutionChannel::open(
        router,
        &PlayerConfig::default(),
        RecordingFrame::default(),
        callbacks(log),
    )
    .expect("Failed to open channel")
}

fn files(entry: &str, source: &str) -> FileMap {
    let mut files = FileMap::new();
    files.insert(entry.to_string(), source.to_string());
    files
}

fn event(id: &str, kind: &str, payload: &str) -> String {
    format!(r#"{{"id":"{}","type":"{}","payload":{}}}"#, id, kind, payload)
}

fn posted(channel: &ExecutionChannel<RecordingFrame>) -> Vec<RunMessage> {
    channel.with_frame(|frame| frame.posted.clone())
}

/// A frame whose posts always fail.
struct BrokenFrame;

impl Frame for BrokenFrame {
    fn load(&mut self, _url: &str) -> ChannelResult<()> {
        Ok(())
    }

    fn post_message(&mut self, _message: &RunMessage) -> ChannelResult<()> {
        Err(ChannelError::Frame("frame detached".to_string()))
    }
}

// =============================================================================
// Run Buffering
// =============================================================================

#[test]
fn test_run_before_ready_is_delivered_on_ready() {
    let router = MessageRouter::new();
    let log = Rc::new(RefCell::new(HostLog::default()));
    let channel = open(&router, &log);

    let delivery = channel
        .run_application(files("/index.js", "console.log(1)"), "/index.js")
        .unwrap();
    assert_eq!(delivery, Delivery::Queued);
    assert!(posted(&channel).is_empty());
    assert_eq!(log.borrow().runs, 1);

    let id = channel.session_id().to_string();
    assert_eq!(router.dispatch(&event(&id, "ready", "null")), Dispatch::Delivered);

    assert_eq!(channel.status(), RuntimeStatus::Ready);
    assert_eq!(
        posted(&channel),
        vec![RunMessage::new(files("/index.js", "console.log(1)"), "/index.js")]
    );
    assert_eq!(
        posted(&channel)[0].to_json().unwrap(),
        r#"{"fileMap":{"/index.js":"console.log(1)"},"entry":"/index.js","source":"rnwp"}"#
    );
    assert!(channel.pending_run().is_none());
}

#[test]
fn test_only_last_run_before_ready_is_delivered() {
    let router = MessageRouter::new();
    let log = Rc::new(RefCell::new(HostLog::default()));
    let channel = open(&router, &log);

    for n in 0..5 {
        let entry = format!("/v{}.js", n);
        channel
            .run_application(files(&entry, "1"), entry.as_str())
            .unwrap();
    }
    assert_eq!(log.borrow().runs, 5);
    assert_eq!(channel.pending_run().unwrap().entry, "/v4.js");

    router.dispatch(&event(channel.session_id().as_str(), "ready", "null"));

    let messages = posted(&channel);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].entry, "/v4.js");
}

#[test]
fn test_runs_after_ready_post_immediately() {
    let router = MessageRouter::new();
    let log = Rc::new(RefCell::new(HostLog::default()));
    let channel = open(&router, &log);
    router.dispatch(&event(channel.session_id().as_str(), "ready", "null"));
    assert!(posted(&channel).is_empty());

    for n in 1..=3 {
        let delivery = channel
            .run_application(files("/index.js", "x"), "/index.js")
            .unwrap();
        assert_eq!(delivery, Delivery::Posted);
        assert_eq!(posted(&channel).len(), n);
    }
    assert_eq!(log.borrow().runs, 3);
}

#[test]
fn test_second_ready_does_not_redeliver() {
    let router = MessageRouter::new();
    let log = Rc::new(RefCell::new(HostLog::default()));
    let channel = open(&router, &log);
    let id = channel.session_id().to_string();

    channel
        .run_application(files("/index.js", "x"), "/index.js")
        .unwrap();
    router.dispatch(&event(&id, "ready", "null"));
    router.dispatch(&event(&id, "ready", "null"));

    assert_eq!(posted(&channel).len(), 1);
    assert_eq!(log.borrow().runs, 1);
}

#[test]
fn test_post_failure_surfaces_from_run_application() {
    let router = MessageRouter::new();
    let channel = ExecutionChannel::open(
        &router,
        &PlayerConfig::default(),
        BrokenFrame,
        ChannelCallbacks::new(),
    )
    .unwrap();
    router.dispatch(&event(channel.session_id().as_str(), "ready", "null"));

    let result = channel.run_application(files("/index.js", "x"), "/index.js");
    assert!(matches!(result, Err(ChannelError::Frame(_))));
}

#[test]
fn test_post_failure_on_ready_flush_is_swallowed() {
    let router = MessageRouter::new();
    let channel = ExecutionChannel::open(
        &router,
        &PlayerConfig::default(),
        BrokenFrame,
        ChannelCallbacks::new(),
    )
    .unwrap();
    channel
        .run_application(files("/index.js", "x"), "/index.js")
        .unwrap();

    let outcome = router.dispatch(&event(channel.session_id().as_str(), "ready", "null"));
    assert_eq!(outcome, Dispatch::Delivered);
    assert_eq!(channel.status(), RuntimeStatus::Ready);
    assert!(channel.pending_run().is_none());
}

// =============================================================================
// Event Routing
// =============================================================================

#[test]
fn test_foreign_session_never_reaches_callbacks() {
    let router = MessageRouter::new();
    let log = Rc::new(RefCell::new(HostLog::default()));
    let channel = open(&router, &log);
    channel
        .run_application(files("/index.js", "x"), "/index.js")
        .unwrap();

    let foreign = format!("{}-other", channel.session_id());
    for (kind, payload) in [
        ("ready", "null"),
        ("error", r#"{"message":"boom"}"#),
        ("console", r#"["hi"]"#),
        ("console", r#"{"__type":"number","value":"bogus"}"#),
    ] {
        assert_ne!(router.dispatch(&event(&foreign, kind, payload)), Dispatch::Delivered);
        assert_ne!(channel.receive(&event(&foreign, kind, payload)), Dispatch::Delivered);
    }

    let log = log.borrow();
    assert!(log.errors.is_empty());
    assert!(log.console.is_empty());
    assert_eq!(channel.status(), RuntimeStatus::Loading);
    assert!(posted(&channel).is_empty());
}

#[test]
fn test_events_reach_their_own_channel() {
    let router = MessageRouter::new();
    let first_log = Rc::new(RefCell::new(HostLog::default()));
    let second_log = Rc::new(RefCell::new(HostLog::default()));
    let first = open(&router, &first_log);
    let second = open(&router, &second_log);
    assert_eq!(router.len(), 2);

    router.dispatch(&event(first.session_id().as_str(), "console", r#"["one"]"#));
    router.dispatch(&event(second.session_id().as_str(), "error", r#"{"message":"two"}"#));

    assert_eq!(first_log.borrow().console.len(), 1);
    assert!(first_log.borrow().errors.is_empty());
    assert_eq!(second_log.borrow().errors.len(), 1);
    assert!(second_log.borrow().console.is_empty());
}

#[test]
fn test_console_and_error_before_ready_are_forwarded() {
    let router = MessageRouter::new();
    let log = Rc::new(RefCell::new(HostLog::default()));
    let channel = open(&router, &log);
    let id = channel.session_id().to_string();

    channel.receive(&event(&id, "console", r#"[{"__type":"number","value":"NaN"}]"#));
    channel.receive(&event(&id, "error", r#"{"__type":"error","name":"Error","message":"early"}"#));
    assert_eq!(channel.status(), RuntimeStatus::Loading);

    channel.receive(&event(&id, "ready", "null"));
    channel.receive(&event(&id, "console", r#"["late"]"#));

    let log = log.borrow();
    assert_eq!(log.console.len(), 2);
    assert!(log.console[0].as_array().unwrap()[0].as_f64().unwrap().is_nan());
    assert_eq!(log.console[1].to_string(), "[ 'late' ]");
    assert_eq!(
        log.errors,
        vec![Value::Error {
            name: "Error".to_string(),
            message: "early".to_string(),
            stack: None,
        }]
    );
}

#[test]
fn test_malformed_and_unknown_messages_are_noise() {
    let router = MessageRouter::new();
    let log = Rc::new(RefCell::new(HostLog::default()));
    let channel = open(&router, &log);
    let id = channel.session_id().to_string();

    assert_eq!(router.dispatch("garbage"), Dispatch::Malformed);
    assert_eq!(router.dispatch(r#"{"type":"ready"}"#), Dispatch::Malformed);
    assert_eq!(router.dispatch(&event(&id, "resize", "{}")), Dispatch::Delivered);

    let log = log.borrow();
    assert!(log.console.is_empty());
    assert!(log.errors.is_empty());
    assert_eq!(channel.status(), RuntimeStatus::Loading);
}

// =============================================================================
// Host Hooks
// =============================================================================

type ChannelSlot = Rc<RefCell<Option<Rc<ExecutionChannel<RecordingFrame>>>>>;

#[test]
fn test_error_hook_can_rerun_the_application() {
    let router = MessageRouter::new();
    let slot: ChannelSlot = Rc::new(RefCell::new(None));
    let reruns = Rc::new(RefCell::new(Vec::new()));
    let runs = Rc::new(RefCell::new(0));

    let hook_slot = slot.clone();
    let hook_reruns = reruns.clone();
    let hook_runs = runs.clone();
    let callbacks = ChannelCallbacks::new()
        .on_run(move || *hook_runs.borrow_mut() += 1)
        .on_error(move |_| {
            let channel = hook_slot.borrow().clone();
            if let Some(channel) = channel {
                let outcome = channel.run_application(files("/index.js", "retry()"), "/index.js");
                hook_reruns.borrow_mut().push(outcome.map_err(|e| e.to_string()));
            }
        });

    let channel = Rc::new(
        ExecutionChannel::open(&router, &PlayerConfig::default(), RecordingFrame::default(), callbacks)
            .expect("Failed to open channel"),
    );
    *slot.borrow_mut() = Some(channel.clone());
    let id = channel.session_id().to_string();

    router.dispatch(&event(&id, "ready", "null"));
    assert_eq!(
        router.dispatch(&event(&id, "error", r#"{"message":"boom"}"#)),
        Dispatch::Delivered
    );

    assert_eq!(*reruns.borrow(), vec![Ok(Delivery::Posted)]);
    assert_eq!(*runs.borrow(), 1);
    let posted = posted(&channel);
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].file_map["/index.js"], "retry()");

    slot.borrow_mut().take();
}

#[test]
fn test_run_hook_can_read_channel_state() {
    let router = MessageRouter::new();
    let slot: ChannelSlot = Rc::new(RefCell::new(None));
    let seen = Rc::new(RefCell::new(Vec::new()));

    let hook_slot = slot.clone();
    let hook_seen = seen.clone();
    let callbacks = ChannelCallbacks::new().on_run(move || {
        if let Some(channel) = hook_slot.borrow().as_ref() {
            hook_seen.borrow_mut().push(channel.status());
        }
    });

    let channel = Rc::new(
        ExecutionChannel::open(&router, &PlayerConfig::default(), RecordingFrame::default(), callbacks)
            .expect("Failed to open channel"),
    );
    *slot.borrow_mut() = Some(channel.clone());

    channel.run_application(files("/index.js", "x"), "/index.js").unwrap();
    router.dispatch(&event(channel.session_id().as_str(), "ready", "null"));
    channel.run_application(files("/index.js", "y"), "/index.js").unwrap();

    assert_eq!(*seen.borrow(), vec![RuntimeStatus::Loading, RuntimeStatus::Ready]);

    slot.borrow_mut().take();
}

// =============================================================================
// Teardown
// =============================================================================

#[test]
fn test_open_close_cycles_leave_router_empty() {
    let router = MessageRouter::new();
    let log = Rc::new(RefCell::new(HostLog::default()));

    for _ in 0..10 {
        let channel = open(&router, &log);
        channel
            .run_application(files("/index.js", "x"), "/index.js")
            .unwrap();
        channel.close();
    }
    assert!(router.is_empty());
}

#[test]
fn test_closed_channel_receives_nothing() {
    let router = MessageRouter::new();
    let log = Rc::new(RefCell::new(HostLog::default()));
    let channel = open(&router, &log);
    let id = channel.session_id().to_string();
    drop(channel);

    assert!(!router.is_registered(&id));
    assert_eq!(router.dispatch(&event(&id, "console", "[]")), Dispatch::Unrouted);
    assert!(log.borrow().console.is_empty());
}

// =============================================================================
// Boundary Listener
// =============================================================================

#[tokio::test]
async fn test_listen_dispatches_until_senders_close() {
    let router = MessageRouter::new();
    let log = Rc::new(RefCell::new(HostLog::default()));
    let channel = open(&router, &log);
    let id = channel.session_id().to_string();
    channel
        .run_application(files("/index.js", "console.log(1)"), "/index.js")
        .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(event(&id, "console", r#"["booting"]"#)).unwrap();
    tx.send("not json".to_string()).unwrap();
    tx.send(event("someone-else", "ready", "null")).unwrap();
    tx.send(event(&id, "ready", "null")).unwrap();
    drop(tx);

    let delivered = router.listen(rx).await;

    assert_eq!(delivered, 2);
    assert_eq!(log.borrow().console.len(), 1);
    assert_eq!(posted(&channel).len(), 1);
}
