//! Execution channel: one host-side endpoint for one player frame.
//!
//! The channel picks a session id, points its frame at the runtime page for
//! that id, and registers with the process-wide [`MessageRouter`]. Run
//! requests made before the runtime reports `ready` are buffered (last one
//! wins) and flushed on the `ready` transition.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use webplayer_core::Value;

use crate::config::PlayerConfig;
use crate::error::{ChannelError, ChannelResult};
use crate::protocol::{Envelope, EventKind, FileMap, RunMessage};
use crate::router::{Dispatch, EnvelopeSink, MessageRouter};
use crate::status::{ReadyTransition, RunRequest, RuntimeHandle, RuntimeStatus};

/// Random identifier tying runtime events to the channel that opened the frame.
///
/// Unguessable enough to keep unrelated frames apart; not a security boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::borrow::Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The isolated frame the runtime lives in.
pub trait Frame {
    /// Point the frame at the runtime page.
    fn load(&mut self, url: &str) -> ChannelResult<()>;

    /// Post a message into the frame (any target origin).
    fn post_message(&mut self, message: &RunMessage) -> ChannelResult<()>;
}

type EventCallback = Box<dyn FnMut(&Value)>;
type RunCallback = Box<dyn FnMut()>;

/// Host hooks. Each defaults to a no-op.
///
/// Hooks may call back into their channel, for instance to request another
/// run from `on_error`. A hook that re-enters itself is skipped.
pub struct ChannelCallbacks {
    on_error: EventCallback,
    on_console: EventCallback,
    on_run: RunCallback,
}

impl Default for ChannelCallbacks {
    fn default() -> Self {
        Self {
            on_error: Box::new(|_: &Value| {}),
            on_console: Box::new(|_: &Value| {}),
            on_run: Box::new(|| {}),
        }
    }
}

impl ChannelCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the payload of every `error` event.
    pub fn on_error(mut self, callback: impl FnMut(&Value) + 'static) -> Self {
        self.on_error = Box::new(callback);
        self
    }

    /// Called with the payload of every `console` event.
    pub fn on_console(mut self, callback: impl FnMut(&Value) + 'static) -> Self {
        self.on_console = Box::new(callback);
        self
    }

    /// Called at the start of every run request, delivered or buffered.
    pub fn on_run(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_run = Box::new(callback);
        self
    }
}

/// Hooks held by an open channel, each in its own cell.
struct Hooks {
    on_error: RefCell<EventCallback>,
    on_console: RefCell<EventCallback>,
    on_run: RefCell<RunCallback>,
}

impl From<ChannelCallbacks> for Hooks {
    fn from(callbacks: ChannelCallbacks) -> Self {
        Self {
            on_error: RefCell::new(callbacks.on_error),
            on_console: RefCell::new(callbacks.on_console),
            on_run: RefCell::new(callbacks.on_run),
        }
    }
}

fn call_event_hook(hook: &RefCell<EventCallback>, name: &str, payload: &Value) {
    match hook.try_borrow_mut() {
        Ok(mut hook) => (hook)(payload),
        Err(_) => tracing::warn!("Skipping re-entrant {} hook", name),
    }
}

/// What `run_application` did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Posted to the frame.
    Posted,
    /// Buffered until the runtime is ready.
    Queued,
}

struct ChannelState<F> {
    runtime: RuntimeHandle,
    frame: F,
}

/// Everything the router reaches through its weak route.
///
/// The runtime state and the hooks live in separate cells: hooks never run
/// while the state is borrowed.
struct ChannelInner<F> {
    session_id: SessionId,
    state: RefCell<ChannelState<F>>,
    hooks: Hooks,
}

impl<F: Frame> ChannelInner<F> {
    fn mark_ready(&self) -> Dispatch {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            tracing::warn!("Channel {} re-entered while posting", self.session_id);
            return Dispatch::Busy;
        };

        match state.runtime.mark_ready() {
            ReadyTransition::Entered(Some(request)) => {
                tracing::debug!(
                    "Runtime {} ready, delivering buffered run of {}",
                    self.session_id,
                    request.entry
                );
                let message = request.into_message();
                if let Err(e) = state.frame.post_message(&message) {
                    tracing::warn!("Failed to deliver buffered run to {}: {}", self.session_id, e);
                }
            }
            ReadyTransition::Entered(None) => {
                tracing::debug!("Runtime {} ready", self.session_id);
            }
            ReadyTransition::Ignored => {
                tracing::trace!("Ignoring repeated ready from {}", self.session_id);
            }
        }
        Dispatch::Delivered
    }
}

impl<F: Frame> EnvelopeSink for ChannelInner<F> {
    fn accept(&self, envelope: Envelope) -> Dispatch {
        if envelope.id != self.session_id.as_str() {
            return Dispatch::Unrouted;
        }

        match envelope.kind {
            EventKind::Ready => return self.mark_ready(),
            EventKind::Error => call_event_hook(&self.hooks.on_error, "error", &envelope.payload),
            EventKind::Console => {
                call_event_hook(&self.hooks.on_console, "console", &envelope.payload)
            }
            EventKind::Unknown => {
                tracing::trace!("Ignoring unknown event for {}", self.session_id);
            }
        }
        Dispatch::Delivered
    }
}

/// Host endpoint for one player frame.
///
/// Dropping the channel (or calling [`close`](Self::close)) deregisters it
/// from the router; a run still buffered at that point is discarded.
pub struct ExecutionChannel<F: Frame + 'static> {
    inner: Rc<ChannelInner<F>>,
    router: MessageRouter,
    frame_url: String,
}

impl<F: Frame + 'static> ExecutionChannel<F> {
    /// Open a channel with a fresh session id and load the runtime page into `frame`.
    pub fn open(
        router: &MessageRouter,
        config: &PlayerConfig,
        frame: F,
        callbacks: ChannelCallbacks,
    ) -> ChannelResult<Self> {
        Self::open_with_id(router, config, frame, callbacks, SessionId::generate())
    }

    /// Open a channel with a caller-chosen session id.
    pub fn open_with_id(
        router: &MessageRouter,
        config: &PlayerConfig,
        mut frame: F,
        callbacks: ChannelCallbacks,
        session_id: SessionId,
    ) -> ChannelResult<Self> {
        let frame_url = config.frame_url(&session_id);
        frame.load(&frame_url)?;

        let inner = Rc::new(ChannelInner {
            session_id: session_id.clone(),
            state: RefCell::new(ChannelState {
                runtime: RuntimeHandle::new(),
                frame,
            }),
            hooks: Hooks::from(callbacks),
        });
        let sink: Weak<dyn EnvelopeSink> = Rc::downgrade(&inner) as _;
        router.register(session_id.clone(), sink);

        tracing::debug!("Opened channel {} at {}", session_id, frame_url);
        Ok(Self {
            inner,
            router: router.clone(),
            frame_url,
        })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.inner.session_id
    }

    /// Address the frame was loaded with.
    pub fn frame_url(&self) -> &str {
        &self.frame_url
    }

    pub fn status(&self) -> RuntimeStatus {
        self.inner.state.borrow().runtime.status()
    }

    /// The run waiting for the runtime, if any.
    pub fn pending_run(&self) -> Option<RunRequest> {
        self.inner.state.borrow().runtime.pending().cloned()
    }

    /// Access the frame.
    pub fn with_frame<R>(&self, f: impl FnOnce(&F) -> R) -> R {
        f(&self.inner.state.borrow().frame)
    }

    /// Handle a raw boundary message addressed to this channel.
    ///
    /// Undecodable messages and messages for other sessions are dropped.
    pub fn receive(&self, raw: &str) -> Dispatch {
        match Envelope::decode(raw) {
            Ok(envelope) => self.inner.accept(envelope),
            Err(e) => {
                tracing::trace!("Dropping malformed message: {}", e);
                Dispatch::Malformed
            }
        }
    }

    /// Ask the runtime to execute `entry` from `file_map`.
    ///
    /// The host's run hook fires first, whatever happens next. While the
    /// runtime is loading the request replaces any buffered one. Fails with
    /// [`ChannelError::Reentrant`] only when called from inside the frame
    /// while it is being posted to.
    pub fn run_application(&self, file_map: FileMap, entry: impl Into<String>) -> ChannelResult<Delivery> {
        match self.inner.hooks.on_run.try_borrow_mut() {
            Ok(mut on_run) => (on_run)(),
            Err(_) => tracing::warn!("Skipping re-entrant run hook"),
        }

        let mut state = self
            .inner
            .state
            .try_borrow_mut()
            .map_err(|_| ChannelError::Reentrant(self.inner.session_id.to_string()))?;

        match state.runtime.request_run(RunRequest::new(file_map, entry)) {
            Some(request) => {
                tracing::debug!("Posting run of {} to {}", request.entry, self.inner.session_id);
                state.frame.post_message(&request.into_message())?;
                Ok(Delivery::Posted)
            }
            None => {
                tracing::debug!("Runtime {} still loading, run buffered", self.inner.session_id);
                Ok(Delivery::Queued)
            }
        }
    }

    /// Deregister from the router. Equivalent to dropping the channel.
    pub fn close(self) {}
}

impl<F: Frame + 'static> Drop for ExecutionChannel<F> {
    fn drop(&mut self) {
        self.router.unregister(self.inner.session_id.as_str());
        let Ok(mut state) = self.inner.state.try_borrow_mut() else {
            return;
        };
        if let Some(request) = state.runtime.discard() {
            tracing::debug!(
                "Channel {} closed with undelivered run of {}",
                self.inner.session_id,
                request.entry
            );
        }
    }
}

impl<F: Frame + 'static> fmt::Debug for ExecutionChannel<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionChannel")
            .field("session_id", &self.inner.session_id)
            .field("frame_url", &self.frame_url)
            .finish_non_exhaustive()
    }
}

/// A frame that keeps what it was given. For headless hosts and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingFrame {
    pub url: Option<String>,
    pub posted: Vec<RunMessage>,
}

impl Frame for RecordingFrame {
    fn load(&mut self, url: &str) -> ChannelResult<()> {
        self.url = Some(url.to_string());
        Ok(())
    }

    fn post_message(&mut self, message: &RunMessage) -> ChannelResult<()> {
        self.posted.push(message.clone());
        Ok(())
    }
}
