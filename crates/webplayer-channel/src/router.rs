//! The single inbound listener shared by every channel in a process.
//!
//! Raw boundary messages are decoded once and handed to the channel whose
//! session id they carry. Messages for unknown sessions are dropped.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use crate::channel::SessionId;
use crate::protocol::Envelope;

/// Receives envelopes routed to one session.
pub(crate) trait EnvelopeSink {
    fn accept(&self, envelope: Envelope) -> Dispatch;
}

type Route = Weak<dyn EnvelopeSink>;

/// What happened to a dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to the channel owning the session id.
    Delivered,
    /// Not decodable as an envelope.
    Malformed,
    /// No open channel has this session id.
    Unrouted,
    /// The target channel was posting to its frame and the frame re-entered it.
    Busy,
}

/// Dispatch table keyed by session id.
///
/// Cloning yields another handle to the same table. Channels register on open
/// and deregister on close, so repeated open/close cycles leave nothing behind.
#[derive(Clone, Default)]
pub struct MessageRouter {
    routes: Rc<RefCell<FxHashMap<SessionId, Route>>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.routes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.borrow().is_empty()
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.routes.borrow().contains_key(id)
    }

    pub(crate) fn register(&self, id: SessionId, sink: Route) {
        tracing::debug!("Registering channel {}", id);
        self.routes.borrow_mut().insert(id, sink);
    }

    pub(crate) fn unregister(&self, id: &str) -> bool {
        let removed = self.routes.borrow_mut().remove(id).is_some();
        if removed {
            tracing::debug!("Unregistered channel {}", id);
        }
        removed
    }

    /// Decode a raw message and deliver it to the channel it names.
    ///
    /// Never fails: undecodable or unroutable messages are dropped.
    pub fn dispatch(&self, raw: &str) -> Dispatch {
        let envelope = match Envelope::decode(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::trace!("Dropping malformed message: {}", e);
                return Dispatch::Malformed;
            }
        };
        self.deliver(envelope)
    }

    /// Deliver an already decoded envelope.
    pub fn deliver(&self, envelope: Envelope) -> Dispatch {
        let route = self.routes.borrow().get(envelope.id.as_str()).cloned();
        let Some(route) = route else {
            tracing::trace!("Dropping message for unknown session {}", envelope.id);
            return Dispatch::Unrouted;
        };

        let Some(sink) = route.upgrade() else {
            self.routes.borrow_mut().remove(envelope.id.as_str());
            return Dispatch::Unrouted;
        };

        sink.accept(envelope)
    }

    /// Dispatch messages from `rx` until every sender is gone.
    ///
    /// Returns how many messages were delivered to a channel.
    pub async fn listen(&self, mut rx: mpsc::UnboundedReceiver<String>) -> usize {
        let mut delivered = 0;
        while let Some(raw) = rx.recv().await {
            if self.dispatch(&raw) == Dispatch::Delivered {
                delivered += 1;
            }
        }
        tracing::debug!("Boundary listener closed after {} deliveries", delivered);
        delivered
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes = self.routes.borrow();
        let mut ids: Vec<&str> = routes.keys().map(SessionId::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("MessageRouter").field("sessions", &ids).finish()
    }
}
