//! Host side of the web player.
//!
//! Runs application code in an isolated player frame and relays what the
//! runtime reports back to the host.
//!
//! # Architecture
//!
//! - **Channel**: One endpoint per frame; buffers runs until the runtime is ready
//! - **Router**: The single inbound listener, dispatching by session id
//! - **Protocol**: Envelope and run message types
//! - **Config**: Player options and the frame address

pub mod channel;
pub mod config;
pub mod error;
pub mod protocol;
pub mod router;
pub mod status;

pub use channel::{ChannelCallbacks, Delivery, ExecutionChannel, Frame, RecordingFrame, SessionId};
pub use config::{DeviceChrome, Platform, PlayerConfig};
pub use error::{ChannelError, ChannelResult};
pub use protocol::{Envelope, EventKind, FileMap, RUN_SOURCE, RunMessage};
pub use router::{Dispatch, MessageRouter};
pub use status::{ReadyTransition, RunRequest, RuntimeHandle, RuntimeStatus};
