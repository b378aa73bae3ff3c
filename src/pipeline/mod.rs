//! Per-session processing: frames in on the transport's thread, recognition on
//! worker threads, translation and synthesis on the render loop.
//!
//! The frame callback and the render loop meet only at the single-slot
//! [`ResultChannel`].

pub mod error;
pub mod mailbox;
pub mod render;
pub mod session;
pub mod worker;

pub use error::{ErrorReporter, LogReporter, MemoryReporter, NullReporter, StationError};
pub use mailbox::ResultChannel;
pub use render::{CollectorSink, Cycle, RenderSink, Renderer, Speech, View, unsupported_notice};
pub use session::{LanguagePair, Session, SessionConfig, SessionStats};
pub use worker::{Transcript, WorkerPool};
