//! Recorded alibi.session_event.v1 stream
//!
//! This module defines the on-disk event format for recorded sessions, its
//! validation, and replay through the analysis pipeline.

mod session_event;
mod adapter;

pub use session_event::*;
pub use adapter::*;
