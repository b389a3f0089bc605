//! No Alibi - baseline-relative facial pattern analysis engine
//!
//! The engine turns per-frame facial landmarks captured during a timed
//! question-and-answer session into sustained, rule-defined deviation patterns
//! through a deterministic pipeline: signal extraction → baseline calibration
//! → delta normalization → streak/confirmation detection → per-question
//! aggregation → session recurrence.
//!
//! ## Modules
//!
//! - **Live sessions**: drive an [`InterrogationProcessor`] from a capture loop,
//!   reading landmarks through a [`LandmarkMailbox`]
//! - **Replay**: run a recorded `alibi.session_event.v1` stream through the same
//!   pipeline with [`SessionEventAdapter`]
//! - **Reporting**: per-question commentary and the session case file
//!
//! The engine measures deviation from an individual's own baseline. It makes
//! no claim about deception, intent or emotional state.

pub mod baseline;
pub mod commentary;
pub mod config;
pub mod detector;
pub mod error;
pub mod mailbox;
pub mod normalizer;
pub mod pipeline;
pub mod question;
pub mod report;
pub mod rules;
pub mod schema;
pub mod session;
pub mod signals;
pub mod types;

pub use commentary::{CommentaryContext, PhraseBank};
pub use config::EngineConfig;
pub use detector::PatternDetector;
pub use error::AnalysisError;
pub use mailbox::LandmarkMailbox;
pub use pipeline::{InterrogationProcessor, Phase, SessionReport};
pub use report::CaseFileRenderer;
pub use session::{Category, SessionAggregate, SessionClassification};

// Schema exports
pub use schema::{SessionEvent, SessionEventAdapter, SESSION_SCHEMA_VERSION};

/// Engine version embedded in every session report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name embedded in every session report
pub const PRODUCER_NAME: &str = "no-alibi";
