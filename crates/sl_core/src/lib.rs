//! # sl_core - Live Session Tracking Core
//!
//! Client-side real-time engine behind the coaching app's live match and
//! training screens. Tracks elapsed time with pause/resume and crash
//! recovery, player on-pitch/bench status with minutes-played accounting,
//! derived fatigue levels, and per-player criterion evaluations, then emits
//! one immutable session record for external reporting and persistence.
//!
//! ## Features
//! - Single time source: every derived value (stints, fatigue) comes off the
//!   clock's tick
//! - Best-effort crash recovery: checkpoints are namespaced per concern and
//!   their I/O failures never block live usage
//! - No network I/O; persistence and report generation are trait seams

pub mod board;
pub mod clock;
pub mod error;
pub mod fatigue;
pub mod ledger;
pub mod models;
pub mod recovery;
pub mod session;

// Re-export the main session API
pub use board::{Evaluation, EvaluationBoard, AUTOSAVE_QUIET_WINDOW, MAX_SCORE};
pub use clock::{ClockConfig, MatchClock, CHECKPOINT_EVERY_TICKS};
pub use error::{Result, SessionError};
pub use fatigue::{fatigue_of, FatigueInfo, FatigueLevel};
pub use ledger::{PendingSelection, PlayerStatus, SelectionOutcome, SubstitutionLedger};
pub use models::{
    Criterion, EvaluationSummary, PlayerMinutes, Roster, RosterEntry, SessionRecord,
    SessionSnapshot, SidelineEvent, SubstitutionEvent,
};
pub use recovery::{
    FileRecoveryStore, MemoryRecoveryStore, RecoveryError, RecoveryStore, StoreHandle,
};
pub use session::{
    FinishGate, LiveSession, PersistError, ReportError, ReportGenerator, SessionConfig,
    SessionKind, SessionPhase, SessionSink,
};
