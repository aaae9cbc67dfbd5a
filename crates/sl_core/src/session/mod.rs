//! Session Orchestrator
//!
//! Composes the clock, substitution ledger, evaluation board and sideline
//! events into one in-progress session, and drives the
//! Setup → Live → Summary → Saved phase machine (Live → Abandoned on cancel).

pub mod collaborators;

pub use collaborators::{PersistError, ReportError, ReportGenerator, SessionSink};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::board::EvaluationBoard;
use crate::clock::{ClockConfig, MatchClock};
use crate::error::SessionError;
use crate::fatigue::{fatigue_of, FatigueInfo};
use crate::ledger::{SelectionOutcome, SubstitutionLedger};
use crate::models::{
    Criterion, EvaluationSummary, PlayerMinutes, Roster, RosterEntry, SessionRecord,
    SessionSnapshot, SidelineEvent, SubstitutionEvent,
};
use crate::recovery::{self, StoreHandle};

/// Linear phase machine. No backward transitions; the only exits from Live
/// are Summary (finish) and Abandoned (explicit cancel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Setup,
    Live,
    Summary,
    Saved,
    Abandoned,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Setup => "Setup",
            SessionPhase::Live => "Live",
            SessionPhase::Summary => "Summary",
            SessionPhase::Saved => "Saved",
            SessionPhase::Abandoned => "Abandoned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionKind {
    /// Match mode: a starting eleven is on the pitch, the rest bench.
    #[default]
    Match,
    /// Training mode: the whole roster counts as on the pitch.
    Training,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    pub kind: SessionKind,
    pub clock: ClockConfig,
}

/// Result of a `finish()` attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FinishGate {
    /// Everyone evaluated; the session moved to Summary.
    Finished,
    /// Still in Live: the caller should warn "N players not yet evaluated,
    /// finish anyway?" and call `finish_confirmed()` on confirmation.
    ConfirmationRequired(Vec<RosterEntry>),
}

/// Score board and sideline events, persisted with the evaluations so a
/// reload recovers them (same checkpoint namespace).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionMeta {
    score_for: u32,
    score_against: u32,
    sideline: Vec<SidelineEvent>,
}

/// One in-progress live session. Exclusively owns its clock/ledger/board for
/// its whole lifetime; single-threaded, driven by host ticks and UI calls.
#[derive(Debug)]
pub struct LiveSession {
    session_id: String,
    phase: SessionPhase,
    clock: MatchClock,
    ledger: SubstitutionLedger,
    board: EvaluationBoard,
    meta: SessionMeta,
    snapshot: Option<SessionSnapshot>,
    unsaved_changes: bool,
    store: StoreHandle,
}

impl LiveSession {
    /// Build a session in Setup. Restores any recovery checkpoints left by a
    /// crashed run of the same `session_id`.
    pub fn new(
        store: StoreHandle,
        session_id: &str,
        roster: Roster,
        criteria: Vec<Criterion>,
        initial_on_pitch: &[String],
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        if roster.is_empty() {
            return Err(SessionError::EmptyRoster);
        }

        // Training sessions track the whole roster as on-pitch.
        let initial: Vec<String> = match config.kind {
            SessionKind::Match => initial_on_pitch.to_vec(),
            SessionKind::Training => roster.iter().map(|e| e.id.clone()).collect(),
        };

        let clock = MatchClock::restore_or_new(store.clone(), session_id, config.clock);
        let ledger =
            SubstitutionLedger::restore_or_new(store.clone(), session_id, &roster, &initial)?;
        let board =
            EvaluationBoard::restore_or_new(store.clone(), session_id, roster, criteria);

        let meta = board
            .metadata()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default();

        let mut session = Self {
            session_id: session_id.to_string(),
            phase: SessionPhase::Setup,
            clock,
            ledger,
            board,
            meta,
            snapshot: None,
            unsaved_changes: false,
            store,
        };
        // A recovered clock that was mid-run means we crashed out of Live.
        if session.clock.elapsed_seconds() > 0 {
            session.phase = SessionPhase::Live;
            session.ledger.on_clock_tick(session.clock.elapsed_seconds());
        }
        Ok(session)
    }

    /// Convenience constructor with a fresh session id.
    pub fn start(
        store: StoreHandle,
        roster: Roster,
        criteria: Vec<Criterion>,
        initial_on_pitch: &[String],
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let session_id = Uuid::new_v4().to_string();
        Self::new(store, &session_id, roster, criteria, initial_on_pitch, config)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Setup → Live; starts the clock.
    pub fn kick_off(&mut self) -> Result<(), SessionError> {
        self.require_phase(SessionPhase::Setup, "Setup")?;
        self.phase = SessionPhase::Live;
        self.clock.start();
        log::info!("Session {} is live", self.session_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Host timer callback, once per real-world second. Feeds the ledger
    /// whenever the clock actually advances.
    pub fn tick(&mut self) -> bool {
        if self.phase != SessionPhase::Live {
            return false;
        }

        // Land any write the board debounced, now that its window is over.
        self.board.flush_if_quiet();

        if self.clock.tick() {
            self.ledger.on_clock_tick(self.clock.elapsed_seconds());
            true
        } else {
            false
        }
    }

    /// Clock control is Live-only: once `finish()` froze the clock it stays
    /// frozen.
    pub fn toggle_clock(&mut self) -> Result<(), SessionError> {
        self.require_phase(SessionPhase::Live, "Live")?;
        self.clock.toggle();
        Ok(())
    }

    pub fn pause_clock(&mut self) -> Result<(), SessionError> {
        self.require_phase(SessionPhase::Live, "Live")?;
        self.clock.pause();
        Ok(())
    }

    pub fn resume_clock(&mut self) -> Result<(), SessionError> {
        self.require_phase(SessionPhase::Live, "Live")?;
        self.clock.resume();
        Ok(())
    }

    pub fn is_clock_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.clock.elapsed_seconds()
    }

    pub fn formatted_time(&self) -> String {
        self.clock.formatted()
    }

    // ------------------------------------------------------------------
    // Substitutions & fatigue
    // ------------------------------------------------------------------

    pub fn select_player(&mut self, player_id: &str) -> Result<SelectionOutcome, SessionError> {
        self.require_phase(SessionPhase::Live, "Live")?;
        let outcome = self.ledger.select_player(player_id)?;
        if matches!(outcome, SelectionOutcome::Substituted(_)) {
            self.unsaved_changes = true;
        }
        Ok(outcome)
    }

    pub fn cancel_selection(&mut self) {
        self.ledger.cancel_selection();
    }

    pub fn substitute(
        &mut self,
        first_id: &str,
        second_id: &str,
    ) -> Result<SubstitutionEvent, SessionError> {
        self.require_phase(SessionPhase::Live, "Live")?;
        let event = self.ledger.substitute(first_id, second_id)?;
        self.unsaved_changes = true;
        Ok(event)
    }

    pub fn ledger(&self) -> &SubstitutionLedger {
        &self.ledger
    }

    /// Fatigue for every roster player, recomputed from the current ledger.
    pub fn fatigue_overview(&self) -> Vec<FatigueInfo> {
        self.ledger.statuses().iter().map(fatigue_of).collect()
    }

    pub fn fatigue_for(&self, player_id: &str) -> Option<FatigueInfo> {
        self.ledger.status(player_id).map(fatigue_of)
    }

    // ------------------------------------------------------------------
    // Evaluations
    // ------------------------------------------------------------------

    pub fn set_score(
        &mut self,
        player_id: &str,
        criterion_id: &str,
        score: u8,
    ) -> Result<(), SessionError> {
        self.require_phase(SessionPhase::Live, "Live")?;
        self.board.set_score(player_id, criterion_id, score)?;
        self.unsaved_changes = true;
        Ok(())
    }

    pub fn set_player_note(
        &mut self,
        player_id: &str,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.require_phase(SessionPhase::Live, "Live")?;
        self.board.set_note(player_id, text)?;
        self.unsaved_changes = true;
        Ok(())
    }

    pub fn board(&self) -> &EvaluationBoard {
        &self.board
    }

    pub fn evaluation_progress(&self) -> u8 {
        self.board.progress()
    }

    pub fn unevaluated_players(&self) -> Vec<&RosterEntry> {
        self.board.unevaluated_players()
    }

    // ------------------------------------------------------------------
    // Sideline events & score
    // ------------------------------------------------------------------

    pub fn record_goal_for(&mut self) -> Result<(), SessionError> {
        self.record_goal(true)
    }

    pub fn record_goal_against(&mut self) -> Result<(), SessionError> {
        self.record_goal(false)
    }

    fn record_goal(&mut self, scored_by_us: bool) -> Result<(), SessionError> {
        self.require_phase(SessionPhase::Live, "Live")?;
        let event = SidelineEvent::goal(self.clock.elapsed_seconds(), scored_by_us);
        if scored_by_us {
            self.meta.score_for += 1;
        } else {
            self.meta.score_against += 1;
        }
        self.meta.sideline.push(event);
        self.sync_meta();
        Ok(())
    }

    /// Timestamped free-text note, scoped to a player or the whole session.
    pub fn add_sideline_note(
        &mut self,
        text: impl Into<String>,
        player_id: Option<String>,
    ) -> Result<(), SessionError> {
        self.require_phase(SessionPhase::Live, "Live")?;
        let event = SidelineEvent::note(self.clock.elapsed_seconds(), text, player_id);
        self.meta.sideline.push(event);
        self.sync_meta();
        Ok(())
    }

    pub fn score(&self) -> (u32, u32) {
        (self.meta.score_for, self.meta.score_against)
    }

    pub fn sideline_events(&self) -> &[SidelineEvent] {
        &self.meta.sideline
    }

    // ------------------------------------------------------------------
    // Finish / save / abandon
    // ------------------------------------------------------------------

    /// Attempt the Live → Summary transition. With unevaluated players left
    /// the session stays Live and the caller must confirm.
    pub fn finish(&mut self) -> Result<FinishGate, SessionError> {
        self.require_phase(SessionPhase::Live, "Live")?;

        let unevaluated: Vec<RosterEntry> =
            self.board.unevaluated_players().into_iter().cloned().collect();
        if !unevaluated.is_empty() {
            return Ok(FinishGate::ConfirmationRequired(unevaluated));
        }

        self.complete_finish();
        Ok(FinishGate::Finished)
    }

    /// Live → Summary regardless of unevaluated players (caller confirmed).
    pub fn finish_confirmed(&mut self) -> Result<(), SessionError> {
        self.require_phase(SessionPhase::Live, "Live")?;
        self.complete_finish();
        Ok(())
    }

    fn complete_finish(&mut self) {
        // Freeze time, flush the board's pending write, then snapshot.
        self.clock.pause();
        self.board.flush();
        self.snapshot = Some(self.build_snapshot());
        self.phase = SessionPhase::Summary;
        log::info!(
            "Session {} finished at {} ({} substitutions)",
            self.session_id,
            self.clock.formatted(),
            self.ledger.substitution_log().len()
        );
    }

    /// The final snapshot; present from Summary onward.
    pub fn snapshot(&self) -> Option<&SessionSnapshot> {
        self.snapshot.as_ref()
    }

    /// Ask the external report collaborator for a narrative. Retryable: a
    /// failure leaves the session in Summary with the snapshot intact.
    pub fn generate_report(
        &self,
        generator: &dyn ReportGenerator,
    ) -> Result<String, SessionError> {
        self.require_phase(SessionPhase::Summary, "Summary")?;
        let snapshot = self.snapshot.as_ref().expect("Summary phase implies snapshot");
        generator.generate(snapshot).map_err(|err| SessionError::Report(err.message))
    }

    /// Summary → Saved: emit the record to the persistence collaborator and
    /// clear every recovery checkpoint. Persistence failure is the one hard
    /// error; the session stays in Summary so the caller can retry.
    pub fn save_and_exit(
        &mut self,
        sink: &mut dyn SessionSink,
        report: Option<String>,
    ) -> Result<SessionRecord, SessionError> {
        self.require_phase(SessionPhase::Summary, "Summary")?;

        let snapshot = self.snapshot.clone().expect("Summary phase implies snapshot");
        let record = SessionRecord::new(self.session_id.clone(), snapshot, report);

        sink.persist(&record).map_err(|err| SessionError::Persist(err.message))?;

        recovery::clear_all(&self.store, &self.session_id);
        self.phase = SessionPhase::Saved;
        self.unsaved_changes = false;
        log::info!("Session {} saved", self.session_id);
        Ok(record)
    }

    /// Cancel from Setup/Live: discard all state and recovery checkpoints
    /// without emitting a snapshot.
    pub fn abandon(&mut self) -> Result<(), SessionError> {
        if !matches!(self.phase, SessionPhase::Setup | SessionPhase::Live) {
            return Err(SessionError::InvalidPhase {
                expected: "Setup or Live",
                current: self.phase.as_str(),
            });
        }

        self.board.discard_pending();
        recovery::clear_all(&self.store, &self.session_id);
        self.phase = SessionPhase::Abandoned;
        self.unsaved_changes = false;
        log::info!("Session {} abandoned", self.session_id);
        Ok(())
    }

    /// For the host's teardown guard ("you have unsaved data"). The core
    /// never blocks teardown itself.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    fn sync_meta(&mut self) {
        self.unsaved_changes = true;
        match serde_json::to_value(&self.meta) {
            Ok(value) => self.board.set_metadata(value),
            Err(err) => log::warn!("Failed to serialize session metadata: {}", err),
        }
    }

    fn require_phase(
        &self,
        phase: SessionPhase,
        expected: &'static str,
    ) -> Result<(), SessionError> {
        if self.phase != phase {
            return Err(SessionError::InvalidPhase { expected, current: self.phase.as_str() });
        }
        Ok(())
    }

    fn build_snapshot(&self) -> SessionSnapshot {
        let evaluations: Vec<EvaluationSummary> = self
            .ledger
            .statuses()
            .iter()
            .filter_map(|status| self.board.get_evaluation(&status.player_id))
            .map(|evaluation| EvaluationSummary {
                player_id: evaluation.player_id.clone(),
                scores: evaluation.scores.clone(),
                note: self.board.note(&evaluation.player_id).map(str::to_string),
            })
            .collect();

        let player_statuses: BTreeMap<String, PlayerMinutes> = self
            .ledger
            .statuses()
            .iter()
            .map(|status| {
                (
                    status.player_id.clone(),
                    PlayerMinutes { cumulative_minutes: status.cumulative_minutes },
                )
            })
            .collect();

        SessionSnapshot {
            duration_seconds: self.clock.elapsed_seconds(),
            score_for: self.meta.score_for,
            score_against: self.meta.score_against,
            substitution_log: self.ledger.substitution_log().to_vec(),
            sideline_notes: self.meta.sideline.clone(),
            evaluations,
            player_statuses,
        }
    }
}
