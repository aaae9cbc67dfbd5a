// 경기 시간 관리 - 초 단위 모노토닉 카운터 + 크래시 복구 체크포인트

use serde::{Deserialize, Serialize};

use crate::recovery::{self, Concern, StoreHandle};

/// Checkpoint at a bounded interval so a reload resumes within
/// `CHECKPOINT_EVERY_TICKS` seconds of true elapsed time.
pub const CHECKPOINT_EVERY_TICKS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Mode the clock starts in, and returns to on `reset()`.
    pub start_paused: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { start_paused: true }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ClockCheckpoint {
    elapsed_seconds: u32,
    is_paused: bool,
}

/// Elapsed match time with pause/resume.
///
/// The host drives `tick()` once per real-world second; everything else in
/// the session (stint minutes, fatigue) derives from this single counter.
#[derive(Debug)]
pub struct MatchClock {
    elapsed_seconds: u32,
    paused: bool,
    ticks_since_checkpoint: u32,
    config: ClockConfig,
    session_id: String,
    store: StoreHandle,
}

impl MatchClock {
    /// Restore from an existing checkpoint if one exists, otherwise start
    /// fresh at 00:00 in the configured mode.
    pub fn restore_or_new(store: StoreHandle, session_id: &str, config: ClockConfig) -> Self {
        let restored: Option<ClockCheckpoint> = recovery::restore(&store, session_id, Concern::Clock);

        match restored {
            Some(cp) => Self {
                elapsed_seconds: cp.elapsed_seconds,
                paused: cp.is_paused,
                ticks_since_checkpoint: 0,
                config,
                session_id: session_id.to_string(),
                store,
            },
            None => Self {
                elapsed_seconds: 0,
                paused: config.start_paused,
                ticks_since_checkpoint: 0,
                config,
                session_id: session_id.to_string(),
                store,
            },
        }
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// One real-world second. Returns whether the counter advanced.
    pub fn tick(&mut self) -> bool {
        if self.paused {
            return false;
        }

        self.elapsed_seconds += 1;
        self.ticks_since_checkpoint += 1;

        if self.ticks_since_checkpoint >= CHECKPOINT_EVERY_TICKS {
            self.write_checkpoint();
        }
        true
    }

    pub fn start(&mut self) {
        self.resume();
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.write_checkpoint();
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.write_checkpoint();
        }
    }

    pub fn toggle(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Back to 00:00 in the configured start mode. Checkpoints immediately so
    /// a crash right after reset cannot resurrect the old time.
    pub fn reset(&mut self) {
        self.elapsed_seconds = 0;
        self.paused = self.config.start_paused;
        self.write_checkpoint();
    }

    /// `MM:SS`, zero-padded. Minutes keep counting past 59 (no hour rollover).
    pub fn formatted(&self) -> String {
        format!("{:02}:{:02}", self.elapsed_seconds / 60, self.elapsed_seconds % 60)
    }

    fn write_checkpoint(&mut self) {
        let cp = ClockCheckpoint { elapsed_seconds: self.elapsed_seconds, is_paused: self.paused };
        recovery::checkpoint(&self.store, &self.session_id, Concern::Clock, &cp);
        self.ticks_since_checkpoint = 0;
    }
}
