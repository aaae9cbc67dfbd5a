// 피로도 평가 - 현재 스틴트 시간 기반 순수 함수 (상태 없음)
use serde::{Deserialize, Serialize};

use crate::ledger::PlayerStatus;

/// Stint minutes above which a player is flagged for substitution.
pub const TIRED_THRESHOLD_MIN: u32 = 20;
/// Stint minutes above which a player is trending tired.
pub const MODERATE_THRESHOLD_MIN: u32 = 15;
/// Visual ceiling for the fatigue bar fill.
pub const FATIGUE_BAR_CEILING_MIN: u32 = 30;

/// Fatigue tier derived from current continuous on-pitch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FatigueLevel {
    #[default]
    Fresh,
    Moderate,
    Tired,
}

impl FatigueLevel {
    pub fn label(&self) -> &'static str {
        match self {
            FatigueLevel::Fresh => "Fresh",
            FatigueLevel::Moderate => "Moderate",
            FatigueLevel::Tired => "Tired",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            FatigueLevel::Fresh => "green",
            FatigueLevel::Moderate => "yellow",
            FatigueLevel::Tired => "red",
        }
    }
}

/// Derived, never stored. Recomputed from the ledger's current status on
/// every render/tick so displayed and persisted values cannot diverge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueInfo {
    pub player_id: String,
    pub level: FatigueLevel,
    pub should_alert: bool,
    pub current_stint_minutes: u32,
    pub cumulative_minutes: u32,
    /// Bar-fill percentage, capped at 100 (30-minute visual ceiling).
    pub fatigue_percentage: f32,
}

/// Classify a player's fatigue from their current stint length.
///
/// Off-pitch (or never played) is always `Fresh` with no alert.
pub fn fatigue_of(status: &PlayerStatus) -> FatigueInfo {
    let stint = if status.is_on_pitch { status.current_stint_minutes } else { 0 };

    let level = match stint {
        0..=MODERATE_THRESHOLD_MIN => FatigueLevel::Fresh,
        m if m <= TIRED_THRESHOLD_MIN => FatigueLevel::Moderate,
        _ => FatigueLevel::Tired,
    };

    FatigueInfo {
        player_id: status.player_id.clone(),
        level,
        should_alert: level == FatigueLevel::Tired,
        current_stint_minutes: stint,
        cumulative_minutes: status.cumulative_minutes,
        fatigue_percentage: ((stint as f32 / FATIGUE_BAR_CEILING_MIN as f32) * 100.0).min(100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_pitch_status(stint_minutes: u32) -> PlayerStatus {
        PlayerStatus {
            player_id: "p1".to_string(),
            player_name: "Ahn".to_string(),
            is_on_pitch: true,
            cumulative_minutes: stint_minutes,
            last_substitution_time: Some(0),
            current_stint_minutes: stint_minutes,
        }
    }

    #[test]
    fn test_threshold_sweep() {
        // Exhaustive over 0..=40 stint minutes.
        for minutes in 0..=40u32 {
            let info = fatigue_of(&on_pitch_status(minutes));
            let expected = match minutes {
                0..=15 => FatigueLevel::Fresh,
                16..=20 => FatigueLevel::Moderate,
                _ => FatigueLevel::Tired,
            };
            assert_eq!(info.level, expected, "minutes = {}", minutes);
            assert_eq!(info.should_alert, minutes > 20, "minutes = {}", minutes);
        }
    }

    #[test]
    fn test_off_pitch_always_fresh() {
        let mut status = on_pitch_status(35);
        status.is_on_pitch = false;
        status.current_stint_minutes = 0;

        let info = fatigue_of(&status);
        assert_eq!(info.level, FatigueLevel::Fresh);
        assert!(!info.should_alert);
        assert_eq!(info.fatigue_percentage, 0.0);
    }

    #[test]
    fn test_never_played_is_fresh() {
        let status = PlayerStatus {
            player_id: "p2".to_string(),
            player_name: "Bae".to_string(),
            is_on_pitch: false,
            cumulative_minutes: 0,
            last_substitution_time: None,
            current_stint_minutes: 0,
        };
        let info = fatigue_of(&status);
        assert_eq!(info.level, FatigueLevel::Fresh);
        assert!(!info.should_alert);
    }

    #[test]
    fn test_percentage_ceiling() {
        assert_eq!(fatigue_of(&on_pitch_status(15)).fatigue_percentage, 50.0);
        assert_eq!(fatigue_of(&on_pitch_status(30)).fatigue_percentage, 100.0);
        // Capped past the 30-minute ceiling.
        assert_eq!(fatigue_of(&on_pitch_status(45)).fatigue_percentage, 100.0);
    }
}
