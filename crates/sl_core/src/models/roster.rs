// 로스터/평가 기준 - 외부 팀 관리 시스템이 공급하는 읽기 전용 데이터
use serde::{Deserialize, Serialize};

/// A single player identity supplied by the external roster collaborator.
///
/// The session core never mutates these; everything it tracks about a player
/// lives in the ledger/board keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jersey_number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl RosterEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), jersey_number: None, position: None }
    }

    pub fn with_jersey(mut self, number: u8) -> Self {
        self.jersey_number = Some(number);
        self
    }
}

/// Ordered roster. Order is meaningful: on-pitch/bench listings and
/// unevaluated-player listings all come back in roster order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn get(&self, player_id: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.id == player_id)
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.get(player_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries.iter()
    }
}

/// One evaluation criterion (e.g. "First touch" under "Technical").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    pub name: String,
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_order_preserved() {
        let roster = Roster::new(vec![
            RosterEntry::new("p3", "Cho"),
            RosterEntry::new("p1", "Ahn"),
            RosterEntry::new("p2", "Bae"),
        ]);

        let ids: Vec<&str> = roster.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p1", "p2"]);
        assert!(roster.contains("p1"));
        assert!(!roster.contains("p9"));
    }
}
