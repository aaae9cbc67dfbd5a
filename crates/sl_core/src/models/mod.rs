// 세션 코어 데이터 모델
pub mod events;
pub mod roster;
pub mod snapshot;

pub use events::{SidelineEvent, SubstitutionEvent};
pub use roster::{Criterion, Roster, RosterEntry};
pub use snapshot::{
    EvaluationSummary, PlayerMinutes, SessionRecord, SessionSnapshot, RECORD_VERSION,
};
