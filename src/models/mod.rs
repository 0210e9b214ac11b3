pub mod member;
pub mod status;
pub mod session;
pub mod offline;
pub mod queue;

pub use member::{ActiveState, Member, ImportRow};
pub use status::{StatusBoard, StatusEntry, StatusSlot};
pub use session::{SessionToggleResponse, ToggleState};
pub use offline::{
    OfflineHistoryEntry, OfflineStatus, OfflineSubmission, ReviewAction, SessionKind,
};
pub use queue::PendingToggle;
