pub mod due;
pub mod flashcard;
pub mod learning_card;
pub mod learning_session;
pub mod review_item;
pub mod sm2;
pub mod status;

pub use due::select_due;
pub use flashcard::{CardKind, Flashcard, SourceType};
pub use learning_card::LearningCard;
pub use learning_session::LearningSession;
pub use review_item::{ReviewItem, ScheduleFields, owner_key};
pub use sm2::reviewed;
pub use status::{CardStatus, StatusSummary};
