pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;

pub use database::ItemStore;
pub use error::{SchedulerError, StoreError, StoreResult};
pub use models::{
    CardStatus, Flashcard, LearningSession, ReviewItem, ScheduleFields, reviewed, select_due,
};
