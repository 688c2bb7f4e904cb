//! # Skycast Scheduler
//!
//! The broadcast core: who receives reports, how a report reaches them, and
//! when reports go out.
//!
//! ## Architecture
//! ```text
//! SchedulerEngine (one tokio timer per job)
//!   ├── "today"    06:00 Europe/Moscow → build_report(Today)
//!   └── "tomorrow" 19:00 Europe/Moscow → build_report(Tomorrow)
//!         └── Broadcaster
//!               ├── snapshot RecipientStore
//!               ├── MessageSink::send to each (failures isolated)
//!               └── RecipientStore::remove_all(failed)
//! ```

pub mod broadcast;
pub mod daily;
pub mod engine;
pub mod store;

pub use broadcast::{BroadcastSummary, Broadcaster};
pub use daily::next_fire_after;
pub use engine::{Clock, JobOutcome, ReportJob, SchedulerEngine, SystemClock, spawn_scheduler};
pub use store::{LoadOutcome, RecipientStore};
