//! File uploads: per-file controllers and the list that owns them.

pub mod coordinator;
pub mod item;

pub use coordinator::{aggregate_complete, UploadCoordinator, UploadSnapshot};
pub use item::{LocalId, UploadItem, UploadItemController, UploadPhase};
