//! Persisted jobs: the polled job list and single-job detail.

pub mod detail;
pub mod list;

pub use detail::JobDetail;
pub use list::{JobListSnapshot, JobListViewModel, JobRow};
