#![forbid(unsafe_code)]

pub mod model;
pub mod phase;
pub mod sample;
pub mod service;
pub mod stats;
pub mod storage;

pub use model::{Job, JobPatch, JobStatus, NewJob, Priority};
pub use phase::{ColorToken, Phase, clamp_percent, derive_status_color, derive_status_label};
pub use service::{JobBook, JobFilter};
pub use stats::JobStats;
pub use storage::{FileJobStore, JobStore, MemoryJobStore, STORAGE_KEY};
