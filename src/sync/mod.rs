#![forbid(unsafe_code)]

pub mod merge;

pub use merge::{MergeOutcome, MergeSummary, reconcile};
