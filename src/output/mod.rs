#![forbid(unsafe_code)]

pub mod table;

pub use table::{Cell, Table};
