//! Shared data types for the Tabularium metadata catalog.
//!
//! This crate holds the plain records that cross crate boundaries: import
//! jobs and their lifecycle, catalog entities written by a successful
//! import, the normalized column descriptor produced by every connector,
//! and the opaque source configuration blob the worker interprets.

pub mod catalog;
pub mod job;
pub mod schema;
pub mod source;

pub use catalog::{DatabaseRecord, FieldRecord, TableRecord};
pub use job::{ImportJob, JobStatus, JobUpdate, ParseStatusError};
pub use schema::ColumnDescriptor;
pub use source::{ParseVendorError, SourceConfig, Vendor};
