//! Minimal active-record layer over SQLite.
//!
//! # Intention
//!
//! - Track per-record attribute state and detect dirty columns against the
//!   last persisted snapshot.
//! - Compile parameterized single-row insert and update statements.
//! - Drive the insert-vs-update decision, generated-key fetch, and
//!   timestamp maintenance through one blocking executor seam.
//!
//! # Architectural Boundaries
//!
//! - Only single-record persistence belongs here: no query builder, no
//!   relationships, no migrations, no cross-record transactions.
//! - The backing store is reached exclusively through [`Executor`];
//!   connection lifecycle stays with the caller.

pub mod attributes;
pub mod error;
pub mod executor;
pub mod record;
pub mod sql;
pub mod value;

pub use attributes::AttributeMap;
pub use error::{Error, Result};
pub use executor::{Executor, SqliteConfig};
pub use record::{Record, SaveOptions};
pub use value::Value;
