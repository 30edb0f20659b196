//! Framework-agnostic business logic.
//!
//! Services contain no UI concerns: they take paths, documents and
//! records, and return values or errors. Both binaries and the editor
//! coordinator are built on top of them.

pub mod chara;
pub mod extract;
pub mod generate;
pub mod matcher;
pub mod output;
pub mod rules;
pub mod unpack;
