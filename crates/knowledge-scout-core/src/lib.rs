//! # Knowledge Scout Core
//!
//! Transport-free logic for Knowledge Scout: the finding model and its
//! status workflow, the category → section router, the markdown fragment
//! formatter, the section splicer, and the merge engine that commits a
//! finding into the canonical document with one conflict retry.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. Remote
//! collaborators are reached through the capability traits in [`store`];
//! [`store::memory`] provides in-memory implementations for tests.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Finding, status workflow, enrichment result |
//! | [`routing`] | Static category → heading table |
//! | [`format`] | Markdown fragment rendering |
//! | [`splice`] | Insertion-point search and splicing |
//! | [`merge`] | Fetch / splice / commit orchestration, preview, reconciliation |
//! | [`review`] | Approve / reject / edit with workflow checks |
//! | [`enrich`] | Extraction prompt, reply parsing, enrichment flow |
//! | [`error`] | Error taxonomy |
//! | [`store`] | `DocumentStore`, `FindingStore`, `Extractor` traits |

pub mod enrich;
pub mod error;
pub mod format;
pub mod merge;
pub mod models;
pub mod review;
pub mod routing;
pub mod splice;
pub mod store;

pub use error::{ScoutError, ScoutResult};
