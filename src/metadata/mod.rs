//! Metadata lookups for expression items.
//!
//! The engine never owns metadata. Program stages, data elements, tracked
//! entity attributes, constants and relationship types are fetched on demand
//! through a [`MetadataResolver`] supplied by the caller.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               MetadataResolver                │
//! │  resolve_data_element(stage, de)              │
//! │  resolve_attribute(uid)                       │
//! │  resolve_constant(uid)                        │
//! │  resolve_program_stage(uid)                   │
//! │  resolve_relationship_type(uid)               │
//! └───────────────────────────────────────────────┘
//!          ▲                         ▲
//!   InMemoryMetadata          caller's store
//!   (JSON snapshot)           (database, cache)
//! ```

mod memory;
mod resolver;
mod types;

pub use memory::{InMemoryMetadata, MetadataError, MetadataSnapshot, NamedObject};
pub use resolver::MetadataResolver;
pub use types::*;
