//! # SceneTrack Core
//!
//! Domain types and error definitions for the SceneTrack scene-state tracker.
//! This crate holds **no engine logic**: it defines the field schema, the
//! instance tree representation and the include filter that every other
//! crate works against.
//!
//! ## Layout
//!
//! - [`schema`] — the declarative field schema (`FieldSchema`, `FieldMap`)
//! - [`filter`] — presence-based include filters
//! - [`instance`] — tracker instance trees and value helpers
//! - [`error`] — error taxonomy for the fallible boundaries

pub mod error;
pub mod filter;
pub mod instance;
pub mod schema;

// Re-export key types at crate root for ergonomics
pub use error::{CodecError, Error, Result, SchemaError};
pub use filter::IncludeFilter;
pub use instance::{EXTRA_FIELDS_KEY, Instance, ROOT_EXTRA_KEY};
pub use schema::{FieldKind, FieldMap, FieldMetadata, FieldSchema, Presence};
