//! SceneTrack engine — schema-driven reconciliation of tracker instances.
//!
//! A tracker schema ([`FieldMap`](scenetrack_core::FieldMap)) describes the
//! fields a model is asked to maintain. The engine turns whatever the model
//! returned into a canonical instance ([`normalize`]), folds a turn's output
//! into the previous state ([`apply_update`]), and derives defaults,
//! examples and prompt text from the same schema.
//!
//! Nothing is ever dropped: data that does not fit the schema is moved into
//! the `_extraFields` side-channel. All entry points are pure functions over
//! shared references and may run concurrently.

mod clean;
mod defaults;
mod extra;
mod handlers;
mod normalize;
mod prompt;
mod update;

#[cfg(test)]
mod test_support;

pub use clean::{clean, strip_internal_only};
pub use defaults::{default_tree, example_trees, exists};
pub use extra::ExtraFields;
pub use handlers::DEFAULT_ENTITY_KEY;
pub use normalize::normalize;
pub use prompt::prompt_text;
pub use update::{UpdateOutcome, apply_update};
