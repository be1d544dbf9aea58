//! Parent/child structure of retrospectives.
//!
//! ## Submodules
//!
//! - [`arena`]: pure forest operations (split, breadcrumb, validated arena).
//! - [`hierarchy`]: the same questions answered against the store.

pub mod arena;
pub mod hierarchy;

pub use arena::{Crumb, MAX_BREADCRUMB_HOPS, RetroArena, Split, split_parents_and_children};
