//! Aria Document Layer
//!
//! A small live element tree for headless widgets:
//!
//! - **Document**: slotmap-backed arena of elements with attributes, text,
//!   shadow roots, focus and host-supplied layout bounds
//! - **Selectors**: a CSS selector subset parsed with `nom`
//! - **Live Query Binder**: named part declarations re-resolved on every read
//! - **Builder**: `el("tag").attr(..).child(..)` subtree construction

pub mod builder;
pub mod document;
pub mod error;
pub mod geometry;
pub mod query;
pub mod selector;

pub use builder::{el, ElementBuilder};
pub use document::{Document, FocusChange, Node, NodeId, NodeKind};
pub use error::{DomError, Result, SelectorError};
pub use geometry::Rect;
pub use query::{BoundParts, Part, PartQuery, Parts, QueryMode};
pub use selector::Selector;
