//! Live query binder
//!
//! Widgets declare their structural parts once, by name, and read them back
//! through a [`BoundParts`] view. Every read re-runs the query against the
//! current document: nothing is cached, so options inserted after mount or
//! a submenu removed mid-interaction are reflected on the very next read.
//!
//! ```rust
//! use aria_dom::{el, Document, PartQuery, Parts};
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! let combo = doc.insert(root, el("ui-combobox").child(el("ui-combobox-list"))).unwrap();
//!
//! let parts = Parts::new()
//!     .declare("list", PartQuery::one("ui-combobox-list").unwrap())
//!     .declare("options", PartQuery::all("ui-combobox-option").unwrap());
//!
//! let view = parts.bind(&doc, combo);
//! assert!(view.one("list").is_some());
//! assert!(view.all("options").is_empty());
//! ```

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::document::{Document, NodeId};
use crate::error::SelectorError;
use crate::selector::Selector;

/// How a part is resolved relative to the widget host
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryMode {
    /// First matching descendant
    One,
    /// All matching descendants in tree order
    All,
    /// Nearest matching ancestor, including the host itself
    Closest,
}

/// A declared part query
#[derive(Clone, Debug)]
pub struct PartQuery {
    selector: Selector,
    mode: QueryMode,
    shadow: bool,
}

impl PartQuery {
    fn new(selector: &str, mode: QueryMode) -> Result<Self, SelectorError> {
        Ok(Self {
            selector: Selector::parse(selector)?,
            mode,
            shadow: false,
        })
    }

    /// First descendant matching `selector`
    pub fn one(selector: &str) -> Result<Self, SelectorError> {
        Self::new(selector, QueryMode::One)
    }

    /// Every descendant matching `selector`
    pub fn all(selector: &str) -> Result<Self, SelectorError> {
        Self::new(selector, QueryMode::All)
    }

    /// Nearest inclusive ancestor matching `selector`
    pub fn closest(selector: &str) -> Result<Self, SelectorError> {
        Self::new(selector, QueryMode::Closest)
    }

    /// Search inside the host's shadow root instead of its light tree
    pub fn shadow(mut self) -> Self {
        self.shadow = true;
        self
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    /// Run the query for `host`
    pub fn resolve(&self, doc: &Document, host: NodeId) -> Part {
        match self.mode {
            QueryMode::Closest => Part::One(doc.closest(host, &self.selector)),
            mode => {
                let scope = if self.shadow {
                    match doc.shadow_root(host) {
                        Some(shadow) => shadow,
                        None => return Part::empty(mode),
                    }
                } else {
                    host
                };
                match mode {
                    QueryMode::All => Part::Many(doc.query_all(scope, &self.selector).into()),
                    _ => Part::One(doc.query(scope, &self.selector)),
                }
            }
        }
    }
}

/// Result of resolving a part
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Part {
    One(Option<NodeId>),
    Many(SmallVec<[NodeId; 8]>),
}

impl Part {
    fn empty(mode: QueryMode) -> Self {
        match mode {
            QueryMode::All => Part::Many(SmallVec::new()),
            _ => Part::One(None),
        }
    }

    /// The single node, or the first of many
    pub fn first(&self) -> Option<NodeId> {
        match self {
            Part::One(node) => *node,
            Part::Many(nodes) => nodes.first().copied(),
        }
    }

    pub fn into_vec(self) -> Vec<NodeId> {
        match self {
            Part::One(node) => node.into_iter().collect(),
            Part::Many(nodes) => nodes.into_vec(),
        }
    }
}

/// A widget's part declarations
#[derive(Clone, Debug, Default)]
pub struct Parts {
    queries: IndexMap<&'static str, PartQuery>,
}

impl Parts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or replace) the part `name`
    pub fn declare(mut self, name: &'static str, query: PartQuery) -> Self {
        self.queries.insert(name, query);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PartQuery> {
        self.queries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.queries.keys().copied()
    }

    /// Bind the declarations to a host element in a document
    pub fn bind<'a>(&'a self, doc: &'a Document, host: NodeId) -> BoundParts<'a> {
        BoundParts {
            parts: self,
            doc,
            host,
        }
    }
}

/// Read-only view of a widget's parts; every accessor re-queries
#[derive(Clone, Copy)]
pub struct BoundParts<'a> {
    parts: &'a Parts,
    doc: &'a Document,
    host: NodeId,
}

impl<'a> BoundParts<'a> {
    pub fn host(&self) -> NodeId {
        self.host
    }

    /// Resolve a part by name. Undeclared names log a warning and resolve
    /// to nothing.
    pub fn get(&self, name: &str) -> Option<Part> {
        match self.parts.get(name) {
            Some(query) => Some(query.resolve(self.doc, self.host)),
            None => {
                tracing::warn!(part = name, "undeclared part queried");
                None
            }
        }
    }

    /// A single-node part (first match for `all` declarations)
    pub fn one(&self, name: &str) -> Option<NodeId> {
        self.get(name).and_then(|p| p.first())
    }

    /// A multi-node part (zero or one node for single declarations)
    pub fn all(&self, name: &str) -> Vec<NodeId> {
        self.get(name).map(Part::into_vec).unwrap_or_default()
    }
}
