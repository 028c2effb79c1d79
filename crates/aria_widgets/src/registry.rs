//! Registry of mounted widgets
//!
//! Owned by the [`WidgetContext`](crate::WidgetContext); entries are added
//! on mount and removed on unmount. The registry also hands out element ids
//! for parts that need to be referenced from `aria-*` attributes.

use aria_dom::{Document, NodeId};
use rustc_hash::FxHashMap;

use crate::widget::WidgetId;

#[derive(Debug, Default)]
pub struct WidgetRegistry {
    by_root: FxHashMap<NodeId, WidgetId>,
    roots: FxHashMap<WidgetId, NodeId>,
    counters: FxHashMap<String, u32>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a widget rooted at `root`
    ///
    /// If the root already hosts a widget, the old mapping is replaced
    /// (last-wins) and a warning is logged.
    pub fn register(&mut self, root: NodeId, widget: WidgetId) {
        if let Some(previous) = self.by_root.insert(root, widget) {
            tracing::warn!(?root, ?previous, "Duplicate widget registered on element");
            self.roots.remove(&previous);
        }
        self.roots.insert(widget, root);
    }

    pub fn unregister(&mut self, widget: WidgetId) -> Option<NodeId> {
        let root = self.roots.remove(&widget)?;
        if self.by_root.get(&root) == Some(&widget) {
            self.by_root.remove(&root);
        }
        Some(root)
    }

    pub fn widget_at(&self, root: NodeId) -> Option<WidgetId> {
        self.by_root.get(&root).copied()
    }

    pub fn root_of(&self, widget: WidgetId) -> Option<NodeId> {
        self.roots.get(&widget).copied()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WidgetId, NodeId)> + '_ {
        self.roots.iter().map(|(&w, &r)| (w, r))
    }

    /// Generate an id of the form `aria-{kind}-{n}` not used in `doc`
    pub fn generate_id(&mut self, doc: &Document, kind: &str) -> String {
        let counter = self.counters.entry(kind.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let id = format!("aria-{kind}-{counter}");
            if doc.element_by_id(&id).is_none() {
                return id;
            }
        }
    }

    /// The element's id, assigning a generated one first if it has none
    pub fn ensure_id(&mut self, doc: &mut Document, node: NodeId, kind: &str) -> String {
        if let Some(id) = doc.id(node).filter(|id| !id.is_empty()) {
            return id.to_string();
        }
        let id = self.generate_id(doc, kind);
        doc.set_attribute(node, "id", id.clone());
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_register_and_lookup() {
        let mut widgets: SlotMap<WidgetId, ()> = SlotMap::with_key();
        let (a, b) = (widgets.insert(()), widgets.insert(()));
        let mut doc = Document::new();
        let root = doc.create_element("ui-menu");

        let mut registry = WidgetRegistry::new();
        registry.register(root, a);
        assert_eq!(registry.widget_at(root), Some(a));

        // Last registration wins
        registry.register(root, b);
        assert_eq!(registry.widget_at(root), Some(b));
        assert_eq!(registry.root_of(a), None);
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.unregister(b), Some(root));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ensure_id() {
        let mut doc = Document::new();
        let root = doc.root();
        let taken = doc.create_element("div");
        doc.append_child(root, taken).unwrap();
        doc.set_attribute(taken, "id", "aria-list-1");

        let mut registry = WidgetRegistry::new();
        let list = doc.create_element("ui-combobox-list");
        doc.append_child(root, list).unwrap();
        assert_eq!(registry.ensure_id(&mut doc, list, "list"), "aria-list-2");
        assert_eq!(registry.ensure_id(&mut doc, list, "list"), "aria-list-2");
        assert_eq!(registry.ensure_id(&mut doc, taken, "list"), "aria-list-1");
    }
}
