//! Live document arena
//!
//! A [`Document`] is a tree of element nodes stored in a slotmap. Nodes keep
//! parent pointers and ordered children, attributes in insertion order, own
//! text, an optional shadow root and optional layout bounds supplied by the
//! host.
//!
//! Only structural mutations (insert, remove, shadow attachment) bump the
//! [`Document::generation`] counter. Attribute writes do not, so controllers
//! that cache structure can key the cache on the generation alone.

use indexmap::IndexMap;
use slotmap::{new_key_type, Key, SlotMap};
use smallvec::SmallVec;

use crate::error::{DomError, Result};
use crate::geometry::Rect;
use crate::selector::Selector;

new_key_type! {
    /// Identifier of a node in a [`Document`]
    pub struct NodeId;
}

impl NodeId {
    /// Convert to a raw u64 representation (used as event targets)
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Create from a raw u64 produced by [`NodeId::to_raw`]
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

/// What a node is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// The single document root
    Document,
    /// A regular element
    Element,
    /// The private render root attached to a host element
    ShadowRoot,
}

/// Storage for a single node
#[derive(Clone, Debug)]
pub struct Node {
    kind: NodeKind,
    tag: String,
    attributes: IndexMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
    shadow_root: Option<NodeId>,
    host: Option<NodeId>,
    bounds: Option<Rect>,
}

impl Node {
    fn new(kind: NodeKind, tag: &str) -> Self {
        Self {
            kind,
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
            text: String::new(),
            parent: None,
            children: SmallVec::new(),
            shadow_root: None,
            host: None,
            bounds: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Focus movement produced by [`Document::focus`] / [`Document::blur`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FocusChange {
    pub previous: Option<NodeId>,
    pub current: Option<NodeId>,
}

impl FocusChange {
    /// Whether focus actually moved
    pub fn moved(&self) -> bool {
        self.previous != self.current
    }
}

/// The live element tree
#[derive(Debug)]
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    active: Option<NodeId>,
    generation: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Document, "#document"));
        Self {
            nodes,
            root,
            active: None,
            generation: 0,
        }
    }

    /// The document root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Structural generation counter
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or(DomError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id).ok_or(DomError::NodeNotFound(id))
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Element, tag))
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or last when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        self.get(parent)?;
        let child_kind = self.get(child)?.kind;
        if child_kind != NodeKind::Element {
            return Err(DomError::HierarchyRequest(
                "only elements can be inserted".to_string(),
            ));
        }
        if self.composed_contains(child, parent) {
            return Err(DomError::HierarchyRequest(
                "cannot insert a node into its own subtree".to_string(),
            ));
        }
        if let Some(reference) = reference {
            if self.get(reference)?.parent != Some(parent) {
                return Err(DomError::HierarchyRequest(
                    "reference node is not a child of parent".to_string(),
                ));
            }
        }

        self.detach(child);
        let index = reference.and_then(|r| self.nodes[parent].children.iter().position(|&c| c == r));
        let children = &mut self.nodes[parent].children;
        match index {
            Some(index) => children.insert(index, child),
            None => children.push(child),
        }
        self.nodes[child].parent = Some(parent);
        self.generation += 1;
        Ok(())
    }

    /// Detach `node` (and its subtree) from its parent.
    ///
    /// The nodes stay in the arena and can be re-inserted. If the focused
    /// element was inside the removed subtree, focus is cleared and the
    /// change is returned.
    pub fn remove(&mut self, node: NodeId) -> Result<FocusChange> {
        let kind = self.get(node)?.kind;
        if kind != NodeKind::Element {
            return Err(DomError::HierarchyRequest(
                "only elements can be removed".to_string(),
            ));
        }
        let mut change = FocusChange {
            previous: self.active,
            current: self.active,
        };
        if let Some(active) = self.active {
            if self.composed_contains(node, active) {
                self.active = None;
                change.current = None;
            }
        }
        if self.detach(node) {
            self.generation += 1;
        }
        Ok(change)
    }

    /// Remove `node` and free it together with its subtree and shadow
    /// roots. Ids into the freed subtree stop resolving.
    pub fn destroy(&mut self, node: NodeId) -> Result<FocusChange> {
        let change = self.remove(node)?;
        let mut stack = vec![node];
        let mut freed = 0usize;
        while let Some(id) = stack.pop() {
            let Some(n) = self.nodes.remove(id) else {
                continue;
            };
            stack.extend(n.children);
            stack.extend(n.shadow_root);
            freed += 1;
        }
        if self.active.is_some_and(|a| !self.nodes.contains_key(a)) {
            self.active = None;
        }
        tracing::trace!(?node, freed, "subtree destroyed");
        Ok(change)
    }

    /// Number of nodes held by the arena, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn detach(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.nodes.get(node).and_then(|n| n.parent) else {
            return false;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|c| *c != node);
        }
        self.nodes[node].parent = None;
        true
    }

    /// Attach (or return the existing) shadow root of `host`
    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId> {
        if let Some(existing) = self.get(host)?.shadow_root {
            return Ok(existing);
        }
        if self.nodes[host].kind != NodeKind::Element {
            return Err(DomError::HierarchyRequest(
                "only elements can host a shadow root".to_string(),
            ));
        }
        let mut shadow = Node::new(NodeKind::ShadowRoot, "#shadow-root");
        shadow.host = Some(host);
        let shadow = self.nodes.insert(shadow);
        self.nodes[host].shadow_root = Some(shadow);
        self.generation += 1;
        Ok(shadow)
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.nodes.get(host)?.shadow_root
    }

    /// Host element of a shadow root
    pub fn host(&self, shadow: NodeId) -> Option<NodeId> {
        self.nodes.get(shadow)?.host
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.parent
    }

    /// Parent element, excluding the document root and shadow roots
    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        (self.nodes.get(parent)?.kind == NodeKind::Element).then_some(parent)
    }

    /// Parent across shadow boundaries (a shadow root's parent is its host)
    pub fn composed_parent(&self, node: NodeId) -> Option<NodeId> {
        let n = self.nodes.get(node)?;
        n.parent.or(n.host)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Ancestors within the same tree, nearest first
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |&n| self.parent(n))
    }

    /// Descendants in tree order, excluding `node`, not entering shadow roots
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(node, false, &mut out);
        out
    }

    /// Descendants in tree order including the contents of shadow roots
    pub fn composed_descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(node, true, &mut out);
        out
    }

    fn collect_descendants(&self, node: NodeId, composed: bool, out: &mut Vec<NodeId>) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        if composed {
            if let Some(shadow) = n.shadow_root {
                self.collect_descendants(shadow, composed, out);
            }
        }
        for &child in &n.children {
            out.push(child);
            self.collect_descendants(child, composed, out);
        }
    }

    /// Whether `node` is `ancestor` or inside it (same tree)
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether `node` is `ancestor` or inside it, crossing shadow boundaries
    pub fn composed_contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.composed_parent(n);
        }
        false
    }

    /// Whether the node is reachable from the document root
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.exists(node) && self.composed_contains(self.root, node)
    }

    // =========================================================================
    // Content
    // =========================================================================

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).map(|n| n.tag.as_str())
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(node).map(|n| n.kind)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Element)
    }

    /// Read an attribute
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(node)?
            .attributes
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Write an attribute. Returns true if the stored value changed.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: impl Into<String>) -> bool {
        let Some(n) = self.nodes.get_mut(node) else {
            return false;
        };
        let value = value.into();
        let name = name.to_ascii_lowercase();
        if n.attributes.get(&name) == Some(&value) {
            return false;
        }
        n.attributes.insert(name, value);
        true
    }

    /// Remove an attribute. Returns true if it was present.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> bool {
        self.nodes
            .get_mut(node)
            .and_then(|n| n.attributes.shift_remove(&name.to_ascii_lowercase()))
            .is_some()
    }

    /// Set or remove a boolean (presence) attribute
    pub fn toggle_attribute(&mut self, node: NodeId, name: &str, present: bool) -> bool {
        if present {
            if self.has_attribute(node, name) {
                false
            } else {
                self.set_attribute(node, name, "")
            }
        } else {
            self.remove_attribute(node, name)
        }
    }

    /// The `id` attribute
    pub fn id(&self, node: NodeId) -> Option<&str> {
        self.attribute(node, "id")
    }

    /// Whether the whitespace-separated `class` attribute contains `class`
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    /// Find a connected element by id, including inside shadow roots
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.composed_descendants(self.root)
            .into_iter()
            .find(|&n| self.id(n) == Some(id))
    }

    /// Replace the node's own text
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.text = text.into();
        }
    }

    /// The node's own text
    pub fn text(&self, node: NodeId) -> &str {
        self.nodes.get(node).map(|n| n.text.as_str()).unwrap_or("")
    }

    /// Own text followed by descendants' text in tree order
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = self.text(node).to_string();
        for d in self.descendants(node) {
            out.push_str(self.text(d));
        }
        out
    }

    pub fn set_bounds(&mut self, node: NodeId, bounds: Rect) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.bounds = Some(bounds);
        }
    }

    pub fn bounds(&self, node: NodeId) -> Option<Rect> {
        self.nodes.get(node)?.bounds
    }

    // =========================================================================
    // Visibility & focus
    // =========================================================================

    /// Hidden by its own or an ancestor's `hidden` attribute
    pub fn is_hidden(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.has_attribute(n, "hidden") {
                return true;
            }
            current = self.composed_parent(n);
        }
        false
    }

    /// Connected, visible element
    pub fn is_rendered(&self, node: NodeId) -> bool {
        self.is_element(node) && self.is_connected(node) && !self.is_hidden(node)
    }

    fn tab_index(&self, node: NodeId) -> Option<i32> {
        if let Some(value) = self.attribute(node, "tabindex") {
            return value.trim().parse().ok();
        }
        let tag = self.tag(node)?;
        let native = match tag {
            "button" | "input" | "select" | "textarea" => true,
            "a" => self.has_attribute(node, "href"),
            _ => false,
        };
        native.then_some(0)
    }

    /// Can receive focus (by script or keyboard)
    pub fn is_focusable(&self, node: NodeId) -> bool {
        self.is_rendered(node)
            && !self.has_attribute(node, "disabled")
            && self.tab_index(node).is_some()
    }

    /// Reachable with the Tab key
    pub fn is_tabbable(&self, node: NodeId) -> bool {
        self.is_focusable(node) && self.tab_index(node).is_some_and(|t| t >= 0)
    }

    /// Tabbable elements inside `scope` in sequential navigation order:
    /// positive tabindex ascending, then tabindex 0 in tree order.
    pub fn tabbable_descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut ordered: Vec<(i32, usize, NodeId)> = self
            .composed_descendants(scope)
            .into_iter()
            .enumerate()
            .filter(|&(_, n)| self.is_tabbable(n))
            .map(|(i, n)| {
                let t = self.tab_index(n).unwrap_or(0);
                (if t > 0 { t } else { i32::MAX }, i, n)
            })
            .collect();
        ordered.sort_by_key(|&(t, i, _)| (t, i));
        ordered.into_iter().map(|(_, _, n)| n).collect()
    }

    /// Currently focused element
    pub fn active_element(&self) -> Option<NodeId> {
        self.active
            .filter(|&n| self.is_connected(n) && !self.is_hidden(n))
    }

    /// Move focus to `node`.
    ///
    /// Any connected, visible element can take focus programmatically.
    /// Focusing a detached or hidden element leaves focus where it was.
    pub fn focus(&mut self, node: NodeId) -> FocusChange {
        let previous = self.active_element();
        if !self.is_rendered(node) {
            return FocusChange {
                previous,
                current: previous,
            };
        }
        self.active = Some(node);
        FocusChange {
            previous,
            current: Some(node),
        }
    }

    /// Clear focus
    pub fn blur(&mut self) -> FocusChange {
        let previous = self.active_element();
        self.active = None;
        FocusChange {
            previous,
            current: None,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether `node` matches `selector`
    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    /// First descendant of `scope` matching `selector`
    pub fn query(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&n| selector.matches(self, n))
    }

    /// All descendants of `scope` matching `selector`, in tree order
    pub fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect()
    }

    /// Nearest inclusive ancestor of `node` matching `selector`
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|&n| selector.matches(self, n))
    }

    /// Parse and run a one-off [`Document::query`]
    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let selector = Selector::parse(selector)?;
        Ok(self.query(scope, &selector))
    }

    /// Parse and run a one-off [`Document::query_all`]
    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let selector = Selector::parse(selector)?;
        Ok(self.query_all(scope, &selector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let list = doc.create_element("UL");
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        doc.append_child(doc.root(), list).unwrap();
        doc.append_child(list, a).unwrap();
        doc.append_child(list, b).unwrap();
        (doc, list, a, b)
    }

    #[test]
    fn test_structure() {
        let (doc, list, a, b) = tree();
        assert_eq!(doc.tag(list), Some("ul"));
        assert_eq!(doc.children(list), &[a, b]);
        assert_eq!(doc.parent(a), Some(list));
        assert!(doc.contains(list, b));
        assert!(doc.is_connected(a));
        assert_eq!(doc.descendants(doc.root()), vec![list, a, b]);
    }

    #[test]
    fn test_insert_before_and_move() {
        let (mut doc, list, a, b) = tree();
        doc.insert_before(list, b, Some(a)).unwrap();
        assert_eq!(doc.children(list), &[b, a]);

        let other = doc.create_element("ol");
        doc.append_child(doc.root(), other).unwrap();
        doc.append_child(other, a).unwrap();
        assert_eq!(doc.children(list), &[b]);
        assert_eq!(doc.parent(a), Some(other));
    }

    #[test]
    fn test_cycle_rejected() {
        let (mut doc, list, a, _) = tree();
        assert!(matches!(
            doc.append_child(a, list),
            Err(DomError::HierarchyRequest(_))
        ));
    }

    #[test]
    fn test_generation_tracks_structure_only() {
        let (mut doc, list, a, _) = tree();
        let generation = doc.generation();
        doc.set_attribute(a, "role", "option");
        assert_eq!(doc.generation(), generation);
        doc.remove(a).unwrap();
        assert!(doc.generation() > generation);
        assert!(!doc.is_connected(a));
        assert_eq!(doc.children(list).len(), 1);
    }

    #[test]
    fn test_destroy_frees_subtree() {
        let (mut doc, list, a, b) = tree();
        let shadow = doc.attach_shadow(b).unwrap();
        let inner = doc.create_element("span");
        doc.append_child(shadow, inner).unwrap();
        doc.focus(inner);
        let before = doc.node_count();

        let change = doc.destroy(list).unwrap();
        assert_eq!(change.previous, Some(inner));
        assert_eq!(change.current, None);
        assert_eq!(doc.node_count(), before - 5);
        for freed in [list, a, b, shadow, inner] {
            assert!(!doc.exists(freed));
        }
        assert!(doc.children(doc.root()).is_empty());
        assert!(matches!(doc.destroy(list), Err(DomError::NodeNotFound(_))));
        assert!(doc.destroy(doc.root()).is_err());
    }

    #[test]
    fn test_attributes() {
        let (mut doc, _, a, _) = tree();
        assert!(doc.set_attribute(a, "Class", "one two"));
        assert!(!doc.set_attribute(a, "class", "one two"));
        assert!(doc.has_class(a, "two"));
        assert!(!doc.has_class(a, "three"));
        assert!(doc.toggle_attribute(a, "hidden", true));
        assert!(doc.is_hidden(a));
        assert!(doc.remove_attribute(a, "hidden"));
        assert!(!doc.is_hidden(a));
    }

    #[test]
    fn test_focus_follows_connection() {
        let (mut doc, list, a, b) = tree();
        let change = doc.focus(a);
        assert!(change.moved());
        assert_eq!(doc.active_element(), Some(a));

        let change = doc.remove(list).unwrap();
        assert_eq!(change.previous, Some(a));
        assert_eq!(change.current, None);
        assert_eq!(doc.active_element(), None);

        // Detached nodes cannot take focus
        assert!(!doc.focus(b).moved());
    }

    #[test]
    fn test_shadow_root() {
        let (mut doc, list, a, _) = tree();
        let shadow = doc.attach_shadow(list).unwrap();
        assert_eq!(doc.attach_shadow(list).unwrap(), shadow);
        let inner = doc.create_element("span");
        doc.append_child(shadow, inner).unwrap();

        assert!(doc.is_connected(inner));
        assert!(!doc.descendants(list).contains(&inner));
        assert!(doc.composed_descendants(list).contains(&inner));
        assert!(doc.composed_contains(list, inner));
        assert!(!doc.contains(list, inner));
        assert_eq!(doc.host(shadow), Some(list));
        assert!(doc.composed_descendants(list).contains(&a));
    }

    #[test]
    fn test_tabbable_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let first = doc.create_element("button");
        let second = doc.create_element("div");
        let third = doc.create_element("input");
        let skipped = doc.create_element("div");
        doc.set_attribute(second, "tabindex", "2");
        doc.set_attribute(skipped, "tabindex", "-1");
        for n in [first, second, third, skipped] {
            doc.append_child(root, n).unwrap();
        }
        doc.set_attribute(third, "disabled", "");

        assert_eq!(doc.tabbable_descendants(root), vec![second, first]);
        assert!(doc.is_focusable(skipped));
        assert!(!doc.is_tabbable(skipped));
    }

    #[test]
    fn test_text_content() {
        let (mut doc, list, a, b) = tree();
        doc.set_text(a, "Cat");
        doc.set_text(b, "Dog");
        assert_eq!(doc.text_content(list), "CatDog");
    }

    #[test]
    fn test_raw_roundtrip() {
        let (doc, _, a, _) = tree();
        assert_eq!(NodeId::from_raw(a.to_raw()), a);
        assert!(doc.exists(NodeId::from_raw(a.to_raw())));
    }
}
