//! Parent-pointer arena of menu items and submenus
//!
//! Built once per document generation by a single walk of the menu subtree.
//! Every read afterwards (depth, owner, siblings, ancestors) follows stored
//! indices instead of re-walking the document.

use aria_dom::{Document, NodeId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::{ITEM_TAG, SUBMENU_TAG};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuNodeKind {
    Item,
    Submenu,
}

#[derive(Clone, Debug)]
struct Entry {
    node: NodeId,
    kind: MenuNodeKind,
    /// Containing submenu for an item, owning item for a submenu
    parent: Option<usize>,
    /// Number of ancestor submenus
    depth: usize,
    children: SmallVec<[usize; 8]>,
}

#[derive(Clone, Debug, Default)]
pub struct MenuTree {
    entries: Vec<Entry>,
    index: FxHashMap<NodeId, usize>,
    /// Items and submenus with no parent entry
    top: SmallVec<[usize; 8]>,
    generation: Option<u64>,
}

impl MenuTree {
    /// Walk the subtree under `root` (across shadow roots) and record every
    /// item and submenu with its parent
    pub fn build(doc: &Document, root: NodeId) -> Self {
        let mut tree = Self {
            generation: Some(doc.generation()),
            ..Self::default()
        };

        // (node, parent entry, ancestor submenu count)
        let mut stack: Vec<(NodeId, Option<usize>, usize)> = Vec::new();
        push_children(doc, root, None, 0, &mut stack);

        while let Some((node, parent, depth)) = stack.pop() {
            let kind = match doc.tag(node) {
                Some(ITEM_TAG) => Some(MenuNodeKind::Item),
                Some(SUBMENU_TAG) => Some(MenuNodeKind::Submenu),
                _ => None,
            };
            match kind {
                Some(kind) => {
                    let index = tree.entries.len();
                    tree.entries.push(Entry {
                        node,
                        kind,
                        parent,
                        depth,
                        children: SmallVec::new(),
                    });
                    tree.index.insert(node, index);
                    match parent {
                        Some(p) => tree.entries[p].children.push(index),
                        None => tree.top.push(index),
                    }
                    let child_depth = match kind {
                        MenuNodeKind::Submenu => depth + 1,
                        MenuNodeKind::Item => depth,
                    };
                    push_children(doc, node, Some(index), child_depth, &mut stack);
                }
                None => push_children(doc, node, parent, depth, &mut stack),
            }
        }
        tree
    }

    /// Whether the tree was built from the document's current structure
    pub fn is_current(&self, doc: &Document) -> bool {
        self.generation == Some(doc.generation())
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    pub fn kind(&self, node: NodeId) -> Option<MenuNodeKind> {
        self.entry(node).map(|e| e.kind)
    }

    pub fn is_item(&self, node: NodeId) -> bool {
        self.kind(node) == Some(MenuNodeKind::Item)
    }

    pub fn is_submenu(&self, node: NodeId) -> bool {
        self.kind(node) == Some(MenuNodeKind::Submenu)
    }

    pub fn depth(&self, node: NodeId) -> Option<usize> {
        self.entry(node).map(|e| e.depth)
    }

    /// Submenu containing `item`, `None` for menu bar items
    pub fn level_of(&self, item: NodeId) -> Option<NodeId> {
        let entry = self.entry(item)?;
        entry.parent.map(|p| self.entries[p].node)
    }

    /// Item owning `submenu`, `None` for the submenu opened by the button
    pub fn owner_of(&self, submenu: NodeId) -> Option<NodeId> {
        self.level_of(submenu)
    }

    /// First submenu owned by `item`
    pub fn submenu_of(&self, item: NodeId) -> Option<NodeId> {
        let entry = self.entry(item)?;
        entry
            .children
            .iter()
            .map(|&c| &self.entries[c])
            .find(|c| c.kind == MenuNodeKind::Submenu)
            .map(|c| c.node)
    }

    /// Items directly inside `level` (`None` for the top level)
    pub fn items_in(&self, level: Option<NodeId>) -> Vec<NodeId> {
        let indices: &[usize] = match level {
            Some(submenu) => match self.entry(submenu) {
                Some(entry) => entry.children.as_slice(),
                None => return Vec::new(),
            },
            None => self.top.as_slice(),
        };
        indices
            .iter()
            .map(|&i| &self.entries[i])
            .filter(|e| e.kind == MenuNodeKind::Item)
            .map(|e| e.node)
            .collect()
    }

    /// Submenu with no owning item (the one a menu button opens)
    pub fn root_submenu(&self) -> Option<NodeId> {
        self.top
            .iter()
            .map(|&i| &self.entries[i])
            .find(|e| e.kind == MenuNodeKind::Submenu)
            .map(|e| e.node)
    }

    /// The top navigable level: the button's submenu, or the menu bar itself
    pub fn shallow_level(&self) -> Option<NodeId> {
        self.root_submenu()
    }

    pub fn shallow_items(&self) -> Vec<NodeId> {
        self.items_in(self.shallow_level())
    }

    /// Ancestors of `node` (nearest first), alternating submenus and items
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.index.get(&node).and_then(|&i| self.entries[i].parent);
        std::iter::from_fn(move || {
            let index = current?;
            current = self.entries[index].parent;
            Some(self.entries[index].node)
        })
    }

    /// Submenus nested anywhere inside `node`
    pub fn descendant_submenus(&self, node: NodeId) -> Vec<NodeId> {
        let Some(&start) = self.index.get(&node) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.entries[start].children.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            let entry = &self.entries[index];
            if entry.kind == MenuNodeKind::Submenu {
                out.push(entry.node);
            }
            stack.extend(entry.children.iter().rev().copied());
        }
        out
    }

    /// Every submenu in tree order
    pub fn submenus(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries
            .iter()
            .filter(|e| e.kind == MenuNodeKind::Submenu)
            .map(|e| e.node)
    }

    /// Every item in tree order
    pub fn items(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries
            .iter()
            .filter(|e| e.kind == MenuNodeKind::Item)
            .map(|e| e.node)
    }

    /// The nearest item at or above `node` in the document
    pub fn item_at(&self, doc: &Document, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.is_item(n) {
                return Some(n);
            }
            current = doc.composed_parent(n);
        }
        None
    }

    /// The top-level item an item ultimately hangs from
    pub fn top_item(&self, item: NodeId) -> Option<NodeId> {
        std::iter::once(item)
            .chain(self.ancestors(item))
            .filter(|&n| self.is_item(n))
            .last()
    }

    /// Item label without the text of its nested submenu
    pub fn label(&self, doc: &Document, item: NodeId) -> String {
        if let Some(label) = doc
            .attribute(item, "aria-label")
            .or_else(|| doc.attribute(item, "label"))
        {
            return label.to_string();
        }
        let mut text = String::from(doc.text(item));
        let mut stack: Vec<NodeId> = doc.children(item).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.is_submenu(node) {
                continue;
            }
            text.push_str(doc.text(node));
            stack.extend(doc.children(node).iter().rev().copied());
        }
        text.trim().to_string()
    }

    fn entry(&self, node: NodeId) -> Option<&Entry> {
        self.index.get(&node).map(|&i| &self.entries[i])
    }
}

fn push_children(
    doc: &Document,
    node: NodeId,
    parent: Option<usize>,
    depth: usize,
    stack: &mut Vec<(NodeId, Option<usize>, usize)>,
) {
    let shadow = doc
        .shadow_root(node)
        .map(|s| doc.children(s))
        .unwrap_or_default();
    // Reversed so the stack pops in tree order
    for &child in doc.children(node).iter().chain(shadow).rev() {
        stack.push((child, parent, depth));
    }
}
