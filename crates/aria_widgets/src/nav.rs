//! Shared navigation behavior for list-like widgets

use aria_core::{prefix_match, KeyEvent, Timestamp, Typeahead};
use aria_dom::{Document, NodeId};

/// Index after `current`, wrapping or stopping at the end
pub fn next_index(len: usize, current: Option<usize>, wrap: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match current {
        None => Some(0),
        Some(i) if i + 1 < len => Some(i + 1),
        Some(_) if wrap => Some(0),
        Some(i) => Some(i.min(len - 1)),
    }
}

/// Index before `current`, wrapping or stopping at the start
pub fn prev_index(len: usize, current: Option<usize>, wrap: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match current {
        None => Some(len - 1),
        Some(i) if i > 0 => Some(i.min(len) - 1),
        Some(_) if wrap => Some(len - 1),
        Some(_) => Some(0),
    }
}

pub fn position_of(items: &[NodeId], node: Option<NodeId>) -> Option<usize> {
    let node = node?;
    items.iter().position(|&n| n == node)
}

/// The part in `parts` that contains `target` (inclusive)
pub fn part_containing(doc: &Document, parts: &[NodeId], target: NodeId) -> Option<NodeId> {
    parts
        .iter()
        .copied()
        .find(|&part| doc.composed_contains(part, target))
}

/// Accessible label: `aria-label`, then `label`, then trimmed text content
pub fn label(doc: &Document, node: NodeId) -> String {
    doc.attribute(node, "aria-label")
        .or_else(|| doc.attribute(node, "label"))
        .map(str::to_string)
        .unwrap_or_else(|| doc.text_content(node).trim().to_string())
}

/// Option value: the `value` attribute, falling back to the label
pub fn value(doc: &Document, node: NodeId) -> String {
    doc.attribute(node, "value")
        .map(str::to_string)
        .unwrap_or_else(|| label(doc, node))
}

/// Run typeahead over `items` starting after `current`
pub fn typeahead(
    typeahead: &mut Typeahead,
    key: &KeyEvent,
    now: Timestamp,
    doc: &Document,
    items: &[NodeId],
    current: Option<NodeId>,
) -> Option<NodeId> {
    let labels: Vec<String> = items.iter().map(|&n| label(doc, n)).collect();
    let start = position_of(items, current);
    typeahead
        .handle(key, now, &labels, start, |label, _, _, buffer| {
            prefix_match(label, buffer)
        })
        .map(|index| items[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_prev() {
        assert_eq!(next_index(0, None, true), None);
        assert_eq!(next_index(3, None, false), Some(0));
        assert_eq!(next_index(3, Some(2), false), Some(2));
        assert_eq!(next_index(3, Some(2), true), Some(0));
        assert_eq!(prev_index(3, None, false), Some(2));
        assert_eq!(prev_index(3, Some(0), false), Some(0));
        assert_eq!(prev_index(3, Some(0), true), Some(2));
        assert_eq!(prev_index(3, Some(1), true), Some(0));
    }

    #[test]
    fn test_label_and_part_lookup() {
        use aria_dom::el;

        let mut doc = Document::new();
        let root = doc.root();
        let list = doc
            .insert(
                root,
                el("ul").children([
                    el("li").attr("aria-label", "Apple").child(el("span").text("ignored")),
                    el("li").attr("value", "b").child(el("span").text("  Banana ")),
                ]),
            )
            .unwrap();
        let items = doc.children(list).to_vec();
        assert_eq!(label(&doc, items[0]), "Apple");
        assert_eq!(label(&doc, items[1]), "Banana");
        assert_eq!(value(&doc, items[0]), "Apple");
        assert_eq!(value(&doc, items[1]), "b");

        let span = doc.children(items[1])[0];
        assert_eq!(part_containing(&doc, &items, span), Some(items[1]));
        assert_eq!(part_containing(&doc, &items, list), None);
    }
}
