//! Focus trap collaborator used by dialogs
//!
//! A trap never moves focus itself. It answers where focus should go
//! (initial target on activation, return target on deactivation, next stop
//! on Tab) and the dialog controller performs the move through its context
//! so focus events are delivered in order.

use aria_dom::{Document, NodeId, Selector};

use crate::error::FocusTrapError;

/// Options forwarded from the dialog configuration
#[derive(Clone, Debug, Default)]
pub struct TrapOptions {
    /// Element to focus on activation
    pub initial_focus: Option<Selector>,
    /// Element to focus when nothing inside is tabbable
    pub fallback_focus: Option<Selector>,
    /// Restore the previously focused element on deactivation
    pub return_focus: bool,
}

pub trait FocusTrap {
    /// Activate for `container`. Returns the element that should receive focus.
    fn activate(
        &mut self,
        doc: &Document,
        container: NodeId,
        options: &TrapOptions,
    ) -> Result<NodeId, FocusTrapError>;

    /// Deactivate. Returns the element focus should return to, if any.
    fn deactivate(&mut self, doc: &Document) -> Result<Option<NodeId>, FocusTrapError>;

    fn is_active(&self) -> bool;

    /// Next focus stop for Tab (`backward` for Shift+Tab)
    fn next_stop(&self, doc: &Document, current: Option<NodeId>, backward: bool) -> Option<NodeId>;

    /// Where to pull focus back to when it escaped the container
    fn recapture(&self, doc: &Document) -> Option<NodeId>;
}

#[derive(Debug)]
struct ActiveTrap {
    container: NodeId,
    return_to: Option<NodeId>,
    return_focus: bool,
    fallback: Option<Selector>,
}

/// Cycles Tab / Shift+Tab among the container's tabbable elements
#[derive(Debug, Default)]
pub struct TabCycleTrap {
    active: Option<ActiveTrap>,
}

impl TabCycleTrap {
    pub fn new() -> Self {
        Self::default()
    }

    fn fallback(doc: &Document, container: NodeId, fallback: Option<&Selector>) -> Option<NodeId> {
        fallback
            .and_then(|s| doc.query(container, s))
            .or_else(|| doc.is_rendered(container).then_some(container))
    }
}

impl FocusTrap for TabCycleTrap {
    fn activate(
        &mut self,
        doc: &Document,
        container: NodeId,
        options: &TrapOptions,
    ) -> Result<NodeId, FocusTrapError> {
        if self.active.is_some() {
            return Err(FocusTrapError::AlreadyActive);
        }
        let target = options
            .initial_focus
            .as_ref()
            .and_then(|s| doc.query(container, s))
            .filter(|&n| doc.is_rendered(n))
            .or_else(|| doc.tabbable_descendants(container).first().copied())
            .or_else(|| Self::fallback(doc, container, options.fallback_focus.as_ref()))
            .ok_or(FocusTrapError::NoFocusableElement(container))?;

        self.active = Some(ActiveTrap {
            container,
            return_to: doc.active_element(),
            return_focus: options.return_focus,
            fallback: options.fallback_focus.clone(),
        });
        tracing::debug!(?container, ?target, "focus trap activated");
        Ok(target)
    }

    fn deactivate(&mut self, doc: &Document) -> Result<Option<NodeId>, FocusTrapError> {
        let trap = self.active.take().ok_or(FocusTrapError::NotActive)?;
        tracing::debug!(container = ?trap.container, "focus trap deactivated");
        Ok(trap
            .return_to
            .filter(|_| trap.return_focus)
            .filter(|&n| doc.is_rendered(n) && !doc.composed_contains(trap.container, n)))
    }

    fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn next_stop(&self, doc: &Document, current: Option<NodeId>, backward: bool) -> Option<NodeId> {
        let trap = self.active.as_ref()?;
        let stops = doc.tabbable_descendants(trap.container);
        if stops.is_empty() {
            return Self::fallback(doc, trap.container, trap.fallback.as_ref());
        }
        let index = current.and_then(|c| stops.iter().position(|&s| s == c));
        let next = if backward {
            crate::nav::prev_index(stops.len(), index, true)
        } else {
            crate::nav::next_index(stops.len(), index, true)
        };
        next.map(|i| stops[i])
    }

    fn recapture(&self, doc: &Document) -> Option<NodeId> {
        let trap = self.active.as_ref()?;
        doc.tabbable_descendants(trap.container)
            .first()
            .copied()
            .or_else(|| Self::fallback(doc, trap.container, trap.fallback.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aria_dom::el;

    fn fixture() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let opener = doc.insert(root, el("button").id("opener")).unwrap();
        let dialog = doc
            .insert(
                root,
                el("ui-dialog").children([
                    el("input").id("name"),
                    el("button").id("cancel"),
                    el("button").id("ok").class("primary"),
                ]),
            )
            .unwrap();
        doc.focus(opener);
        (doc, opener, dialog)
    }

    #[test]
    fn test_activation_targets() {
        let (doc, _, dialog) = fixture();
        let mut trap = TabCycleTrap::new();
        let target = trap.activate(&doc, dialog, &TrapOptions::default()).unwrap();
        assert_eq!(doc.id(target), Some("name"));
        assert_eq!(
            trap.activate(&doc, dialog, &TrapOptions::default()),
            Err(FocusTrapError::AlreadyActive)
        );

        let mut trap = TabCycleTrap::new();
        let options = TrapOptions {
            initial_focus: Some(Selector::parse(".primary").unwrap()),
            ..TrapOptions::default()
        };
        let target = trap.activate(&doc, dialog, &options).unwrap();
        assert_eq!(doc.id(target), Some("ok"));
    }

    #[test]
    fn test_tab_cycles() {
        let (doc, _, dialog) = fixture();
        let mut trap = TabCycleTrap::new();
        trap.activate(&doc, dialog, &TrapOptions::default()).unwrap();
        let ok = doc.element_by_id("ok");
        let name = doc.element_by_id("name");
        assert_eq!(trap.next_stop(&doc, ok, false), name);
        assert_eq!(trap.next_stop(&doc, name, true), ok);
    }

    #[test]
    fn test_return_focus() {
        let (doc, opener, dialog) = fixture();
        let mut trap = TabCycleTrap::new();
        let options = TrapOptions {
            return_focus: true,
            ..TrapOptions::default()
        };
        trap.activate(&doc, dialog, &options).unwrap();
        assert_eq!(trap.deactivate(&doc), Ok(Some(opener)));
        assert_eq!(trap.deactivate(&doc), Err(FocusTrapError::NotActive));
    }

    #[test]
    fn test_empty_container_uses_container() {
        let mut doc = Document::new();
        let root = doc.root();
        let dialog = doc.insert(root, el("ui-dialog")).unwrap();
        let mut trap = TabCycleTrap::new();
        assert_eq!(trap.activate(&doc, dialog, &TrapOptions::default()), Ok(dialog));

        doc.set_attribute(dialog, "hidden", "");
        let mut trap = TabCycleTrap::new();
        assert_eq!(
            trap.activate(&doc, dialog, &TrapOptions::default()),
            Err(FocusTrapError::NoFocusableElement(dialog))
        );
    }
}
