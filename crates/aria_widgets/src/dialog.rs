//! Dialog Widget
//!
//! Showing a dialog activates a [`FocusTrap`] scoped to its subtree; hiding
//! it deactivates the trap and hands focus back. `Open` and `Close`
//! notifications are queued only after focus has moved, so a host reading
//! them can rely on the active element.

use aria_core::{event_types, Event, EventId, Key, StateMachine};
use aria_dom::{Document, NodeId, Selector};
use serde::{Deserialize, Serialize};

use crate::aria;
use crate::config::parse_flag;
use crate::context::WidgetCx;
use crate::error::Result;
use crate::focus_trap::{FocusTrap, TabCycleTrap, TrapOptions};
use crate::notification::NotificationKind;
use crate::widget::{Controller, Expandable, Focusable};

pub const TAG: &str = "ui-dialog";

/// Dialog FSM states
pub mod states {
    pub const CLOSED: u32 = 0;
    pub const OPEN: u32 = 1;
}

const SHOW: EventId = event_types::USER + 1;
const HIDE: EventId = event_types::USER + 2;

const OBSERVED: &[&str] = &[
    "open",
    "initial-focus",
    "fallback-focus",
    "escape-deactivates",
    "click-outside-deactivates",
    "return-focus",
    "modal",
];

/// Dialog configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    /// Visible on mount
    pub open: bool,
    /// Selector for the element focused on open
    pub initial_focus: Option<String>,
    /// Selector focused when nothing inside is tabbable
    pub fallback_focus: Option<String>,
    pub escape_deactivates: bool,
    pub click_outside_deactivates: bool,
    pub return_focus: bool,
    /// Pull focus back inside when it moves out while open
    pub modal: bool,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            open: false,
            initial_focus: None,
            fallback_focus: None,
            escape_deactivates: true,
            click_outside_deactivates: false,
            return_focus: true,
            modal: true,
        }
    }
}

impl DialogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    pub fn initial_focus(mut self, selector: impl Into<String>) -> Self {
        self.initial_focus = Some(selector.into());
        self
    }

    pub fn fallback_focus(mut self, selector: impl Into<String>) -> Self {
        self.fallback_focus = Some(selector.into());
        self
    }

    pub fn escape_deactivates(mut self, enabled: bool) -> Self {
        self.escape_deactivates = enabled;
        self
    }

    pub fn click_outside_deactivates(mut self, enabled: bool) -> Self {
        self.click_outside_deactivates = enabled;
        self
    }

    pub fn return_focus(mut self, enabled: bool) -> Self {
        self.return_focus = enabled;
        self
    }

    pub fn modal(mut self, modal: bool) -> Self {
        self.modal = modal;
        self
    }

    pub(crate) fn apply_attribute(&mut self, name: &str, value: Option<&str>) -> Result<bool> {
        // Policies default to on, so only an explicit "false" turns them off
        let enabled = |value: Option<&str>| value.map_or(true, |v| parse_flag(Some(v)));
        match name {
            "open" => self.open = parse_flag(value),
            "initial-focus" => self.initial_focus = value.map(str::to_string),
            "fallback-focus" => self.fallback_focus = value.map(str::to_string),
            "escape-deactivates" => self.escape_deactivates = enabled(value),
            "click-outside-deactivates" => self.click_outside_deactivates = parse_flag(value),
            "return-focus" => self.return_focus = enabled(value),
            "modal" => self.modal = enabled(value),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Compile the focus selectors
    fn trap_options(&self) -> Result<TrapOptions> {
        let compile = |source: &Option<String>| -> Result<Option<Selector>> {
            Ok(source.as_deref().map(Selector::parse).transpose()?)
        };
        Ok(TrapOptions {
            initial_focus: compile(&self.initial_focus)?,
            fallback_focus: compile(&self.fallback_focus)?,
            return_focus: self.return_focus,
        })
    }
}

pub struct Dialog {
    root: NodeId,
    config: DialogConfig,
    trap_options: TrapOptions,
    trap: Box<dyn FocusTrap>,
    fsm: StateMachine,
}

impl Dialog {
    pub fn new(root: NodeId, config: DialogConfig) -> Result<Self> {
        Self::with_trap(root, config, Box::new(TabCycleTrap::new()))
    }

    /// Use a host-provided focus trap
    pub fn with_trap(root: NodeId, config: DialogConfig, trap: Box<dyn FocusTrap>) -> Result<Self> {
        let trap_options = config.trap_options()?;
        let fsm = StateMachine::builder(states::CLOSED)
            .on(states::CLOSED, SHOW, states::OPEN)
            .on(states::OPEN, HIDE, states::CLOSED)
            .build();
        Ok(Self {
            root,
            config,
            trap_options,
            trap,
            fsm,
        })
    }

    pub fn config(&self) -> &DialogConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.fsm.current_state() == states::OPEN
    }

    /// Make the dialog visible and move focus inside
    pub fn show(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        if self.is_open() {
            tracing::warn!(root = ?self.root, "show: dialog is already open");
            return false;
        }
        cx.toggle_attr(self.root, "hidden", false);
        let target = match self.trap.activate(cx.doc(), self.root, &self.trap_options) {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(root = ?self.root, %err, "focus trap activation failed");
                cx.toggle_attr(self.root, "hidden", true);
                self.config.open = false;
                return false;
            }
        };
        self.fsm.send(SHOW);
        self.config.open = true;
        cx.focus(target);
        tracing::debug!(root = ?self.root, ?target, "dialog opened");
        cx.notify(NotificationKind::Open);
        true
    }

    /// Hide the dialog and return focus
    pub fn hide(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        if !self.is_open() {
            return false;
        }
        let return_to = match self.trap.deactivate(cx.doc()) {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(root = ?self.root, %err, "focus trap deactivation failed");
                None
            }
        };
        self.fsm.send(HIDE);
        self.config.open = false;
        match return_to {
            Some(target) => {
                cx.focus(target);
            }
            None if cx.is_focus_within(self.root) => cx.blur(),
            None => {}
        }
        cx.toggle_attr(self.root, "hidden", true);
        tracing::debug!(root = ?self.root, ?return_to, "dialog closed");
        cx.notify(NotificationKind::Close);
        true
    }

    fn handle_key(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event) {
        let Some(key) = event.key() else {
            return;
        };
        match key.key {
            Key::Tab => {
                let backward = key.modifiers.shift;
                event.prevent_default();
                let next = self.trap.next_stop(cx.doc(), cx.active_element(), backward);
                if let Some(next) = next {
                    cx.focus(next);
                }
            }
            Key::Escape if self.config.escape_deactivates => {
                event.prevent_default();
                event.stop_propagation();
                self.hide(cx);
            }
            _ => {}
        }
    }
}

impl Controller for Dialog {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self) -> &'static str {
        "dialog"
    }

    fn observed_attributes(&self) -> &'static [&'static str] {
        OBSERVED
    }

    fn mount(&mut self, cx: &mut WidgetCx<'_>) {
        if self.config.open {
            self.show(cx);
        }
        self.sync(cx);
    }

    fn unmount(&mut self, cx: &mut WidgetCx<'_>) {
        if self.trap.is_active() {
            if let Err(err) = self.trap.deactivate(cx.doc()) {
                tracing::warn!(root = ?self.root, %err, "focus trap deactivation failed");
            }
        }
    }

    fn handle_event(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event) {
        if self.is_open() && event.event_type == event_types::KEY_DOWN {
            self.handle_key(cx, event);
        }
    }

    fn handle_outside(&mut self, cx: &mut WidgetCx<'_>, event: &Event) {
        if !self.is_open() {
            return;
        }
        match event.event_type {
            event_types::POINTER_DOWN if self.config.click_outside_deactivates => {
                self.hide(cx);
            }
            event_types::FOCUS_IN if self.config.modal => {
                if let Some(target) = self.trap.recapture(cx.doc()) {
                    tracing::trace!(root = ?self.root, ?target, "focus recaptured");
                    cx.focus(target);
                }
            }
            _ => {}
        }
    }

    fn attribute_changed(
        &mut self,
        cx: &mut WidgetCx<'_>,
        name: &str,
        value: Option<&str>,
    ) -> Result<()> {
        let mut config = self.config.clone();
        config.apply_attribute(name, value)?;
        self.trap_options = config.trap_options()?;
        self.config = config;
        if name == "open" {
            if self.config.open {
                if !self.is_open() {
                    self.show(cx);
                }
            } else {
                self.hide(cx);
            }
        }
        Ok(())
    }

    fn sync(&mut self, cx: &mut WidgetCx<'_>) {
        let root = self.root;
        let open = self.is_open();
        if cx.doc().attribute(root, aria::ROLE).is_none() {
            cx.set_attr(root, aria::ROLE, "dialog");
        }
        aria::set_bool(cx, root, "aria-modal", self.config.modal);
        cx.toggle_attr(root, "open", open);
        cx.toggle_attr(root, "hidden", !open);
    }
}

impl Focusable for Dialog {
    fn focused_part(&self, doc: &Document) -> Option<NodeId> {
        doc.active_element()
            .filter(|&active| doc.composed_contains(self.root, active))
    }
}

impl Expandable for Dialog {
    fn is_expanded(&self) -> bool {
        self.is_open()
    }

    fn expand(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        self.show(cx)
    }

    fn collapse(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        self.hide(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WidgetContext;
    use aria_core::Modifiers;
    use aria_dom::el;

    fn fixture(config: DialogConfig) -> (WidgetContext, crate::WidgetId) {
        let mut cx = WidgetContext::default();
        let body = cx.doc().root();
        cx.doc_mut().insert(body, el("button").id("opener")).unwrap();
        cx.doc_mut().insert(body, el("button").id("elsewhere")).unwrap();
        let root = cx
            .doc_mut()
            .insert(
                body,
                el(TAG).id("dialog").children([
                    el("input").id("name"),
                    el("button").id("cancel"),
                    el("button").id("ok").class("primary"),
                ]),
            )
            .unwrap();
        let id = cx.mount(root, config).unwrap();
        let opener = node(&cx, "opener");
        cx.focus(opener);
        (cx, id)
    }

    fn node(cx: &WidgetContext, id: &str) -> NodeId {
        cx.doc().element_by_id(id).unwrap()
    }

    fn open(cx: &mut WidgetContext, id: crate::WidgetId) -> bool {
        cx.with::<Dialog, _>(id, |d, wcx| d.show(wcx)).unwrap()
    }

    #[test]
    fn test_open_focuses_first_tabbable_then_notifies() {
        let (mut cx, id) = fixture(DialogConfig::default());
        let dialog = node(&cx, "dialog");
        assert!(cx.doc().has_attribute(dialog, "hidden"));
        assert_eq!(cx.doc().attribute(dialog, "role"), Some("dialog"));
        assert_eq!(cx.doc().attribute(dialog, "aria-modal"), Some("true"));

        cx.take_notifications();
        assert!(open(&mut cx, id));
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "name")));
        assert!(!cx.doc().has_attribute(dialog, "hidden"));
        assert!(cx.doc().has_attribute(dialog, "open"));
        let kinds: Vec<_> = cx.take_notifications().into_iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Open]);
        assert!(!open(&mut cx, id));
    }

    #[test]
    fn test_tab_cycles_inside() {
        let (mut cx, id) = fixture(DialogConfig::default());
        open(&mut cx, id);
        cx.press(Key::Tab);
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "cancel")));
        cx.press(Key::Tab);
        cx.press(Key::Tab);
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "name")));
        cx.press_with(Key::Tab, Modifiers::SHIFT);
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "ok")));
    }

    #[test]
    fn test_escape_closes_and_returns_focus() {
        let (mut cx, id) = fixture(DialogConfig::default());
        open(&mut cx, id);
        cx.take_notifications();
        cx.press(Key::Escape);
        assert!(!cx.get::<Dialog>(id).unwrap().is_open());
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "opener")));
        assert!(cx.doc().has_attribute(node(&cx, "dialog"), "hidden"));
        let kinds: Vec<_> = cx.take_notifications().into_iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Close]);
    }

    #[test]
    fn test_escape_policy_and_initial_focus() {
        let config = DialogConfig::default()
            .escape_deactivates(false)
            .initial_focus(".primary");
        let (mut cx, id) = fixture(config);
        open(&mut cx, id);
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "ok")));
        cx.press(Key::Escape);
        assert!(cx.get::<Dialog>(id).unwrap().is_open());
    }

    #[test]
    fn test_modal_recaptures_focus() {
        let (mut cx, id) = fixture(DialogConfig::default());
        open(&mut cx, id);
        cx.focus(node(&cx, "elsewhere"));
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "name")));

        cx.attribute_changed(id, "modal", Some("false")).unwrap();
        cx.focus(node(&cx, "elsewhere"));
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "elsewhere")));
    }

    #[test]
    fn test_click_outside_policy() {
        let config = DialogConfig::default().click_outside_deactivates(true);
        let (mut cx, id) = fixture(config);
        open(&mut cx, id);
        let elsewhere = node(&cx, "elsewhere");
        let now = cx.now();
        cx.dispatch(Event::pointer(event_types::POINTER_DOWN, elsewhere.to_raw(), 0.0, 0.0).at(now));
        assert!(!cx.get::<Dialog>(id).unwrap().is_open());
    }

    #[test]
    fn test_open_attribute_drives_visibility() {
        let (mut cx, id) = fixture(DialogConfig::default());
        cx.attribute_changed(id, "open", Some("")).unwrap();
        assert!(cx.get::<Dialog>(id).unwrap().is_open());
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "name")));
        cx.attribute_changed(id, "open", None).unwrap();
        assert!(!cx.get::<Dialog>(id).unwrap().is_open());
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "opener")));

        assert!(cx.attribute_changed(id, "initial-focus", Some("[[")).is_err());
    }

    #[test]
    fn test_failed_open_clears_open_flag() {
        let mut cx = WidgetContext::default();
        let body = cx.doc().root();
        let wrapper = cx.doc_mut().insert(body, el("div").attr("hidden", "")).unwrap();
        let root = cx
            .doc_mut()
            .insert(wrapper, el(TAG).child(el("button")))
            .unwrap();
        let id = cx.mount(root, DialogConfig::default().open(true)).unwrap();

        let dialog = cx.get::<Dialog>(id).unwrap();
        assert!(!dialog.is_open());
        assert!(!dialog.config().open);
        assert!(cx.doc().has_attribute(root, "hidden"));
        assert!(!cx.doc().has_attribute(root, "open"));
        assert!(cx.take_notifications().is_empty());

        cx.doc_mut().remove_attribute(wrapper, "hidden");
        cx.attribute_changed(id, "open", Some("")).unwrap();
        assert!(cx.get::<Dialog>(id).unwrap().config().open);
        assert!(cx.get::<Dialog>(id).unwrap().is_open());
    }
}
