//! List Box Widget
//!
//! A persistent list of options with single or multiple selection. The root
//! keeps document focus and points at the focused option through
//! `aria-activedescendant`.

use std::time::Duration;

use aria_core::{event_types, Event, Key, KeyEvent, Typeahead, DEFAULT_TYPEAHEAD_DEBOUNCE};
use aria_dom::{Document, NodeId, PartQuery, Parts};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::aria;
use crate::config::{duration_ms, parse_duration, parse_enum, parse_flag, Orientation, ScrollOptions};
use crate::context::WidgetCx;
use crate::error::Result;
use crate::nav;
use crate::notification::NotificationKind;
use crate::widget::{Controller, Focusable, ValueHolder};

pub const TAG: &str = "ui-listbox";
pub const OPTION_TAG: &str = "ui-listbox-option";

const OBSERVED: &[&str] = &[
    "multiple",
    "selection-follows-focus",
    "select-first-option-on-focus",
    "orientation",
    "disabled",
    "typeahead-debounce-time",
];

/// List box configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListBoxConfig {
    pub multiple: bool,
    /// Moving focus also selects (single mode only)
    pub selection_follows_focus: bool,
    /// Select the first option when focus enters an empty selection
    /// (single mode only)
    pub select_first_option_on_focus: bool,
    pub orientation: Orientation,
    pub disabled: bool,
    #[serde(with = "duration_ms")]
    pub typeahead_debounce: Duration,
    pub scroll: ScrollOptions,
}

impl Default for ListBoxConfig {
    fn default() -> Self {
        Self {
            multiple: false,
            selection_follows_focus: false,
            select_first_option_on_focus: false,
            orientation: Orientation::Vertical,
            disabled: false,
            typeahead_debounce: DEFAULT_TYPEAHEAD_DEBOUNCE,
            scroll: ScrollOptions::default(),
        }
    }
}

impl ListBoxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn selection_follows_focus(mut self, follows: bool) -> Self {
        self.selection_follows_focus = follows;
        self
    }

    pub fn select_first_option_on_focus(mut self, select: bool) -> Self {
        self.select_first_option_on_focus = select;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn typeahead_debounce(mut self, delay: Duration) -> Self {
        self.typeahead_debounce = delay;
        self
    }

    pub(crate) fn apply_attribute(&mut self, name: &str, value: Option<&str>) -> Result<bool> {
        match name {
            "multiple" => self.multiple = parse_flag(value),
            "selection-follows-focus" => self.selection_follows_focus = parse_flag(value),
            "select-first-option-on-focus" => self.select_first_option_on_focus = parse_flag(value),
            "disabled" => self.disabled = parse_flag(value),
            "orientation" => {
                self.orientation = value
                    .map(|v| parse_enum(name, v))
                    .transpose()?
                    .unwrap_or(Orientation::Vertical);
            }
            "typeahead-debounce-time" => {
                self.typeahead_debounce = value
                    .map(|v| parse_duration(name, v))
                    .transpose()?
                    .unwrap_or(DEFAULT_TYPEAHEAD_DEBOUNCE);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn single_follows_focus(&self) -> bool {
        self.selection_follows_focus && !self.multiple
    }
}

pub struct ListBox {
    root: NodeId,
    config: ListBoxConfig,
    parts: Parts,
    focused: Option<NodeId>,
    selected: FxHashSet<NodeId>,
    /// Values of `selected` in document order
    values: Vec<String>,
    typeahead: Typeahead,
}

impl ListBox {
    pub fn new(root: NodeId, config: ListBoxConfig) -> Result<Self> {
        let parts = Parts::new().declare("options", PartQuery::all(OPTION_TAG)?);
        Ok(Self {
            root,
            typeahead: Typeahead::new(config.typeahead_debounce),
            config,
            parts,
            focused: None,
            selected: FxHashSet::default(),
            values: Vec::new(),
        })
    }

    pub fn config(&self) -> &ListBoxConfig {
        &self.config
    }

    pub fn focused_option(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn is_selected(&self, option: NodeId) -> bool {
        self.selected.contains(&option)
    }

    /// Selected options in document order
    pub fn selected_options(&self, doc: &Document) -> Vec<NodeId> {
        self.parts
            .bind(doc, self.root)
            .all("options")
            .into_iter()
            .filter(|o| self.selected.contains(o))
            .collect()
    }

    /// Options that can take focus
    fn options(&self, doc: &Document) -> Vec<NodeId> {
        self.parts
            .bind(doc, self.root)
            .all("options")
            .into_iter()
            .filter(|&o| doc.is_rendered(o))
            .collect()
    }

    fn focus_option(&mut self, cx: &mut WidgetCx<'_>, option: NodeId) {
        if self.focused == Some(option) {
            return;
        }
        self.focused = Some(option);
        cx.notify_part(
            option,
            NotificationKind::ScrollIntoView {
                container: Some(self.root),
                target: option,
                options: self.config.scroll,
            },
        );
    }

    fn refresh_values(&mut self, doc: &Document) {
        self.values = self
            .selected_options(doc)
            .into_iter()
            .map(|o| nav::value(doc, o))
            .collect();
    }

    fn changed(&mut self, cx: &mut WidgetCx<'_>) {
        self.refresh_values(cx.doc());
        tracing::debug!(root = ?self.root, selected = self.selected.len(), "list box selection changed");
        cx.notify(NotificationKind::Changed);
    }

    /// Make `option` the only selected option
    fn select_only(&mut self, cx: &mut WidgetCx<'_>, option: NodeId) {
        if self.selected.len() == 1 && self.selected.contains(&option) {
            return;
        }
        self.selected.clear();
        self.selected.insert(option);
        self.changed(cx);
    }

    /// Add options to the selection; returns true if any was new
    fn select_all_of(&mut self, cx: &mut WidgetCx<'_>, options: &[NodeId]) -> bool {
        let before = self.selected.len();
        self.selected.extend(options.iter().copied());
        let changed = self.selected.len() != before;
        if changed {
            self.changed(cx);
        }
        changed
    }

    /// Click / Space on an option
    fn activate(&mut self, cx: &mut WidgetCx<'_>, option: NodeId) {
        if self.config.multiple {
            if !self.selected.remove(&option) {
                self.selected.insert(option);
            }
            self.changed(cx);
        } else {
            self.select_only(cx, option);
        }
    }

    fn move_focus(&mut self, cx: &mut WidgetCx<'_>, option: NodeId, extend: bool) {
        self.focus_option(cx, option);
        if extend && self.config.multiple {
            self.select_all_of(cx, &[option]);
        } else if self.config.single_follows_focus() {
            self.select_only(cx, option);
        }
    }

    fn toggle_all(&mut self, cx: &mut WidgetCx<'_>, options: &[NodeId]) {
        if options.iter().all(|o| self.selected.contains(o)) {
            if self.selected.is_empty() {
                return;
            }
            self.selected.clear();
            self.changed(cx);
        } else {
            self.select_all_of(cx, options);
        }
    }

    /// Focus entered the root from outside
    fn focus_entered(&mut self, cx: &mut WidgetCx<'_>) {
        let options = self.options(cx.doc());
        if self.focused.is_some_and(|f| options.contains(&f)) {
            return;
        }
        let first_selected = options.iter().copied().find(|o| self.selected.contains(o));
        let Some(target) = first_selected.or_else(|| options.first().copied()) else {
            return;
        };
        self.focus_option(cx, target);
        if first_selected.is_none() && self.config.select_first_option_on_focus && !self.config.multiple {
            self.select_only(cx, target);
        }
    }

    fn handle_key(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event) {
        let Some(key) = event.key().cloned() else {
            return;
        };
        let options = self.options(cx.doc());
        let index = nav::position_of(&options, self.focused);
        let (next_key, prev_key) = match self.config.orientation {
            Orientation::Vertical => (Key::ArrowDown, Key::ArrowUp),
            Orientation::Horizontal => (Key::ArrowRight, Key::ArrowLeft),
        };
        let modifiers = key.modifiers;
        let range = self.config.multiple && (modifiers.shift || modifiers.command());

        match &key.key {
            k if *k == next_key || *k == prev_key => {
                event.prevent_default();
                let next = if *k == next_key {
                    nav::next_index(options.len(), index, false)
                } else {
                    nav::prev_index(options.len(), index, false)
                };
                if let Some(next) = next.map(|i| options[i]) {
                    self.move_focus(cx, next, modifiers.shift);
                }
            }
            Key::Home | Key::End => {
                event.prevent_default();
                let target = if key.key == Key::Home {
                    options.first()
                } else {
                    options.last()
                };
                let Some(&target) = target else {
                    return;
                };
                if range {
                    let from = index.unwrap_or(0);
                    let to = nav::position_of(&options, Some(target)).unwrap_or(from);
                    let (lo, hi) = (from.min(to), from.max(to));
                    self.select_all_of(cx, &options[lo..=hi]);
                    self.focus_option(cx, target);
                } else {
                    self.move_focus(cx, target, false);
                }
            }
            Key::Character(c) if c.eq_ignore_ascii_case(&'a') && modifiers.command() => {
                if self.config.multiple {
                    event.prevent_default();
                    self.toggle_all(cx, &options);
                }
            }
            Key::Space => {
                event.prevent_default();
                if let Some(focused) = self.focused {
                    self.activate(cx, focused);
                }
            }
            Key::Character(_) => self.run_typeahead(cx, &key, &options),
            _ => {}
        }
    }

    fn run_typeahead(&mut self, cx: &mut WidgetCx<'_>, key: &KeyEvent, options: &[NodeId]) {
        let hit = nav::typeahead(
            &mut self.typeahead,
            key,
            cx.now(),
            cx.doc(),
            options,
            self.focused,
        );
        if let Some(option) = hit {
            self.move_focus(cx, option, false);
        }
    }
}

impl Controller for ListBox {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self) -> &'static str {
        "listbox"
    }

    fn observed_attributes(&self) -> &'static [&'static str] {
        OBSERVED
    }

    fn handle_event(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event) {
        if self.config.disabled {
            if matches!(
                event.event_type,
                event_types::KEY_DOWN | event_types::CLICK
            ) {
                tracing::warn!(root = ?self.root, "list box is disabled");
            }
            return;
        }
        let target = NodeId::from_raw(event.target);
        match event.event_type {
            event_types::KEY_DOWN => self.handle_key(cx, event),
            event_types::CLICK => {
                let options = self.options(cx.doc());
                if let Some(option) = nav::part_containing(cx.doc(), &options, target) {
                    cx.focus(self.root);
                    self.focus_option(cx, option);
                    self.activate(cx, option);
                }
            }
            event_types::FOCUS_IN if target == self.root => {
                let from_outside = event
                    .related_target()
                    .map(NodeId::from_raw)
                    .map_or(true, |related| !cx.doc().composed_contains(self.root, related));
                if from_outside {
                    self.focus_entered(cx);
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
        self.config.apply_attribute(name, value)?;
        self.typeahead.set_debounce(self.config.typeahead_debounce);
        if !self.config.multiple && self.selected.len() > 1 {
            let keep = self.selected_options(cx.doc()).first().copied();
            self.selected.retain(|&o| Some(o) == keep);
            self.changed(cx);
        }
        Ok(())
    }

    fn sync(&mut self, cx: &mut WidgetCx<'_>) {
        let doc = cx.doc();
        let all = self.parts.bind(doc, self.root).all("options");
        if self.focused.is_some_and(|f| !doc.is_rendered(f)) {
            self.focused = None;
        }
        let before = self.selected.len();
        self.selected.retain(|o| all.contains(o));
        if self.selected.len() != before {
            self.changed(cx);
        } else {
            self.refresh_values(cx.doc());
        }
        let root = self.root;

        cx.set_attr(root, aria::ROLE, "listbox");
        cx.set_attr(root, aria::TABINDEX, if self.config.disabled { "-1" } else { "0" });
        aria::set_bool(cx, root, "aria-multiselectable", self.config.multiple);
        aria::set_bool(cx, root, aria::DISABLED, self.config.disabled);
        cx.set_attr(root, aria::ORIENTATION, self.config.orientation.as_str());
        let active = self.focused.map(|f| cx.ensure_id(f, "listbox-option"));
        aria::set_optional(cx, root, aria::ACTIVE_DESCENDANT, active.as_deref());

        for option in all {
            let selected = self.selected.contains(&option);
            cx.set_attr(option, aria::ROLE, "option");
            aria::set_bool(cx, option, aria::SELECTED, selected);
            cx.toggle_attr(option, "selected", selected);
            cx.toggle_attr(option, "focused", self.focused == Some(option));
        }
    }
}

impl Focusable for ListBox {
    fn focused_part(&self, doc: &Document) -> Option<NodeId> {
        self.focused.filter(|&f| doc.is_rendered(f))
    }
}

impl ValueHolder for ListBox {
    type Value = Vec<String>;

    /// Values of the selected options in document order
    fn value(&self) -> Vec<String> {
        self.values.clone()
    }

    fn set_value(&mut self, cx: &mut WidgetCx<'_>, value: Vec<String>) -> bool {
        let doc = cx.doc();
        let mut next: FxHashSet<NodeId> = self
            .parts
            .bind(doc, self.root)
            .all("options")
            .into_iter()
            .filter(|&o| value.contains(&nav::value(doc, o)))
            .collect();
        if !self.config.multiple {
            let first = self
                .parts
                .bind(doc, self.root)
                .all("options")
                .into_iter()
                .find(|o| next.contains(o));
            next.retain(|&o| Some(o) == first);
        }
        if next == self.selected {
            return false;
        }
        self.selected = next;
        self.changed(cx);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WidgetContext;
    use aria_core::Modifiers;
    use aria_dom::el;

    fn listbox(labels: &[&str], config: ListBoxConfig) -> (WidgetContext, crate::WidgetId) {
        let mut cx = WidgetContext::default();
        let body = cx.doc().root();
        let root = cx
            .doc_mut()
            .insert(
                body,
                el(TAG).id("list").children(
                    labels
                        .iter()
                        .map(|l| el(OPTION_TAG).id(&l.to_lowercase()).text(l)),
                ),
            )
            .unwrap();
        let id = cx.mount(root, config).unwrap();
        cx.focus(root);
        (cx, id)
    }

    fn node(cx: &WidgetContext, id: &str) -> NodeId {
        cx.doc().element_by_id(id).unwrap()
    }

    fn list(cx: &WidgetContext, id: crate::WidgetId) -> &ListBox {
        cx.get::<ListBox>(id).unwrap()
    }

    #[test]
    fn test_focus_enters_first_option() {
        let (cx, id) = listbox(&["Red", "Green"], ListBoxConfig::default());
        let red = node(&cx, "red");
        assert_eq!(list(&cx, id).focused_option(), Some(red));
        assert!(!list(&cx, id).is_selected(red));
        let root = node(&cx, "list");
        assert_eq!(cx.doc().attribute(root, "aria-activedescendant"), Some("red"));
        assert_eq!(cx.doc().attribute(root, "role"), Some("listbox"));
        assert_eq!(cx.doc().attribute(root, "aria-multiselectable"), Some("false"));
    }

    #[test]
    fn test_select_first_option_on_focus() {
        let config = ListBoxConfig::default().select_first_option_on_focus(true);
        let (cx, id) = listbox(&["Red", "Green"], config);
        assert!(list(&cx, id).is_selected(node(&cx, "red")));
        assert_eq!(list(&cx, id).value(), vec!["Red".to_string()]);
    }

    #[test]
    fn test_arrows_stop_at_ends_and_follow_focus() {
        let config = ListBoxConfig::default().selection_follows_focus(true);
        let (mut cx, id) = listbox(&["Red", "Green", "Blue"], config);
        cx.press(Key::ArrowDown);
        cx.press(Key::ArrowDown);
        cx.press(Key::ArrowDown);
        let blue = node(&cx, "blue");
        assert_eq!(list(&cx, id).focused_option(), Some(blue));
        assert!(list(&cx, id).is_selected(blue));
        assert_eq!(list(&cx, id).selected_options(cx.doc()), vec![blue]);
        assert_eq!(cx.doc().attribute(blue, "aria-selected"), Some("true"));
        assert_eq!(cx.doc().attribute(node(&cx, "red"), "aria-selected"), Some("false"));
    }

    #[test]
    fn test_ctrl_a_toggles_all() {
        let config = ListBoxConfig::default().multiple(true);
        let (mut cx, id) = listbox(&["Red", "Green", "Blue"], config);
        cx.press_with(Key::Character('a'), Modifiers::CTRL);
        assert_eq!(list(&cx, id).value().len(), 3);
        cx.press_with(Key::Character('a'), Modifiers::CTRL);
        assert!(list(&cx, id).value().is_empty());
    }

    #[test]
    fn test_shift_extends_and_range_select() {
        let config = ListBoxConfig::default().multiple(true);
        let (mut cx, id) = listbox(&["Red", "Green", "Blue", "Cyan"], config);
        cx.press_with(Key::ArrowDown, Modifiers::SHIFT);
        assert_eq!(list(&cx, id).value(), vec!["Green".to_string()]);
        cx.press_with(Key::End, Modifiers::SHIFT);
        assert_eq!(list(&cx, id).value(), vec!["Green", "Blue", "Cyan"]);
        assert_eq!(list(&cx, id).focused_option(), Some(node(&cx, "cyan")));
    }

    #[test]
    fn test_space_and_click_toggle_in_multiple_mode() {
        let config = ListBoxConfig::default().multiple(true);
        let (mut cx, id) = listbox(&["Red", "Green"], config);
        cx.press(Key::Space);
        assert!(list(&cx, id).is_selected(node(&cx, "red")));
        cx.click(node(&cx, "green"));
        assert_eq!(list(&cx, id).focused_option(), Some(node(&cx, "green")));
        assert_eq!(list(&cx, id).value(), vec!["Red", "Green"]);
        cx.click(node(&cx, "red"));
        assert_eq!(list(&cx, id).value(), vec!["Green"]);
    }

    #[test]
    fn test_horizontal_orientation_and_typeahead_wrap() {
        let config = ListBoxConfig::default().orientation(Orientation::Horizontal);
        let (mut cx, id) = listbox(&["Apple", "Banana", "Cherry"], config);
        cx.press(Key::ArrowDown);
        assert_eq!(list(&cx, id).focused_option(), Some(node(&cx, "apple")));
        cx.press(Key::ArrowRight);
        cx.press(Key::ArrowRight);
        assert_eq!(list(&cx, id).focused_option(), Some(node(&cx, "cherry")));
        cx.press(Key::Character('a'));
        assert_eq!(list(&cx, id).focused_option(), Some(node(&cx, "apple")));
    }

    #[test]
    fn test_set_value_and_switch_to_single() {
        let config = ListBoxConfig::default().multiple(true);
        let (mut cx, id) = listbox(&["Red", "Green", "Blue"], config);
        let changed = cx.with::<ListBox, _>(id, |l, wcx| {
            l.set_value(wcx, vec!["Blue".into(), "Red".into()])
        });
        assert_eq!(changed, Some(true));
        assert_eq!(list(&cx, id).value(), vec!["Red", "Blue"]);

        cx.attribute_changed(id, "multiple", None).unwrap();
        assert_eq!(list(&cx, id).value(), vec!["Red"]);
    }

    #[test]
    fn test_removed_option_leaves_selection() {
        let config = ListBoxConfig::default().multiple(true);
        let (mut cx, id) = listbox(&["Red", "Green"], config);
        cx.press_with(Key::Character('a'), Modifiers::CTRL);
        let green = node(&cx, "green");
        cx.remove(green).unwrap();
        assert_eq!(list(&cx, id).value(), vec!["Red"]);
    }
}
