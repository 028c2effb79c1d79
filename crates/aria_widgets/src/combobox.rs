//! Combo Box Widget
//!
//! A collapsible list of options opened by a button, an editable input, or
//! both. Options are focused with the arrow keys, Home/End and typeahead and
//! activated with Enter (or Space without an input). With an input present,
//! option focus is virtual (`aria-activedescendant`) and arrow navigation
//! wraps; button-only combo boxes stop at the ends like a native select.
//!
//! ```text
//! <ui-combobox>
//!   <ui-combobox-button/> and/or <ui-combobox-input/>
//!   <ui-combobox-list>
//!     <ui-combobox-option value="cat">Cat</ui-combobox-option>
//!   </ui-combobox-list>
//! </ui-combobox>
//! ```

use std::time::Duration;

use aria_core::{
    event_types, prefix_match, Event, EventId, Key, StateMachine, Typeahead,
    DEFAULT_COLLAPSE_DEBOUNCE, DEFAULT_TYPEAHEAD_DEBOUNCE,
};
use aria_dom::{Document, NodeId, PartQuery, Parts};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::aria;
use crate::config::{
    duration_ms, parse_duration, parse_enum, parse_flag, Autocomplete, ScrollOptions,
};
use crate::context::{Timer, WidgetCx};
use crate::error::Result;
use crate::floating::{Middleware, Placement, PositionOptions};
use crate::nav;
use crate::notification::NotificationKind;
use crate::widget::{Controller, Expandable, FloatingPositioned, Focusable, ValueHolder};

pub const TAG: &str = "ui-combobox";
pub const BUTTON_TAG: &str = "ui-combobox-button";
pub const INPUT_TAG: &str = "ui-combobox-input";
pub const LIST_TAG: &str = "ui-combobox-list";
pub const OPTION_TAG: &str = "ui-combobox-option";

/// Combo box FSM states
pub mod states {
    pub const COLLAPSED: u32 = 0;
    pub const EXPANDED: u32 = 1;
}

const EXPAND: EventId = event_types::USER + 1;
const COLLAPSE: EventId = event_types::USER + 2;

const OBSERVED: &[&str] = &[
    "autocomplete",
    "multiple",
    "disabled",
    "readonly",
    "collapse-debounce-time",
    "typeahead-debounce-time",
];

/// Combo box configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboBoxConfig {
    pub autocomplete: Autocomplete,
    pub multiple: bool,
    pub disabled: bool,
    pub readonly: bool,
    /// Delay before a focus loss collapses the list
    #[serde(with = "duration_ms")]
    pub collapse_debounce: Duration,
    #[serde(with = "duration_ms")]
    pub typeahead_debounce: Duration,
    /// Forwarded with scroll-into-view requests
    pub scroll: ScrollOptions,
    pub placement: Placement,
}

impl Default for ComboBoxConfig {
    fn default() -> Self {
        Self {
            autocomplete: Autocomplete::None,
            multiple: false,
            disabled: false,
            readonly: false,
            collapse_debounce: DEFAULT_COLLAPSE_DEBOUNCE,
            typeahead_debounce: DEFAULT_TYPEAHEAD_DEBOUNCE,
            scroll: ScrollOptions::default(),
            placement: Placement::BottomStart,
        }
    }
}

impl ComboBoxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn autocomplete(mut self, autocomplete: Autocomplete) -> Self {
        self.autocomplete = autocomplete;
        self
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn collapse_debounce(mut self, delay: Duration) -> Self {
        self.collapse_debounce = delay;
        self
    }

    pub fn typeahead_debounce(mut self, delay: Duration) -> Self {
        self.typeahead_debounce = delay;
        self
    }

    pub fn scroll(mut self, scroll: ScrollOptions) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub(crate) fn apply_attribute(&mut self, name: &str, value: Option<&str>) -> Result<bool> {
        match name {
            "autocomplete" => {
                self.autocomplete = value
                    .map(|v| parse_enum(name, v))
                    .transpose()?
                    .unwrap_or_default();
            }
            "multiple" => self.multiple = parse_flag(value),
            "disabled" => self.disabled = parse_flag(value),
            "readonly" => self.readonly = parse_flag(value),
            "collapse-debounce-time" => {
                self.collapse_debounce = value
                    .map(|v| parse_duration(name, v))
                    .transpose()?
                    .unwrap_or(DEFAULT_COLLAPSE_DEBOUNCE);
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
}

/// Selected value(s) of a combo box
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComboBoxValue {
    Single(Option<String>),
    Multiple(Vec<String>),
}

/// Structural parts resolved against the live document
struct Layout {
    button: Option<NodeId>,
    input: Option<NodeId>,
    list: Option<NodeId>,
    /// Options not filtered out
    options: Vec<NodeId>,
}

pub struct ComboBox {
    root: NodeId,
    config: ComboBoxConfig,
    parts: Parts,
    fsm: StateMachine,
    focused: Option<NodeId>,
    value: Vec<String>,
    typeahead: Typeahead,
    /// Text typed into the input, without inline completion
    typed: String,
    /// Options hidden by input filtering
    filtered: FxHashSet<NodeId>,
}

impl ComboBox {
    pub fn new(root: NodeId, config: ComboBoxConfig) -> Result<Self> {
        let parts = Parts::new()
            .declare("button", PartQuery::one(BUTTON_TAG)?)
            .declare("input", PartQuery::one(&format!("{INPUT_TAG}, input"))?)
            .declare("list", PartQuery::one(LIST_TAG)?)
            .declare("options", PartQuery::all(OPTION_TAG)?);
        let fsm = StateMachine::builder(states::COLLAPSED)
            .on(states::COLLAPSED, EXPAND, states::EXPANDED)
            .on(states::EXPANDED, COLLAPSE, states::COLLAPSED)
            .build();
        Ok(Self {
            root,
            typeahead: Typeahead::new(config.typeahead_debounce),
            config,
            parts,
            fsm,
            focused: None,
            value: Vec::new(),
            typed: String::new(),
            filtered: FxHashSet::default(),
        })
    }

    pub fn config(&self) -> &ComboBoxConfig {
        &self.config
    }

    pub fn state(&self) -> u32 {
        self.fsm.current_state()
    }

    pub fn focused_option(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn is_selected(&self, doc: &Document, option: NodeId) -> bool {
        self.value.contains(&nav::value(doc, option))
    }

    fn layout(&self, doc: &Document) -> Layout {
        let bound = self.parts.bind(doc, self.root);
        Layout {
            button: bound.one("button"),
            input: bound.one("input"),
            list: bound.one("list"),
            options: bound
                .all("options")
                .into_iter()
                .filter(|&o| !doc.has_attribute(o, "hidden"))
                .collect(),
        }
    }

    /// The element focus returns to after activation
    fn trigger(&self, layout: &Layout) -> NodeId {
        layout.button.or(layout.input).unwrap_or(self.root)
    }

    fn selected_option(&self, doc: &Document, layout: &Layout) -> Option<NodeId> {
        layout
            .options
            .iter()
            .copied()
            .find(|&o| self.is_selected(doc, o))
    }

    fn interactive(&self, action: &str) -> bool {
        if self.config.disabled || self.config.readonly {
            tracing::warn!(
                root = ?self.root,
                action,
                disabled = self.config.disabled,
                readonly = self.config.readonly,
                "ignoring interaction with inactive combo box"
            );
            return false;
        }
        true
    }

    fn open(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        if !self.fsm.send(EXPAND) {
            return false;
        }
        tracing::debug!(root = ?self.root, "combo box expanded");
        cx.notify(NotificationKind::Expanded);
        if let Some(list) = self.layout(cx.doc()).list {
            let options = PositionOptions::new(self.config.placement)
                .with(Middleware::Offset(4.0))
                .with(Middleware::Flip)
                .with(Middleware::Shift { padding: 8.0 });
            cx.attach_floating(self.root, list, options);
        }
        true
    }

    fn close(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        if !self.fsm.send(COLLAPSE) {
            return false;
        }
        tracing::debug!(root = ?self.root, "combo box collapsed");
        self.focused = None;
        if let Some(list) = self.layout(cx.doc()).list {
            cx.detach_floating(list);
        }
        cx.notify(NotificationKind::Collapsed);
        true
    }

    fn focus_option(&mut self, cx: &mut WidgetCx<'_>, layout: &Layout, option: NodeId, scroll: bool) {
        self.focused = Some(option);
        if layout.input.is_none() {
            cx.focus(option);
        }
        if scroll {
            cx.notify_part(
                option,
                NotificationKind::ScrollIntoView {
                    container: layout.list,
                    target: option,
                    options: self.config.scroll,
                },
            );
        }
    }

    fn select(&mut self, cx: &mut WidgetCx<'_>, option: NodeId) {
        let value = nav::value(cx.doc(), option);
        let changed = if self.config.multiple {
            if self.value.contains(&value) {
                false
            } else {
                self.value.push(value);
                true
            }
        } else if self.value.len() == 1 && self.value[0] == value {
            false
        } else {
            self.value = vec![value];
            true
        };
        if changed {
            cx.notify(NotificationKind::Changed);
        }
    }

    /// Select `option`, collapse and return focus to the trigger
    fn activate(&mut self, cx: &mut WidgetCx<'_>, option: NodeId) {
        self.select(cx, option);
        self.clear_filter(cx);
        let layout = self.layout(cx.doc());
        if let Some(input) = layout.input {
            let text = if self.config.multiple {
                String::new()
            } else {
                nav::label(cx.doc(), option)
            };
            self.typed = text.clone();
            cx.set_attr(input, "value", text);
        }
        self.close(cx);
        let trigger = self.trigger(&layout);
        cx.focus(trigger);
    }

    /// Unselect and blur the option(s) carrying `value`. Returns false if
    /// the value was not selected.
    pub fn remove_option(&mut self, cx: &mut WidgetCx<'_>, value: &str) -> bool {
        let Some(index) = self.value.iter().position(|v| v == value) else {
            tracing::trace!(value, "remove_option: value not selected");
            return false;
        };
        self.value.remove(index);
        if self
            .focused
            .is_some_and(|f| nav::value(cx.doc(), f) == value)
        {
            self.focused = None;
        }
        cx.notify(NotificationKind::Changed);
        true
    }

    fn clear_filter(&mut self, cx: &mut WidgetCx<'_>) {
        for option in std::mem::take(&mut self.filtered) {
            cx.toggle_attr(option, "hidden", false);
        }
    }

    /// Show the selected option's label in the input
    fn restore_input(&mut self, cx: &mut WidgetCx<'_>) {
        let layout = self.layout(cx.doc());
        let Some(input) = layout.input else {
            return;
        };
        let text = if self.config.multiple {
            String::new()
        } else {
            self.selected_option(cx.doc(), &layout)
                .map(|o| nav::label(cx.doc(), o))
                .unwrap_or_default()
        };
        self.typed = text.clone();
        cx.set_attr(input, "value", text);
    }

    // =========================================================================
    // Event handlers
    // =========================================================================

    fn handle_key(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event) {
        let Some(key) = event.key().cloned() else {
            return;
        };
        let layout = self.layout(cx.doc());
        let expanded = self.is_expanded();
        let editable = layout.input.is_some();

        match key.key {
            Key::ArrowDown | Key::ArrowUp => {
                let down = key.key == Key::ArrowDown;
                if !self.interactive("navigate") {
                    return;
                }
                event.prevent_default();
                let target = if expanded {
                    let current = nav::position_of(&layout.options, self.focused);
                    let next = if down {
                        nav::next_index(layout.options.len(), current, editable)
                    } else {
                        nav::prev_index(layout.options.len(), current, editable)
                    };
                    next.map(|i| layout.options[i])
                } else {
                    self.open(cx);
                    self.selected_option(cx.doc(), &layout).or_else(|| {
                        if down {
                            layout.options.first().copied()
                        } else {
                            layout.options.last().copied()
                        }
                    })
                };
                if let Some(option) = target {
                    self.focus_option(cx, &layout, option, true);
                }
            }
            Key::Home | Key::End => {
                if !self.interactive("navigate") {
                    return;
                }
                event.prevent_default();
                self.open(cx);
                let target = if key.key == Key::Home {
                    layout.options.first()
                } else {
                    layout.options.last()
                };
                if let Some(&option) = target {
                    self.focus_option(cx, &layout, option, true);
                }
            }
            Key::Space if editable => {}
            Key::Enter | Key::Space => {
                if !self.interactive("activate") {
                    return;
                }
                event.prevent_default();
                if !expanded {
                    self.open(cx);
                    if let Some(option) = self.selected_option(cx.doc(), &layout) {
                        self.focus_option(cx, &layout, option, true);
                    }
                } else if let Some(option) = self.focused {
                    self.activate(cx, option);
                } else {
                    self.close(cx);
                }
            }
            Key::Escape => {
                if expanded {
                    event.prevent_default();
                    let had_option_focus = self
                        .focused
                        .is_some_and(|f| cx.active_element() == Some(f));
                    self.close(cx);
                    self.clear_filter(cx);
                    self.restore_input(cx);
                    if had_option_focus {
                        let trigger = self.trigger(&layout);
                        cx.focus(trigger);
                    }
                } else if let Some(input) = layout.input {
                    if self.config.autocomplete != Autocomplete::None && self.interactive("clear") {
                        event.prevent_default();
                        self.typed.clear();
                        cx.set_attr(input, "value", "");
                        self.clear_filter(cx);
                        cx.notify(NotificationKind::InputCleared);
                    }
                }
            }
            Key::Character(_) if !editable && !key.modifiers.has_shortcut_modifier() => {
                if !self.interactive("typeahead") {
                    return;
                }
                self.open(cx);
                let now = cx.now();
                let current = self.focused.or_else(|| self.selected_option(cx.doc(), &layout));
                let hit = nav::typeahead(
                    &mut self.typeahead,
                    &key,
                    now,
                    cx.doc(),
                    &layout.options,
                    current,
                );
                if let Some(option) = hit {
                    self.focus_option(cx, &layout, option, true);
                }
            }
            _ => {}
        }
    }

    fn handle_input(&mut self, cx: &mut WidgetCx<'_>, value: &str) {
        let Some(input) = self.layout(cx.doc()).input else {
            return;
        };
        if !self.interactive("input") {
            return;
        }
        let grew = value.chars().count() > self.typed.chars().count();
        self.typed = value.to_string();
        let autocomplete = self.config.autocomplete;

        if value.is_empty() {
            self.clear_filter(cx);
            self.focused = None;
            return;
        }

        if autocomplete.filters() {
            let options = self.parts.bind(cx.doc(), self.root).all("options");
            for option in options {
                let matches = prefix_match(&nav::label(cx.doc(), option), value);
                if !matches && !cx.doc().has_attribute(option, "hidden") {
                    self.filtered.insert(option);
                    cx.toggle_attr(option, "hidden", true);
                } else if matches && self.filtered.remove(&option) {
                    cx.toggle_attr(option, "hidden", false);
                }
            }
            self.open(cx);
        }

        let layout = self.layout(cx.doc());
        if self.focused.is_some_and(|f| !layout.options.contains(&f)) {
            self.focused = None;
        }

        if autocomplete.completes_inline() && grew {
            let first = layout
                .options
                .iter()
                .copied()
                .find(|&o| prefix_match(&nav::label(cx.doc(), o), value));
            if let Some(option) = first {
                self.open(cx);
                self.focus_option(cx, &layout, option, true);
                let completion = nav::label(cx.doc(), option);
                cx.set_attr(input, "value", completion.clone());
                cx.notify(NotificationKind::InlineCompletion {
                    input,
                    typed: value.chars().count(),
                    completion,
                });
            }
        }
    }

    fn handle_click(&mut self, cx: &mut WidgetCx<'_>, target: NodeId) {
        let doc = cx.doc();
        let layout = self.layout(doc);
        if let Some(option) = nav::part_containing(doc, &layout.options, target) {
            if self.interactive("activate") {
                self.activate(cx, option);
            }
            return;
        }
        let on_trigger = [layout.button, layout.input]
            .into_iter()
            .flatten()
            .any(|t| doc.composed_contains(t, target));
        if on_trigger && self.interactive("toggle") {
            if self.is_expanded() {
                self.close(cx);
            } else {
                self.open(cx);
                if let Some(option) = self.selected_option(cx.doc(), &layout) {
                    self.focus_option(cx, &layout, option, true);
                }
            }
        }
    }
}

impl Controller for ComboBox {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self) -> &'static str {
        "combobox"
    }

    fn observed_attributes(&self) -> &'static [&'static str] {
        OBSERVED
    }

    fn unmount(&mut self, cx: &mut WidgetCx<'_>) {
        self.clear_filter(cx);
    }

    fn handle_event(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event) {
        let target = NodeId::from_raw(event.target);
        match event.event_type {
            event_types::KEY_DOWN => self.handle_key(cx, event),
            event_types::INPUT => {
                if let Some(value) = event.input_value().map(str::to_string) {
                    self.handle_input(cx, &value);
                }
            }
            event_types::CLICK => self.handle_click(cx, target),
            event_types::POINTER_ENTER => {
                let layout = self.layout(cx.doc());
                if let Some(option) = nav::part_containing(cx.doc(), &layout.options, target) {
                    if self.is_expanded() && !self.config.disabled {
                        self.focus_option(cx, &layout, option, false);
                    }
                }
            }
            event_types::FOCUS_OUT => {
                cx.schedule(Timer::FocusLoss, self.config.collapse_debounce);
            }
            _ => {}
        }
    }

    fn handle_outside(&mut self, cx: &mut WidgetCx<'_>, event: &Event) {
        if event.event_type == event_types::POINTER_DOWN && self.is_expanded() {
            self.close(cx);
        }
    }

    fn on_timer(&mut self, cx: &mut WidgetCx<'_>, timer: Timer) {
        if timer == Timer::FocusLoss && !cx.is_focus_within(self.root) {
            if self.close(cx) {
                self.clear_filter(cx);
            }
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
        if self.config.disabled && self.close(cx) {
            self.clear_filter(cx);
        }
        if !self.config.multiple && self.value.len() > 1 {
            self.value.truncate(1);
            cx.notify(NotificationKind::Changed);
        }
        Ok(())
    }

    fn sync(&mut self, cx: &mut WidgetCx<'_>) {
        let layout = self.layout(cx.doc());
        if self.focused.is_some_and(|f| !layout.options.contains(&f)) {
            self.focused = None;
        }
        let root = self.root;

        aria::set_bool(cx, root, aria::DISABLED, self.config.disabled);
        aria::set_bool(cx, root, aria::READONLY, self.config.readonly);
        cx.toggle_attr(root, "expanded", self.is_expanded());
        match (self.config.multiple, self.value.first()) {
            (false, Some(value)) => cx.set_attr(root, "value", value.clone()),
            (false, None) => cx.remove_attr(root, "value"),
            (true, _) => cx.set_attr(root, "value", self.value.join(",")),
        }

        let list_id = layout.list.map(|list| cx.ensure_id(list, "combobox-list"));
        for trigger in [layout.button, layout.input].into_iter().flatten() {
            aria::set_bool(cx, trigger, aria::EXPANDED, self.is_expanded());
            aria::set_optional(cx, trigger, aria::CONTROLS, list_id.as_deref());
            cx.set_attr(trigger, aria::HASPOPUP, "listbox");
        }
        if let Some(input) = layout.input {
            cx.set_attr(input, aria::ROLE, "combobox");
            cx.set_attr(input, "aria-autocomplete", self.config.autocomplete.as_str());
            let active = self.focused.map(|f| cx.ensure_id(f, "combobox-option"));
            aria::set_optional(cx, input, aria::ACTIVE_DESCENDANT, active.as_deref());
        }
        if let Some(list) = layout.list {
            cx.set_attr(list, aria::ROLE, "listbox");
            aria::set_bool(cx, list, "aria-multiselectable", self.config.multiple);
        }

        let all = self.parts.bind(cx.doc(), root).all("options");
        for option in all {
            let selected = self.is_selected(cx.doc(), option);
            cx.set_attr(option, aria::ROLE, "option");
            aria::set_true_or_remove(cx, option, aria::SELECTED, selected);
            cx.toggle_attr(option, "focused", self.focused == Some(option));
            if layout.input.is_none() {
                cx.set_attr(option, aria::TABINDEX, "-1");
            }
        }
    }
}

impl Focusable for ComboBox {
    fn focused_part(&self, doc: &Document) -> Option<NodeId> {
        self.focused
            .filter(|&f| doc.is_connected(f) && !doc.has_attribute(f, "hidden"))
    }
}

impl Expandable for ComboBox {
    fn is_expanded(&self) -> bool {
        self.fsm.current_state() == states::EXPANDED
    }

    fn expand(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        self.interactive("expand") && self.open(cx)
    }

    fn collapse(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        self.close(cx)
    }
}

impl ValueHolder for ComboBox {
    type Value = ComboBoxValue;

    fn value(&self) -> ComboBoxValue {
        if self.config.multiple {
            ComboBoxValue::Multiple(self.value.clone())
        } else {
            ComboBoxValue::Single(self.value.first().cloned())
        }
    }

    fn set_value(&mut self, cx: &mut WidgetCx<'_>, value: ComboBoxValue) -> bool {
        let mut next = match value {
            ComboBoxValue::Single(value) => value.into_iter().collect(),
            ComboBoxValue::Multiple(values) => values,
        };
        if !self.config.multiple {
            next.truncate(1);
        }
        next.dedup();
        if next == self.value {
            return false;
        }
        self.value = next;
        if !self.is_expanded() {
            self.restore_input(cx);
        }
        cx.notify(NotificationKind::Changed);
        true
    }
}

impl FloatingPositioned for ComboBox {
    fn floating_pairs(&self, doc: &Document) -> Vec<(NodeId, NodeId)> {
        if !self.is_expanded() {
            return Vec::new();
        }
        self.parts
            .bind(doc, self.root)
            .one("list")
            .map(|list| vec![(self.root, list)])
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WidgetContext;
    use aria_core::Modifiers;
    use aria_dom::el;

    fn options(labels: &[&str]) -> Vec<aria_dom::ElementBuilder> {
        labels
            .iter()
            .map(|l| el(OPTION_TAG).attr("value", &l.to_lowercase()).text(l))
            .collect()
    }

    fn button_combo(labels: &[&str]) -> (WidgetContext, crate::WidgetId, NodeId) {
        let mut cx = WidgetContext::default();
        let body = cx.doc().root();
        let root = cx
            .doc_mut()
            .insert(
                body,
                el(TAG).children([
                    el(BUTTON_TAG).id("trigger").attr("tabindex", "0"),
                    el(LIST_TAG).children(options(labels)),
                ]),
            )
            .unwrap();
        let id = cx.mount(root, ComboBoxConfig::default()).unwrap();
        let trigger = cx.doc().element_by_id("trigger").unwrap();
        cx.focus(trigger);
        (cx, id, root)
    }

    fn input_combo(labels: &[&str], autocomplete: Autocomplete) -> (WidgetContext, crate::WidgetId, NodeId) {
        let mut cx = WidgetContext::default();
        let body = cx.doc().root();
        let root = cx
            .doc_mut()
            .insert(
                body,
                el(TAG).children([
                    el("input").id("field"),
                    el(LIST_TAG).children(options(labels)),
                ]),
            )
            .unwrap();
        let id = cx
            .mount(root, ComboBoxConfig::new().autocomplete(autocomplete))
            .unwrap();
        let input = cx.doc().element_by_id("field").unwrap();
        cx.focus(input);
        (cx, id, input)
    }

    fn option(cx: &WidgetContext, value: &str) -> NodeId {
        cx.doc()
            .query_selector(cx.doc().root(), &format!("[value={value}]"))
            .unwrap()
            .unwrap()
    }

    fn combo(cx: &WidgetContext, id: crate::WidgetId) -> &ComboBox {
        cx.get::<ComboBox>(id).unwrap()
    }

    #[test]
    fn test_button_arrows_stop_at_ends() {
        let (mut cx, id, _) = button_combo(&["Cat", "Dog"]);
        cx.press(Key::ArrowDown);
        assert_eq!(combo(&cx, id).focused_option(), Some(option(&cx, "cat")));
        cx.press(Key::ArrowDown);
        cx.press(Key::ArrowDown);
        assert_eq!(combo(&cx, id).focused_option(), Some(option(&cx, "dog")));
        assert_eq!(cx.doc().active_element(), Some(option(&cx, "dog")));
        cx.press(Key::Home);
        assert_eq!(combo(&cx, id).focused_option(), Some(option(&cx, "cat")));
        cx.press(Key::ArrowUp);
        assert_eq!(combo(&cx, id).focused_option(), Some(option(&cx, "cat")));
    }

    #[test]
    fn test_input_arrows_wrap_with_virtual_focus() {
        let (mut cx, id, input) = input_combo(&["Cat", "Dog"], Autocomplete::None);
        cx.press(Key::ArrowUp);
        let dog = option(&cx, "dog");
        assert_eq!(combo(&cx, id).focused_option(), Some(dog));
        assert_eq!(cx.doc().active_element(), Some(input));
        let dog_id = cx.doc().id(dog).unwrap().to_string();
        assert_eq!(cx.doc().attribute(input, "aria-activedescendant"), Some(dog_id.as_str()));

        cx.press(Key::ArrowDown);
        assert_eq!(combo(&cx, id).focused_option(), Some(option(&cx, "cat")));
    }

    #[test]
    fn test_escape_restores_label_and_clears() {
        let (mut cx, id, input) = input_combo(&["Cat", "Dog"], Autocomplete::List);
        cx.press(Key::ArrowDown);
        cx.press(Key::ArrowDown);
        cx.press(Key::Enter);
        assert_eq!(cx.doc().attribute(input, "value"), Some("Dog"));
        assert!(!combo(&cx, id).is_expanded());

        cx.input(input, "Ca");
        assert!(combo(&cx, id).is_expanded());
        assert!(cx.doc().has_attribute(option(&cx, "dog"), "hidden"));
        cx.press(Key::Escape);
        assert!(!combo(&cx, id).is_expanded());
        assert_eq!(cx.doc().attribute(input, "value"), Some("Dog"));
        assert!(!cx.doc().has_attribute(option(&cx, "dog"), "hidden"));

        cx.take_notifications();
        cx.press(Key::Escape);
        assert_eq!(cx.doc().attribute(input, "value"), Some(""));
        assert!(cx
            .take_notifications()
            .iter()
            .any(|n| n.kind == NotificationKind::InputCleared));
    }

    #[test]
    fn test_inline_completion() {
        let (mut cx, id, input) = input_combo(&["Cat", "Cow", "Dog"], Autocomplete::Both);
        cx.take_notifications();
        cx.input(input, "c");
        assert_eq!(combo(&cx, id).focused_option(), Some(option(&cx, "cat")));
        assert_eq!(cx.doc().attribute(input, "value"), Some("Cat"));
        let completion = cx
            .take_notifications()
            .into_iter()
            .find_map(|n| match n.kind {
                NotificationKind::InlineCompletion { typed, completion, .. } => Some((typed, completion)),
                _ => None,
            });
        assert_eq!(completion, Some((1, "Cat".to_string())));

        // Deleting text does not complete again
        cx.input(input, "");
        cx.take_notifications();
        assert!(combo(&cx, id).focused_option().is_none());
    }

    #[test]
    fn test_multiple_selection_and_remove() {
        let mut cx = WidgetContext::default();
        let body = cx.doc().root();
        let root = cx
            .doc_mut()
            .insert(
                body,
                el(TAG).children([el(BUTTON_TAG), el(LIST_TAG).children(options(&["A", "B"]))]),
            )
            .unwrap();
        let id = cx.mount(root, ComboBoxConfig::new().multiple(true)).unwrap();
        let a = option(&cx, "a");
        let b = option(&cx, "b");
        cx.with::<ComboBox, _>(id, |c, wcx| c.expand(wcx));
        cx.click(a);
        cx.with::<ComboBox, _>(id, |c, wcx| c.expand(wcx));
        cx.click(b);
        cx.with::<ComboBox, _>(id, |c, wcx| c.expand(wcx));
        cx.click(a);
        assert_eq!(
            combo(&cx, id).value(),
            ComboBoxValue::Multiple(vec!["a".into(), "b".into()])
        );
        assert_eq!(cx.doc().attribute(b, "aria-selected"), Some("true"));

        assert!(cx.with::<ComboBox, _>(id, |c, wcx| c.remove_option(wcx, "b")).unwrap());
        assert!(!cx.with::<ComboBox, _>(id, |c, wcx| c.remove_option(wcx, "b")).unwrap());
        assert_eq!(cx.doc().attribute(b, "aria-selected"), None);
        let list = cx.doc().query_selector(root, LIST_TAG).unwrap().unwrap();
        assert_eq!(cx.doc().attribute(list, "aria-multiselectable"), Some("true"));
    }

    #[test]
    fn test_typeahead_without_input() {
        let (mut cx, id, _) = button_combo(&["Cat", "Dog", "Cow"]);
        cx.press(Key::Character('d'));
        assert!(combo(&cx, id).is_expanded());
        assert_eq!(combo(&cx, id).focused_option(), Some(option(&cx, "dog")));
        cx.press(Key::Character('c'));
        // "dc" matches nothing; focus stays
        assert_eq!(combo(&cx, id).focused_option(), Some(option(&cx, "dog")));
        cx.advance(1_000);
        cx.press(Key::Character('c'));
        assert_eq!(combo(&cx, id).focused_option(), Some(option(&cx, "cow")));
        // Shortcuts never feed typeahead
        cx.press_with(Key::Character('c'), Modifiers::CTRL);
        assert_eq!(combo(&cx, id).focused_option(), Some(option(&cx, "cow")));
    }

    #[test]
    fn test_disabled_ignores_input() {
        let (mut cx, id, root) = button_combo(&["Cat"]);
        cx.with::<ComboBox, _>(id, |c, wcx| c.attribute_changed(wcx, "disabled", Some("")))
            .unwrap()
            .unwrap();
        cx.press(Key::ArrowDown);
        assert!(!combo(&cx, id).is_expanded());
        assert_eq!(cx.doc().attribute(root, "aria-disabled"), Some("true"));
    }

    #[test]
    fn test_focus_loss_collapses_after_delay() {
        let (mut cx, id, _) = button_combo(&["Cat", "Dog"]);
        let body = cx.doc().root();
        let elsewhere = cx.doc_mut().insert(body, el("button")).unwrap();
        cx.press(Key::ArrowDown);
        cx.focus(elsewhere);
        assert!(combo(&cx, id).is_expanded());
        cx.advance(199);
        assert!(combo(&cx, id).is_expanded());
        cx.advance(200);
        assert!(!combo(&cx, id).is_expanded());
        assert!(combo(&cx, id).focused_option().is_none());
    }
}
