//! Menu and Menu Bar Widgets
//!
//! A menu is a tree of items, each optionally owning one submenu. A menu
//! button opens the root submenu (its items start at depth 1); a menu bar
//! lays its top items out horizontally at depth 0.
//!
//! Expansion is transitive: opening a submenu opens every ancestor submenu
//! and the menu itself, and closing a submenu closes everything nested in
//! it. Exactly one item is tab-reachable at a time (roving tabindex).
//!
//! ```text
//! <ui-menu>                         <ui-menubar>
//!   <ui-menu-button/>                 <ui-menu-item>File
//!   <ui-submenu>                        <ui-submenu>
//!     <ui-menu-item>Open</...>            <ui-menu-item>New</...>
//!     <ui-menu-item>Recent              </ui-submenu>
//!       <ui-submenu>...</ui-submenu>    </ui-menu-item>
//!     </ui-menu-item>                 </ui-menubar>
//!   </ui-submenu>
//! </ui-menu>
//! ```

mod tree;

pub use tree::{MenuNodeKind, MenuTree};

use std::time::Duration;

use aria_core::{
    event_types, prefix_match, Event, EventId, Key, KeyEvent, StateMachine, Typeahead,
    DEFAULT_COLLAPSE_DEBOUNCE, DEFAULT_TYPEAHEAD_DEBOUNCE,
};
use aria_dom::{Document, NodeId, PartQuery, Parts};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::aria;
use crate::config::{duration_ms, parse_duration, parse_flag};
use crate::context::{Timer, WidgetCx};
use crate::error::Result;
use crate::floating::{Middleware, Placement, PositionOptions};
use crate::nav;
use crate::notification::NotificationKind;
use crate::widget::{Controller, Expandable, FloatingPositioned, Focusable};

pub const TAG: &str = "ui-menu";
pub const MENUBAR_TAG: &str = "ui-menubar";
pub const BUTTON_TAG: &str = "ui-menu-button";
pub const ITEM_TAG: &str = "ui-menu-item";
pub const SUBMENU_TAG: &str = "ui-submenu";

/// Menu FSM states
pub mod states {
    pub const COLLAPSED: u32 = 0;
    pub const EXPANDED: u32 = 1;
}

const EXPAND: EventId = event_types::USER + 1;
const COLLAPSE: EventId = event_types::USER + 2;

const OBSERVED: &[&str] = &[
    "expand-on-enter",
    "collapse-debounce-time",
    "typeahead-debounce-time",
];

/// Menu configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Lay the top items out horizontally without a button
    pub menubar: bool,
    /// Open an item's submenu on pointer enter even while the menu is closed
    pub expand_on_enter: bool,
    /// Delay for pointer-leave and focus-loss collapse
    #[serde(with = "duration_ms")]
    pub collapse_debounce: Duration,
    #[serde(with = "duration_ms")]
    pub typeahead_debounce: Duration,
    /// Placement of first-level submenus
    pub placement: Placement,
    /// Placement of nested submenus
    pub submenu_placement: Placement,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            menubar: false,
            expand_on_enter: false,
            collapse_debounce: DEFAULT_COLLAPSE_DEBOUNCE,
            typeahead_debounce: DEFAULT_TYPEAHEAD_DEBOUNCE,
            placement: Placement::BottomStart,
            submenu_placement: Placement::RightStart,
        }
    }
}

impl MenuConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn menubar(mut self, menubar: bool) -> Self {
        self.menubar = menubar;
        self
    }

    pub fn expand_on_enter(mut self, expand: bool) -> Self {
        self.expand_on_enter = expand;
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

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn submenu_placement(mut self, placement: Placement) -> Self {
        self.submenu_placement = placement;
        self
    }

    pub(crate) fn apply_attribute(&mut self, name: &str, value: Option<&str>) -> Result<bool> {
        match name {
            "expand-on-enter" => self.expand_on_enter = parse_flag(value),
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

pub struct Menu {
    root: NodeId,
    config: MenuConfig,
    parts: Parts,
    tree: MenuTree,
    fsm: StateMachine,
    expanded: FxHashSet<NodeId>,
    focused: Option<NodeId>,
    typeahead: Typeahead,
}

impl Menu {
    pub fn new(root: NodeId, config: MenuConfig) -> Result<Self> {
        let parts = Parts::new().declare("button", PartQuery::one(BUTTON_TAG)?);
        let fsm = StateMachine::builder(states::COLLAPSED)
            .on(states::COLLAPSED, EXPAND, states::EXPANDED)
            .on(states::EXPANDED, COLLAPSE, states::COLLAPSED)
            .build();
        Ok(Self {
            root,
            typeahead: Typeahead::new(config.typeahead_debounce),
            config,
            parts,
            tree: MenuTree::default(),
            fsm,
            expanded: FxHashSet::default(),
            focused: None,
        })
    }

    pub fn config(&self) -> &MenuConfig {
        &self.config
    }

    pub fn tree(&self) -> &MenuTree {
        &self.tree
    }

    pub fn focused_item(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn is_submenu_expanded(&self, submenu: NodeId) -> bool {
        self.expanded.contains(&submenu)
    }

    /// Expanded submenus in tree order
    pub fn expanded_submenus(&self) -> Vec<NodeId> {
        self.tree
            .submenus()
            .filter(|s| self.expanded.contains(s))
            .collect()
    }

    /// Open `submenu` together with its ancestors
    pub fn open_submenu(&mut self, cx: &mut WidgetCx<'_>, submenu: NodeId) {
        self.refresh(cx.doc());
        self.expand_chain(cx, submenu);
        self.update_root(cx);
    }

    /// Close `submenu` together with its descendants
    pub fn close_submenu(&mut self, cx: &mut WidgetCx<'_>, submenu: NodeId) {
        self.refresh(cx.doc());
        self.close_tree(cx, submenu);
        self.update_root(cx);
    }

    fn refresh(&mut self, doc: &Document) {
        if self.tree.is_current(doc) {
            return;
        }
        self.tree = MenuTree::build(doc, self.root);
        let tree = &self.tree;
        self.expanded.retain(|&s| tree.is_submenu(s));
        if self.focused.is_some_and(|f| !tree.is_item(f)) {
            self.focused = None;
        }
    }

    fn button(&self, doc: &Document) -> Option<NodeId> {
        self.parts.bind(doc, self.root).one("button")
    }

    fn is_horizontal(&self, level: Option<NodeId>) -> bool {
        self.config.menubar && level.is_none()
    }

    /// Item below the shallow level
    fn is_nested(&self, item: NodeId) -> bool {
        self.tree.level_of(item) != self.tree.shallow_level()
    }

    fn siblings(&self, doc: &Document, level: Option<NodeId>) -> Vec<NodeId> {
        self.tree
            .items_in(level)
            .into_iter()
            .filter(|&i| !doc.has_attribute(i, "hidden"))
            .collect()
    }

    fn children_of(&self, doc: &Document, submenu: NodeId) -> Vec<NodeId> {
        self.siblings(doc, Some(submenu))
    }

    /// Derive the menu state from the set of expanded submenus
    fn update_root(&mut self, cx: &mut WidgetCx<'_>) {
        let open = !self.expanded.is_empty();
        let event = if open { EXPAND } else { COLLAPSE };
        if self.fsm.send(event) {
            tracing::debug!(root = ?self.root, open, "menu state changed");
            cx.notify(if open {
                NotificationKind::Expanded
            } else {
                NotificationKind::Collapsed
            });
        }
    }

    fn anchor(&self, doc: &Document, submenu: NodeId) -> (NodeId, Placement) {
        match self.tree.owner_of(submenu) {
            Some(owner) if self.is_horizontal(self.tree.level_of(owner)) => {
                (owner, self.config.placement)
            }
            Some(owner) => (owner, self.config.submenu_placement),
            None => (self.button(doc).unwrap_or(self.root), self.config.placement),
        }
    }

    fn expand_chain(&mut self, cx: &mut WidgetCx<'_>, submenu: NodeId) {
        if !self.tree.is_submenu(submenu) {
            tracing::warn!(?submenu, "open_submenu: not a submenu of this menu");
            return;
        }
        let chain: Vec<NodeId> = std::iter::once(submenu)
            .chain(self.tree.ancestors(submenu))
            .filter(|&n| self.tree.is_submenu(n))
            .collect();
        // Outermost first so each submenu is visible before its children
        for sub in chain.into_iter().rev() {
            if !self.expanded.insert(sub) {
                continue;
            }
            cx.toggle_attr(sub, "hidden", false);
            let (reference, placement) = self.anchor(cx.doc(), sub);
            let offset = if placement == self.config.submenu_placement { 0.0 } else { 4.0 };
            cx.attach_floating(
                reference,
                sub,
                PositionOptions::new(placement)
                    .with(Middleware::Offset(offset))
                    .with(Middleware::Flip)
                    .with(Middleware::Shift { padding: 8.0 }),
            );
            tracing::debug!(submenu = ?sub, depth = ?self.tree.depth(sub), "submenu expanded");
            cx.notify_part(sub, NotificationKind::Expanded);
        }
    }

    fn close_tree(&mut self, cx: &mut WidgetCx<'_>, submenu: NodeId) {
        let mut targets = vec![submenu];
        targets.extend(self.tree.descendant_submenus(submenu));
        // Innermost first
        for sub in targets.into_iter().rev() {
            if !self.expanded.remove(&sub) {
                continue;
            }
            cx.toggle_attr(sub, "hidden", true);
            cx.detach_floating(sub);
            tracing::debug!(submenu = ?sub, "submenu collapsed");
            cx.notify_part(sub, NotificationKind::Collapsed);
        }
    }

    fn close_all(&mut self, cx: &mut WidgetCx<'_>) {
        let open: Vec<NodeId> = self.expanded_submenus();
        for sub in open.into_iter().rev() {
            self.close_tree(cx, sub);
        }
    }

    fn focus_item(&mut self, cx: &mut WidgetCx<'_>, item: NodeId) {
        self.focused = Some(item);
        cx.focus(item);
    }

    /// Open `item`'s submenu and focus its first (or last) item
    fn enter_submenu(&mut self, cx: &mut WidgetCx<'_>, item: NodeId, last: bool) -> bool {
        let Some(sub) = self.tree.submenu_of(item) else {
            return false;
        };
        self.expand_chain(cx, sub);
        let children = self.children_of(cx.doc(), sub);
        let target = if last { children.last() } else { children.first() };
        if let Some(&child) = target {
            self.focus_item(cx, child);
        }
        true
    }

    fn activate(&mut self, cx: &mut WidgetCx<'_>, item: NodeId) {
        let href = cx.doc().attribute(item, "href").map(str::to_string);
        tracing::debug!(?item, ?href, "menu item activated");
        cx.notify_part(item, NotificationKind::Activated { item, href });
        self.close_all(cx);
        match self.button(cx.doc()) {
            Some(button) => {
                self.focused = None;
                cx.focus(button);
            }
            None => {
                if let Some(top) = self.tree.top_item(item) {
                    self.focus_item(cx, top);
                }
            }
        }
    }

    /// Move between menu bar items from inside a first-level submenu
    fn step_menubar(&mut self, cx: &mut WidgetCx<'_>, item: NodeId, forward: bool) {
        let Some(top) = self.tree.top_item(item) else {
            return;
        };
        let tops = self.siblings(cx.doc(), None);
        let index = nav::position_of(&tops, Some(top));
        let next = if forward {
            nav::next_index(tops.len(), index, true)
        } else {
            nav::prev_index(tops.len(), index, true)
        };
        let Some(next) = next.map(|i| tops[i]) else {
            return;
        };
        self.close_all(cx);
        if !self.enter_submenu(cx, next, false) {
            self.focus_item(cx, next);
        }
    }

    /// Horizontal move between siblings, handing an open submenu over
    fn move_horizontal(&mut self, cx: &mut WidgetCx<'_>, from: NodeId, to: NodeId) {
        let open = self
            .tree
            .items_in(self.tree.level_of(from))
            .into_iter()
            .filter_map(|i| self.tree.submenu_of(i))
            .any(|s| self.expanded.contains(&s));
        if open {
            if let Some(sub) = self.tree.submenu_of(from) {
                self.close_tree(cx, sub);
            }
            if let Some(sub) = self.tree.submenu_of(to) {
                self.expand_chain(cx, sub);
            }
        }
        self.focus_item(cx, to);
    }

    fn run_typeahead(&mut self, cx: &mut WidgetCx<'_>, key: &KeyEvent, siblings: &[NodeId], item: NodeId) {
        let labels: Vec<String> = siblings
            .iter()
            .map(|&i| self.tree.label(cx.doc(), i))
            .collect();
        let start = nav::position_of(siblings, Some(item));
        let hit = self
            .typeahead
            .handle(key, cx.now(), &labels, start, |label, _, _, buffer| {
                prefix_match(label, buffer)
            });
        if let Some(index) = hit {
            self.focus_item(cx, siblings[index]);
        }
    }

    // =========================================================================
    // Event handlers
    // =========================================================================

    fn handle_button_key(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event, key: &Key) {
        let Some(root_submenu) = self.tree.root_submenu() else {
            return;
        };
        match key {
            Key::ArrowDown | Key::Enter | Key::Space => {
                event.prevent_default();
                self.expand_chain(cx, root_submenu);
                if let Some(&first) = self.children_of(cx.doc(), root_submenu).first() {
                    self.focus_item(cx, first);
                }
            }
            Key::ArrowUp => {
                event.prevent_default();
                self.expand_chain(cx, root_submenu);
                if let Some(&last) = self.children_of(cx.doc(), root_submenu).last() {
                    self.focus_item(cx, last);
                }
            }
            Key::Escape => self.close_all(cx),
            _ => {}
        }
    }

    fn handle_key(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event) {
        let Some(key) = event.key().cloned() else {
            return;
        };
        let target = NodeId::from_raw(event.target);
        let doc = cx.doc();
        if self
            .button(doc)
            .is_some_and(|button| doc.composed_contains(button, target))
        {
            self.handle_button_key(cx, event, &key.key);
            return;
        }
        let Some(item) = self.tree.item_at(doc, target) else {
            return;
        };
        let level = self.tree.level_of(item);
        let siblings = self.siblings(doc, level);
        let index = nav::position_of(&siblings, Some(item));
        let horizontal = self.is_horizontal(level);

        match key.key {
            Key::ArrowRight | Key::ArrowLeft if horizontal => {
                event.prevent_default();
                let next = if key.key == Key::ArrowRight {
                    nav::next_index(siblings.len(), index, true)
                } else {
                    nav::prev_index(siblings.len(), index, true)
                };
                if let Some(next) = next.map(|i| siblings[i]) {
                    self.move_horizontal(cx, item, next);
                }
            }
            Key::ArrowDown | Key::ArrowUp if horizontal => {
                event.prevent_default();
                self.enter_submenu(cx, item, key.key == Key::ArrowUp);
            }
            Key::ArrowDown | Key::ArrowUp => {
                event.prevent_default();
                let next = if key.key == Key::ArrowDown {
                    nav::next_index(siblings.len(), index, true)
                } else {
                    nav::prev_index(siblings.len(), index, true)
                };
                if let Some(next) = next.map(|i| siblings[i]) {
                    self.focus_item(cx, next);
                }
            }
            Key::ArrowRight => {
                event.prevent_default();
                if !self.enter_submenu(cx, item, false) && self.config.menubar {
                    self.step_menubar(cx, item, true);
                }
            }
            Key::ArrowLeft => {
                event.prevent_default();
                let owner = level.and_then(|l| self.tree.owner_of(l));
                match owner {
                    Some(owner) if !self.is_horizontal(self.tree.level_of(owner)) => {
                        if let Some(level) = level {
                            self.close_tree(cx, level);
                        }
                        self.focus_item(cx, owner);
                    }
                    Some(_) if self.config.menubar => self.step_menubar(cx, item, false),
                    _ => {}
                }
            }
            Key::Home | Key::End => {
                event.prevent_default();
                let target = if key.key == Key::Home {
                    siblings.first()
                } else {
                    siblings.last()
                };
                if let Some(&target) = target {
                    self.focus_item(cx, target);
                }
            }
            Key::Enter | Key::Space => {
                event.prevent_default();
                if !self.enter_submenu(cx, item, false) {
                    self.activate(cx, item);
                }
            }
            Key::Escape => {
                event.prevent_default();
                match level {
                    Some(sub) => match self.tree.owner_of(sub) {
                        Some(owner) => {
                            self.close_tree(cx, sub);
                            self.focus_item(cx, owner);
                        }
                        None => {
                            self.close_all(cx);
                            self.focused = None;
                            if let Some(button) = self.button(cx.doc()) {
                                cx.focus(button);
                            }
                        }
                    },
                    None => {
                        if let Some(sub) = self.tree.submenu_of(item) {
                            self.close_tree(cx, sub);
                        }
                    }
                }
            }
            Key::Tab => self.close_all(cx),
            Key::Character(_) => self.run_typeahead(cx, &key, &siblings, item),
            _ => {}
        }
    }

    fn pointer_enter(&mut self, cx: &mut WidgetCx<'_>, item: NodeId) {
        let was_open = self.is_expanded();
        let hovered: Vec<NodeId> = std::iter::once(item)
            .chain(self.tree.ancestors(item))
            .filter(|&n| self.tree.is_item(n))
            .collect();
        for n in hovered {
            cx.cancel(Timer::PointerLeave(n));
        }

        let level = self.tree.level_of(item);
        for sibling in self.tree.items_in(level) {
            if sibling == item {
                continue;
            }
            if let Some(sub) = self.tree.submenu_of(sibling) {
                if self.expanded.contains(&sub) {
                    self.close_tree(cx, sub);
                }
            }
        }

        if let Some(sub) = self.tree.submenu_of(item) {
            if was_open || self.config.expand_on_enter || self.is_nested(item) {
                self.expand_chain(cx, sub);
            }
        }
        self.focus_item(cx, item);
    }

    fn pointer_left(&mut self, cx: &mut WidgetCx<'_>, item: NodeId) {
        if let Some(sub) = self.tree.submenu_of(item) {
            self.close_tree(cx, sub);
        }
        // Focus loss decides whether the rest of the menu closes
        if self.is_nested(item) && self.focused == Some(item) {
            self.focused = None;
            if cx.active_element() == Some(item) {
                cx.blur();
            }
        }
    }

    fn handle_click(&mut self, cx: &mut WidgetCx<'_>, target: NodeId) {
        let doc = cx.doc();
        if self
            .button(doc)
            .is_some_and(|button| doc.composed_contains(button, target))
        {
            if self.is_expanded() {
                self.close_all(cx);
            } else if let Some(sub) = self.tree.root_submenu() {
                self.expand_chain(cx, sub);
            }
            return;
        }
        let Some(item) = self.tree.item_at(doc, target) else {
            return;
        };
        match self.tree.submenu_of(item) {
            Some(sub) => {
                if self.expanded.contains(&sub) {
                    self.close_tree(cx, sub);
                } else {
                    self.expand_chain(cx, sub);
                }
                self.focus_item(cx, item);
            }
            None => self.activate(cx, item),
        }
    }
}

impl Controller for Menu {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self) -> &'static str {
        if self.config.menubar {
            "menubar"
        } else {
            "menu"
        }
    }

    fn observed_attributes(&self) -> &'static [&'static str] {
        OBSERVED
    }

    fn handle_event(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event) {
        self.refresh(cx.doc());
        let target = NodeId::from_raw(event.target);
        match event.event_type {
            event_types::KEY_DOWN => self.handle_key(cx, event),
            event_types::CLICK => self.handle_click(cx, target),
            event_types::POINTER_ENTER => {
                if let Some(item) = self.tree.item_at(cx.doc(), target) {
                    self.pointer_enter(cx, item);
                }
            }
            event_types::POINTER_LEAVE => {
                if let Some(item) = self.tree.item_at(cx.doc(), target) {
                    cx.schedule(Timer::PointerLeave(item), self.config.collapse_debounce);
                }
            }
            event_types::FOCUS_IN => {
                if let Some(item) = self.tree.item_at(cx.doc(), target) {
                    self.focused = Some(item);
                }
            }
            event_types::FOCUS_OUT => {
                cx.schedule(Timer::FocusLoss, self.config.collapse_debounce);
            }
            _ => {}
        }
        self.update_root(cx);
    }

    fn handle_outside(&mut self, cx: &mut WidgetCx<'_>, event: &Event) {
        if event.event_type == event_types::POINTER_DOWN && self.is_expanded() {
            self.refresh(cx.doc());
            self.close_all(cx);
            self.update_root(cx);
        }
    }

    fn on_timer(&mut self, cx: &mut WidgetCx<'_>, timer: Timer) {
        self.refresh(cx.doc());
        match timer {
            Timer::PointerLeave(item) if self.tree.is_item(item) => self.pointer_left(cx, item),
            Timer::FocusLoss if !cx.is_focus_within(self.root) => {
                tracing::debug!(root = ?self.root, "menu lost focus");
                self.close_all(cx);
                self.focused = None;
            }
            _ => {}
        }
        self.update_root(cx);
    }

    fn attribute_changed(
        &mut self,
        _cx: &mut WidgetCx<'_>,
        name: &str,
        value: Option<&str>,
    ) -> Result<()> {
        self.config.apply_attribute(name, value)?;
        self.typeahead.set_debounce(self.config.typeahead_debounce);
        Ok(())
    }

    fn sync(&mut self, cx: &mut WidgetCx<'_>) {
        self.refresh(cx.doc());
        let doc = cx.doc();
        if self.focused.is_some_and(|f| !doc.is_rendered(f)) {
            self.focused = None;
        }
        let root = self.root;

        if self.config.menubar {
            cx.set_attr(root, aria::ROLE, "menubar");
            cx.set_attr(root, aria::ORIENTATION, "horizontal");
        }
        if let Some(button) = self.button(cx.doc()) {
            cx.set_attr(button, aria::HASPOPUP, "menu");
            aria::set_bool(cx, button, aria::EXPANDED, self.is_expanded());
            let controls = self
                .tree
                .root_submenu()
                .map(|sub| cx.ensure_id(sub, "menu"));
            aria::set_optional(cx, button, aria::CONTROLS, controls.as_deref());
        }

        let submenus: Vec<NodeId> = self.tree.submenus().collect();
        for sub in submenus {
            let expanded = self.expanded.contains(&sub);
            let depth = self.tree.depth(sub).unwrap_or_default();
            cx.set_attr(sub, aria::ROLE, "menu");
            cx.set_attr(sub, "depth", depth.to_string());
            cx.toggle_attr(sub, "expanded", expanded);
            cx.toggle_attr(sub, "hidden", !expanded);
        }

        let tab_stop = self
            .focused
            .or_else(|| self.siblings(cx.doc(), self.tree.shallow_level()).first().copied());
        let items: Vec<NodeId> = self.tree.items().collect();
        for item in items {
            cx.set_attr(item, aria::ROLE, "menuitem");
            aria::set_tab_stop(cx, item, tab_stop == Some(item));
            cx.toggle_attr(item, "focused", self.focused == Some(item));
            match self.tree.submenu_of(item) {
                Some(sub) => {
                    cx.set_attr(item, aria::HASPOPUP, "menu");
                    aria::set_bool(cx, item, aria::EXPANDED, self.expanded.contains(&sub));
                }
                None => {
                    cx.remove_attr(item, aria::HASPOPUP);
                    cx.remove_attr(item, aria::EXPANDED);
                }
            }
        }
    }
}

impl Focusable for Menu {
    fn focused_part(&self, doc: &Document) -> Option<NodeId> {
        self.focused.filter(|&f| doc.is_rendered(f))
    }
}

impl Expandable for Menu {
    fn is_expanded(&self) -> bool {
        self.fsm.current_state() == states::EXPANDED
    }

    /// Open the button's submenu, or the first menu bar item's submenu
    fn expand(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        self.refresh(cx.doc());
        let target = self.tree.root_submenu().or_else(|| {
            self.tree
                .shallow_items()
                .into_iter()
                .find_map(|item| self.tree.submenu_of(item))
        });
        let Some(sub) = target else {
            tracing::warn!(root = ?self.root, "expand: menu has no submenu");
            return false;
        };
        self.expand_chain(cx, sub);
        self.update_root(cx);
        true
    }

    fn collapse(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        self.refresh(cx.doc());
        let was_open = self.is_expanded();
        self.close_all(cx);
        self.update_root(cx);
        was_open
    }
}

impl FloatingPositioned for Menu {
    fn floating_pairs(&self, doc: &Document) -> Vec<(NodeId, NodeId)> {
        self.expanded_submenus()
            .into_iter()
            .map(|sub| (self.anchor(doc, sub).0, sub))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WidgetContext;
    use aria_dom::el;

    fn item(id: &str) -> aria_dom::ElementBuilder {
        el(ITEM_TAG).id(id).text(id)
    }

    /// button > s0 [a > s1 [b > s2 [c], e], d]
    fn button_menu() -> (WidgetContext, crate::WidgetId) {
        let mut cx = WidgetContext::default();
        let body = cx.doc().root();
        let root = cx
            .doc_mut()
            .insert(
                body,
                el(TAG).children([
                    el(BUTTON_TAG).id("button"),
                    el(SUBMENU_TAG).id("s0").children([
                        item("a").child(el(SUBMENU_TAG).id("s1").children([
                            item("b").child(el(SUBMENU_TAG).id("s2").child(item("c"))),
                            item("e"),
                        ])),
                        item("d").attr("href", "/d"),
                    ]),
                ]),
            )
            .unwrap();
        let id = cx.upgrade(root).unwrap();
        (cx, id)
    }

    fn node(cx: &WidgetContext, id: &str) -> NodeId {
        cx.doc().element_by_id(id).unwrap()
    }

    fn menu(cx: &WidgetContext, id: crate::WidgetId) -> &Menu {
        cx.get::<Menu>(id).unwrap()
    }

    #[test]
    fn test_initial_attributes() {
        let (cx, _) = button_menu();
        let doc = cx.doc();
        assert_eq!(doc.attribute(node(&cx, "button"), "aria-expanded"), Some("false"));
        assert_eq!(doc.attribute(node(&cx, "button"), "aria-controls"), Some("s0"));
        assert!(doc.has_attribute(node(&cx, "s0"), "hidden"));
        assert_eq!(doc.attribute(node(&cx, "s1"), "depth"), Some("1"));
        assert_eq!(doc.attribute(node(&cx, "a"), "tabindex"), Some("0"));
        assert_eq!(doc.attribute(node(&cx, "d"), "tabindex"), Some("-1"));
        assert_eq!(doc.attribute(node(&cx, "a"), "aria-haspopup"), Some("menu"));
        assert_eq!(doc.attribute(node(&cx, "d"), "aria-haspopup"), None);
    }

    #[test]
    fn test_button_keyboard_and_escape() {
        let (mut cx, id) = button_menu();
        let button = node(&cx, "button");
        cx.focus(button);
        cx.press(Key::ArrowDown);
        assert!(menu(&cx, id).is_expanded());
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "a")));

        cx.press(Key::ArrowRight);
        assert!(menu(&cx, id).is_submenu_expanded(node(&cx, "s1")));
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "b")));
        assert_eq!(cx.doc().attribute(node(&cx, "a"), "aria-expanded"), Some("true"));

        cx.press(Key::ArrowLeft);
        assert!(!menu(&cx, id).is_submenu_expanded(node(&cx, "s1")));
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "a")));

        cx.press(Key::Escape);
        assert!(!menu(&cx, id).is_expanded());
        assert_eq!(cx.doc().active_element(), Some(button));
    }

    #[test]
    fn test_vertical_wrap_and_typeahead() {
        let (mut cx, id) = button_menu();
        cx.focus(node(&cx, "button"));
        cx.press(Key::ArrowUp);
        assert_eq!(menu(&cx, id).focused_item(), Some(node(&cx, "d")));
        cx.press(Key::ArrowDown);
        assert_eq!(menu(&cx, id).focused_item(), Some(node(&cx, "a")));
        cx.press(Key::Character('d'));
        assert_eq!(menu(&cx, id).focused_item(), Some(node(&cx, "d")));
        assert_eq!(cx.doc().attribute(node(&cx, "d"), "tabindex"), Some("0"));
        assert_eq!(cx.doc().attribute(node(&cx, "a"), "tabindex"), Some("-1"));
    }

    #[test]
    fn test_activation_notifies_and_returns_focus() {
        let (mut cx, id) = button_menu();
        cx.click(node(&cx, "button"));
        assert!(menu(&cx, id).is_expanded());
        cx.take_notifications();
        cx.click(node(&cx, "d"));
        let activated = cx.take_notifications().into_iter().find_map(|n| match n.kind {
            NotificationKind::Activated { href, .. } => Some(href),
            _ => None,
        });
        assert_eq!(activated, Some(Some("/d".to_string())));
        assert!(!menu(&cx, id).is_expanded());
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "button")));
    }

    #[test]
    fn test_expansion_is_transitive() {
        let (mut cx, id) = button_menu();
        let s2 = node(&cx, "s2");
        cx.with::<Menu, _>(id, |m, wcx| m.open_submenu(wcx, s2));
        for sub in ["s0", "s1", "s2"] {
            assert!(menu(&cx, id).is_submenu_expanded(node(&cx, sub)), "{sub}");
        }
        assert!(menu(&cx, id).is_expanded());

        let s1 = node(&cx, "s1");
        cx.with::<Menu, _>(id, |m, wcx| m.close_submenu(wcx, s1));
        assert!(!menu(&cx, id).is_submenu_expanded(s2));
        assert!(menu(&cx, id).is_submenu_expanded(node(&cx, "s0")));
        assert!(cx.doc().has_attribute(s2, "hidden"));
    }

    #[test]
    fn test_focus_loss_resets_tab_stop() {
        let (mut cx, id) = button_menu();
        let body = cx.doc().root();
        let outside = cx.doc_mut().insert(body, el("button")).unwrap();
        cx.focus(node(&cx, "button"));
        cx.press(Key::ArrowUp);
        assert_eq!(cx.doc().attribute(node(&cx, "d"), "tabindex"), Some("0"));
        cx.focus(outside);
        cx.advance(250);
        assert!(!menu(&cx, id).is_expanded());
        assert_eq!(menu(&cx, id).focused_item(), None);
        assert_eq!(cx.doc().attribute(node(&cx, "a"), "tabindex"), Some("0"));
    }

    #[test]
    fn test_pointer_leaving_nested_item_blurs() {
        let (mut cx, id) = button_menu();
        let step = Duration::from_millis(300);
        cx.click(node(&cx, "button"));
        cx.hover(node(&cx, "a"));
        cx.hover(node(&cx, "b"));
        assert!(menu(&cx, id).is_submenu_expanded(node(&cx, "s2")));
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "b")));

        cx.unhover(node(&cx, "b"));
        cx.advance_by(step);
        assert!(!menu(&cx, id).is_submenu_expanded(node(&cx, "s2")));
        assert_eq!(cx.doc().active_element(), None);
        assert_eq!(menu(&cx, id).focused_item(), None);
        assert!(cx.is_scheduled(id, Timer::FocusLoss));

        cx.advance_by(step);
        assert!(!menu(&cx, id).is_expanded());
    }

    #[test]
    fn test_menubar_navigation() {
        let mut cx = WidgetContext::default();
        let body = cx.doc().root();
        let root = cx
            .doc_mut()
            .insert(
                body,
                el(MENUBAR_TAG).children([
                    item("file").child(el(SUBMENU_TAG).id("file-menu").children([item("new"), item("open")])),
                    item("edit").child(el(SUBMENU_TAG).id("edit-menu").child(item("undo"))),
                    item("help"),
                ]),
            )
            .unwrap();
        let id = cx.upgrade(root).unwrap();
        assert_eq!(cx.doc().attribute(root, "role"), Some("menubar"));

        cx.focus(node(&cx, "file"));
        cx.press(Key::ArrowDown);
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "new")));

        // Right from a leaf in a first-level submenu moves along the bar
        cx.press(Key::ArrowRight);
        assert!(!menu(&cx, id).is_submenu_expanded(node(&cx, "file-menu")));
        assert!(menu(&cx, id).is_submenu_expanded(node(&cx, "edit-menu")));
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "undo")));

        cx.press(Key::Escape);
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "edit")));
        assert!(!menu(&cx, id).is_expanded());

        cx.press(Key::ArrowLeft);
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "file")));
        cx.press(Key::ArrowLeft);
        assert_eq!(cx.doc().active_element(), Some(node(&cx, "help")));
    }
}
