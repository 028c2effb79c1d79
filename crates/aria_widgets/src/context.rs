//! Widget Context - owns the document, mounted widgets and their runtime
//!
//! The WidgetContext provides:
//! - Mounting and upgrading widget roots
//! - Event routing (innermost widget first, pointer capture, outside events)
//! - Host-driven timers for focus-loss and hover debouncing
//! - Ordered focus event delivery
//! - Dirty tracking and notification queues for the host
//!
//! Controllers never hold a reference to the context. During a handler they
//! receive a [`WidgetCx`], a view of the runtime scoped to one widget.

use std::collections::VecDeque;
use std::time::Duration;

use aria_core::{event_types, Debouncer, Event, Key, KeyEvent, Modifiers, Timestamp};
use aria_dom::{Document, FocusChange, NodeId};
use rustc_hash::FxHashSet;
use slotmap::SlotMap;

use crate::error::{Result, WidgetError};
use crate::floating::{FloatingManager, FloatingPositioner, PositionOptions};
use crate::notification::{Notification, NotificationKind};
use crate::registry::WidgetRegistry;
use crate::widget::{Widget, WidgetConfig, WidgetId, WidgetType};

/// Focus moves delivered per dispatch before the queue is dropped
const MAX_FOCUS_HOPS: usize = 32;

/// Timer keys a widget can schedule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Focus left a part; check whether it left the widget
    FocusLoss,
    /// The pointer left a menu item
    PointerLeave(NodeId),
    Show,
    Hide,
    Rotate,
}

/// Shared state handed to controllers through [`WidgetCx`]
struct Runtime {
    doc: Document,
    now: Timestamp,
    timers: Debouncer<(WidgetId, Timer), ()>,
    notifications: Vec<Notification>,
    focus_queue: VecDeque<FocusChange>,
    floating: FloatingManager,
    registry: WidgetRegistry,
    dirty: FxHashSet<WidgetId>,
    capture: Option<WidgetId>,
    generation: u64,
}

/// Runtime view for one widget while it handles an event
pub struct WidgetCx<'a> {
    id: WidgetId,
    root: NodeId,
    rt: &'a mut Runtime,
}

impl<'a> WidgetCx<'a> {
    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn doc(&self) -> &Document {
        &self.rt.doc
    }

    /// Structural access to the document. Attribute writes should go
    /// through [`set_attr`](Self::set_attr) so they are dirty-tracked.
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.rt.doc
    }

    pub fn now(&self) -> Timestamp {
        self.rt.now
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Set an attribute, marking the widget dirty if the value changed
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        if self.rt.doc.set_attribute(node, name, value) {
            self.rt.dirty.insert(self.id);
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if self.rt.doc.remove_attribute(node, name) {
            self.rt.dirty.insert(self.id);
        }
    }

    /// Add or remove a boolean (valueless) attribute
    pub fn toggle_attr(&mut self, node: NodeId, name: &str, present: bool) {
        if self.rt.doc.toggle_attribute(node, name, present) {
            self.rt.dirty.insert(self.id);
        }
    }

    /// The element's id, generating one if it has none
    pub fn ensure_id(&mut self, node: NodeId, kind: &str) -> String {
        let rt = &mut *self.rt;
        if let Some(id) = rt.doc.id(node).filter(|id| !id.is_empty()) {
            return id.to_string();
        }
        let id = rt.registry.ensure_id(&mut rt.doc, node, kind);
        rt.dirty.insert(self.id);
        id
    }

    // =========================================================================
    // Focus
    // =========================================================================

    /// Move document focus. Focus events are delivered after the current
    /// handler returns. Returns false if focus did not move.
    pub fn focus(&mut self, node: NodeId) -> bool {
        let change = self.rt.doc.focus(node);
        let moved = change.moved();
        if moved {
            self.rt.focus_queue.push_back(change);
        }
        moved
    }

    pub fn blur(&mut self) {
        let change = self.rt.doc.blur();
        if change.moved() {
            self.rt.focus_queue.push_back(change);
        }
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.rt.doc.active_element()
    }

    /// Whether document focus is inside `node` (inclusive, across shadow roots)
    pub fn is_focus_within(&self, node: NodeId) -> bool {
        self.rt
            .doc
            .active_element()
            .is_some_and(|active| self.rt.doc.composed_contains(node, active))
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Schedule `timer`, replacing a pending one with the same key
    pub fn schedule(&mut self, timer: Timer, delay: Duration) {
        self.rt
            .timers
            .schedule((self.id, timer), (), self.rt.now, delay);
    }

    pub fn cancel(&mut self, timer: Timer) -> bool {
        self.rt.timers.cancel(&(self.id, timer)).is_some()
    }

    pub fn is_scheduled(&self, timer: Timer) -> bool {
        self.rt.timers.is_pending(&(self.id, timer))
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    pub fn notify(&mut self, kind: NotificationKind) {
        self.push_notification(None, kind);
    }

    /// Notification about a narrower part (a submenu, a thumb)
    pub fn notify_part(&mut self, part: NodeId, kind: NotificationKind) {
        self.push_notification(Some(part), kind);
    }

    fn push_notification(&mut self, part: Option<NodeId>, kind: NotificationKind) {
        tracing::trace!(widget = ?self.id, ?part, ?kind, "notification");
        self.rt.notifications.push(Notification {
            widget: self.id,
            root: self.root,
            part,
            kind,
        });
    }

    // =========================================================================
    // Pointer capture
    // =========================================================================

    /// Route subsequent pointer moves and ups to this widget
    pub fn capture_pointer(&mut self) {
        self.rt.capture = Some(self.id);
    }

    pub fn release_pointer(&mut self) {
        if self.rt.capture == Some(self.id) {
            self.rt.capture = None;
        }
    }

    pub fn has_capture(&self) -> bool {
        self.rt.capture == Some(self.id)
    }

    // =========================================================================
    // Floating
    // =========================================================================

    pub fn attach_floating(&mut self, reference: NodeId, floating: NodeId, options: PositionOptions) {
        let rt = &mut *self.rt;
        rt.floating
            .attach(&mut rt.doc, self.id, reference, floating, options);
    }

    pub fn detach_floating(&mut self, floating: NodeId) {
        self.rt.floating.detach(floating);
    }

    pub fn is_floating(&self, floating: NodeId) -> bool {
        self.rt.floating.is_tracking(floating)
    }
}

/// Owns the document and every mounted widget
pub struct WidgetContext {
    runtime: Runtime,
    widgets: SlotMap<WidgetId, Widget>,
}

impl Default for WidgetContext {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

impl WidgetContext {
    pub fn new(doc: Document) -> Self {
        Self::with_positioner(doc, FloatingManager::default())
    }

    /// Create a context using a host-provided floating position adapter
    pub fn with_positioner(doc: Document, floating: FloatingManager) -> Self {
        let generation = doc.generation();
        Self {
            runtime: Runtime {
                doc,
                now: 0,
                timers: Debouncer::new(),
                notifications: Vec::new(),
                focus_queue: VecDeque::new(),
                floating,
                registry: WidgetRegistry::new(),
                dirty: FxHashSet::default(),
                capture: None,
                generation,
            },
            widgets: SlotMap::with_key(),
        }
    }

    pub fn set_positioner(&mut self, positioner: Box<dyn FloatingPositioner>) {
        self.runtime.floating.set_positioner(positioner);
    }

    pub fn doc(&self) -> &Document {
        &self.runtime.doc
    }

    /// Mutable document access for the host. Call
    /// [`attribute_changed`](Self::attribute_changed) after editing an
    /// observed attribute on a widget root.
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.runtime.doc
    }

    pub fn now(&self) -> Timestamp {
        self.runtime.now
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Mount a widget on `root`
    pub fn mount(&mut self, root: NodeId, config: impl Into<WidgetConfig>) -> Result<WidgetId> {
        let doc = &self.runtime.doc;
        if !doc.exists(root) {
            return Err(aria_dom::DomError::NodeNotFound(root).into());
        }
        if !doc.is_element(root) {
            return Err(WidgetError::UnsupportedElement(
                doc.tag(root).unwrap_or_default().to_string(),
            ));
        }
        if !doc.is_connected(root) {
            return Err(WidgetError::Detached(root));
        }
        if self.runtime.registry.widget_at(root).is_some() {
            return Err(WidgetError::AlreadyMounted(root));
        }

        let widget = config.into().build(root)?;
        let kind = widget.controller().kind();
        let id = self.widgets.insert(widget);
        self.runtime.registry.register(root, id);
        tracing::debug!(?id, ?root, kind, "widget mounted");

        self.run(id, |widget, cx| widget.controller_mut().mount(cx));
        self.settle();
        Ok(id)
    }

    /// Mount the controller registered for the element's tag, configured
    /// from the element's observed attributes
    pub fn upgrade(&mut self, root: NodeId) -> Result<WidgetId> {
        let doc = &self.runtime.doc;
        let tag = doc
            .tag(root)
            .ok_or(aria_dom::DomError::NodeNotFound(root))?;
        let mut config = WidgetConfig::for_tag(tag)
            .ok_or_else(|| WidgetError::UnsupportedElement(tag.to_string()))?;
        let attributes: Vec<(String, String)> = doc
            .node(root)
            .map(|node| {
                node.attributes()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        for (name, value) in &attributes {
            config.apply_attribute(name, Some(value))?;
        }
        self.mount(root, config)
    }

    /// Upgrade every known widget element in the document that is not yet
    /// mounted. Elements that fail to upgrade are logged and skipped.
    pub fn upgrade_all(&mut self) -> Vec<WidgetId> {
        let doc = &self.runtime.doc;
        let candidates: Vec<NodeId> = doc
            .composed_descendants(doc.root())
            .into_iter()
            .filter(|&node| {
                doc.tag(node).is_some_and(|tag| WidgetConfig::for_tag(tag).is_some())
                    && self.runtime.registry.widget_at(node).is_none()
            })
            .collect();

        let mut mounted = Vec::new();
        for node in candidates {
            match self.upgrade(node) {
                Ok(id) => mounted.push(id),
                Err(error) => tracing::warn!(%error, ?node, "failed to upgrade widget element"),
            }
        }
        mounted
    }

    /// Unmount a widget, cancelling its timers and floating subscriptions
    pub fn unmount(&mut self, id: WidgetId) -> Result<()> {
        if !self.widgets.contains_key(id) {
            return Err(WidgetError::UnknownWidget(id));
        }
        self.run(id, |widget, cx| widget.controller_mut().unmount(cx));
        self.widgets.remove(id);

        let rt = &mut self.runtime;
        let cancelled = rt.timers.cancel_where(|(owner, _)| *owner == id);
        rt.floating.detach_owner(id);
        if rt.capture == Some(id) {
            rt.capture = None;
        }
        rt.dirty.remove(&id);
        rt.registry.unregister(id);
        tracing::debug!(?id, cancelled, "widget unmounted");
        Ok(())
    }

    /// Remove `node` from the document. Widgets rooted inside it are
    /// unmounted and focus events are delivered if focus was inside.
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        let change = self.runtime.doc.remove(node)?;
        if change.moved() {
            self.runtime.focus_queue.push_back(change);
        }
        self.prune();
        self.settle();
        Ok(())
    }

    /// Remove `node` like [`remove`](Self::remove), then free its subtree.
    /// The node cannot be inserted again.
    pub fn destroy(&mut self, node: NodeId) -> Result<()> {
        self.remove(node)?;
        self.runtime.doc.destroy(node)?;
        Ok(())
    }

    /// An observed attribute on the widget root changed
    pub fn attribute_changed(&mut self, id: WidgetId, name: &str, value: Option<&str>) -> Result<()> {
        let widget = self.widgets.get(id).ok_or(WidgetError::UnknownWidget(id))?;
        if !widget
            .controller()
            .observed_attributes()
            .iter()
            .any(|&observed| observed == name)
        {
            return Err(WidgetError::UnobservedAttribute(name.to_string()));
        }
        let result = self
            .run(id, |widget, cx| {
                widget.controller_mut().attribute_changed(cx, name, value)
            })
            .ok_or(WidgetError::UnknownWidget(id))?;
        self.settle();
        result
    }

    /// Attributes the widget reacts to
    pub fn observed_attributes(&self, id: WidgetId) -> Option<&'static [&'static str]> {
        self.widgets.get(id).map(|w| w.controller().observed_attributes())
    }

    pub fn widget_at(&self, root: NodeId) -> Option<WidgetId> {
        self.runtime.registry.widget_at(root)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Unmount widgets whose root left the document
    fn prune(&mut self) {
        let detached: Vec<WidgetId> = self
            .widgets
            .iter()
            .filter(|(_, w)| !self.runtime.doc.is_connected(w.controller().root()))
            .map(|(id, _)| id)
            .collect();
        for id in detached {
            tracing::debug!(?id, "widget root detached");
            let _ = self.unmount(id);
        }
    }

    // =========================================================================
    // Event Dispatch
    // =========================================================================

    /// Dispatch a host event.
    ///
    /// Timers due before the event's timestamp fire first. The event is then
    /// delivered to every widget whose root contains the target, innermost
    /// first, until a handler stops propagation. Pointer-down, click and
    /// focus-in events are also offered to the remaining widgets as outside
    /// events.
    pub fn dispatch(&mut self, mut event: Event) {
        if event.timestamp > self.runtime.now {
            self.advance(event.timestamp);
        }
        event.timestamp = self.runtime.now;
        self.prune();

        if event.event_type == event_types::FOCUS_IN {
            let target = NodeId::from_raw(event.target);
            if self.runtime.doc.active_element() != Some(target) {
                self.runtime.doc.focus(target);
            }
        }

        self.deliver(&mut event);
        self.settle();
    }

    fn deliver(&mut self, event: &mut Event) {
        let target = NodeId::from_raw(event.target);
        if !self.runtime.doc.exists(target) {
            tracing::trace!(?target, "event target does not exist");
            return;
        }

        let route = self.route(target, event.event_type);
        for &id in &route {
            self.run(id, |widget, cx| widget.controller_mut().handle_event(cx, event));
            if event.propagation_stopped {
                break;
            }
        }

        let outside = matches!(
            event.event_type,
            event_types::POINTER_DOWN | event_types::CLICK | event_types::FOCUS_IN
        );
        if outside {
            let others: Vec<WidgetId> = self
                .widgets
                .keys()
                .filter(|id| !route.contains(id))
                .collect();
            for id in others {
                self.run(id, |widget, cx| widget.controller_mut().handle_outside(cx, event));
            }
        }
    }

    /// Widgets receiving an event at `target`, innermost first
    fn route(&self, target: NodeId, event_type: u32) -> Vec<WidgetId> {
        if matches!(
            event_type,
            event_types::POINTER_MOVE | event_types::POINTER_UP
        ) {
            if let Some(id) = self.runtime.capture {
                return vec![id];
            }
        }
        let doc = &self.runtime.doc;
        let mut route = Vec::new();
        let mut node = Some(target);
        while let Some(current) = node {
            if let Some(id) = self.runtime.registry.widget_at(current) {
                route.push(id);
            }
            node = doc.composed_parent(current);
        }
        route
    }

    fn run<R>(
        &mut self,
        id: WidgetId,
        f: impl FnOnce(&mut Widget, &mut WidgetCx<'_>) -> R,
    ) -> Option<R> {
        let widget = self.widgets.get_mut(id)?;
        let root = widget.controller().root();
        let mut cx = WidgetCx {
            id,
            root,
            rt: &mut self.runtime,
        };
        Some(f(widget, &mut cx))
    }

    /// Deliver queued focus changes as focus-out / focus-in events
    fn flush_focus(&mut self) {
        let mut hops = 0;
        while let Some(change) = self.runtime.focus_queue.pop_front() {
            hops += 1;
            if hops > MAX_FOCUS_HOPS {
                tracing::warn!(
                    dropped = self.runtime.focus_queue.len() + 1,
                    "focus moved too many times in one dispatch"
                );
                self.runtime.focus_queue.clear();
                break;
            }
            let now = self.runtime.now;
            if let Some(previous) = change.previous {
                let mut event =
                    Event::focus_out(previous.to_raw(), change.current.map(NodeId::to_raw)).at(now);
                self.deliver(&mut event);
            }
            if let Some(current) = change.current {
                let mut event =
                    Event::focus_in(current.to_raw(), change.previous.map(NodeId::to_raw)).at(now);
                self.deliver(&mut event);
            }
        }
    }

    /// Flush focus, re-sync widgets and reposition floating elements after
    /// structural changes
    fn settle(&mut self) {
        self.flush_focus();
        let ids: Vec<WidgetId> = self.widgets.keys().collect();
        for id in ids {
            self.run(id, |widget, cx| widget.controller_mut().sync(cx));
        }
        let rt = &mut self.runtime;
        if rt.doc.generation() != rt.generation {
            rt.generation = rt.doc.generation();
            rt.floating.update(&mut rt.doc);
        }
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// Advance the clock to `now`, firing due timers in deadline order
    pub fn advance(&mut self, now: Timestamp) {
        if now < self.runtime.now {
            tracing::trace!(now, current = self.runtime.now, "ignoring clock going backwards");
            return;
        }
        self.runtime.now = now;
        loop {
            let due = self.runtime.timers.poll(now);
            if due.is_empty() {
                break;
            }
            for ((id, timer), ()) in due {
                tracing::trace!(?id, ?timer, "timer fired");
                self.run(id, |widget, cx| widget.controller_mut().on_timer(cx, timer));
                self.flush_focus();
            }
        }
        self.settle();
    }

    /// Advance the clock by `delta`
    pub fn advance_by(&mut self, delta: Duration) {
        let delta = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        self.advance(self.runtime.now.saturating_add(delta));
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.runtime.timers.next_deadline()
    }

    // =========================================================================
    // Host Conveniences
    // =========================================================================

    /// Move focus as the host (for example on a pointer press)
    pub fn focus(&mut self, node: NodeId) -> bool {
        let change = self.runtime.doc.focus(node);
        let moved = change.moved();
        if moved {
            self.runtime.focus_queue.push_back(change);
        }
        self.settle();
        moved
    }

    pub fn blur(&mut self) {
        let change = self.runtime.doc.blur();
        if change.moved() {
            self.runtime.focus_queue.push_back(change);
        }
        self.settle();
    }

    /// Press a key on the focused element (or the document root)
    pub fn press(&mut self, key: Key) {
        self.press_with(key, Modifiers::NONE);
    }

    pub fn press_with(&mut self, key: Key, modifiers: Modifiers) {
        let target = self
            .runtime
            .doc
            .active_element()
            .unwrap_or_else(|| self.runtime.doc.root());
        let event = Event::key_down(target.to_raw(), KeyEvent::new(key).with_modifiers(modifiers))
            .at(self.runtime.now);
        self.dispatch(event);
    }

    /// Type a string one character at a time
    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.press(Key::Character(c));
        }
    }

    pub fn click(&mut self, node: NodeId) {
        self.dispatch(Event::click(node.to_raw()).at(self.runtime.now));
    }

    pub fn hover(&mut self, node: NodeId) {
        self.dispatch(Event::pointer_enter(node.to_raw()).at(self.runtime.now));
    }

    pub fn unhover(&mut self, node: NodeId) {
        self.dispatch(Event::pointer_leave(node.to_raw()).at(self.runtime.now));
    }

    /// Report new text in an editable input
    pub fn input(&mut self, node: NodeId, value: &str) {
        self.runtime.doc.set_attribute(node, "value", value);
        self.dispatch(Event::input(node.to_raw(), value).at(self.runtime.now));
    }

    /// Run `f` against a typed widget, then deliver focus changes and re-sync
    pub fn with<C, R>(&mut self, id: WidgetId, f: impl FnOnce(&mut C, &mut WidgetCx<'_>) -> R) -> Option<R>
    where
        C: WidgetType,
    {
        let result = self.run(id, |widget, cx| C::from_widget_mut(widget).map(|c| f(c, cx)))?;
        self.settle();
        result
    }

    pub fn get<C: WidgetType>(&self, id: WidgetId) -> Option<&C> {
        self.widgets.get(id).and_then(C::from_widget)
    }

    /// Recompute floating positions (the host's layout-changed callback)
    pub fn reposition(&mut self) {
        let rt = &mut self.runtime;
        rt.floating.update(&mut rt.doc);
    }

    // =========================================================================
    // Host Queues
    // =========================================================================

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.runtime.notifications)
    }

    /// Widgets whose attributes changed since the last call
    pub fn take_dirty(&mut self) -> Vec<WidgetId> {
        self.runtime.dirty.drain().collect()
    }

    pub fn is_dirty(&self, id: WidgetId) -> bool {
        self.runtime.dirty.contains(&id)
    }

    pub fn has_capture(&self, id: WidgetId) -> bool {
        self.runtime.capture == Some(id)
    }

    pub fn is_scheduled(&self, id: WidgetId, timer: Timer) -> bool {
        self.runtime.timers.is_pending(&(id, timer))
    }

    pub fn active_floating(&self) -> usize {
        self.runtime.floating.active()
    }
}
