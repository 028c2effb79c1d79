//! Tooltip Widget
//!
//! A non-interactive description shown for a trigger after a hover delay or
//! immediately on keyboard focus. The content stays open while the pointer
//! moves from the trigger onto it.

use std::time::Duration;

use aria_core::{event_types, Event, Key, StateMachine};
use aria_dom::{Document, NodeId, PartQuery, Parts};
use serde::{Deserialize, Serialize};

use crate::aria;
use crate::config::{duration_ms, parse_duration, parse_enum};
use crate::context::{Timer, WidgetCx};
use crate::error::Result;
use crate::floating::{Middleware, Placement, PositionOptions};
use crate::notification::NotificationKind;
use crate::widget::{Controller, Expandable, FloatingPositioned};

pub const TAG: &str = "ui-tooltip";
pub const TRIGGER_TAG: &str = "ui-tooltip-trigger";
pub const CONTENT_TAG: &str = "ui-tooltip-content";
pub const ARROW_TAG: &str = "ui-tooltip-arrow";

pub const DEFAULT_SHOW_DELAY: Duration = Duration::from_millis(300);
pub const DEFAULT_HIDE_DELAY: Duration = Duration::from_millis(100);

pub mod states {
    pub const HIDDEN: u32 = 0;
    pub const VISIBLE: u32 = 1;
}

const SHOW: u32 = event_types::USER + 1;
const HIDE: u32 = event_types::USER + 2;

const OBSERVED: &[&str] = &["show-delay", "hide-delay", "placement"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TooltipConfig {
    #[serde(with = "duration_ms")]
    pub show_delay: Duration,
    #[serde(with = "duration_ms")]
    pub hide_delay: Duration,
    pub placement: Placement,
    /// Gap between trigger and content
    pub offset: f32,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            show_delay: DEFAULT_SHOW_DELAY,
            hide_delay: DEFAULT_HIDE_DELAY,
            placement: Placement::Top,
            offset: 8.0,
        }
    }
}

impl TooltipConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_delay(mut self, delay: Duration) -> Self {
        self.show_delay = delay;
        self
    }

    pub fn hide_delay(mut self, delay: Duration) -> Self {
        self.hide_delay = delay;
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    pub(crate) fn apply_attribute(&mut self, name: &str, value: Option<&str>) -> Result<bool> {
        match name {
            "show-delay" => {
                self.show_delay = value
                    .map(|v| parse_duration(name, v))
                    .transpose()?
                    .unwrap_or(DEFAULT_SHOW_DELAY);
            }
            "hide-delay" => {
                self.hide_delay = value
                    .map(|v| parse_duration(name, v))
                    .transpose()?
                    .unwrap_or(DEFAULT_HIDE_DELAY);
            }
            "placement" => {
                self.placement = value
                    .map(|v| parse_enum(name, v))
                    .transpose()?
                    .unwrap_or(Placement::Top);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

pub struct Tooltip {
    root: NodeId,
    config: TooltipConfig,
    parts: Parts,
    fsm: StateMachine,
    hovered: bool,
    focused: bool,
}

impl Tooltip {
    pub fn new(root: NodeId, config: TooltipConfig) -> Result<Self> {
        let parts = Parts::new()
            .declare("trigger", PartQuery::one(TRIGGER_TAG)?)
            .declare("content", PartQuery::one(CONTENT_TAG)?)
            .declare("arrow", PartQuery::one(ARROW_TAG)?);
        let fsm = StateMachine::builder(states::HIDDEN)
            .on(states::HIDDEN, SHOW, states::VISIBLE)
            .on(states::VISIBLE, HIDE, states::HIDDEN)
            .build();
        Ok(Self {
            root,
            config,
            parts,
            fsm,
            hovered: false,
            focused: false,
        })
    }

    pub fn config(&self) -> &TooltipConfig {
        &self.config
    }

    pub fn is_visible(&self) -> bool {
        self.fsm.current_state() == states::VISIBLE
    }

    fn trigger(&self, doc: &Document) -> Option<NodeId> {
        self.parts.bind(doc, self.root).one("trigger")
    }

    fn content(&self, doc: &Document) -> Option<NodeId> {
        self.parts.bind(doc, self.root).one("content")
    }

    fn within(&self, doc: &Document, part: &str, target: NodeId) -> bool {
        self.parts
            .bind(doc, self.root)
            .one(part)
            .is_some_and(|node| doc.composed_contains(node, target))
    }

    /// Show now, cancelling any pending timers
    pub fn show(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        cx.cancel(Timer::Show);
        cx.cancel(Timer::Hide);
        if self.is_visible() {
            return false;
        }
        let (Some(trigger), Some(content)) = (self.trigger(cx.doc()), self.content(cx.doc())) else {
            tracing::warn!(root = ?self.root, "tooltip needs a trigger and content");
            return false;
        };
        self.fsm.send(SHOW);
        cx.remove_attr(content, "hidden");

        let mut options = PositionOptions::new(self.config.placement)
            .with(Middleware::Offset(self.config.offset))
            .with(Middleware::Flip)
            .with(Middleware::Shift { padding: 8.0 });
        if let Some(arrow) = self.parts.bind(cx.doc(), self.root).one("arrow") {
            options = options.with(Middleware::Arrow {
                element: arrow,
                padding: 4.0,
            });
        }
        cx.attach_floating(trigger, content, options);

        tracing::debug!(root = ?self.root, "tooltip shown");
        cx.notify_part(content, NotificationKind::Expanded);
        true
    }

    /// Hide now, cancelling any pending timers
    pub fn hide(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        cx.cancel(Timer::Show);
        cx.cancel(Timer::Hide);
        if !self.is_visible() {
            return false;
        }
        self.fsm.send(HIDE);
        if let Some(content) = self.content(cx.doc()) {
            cx.detach_floating(content);
            cx.set_attr(content, "hidden", "");
            cx.notify_part(content, NotificationKind::Collapsed);
        }
        tracing::debug!(root = ?self.root, "tooltip hidden");
        true
    }

    fn request_show(&mut self, cx: &mut WidgetCx<'_>) {
        cx.cancel(Timer::Hide);
        if self.is_visible() || cx.is_scheduled(Timer::Show) {
            return;
        }
        if self.config.show_delay.is_zero() {
            self.show(cx);
        } else {
            cx.schedule(Timer::Show, self.config.show_delay);
        }
    }

    fn request_hide(&mut self, cx: &mut WidgetCx<'_>) {
        if self.hovered || self.focused {
            return;
        }
        cx.cancel(Timer::Show);
        if !self.is_visible() {
            return;
        }
        if self.config.hide_delay.is_zero() {
            self.hide(cx);
        } else {
            cx.schedule(Timer::Hide, self.config.hide_delay);
        }
    }
}

impl Controller for Tooltip {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self) -> &'static str {
        "tooltip"
    }

    fn observed_attributes(&self) -> &'static [&'static str] {
        OBSERVED
    }

    fn handle_event(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event) {
        let target = NodeId::from_raw(event.target);
        let on_trigger = self.within(cx.doc(), "trigger", target);
        let on_content = self.within(cx.doc(), "content", target);

        match event.event_type {
            event_types::POINTER_ENTER if on_trigger => {
                self.hovered = true;
                self.request_show(cx);
            }
            // Moving onto the content keeps the tooltip open
            event_types::POINTER_ENTER if on_content && self.is_visible() => {
                self.hovered = true;
                cx.cancel(Timer::Hide);
            }
            event_types::POINTER_LEAVE if on_trigger || on_content => {
                self.hovered = false;
                self.request_hide(cx);
            }
            event_types::POINTER_DOWN if on_trigger => {
                self.hovered = false;
                self.focused = false;
                self.hide(cx);
            }
            event_types::FOCUS_IN if on_trigger => {
                self.focused = true;
                self.show(cx);
            }
            event_types::FOCUS_OUT if on_trigger => {
                self.focused = false;
                if !self.hovered {
                    self.hide(cx);
                }
            }
            event_types::KEY_DOWN => {
                if event.key().is_some_and(|k| k.key == Key::Escape) && self.is_visible() {
                    event.prevent_default();
                    self.hovered = false;
                    self.hide(cx);
                }
            }
            _ => {}
        }
    }

    fn on_timer(&mut self, cx: &mut WidgetCx<'_>, timer: Timer) {
        match timer {
            Timer::Show => {
                self.show(cx);
            }
            Timer::Hide => {
                self.hide(cx);
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
        // Re-attach so a new placement takes effect
        if name == "placement" && self.is_visible() {
            self.fsm.send(HIDE);
            self.show(cx);
        }
        Ok(())
    }

    fn sync(&mut self, cx: &mut WidgetCx<'_>) {
        let visible = self.is_visible();
        let (trigger, content) = (self.trigger(cx.doc()), self.content(cx.doc()));
        cx.toggle_attr(self.root, "open", visible);
        let Some(content) = content else {
            return;
        };
        cx.set_attr(content, aria::ROLE, "tooltip");
        cx.toggle_attr(content, "hidden", !visible);
        let id = cx.ensure_id(content, "tooltip");
        if let Some(trigger) = trigger {
            cx.set_attr(trigger, "aria-describedby", id);
        }
    }
}

impl Expandable for Tooltip {
    fn is_expanded(&self) -> bool {
        self.is_visible()
    }

    fn expand(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        self.show(cx)
    }

    fn collapse(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        self.hovered = false;
        self.focused = false;
        self.hide(cx)
    }
}

impl FloatingPositioned for Tooltip {
    fn floating_pairs(&self, doc: &Document) -> Vec<(NodeId, NodeId)> {
        match (self.is_visible(), self.trigger(doc), self.content(doc)) {
            (true, Some(trigger), Some(content)) => vec![(trigger, content)],
            _ => Vec::new(),
        }
    }
}
