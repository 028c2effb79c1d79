//! Carousel Widget
//!
//! Shows one slide at a time with previous/next controls. Optional
//! auto-rotation runs on the context timer and pauses while the pointer or
//! focus is inside the carousel.

use std::time::Duration;

use aria_core::{event_types, Event, Key};
use aria_dom::{Document, NodeId, PartQuery, Parts};
use serde::{Deserialize, Serialize};

use crate::aria;
use crate::config::{duration_ms, parse_duration, parse_flag};
use crate::context::{Timer, WidgetCx};
use crate::error::Result;
use crate::nav;
use crate::notification::NotificationKind;
use crate::widget::{Controller, ValueHolder};

pub const TAG: &str = "ui-carousel";
pub const SLIDES_TAG: &str = "ui-carousel-slides";
pub const SLIDE_TAG: &str = "ui-carousel-slide";
pub const PREV_TAG: &str = "ui-carousel-prev";
pub const NEXT_TAG: &str = "ui-carousel-next";
pub const ROTATION_TAG: &str = "ui-carousel-rotation";

pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_millis(5000);

const OBSERVED: &[&str] = &["auto-rotate", "interval", "wrap"];

/// Carousel configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    pub auto_rotate: bool,
    #[serde(with = "duration_ms")]
    pub interval: Duration,
    /// Previous/next wrap around at the ends
    pub wrap: bool,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            auto_rotate: false,
            interval: DEFAULT_ROTATION_INTERVAL,
            wrap: true,
        }
    }
}

impl CarouselConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_rotate(mut self, enabled: bool) -> Self {
        self.auto_rotate = enabled;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    pub(crate) fn apply_attribute(&mut self, name: &str, value: Option<&str>) -> Result<bool> {
        match name {
            "auto-rotate" => self.auto_rotate = parse_flag(value),
            "wrap" => self.wrap = value.map_or(true, |v| parse_flag(Some(v))),
            "interval" => {
                self.interval = value
                    .map(|v| parse_duration(name, v))
                    .transpose()?
                    .unwrap_or(DEFAULT_ROTATION_INTERVAL);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

pub struct Carousel {
    root: NodeId,
    config: CarouselConfig,
    parts: Parts,
    current: usize,
    rotating: bool,
    hovered: bool,
    focus_within: bool,
}

impl Carousel {
    pub fn new(root: NodeId, config: CarouselConfig) -> Result<Self> {
        let parts = Parts::new()
            .declare("slides", PartQuery::all(SLIDE_TAG)?)
            .declare("container", PartQuery::one(SLIDES_TAG)?)
            .declare("prev", PartQuery::one(PREV_TAG)?)
            .declare("next", PartQuery::one(NEXT_TAG)?)
            .declare("rotation", PartQuery::one(ROTATION_TAG)?);
        Ok(Self {
            root,
            rotating: config.auto_rotate,
            config,
            parts,
            current: 0,
            hovered: false,
            focus_within: false,
        })
    }

    pub fn config(&self) -> &CarouselConfig {
        &self.config
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_rotating(&self) -> bool {
        self.rotating
    }

    /// Rotation is on but held while the user is interacting
    pub fn is_paused(&self) -> bool {
        self.hovered || self.focus_within
    }

    pub fn slides(&self, doc: &Document) -> Vec<NodeId> {
        self.parts.bind(doc, self.root).all("slides")
    }

    /// Show the slide at `index`
    pub fn go_to(&mut self, cx: &mut WidgetCx<'_>, index: usize) -> bool {
        let count = self.slides(cx.doc()).len();
        if index >= count {
            tracing::warn!(root = ?self.root, index, count, "go_to: no such slide");
            return false;
        }
        if index == self.current {
            return false;
        }
        self.current = index;
        tracing::debug!(root = ?self.root, index, "carousel slide changed");
        cx.notify(NotificationKind::SlideChanged { index });
        self.reschedule(cx);
        true
    }

    pub fn next(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        self.step(cx, true, self.config.wrap)
    }

    pub fn prev(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        self.step(cx, false, self.config.wrap)
    }

    pub fn start_rotation(&mut self, cx: &mut WidgetCx<'_>) {
        self.rotating = true;
        self.reschedule(cx);
    }

    pub fn stop_rotation(&mut self, cx: &mut WidgetCx<'_>) {
        self.rotating = false;
        cx.cancel(Timer::Rotate);
    }

    fn step(&mut self, cx: &mut WidgetCx<'_>, forward: bool, wrap: bool) -> bool {
        let count = self.slides(cx.doc()).len();
        let next = if forward {
            nav::next_index(count, Some(self.current), wrap)
        } else {
            nav::prev_index(count, Some(self.current), wrap)
        };
        match next {
            Some(index) => self.go_to(cx, index),
            None => false,
        }
    }

    /// Restart the rotation interval, or hold it while paused
    fn reschedule(&mut self, cx: &mut WidgetCx<'_>) {
        if self.rotating && !self.is_paused() {
            cx.schedule(Timer::Rotate, self.config.interval);
        } else {
            cx.cancel(Timer::Rotate);
        }
    }

    fn handle_click(&mut self, cx: &mut WidgetCx<'_>, target: NodeId) {
        let parts = self.parts.bind(cx.doc(), self.root);
        let hit = |name: &str| {
            parts
                .one(name)
                .is_some_and(|part| cx.doc().composed_contains(part, target))
        };
        let (prev, next, rotation) = (hit("prev"), hit("next"), hit("rotation"));
        if rotation {
            if self.rotating {
                self.stop_rotation(cx);
            } else {
                self.start_rotation(cx);
            }
        } else if prev {
            self.prev(cx);
        } else if next {
            self.next(cx);
        }
    }
}

impl Controller for Carousel {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self) -> &'static str {
        "carousel"
    }

    fn observed_attributes(&self) -> &'static [&'static str] {
        OBSERVED
    }

    fn mount(&mut self, cx: &mut WidgetCx<'_>) {
        self.reschedule(cx);
        self.sync(cx);
    }

    fn handle_event(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event) {
        let target = NodeId::from_raw(event.target);
        match event.event_type {
            event_types::CLICK => self.handle_click(cx, target),
            event_types::KEY_DOWN => {
                let forward = match event.key().map(|k| &k.key) {
                    Some(Key::ArrowRight) => true,
                    Some(Key::ArrowLeft) => false,
                    _ => return,
                };
                event.prevent_default();
                self.step(cx, forward, self.config.wrap);
            }
            event_types::POINTER_ENTER if target == self.root => {
                self.hovered = true;
                self.reschedule(cx);
            }
            event_types::POINTER_LEAVE if target == self.root => {
                self.hovered = false;
                self.reschedule(cx);
            }
            event_types::FOCUS_IN => {
                self.focus_within = true;
                self.reschedule(cx);
            }
            event_types::FOCUS_OUT => {
                let stays = event
                    .related_target()
                    .map(NodeId::from_raw)
                    .is_some_and(|related| cx.doc().composed_contains(self.root, related));
                if !stays {
                    self.focus_within = false;
                    self.reschedule(cx);
                }
            }
            _ => {}
        }
    }

    fn on_timer(&mut self, cx: &mut WidgetCx<'_>, timer: Timer) {
        if timer != Timer::Rotate || !self.rotating || self.is_paused() {
            return;
        }
        // Rotation always wraps; go_to reschedules
        if !self.step(cx, true, true) {
            self.reschedule(cx);
        }
    }

    fn attribute_changed(
        &mut self,
        cx: &mut WidgetCx<'_>,
        name: &str,
        value: Option<&str>,
    ) -> Result<()> {
        self.config.apply_attribute(name, value)?;
        if name == "auto-rotate" {
            self.rotating = self.config.auto_rotate;
        }
        self.reschedule(cx);
        Ok(())
    }

    fn sync(&mut self, cx: &mut WidgetCx<'_>) {
        let slides = self.slides(cx.doc());
        if self.current >= slides.len() {
            self.current = slides.len().saturating_sub(1);
        }
        let parts = self.parts.bind(cx.doc(), self.root);
        let (container, prev, next, rotation) = (
            parts.one("container"),
            parts.one("prev"),
            parts.one("next"),
            parts.one("rotation"),
        );
        let root = self.root;

        if cx.doc().attribute(root, aria::ROLE).is_none() {
            cx.set_attr(root, aria::ROLE, "region");
        }
        cx.set_attr(root, "aria-roledescription", "carousel");
        cx.toggle_attr(root, "rotating", self.rotating);

        let live = if self.rotating && !self.is_paused() { "off" } else { "polite" };
        let controls = container.map(|c| {
            cx.set_attr(c, "aria-live", live);
            cx.set_attr(c, "aria-atomic", "false");
            cx.ensure_id(c, "carousel-slides")
        });

        let count = slides.len();
        for (index, slide) in slides.into_iter().enumerate() {
            let active = index == self.current;
            cx.set_attr(slide, aria::ROLE, "group");
            cx.set_attr(slide, "aria-roledescription", "slide");
            cx.set_attr(slide, "aria-label", format!("{} of {}", index + 1, count));
            aria::set_true_or_remove(cx, slide, "aria-hidden", !active);
            cx.toggle_attr(slide, "active", active);
        }

        let at_start = !self.config.wrap && self.current == 0;
        let at_end = !self.config.wrap && self.current + 1 >= count;
        for (control, disabled) in [(prev, at_start), (next, at_end)] {
            if let Some(control) = control {
                aria::set_optional(cx, control, aria::CONTROLS, controls.as_deref());
                aria::set_true_or_remove(cx, control, aria::DISABLED, disabled);
            }
        }
        if let Some(rotation) = rotation {
            let label = if self.rotating {
                "Stop automatic slide show"
            } else {
                "Start automatic slide show"
            };
            cx.set_attr(rotation, "aria-label", label);
        }
    }
}

impl ValueHolder for Carousel {
    type Value = usize;

    fn value(&self) -> usize {
        self.current
    }

    fn set_value(&mut self, cx: &mut WidgetCx<'_>, value: usize) -> bool {
        self.go_to(cx, value)
    }
}
