//! Slider Widget
//!
//! One root with one or more thumbs, each holding its own value. Values move
//! by keyboard (step, page step, Home/End) or by dragging a thumb along the
//! root's axis. With swap prevention a thumb may not come within
//! `min_distance` of its neighbors; such changes are dropped silently.

use aria_core::{event_types, Event, EventId, Key, StateMachine};
use aria_dom::{Document, NodeId, PartQuery, Parts, Rect};
use serde::{Deserialize, Serialize};

use crate::aria;
use crate::config::{parse_enum, parse_flag, parse_number, Orientation};
use crate::context::WidgetCx;
use crate::error::{Result, WidgetError};
use crate::nav;
use crate::notification::NotificationKind;
use crate::widget::{Controller, Focusable, ValueHolder};

pub const TAG: &str = "ui-slider";
pub const THUMB_TAG: &str = "ui-slider-thumb";

/// Drag FSM states
pub mod states {
    pub const IDLE: u32 = 0;
    pub const DRAGGING: u32 = 1;
}

const DRAG_START: EventId = event_types::USER + 1;
const DRAG_END: EventId = event_types::USER + 2;

/// Page Up / Page Down move this many steps
const PAGE_STEPS: f64 = 10.0;

const OBSERVED: &[&str] = &[
    "min",
    "max",
    "step",
    "orientation",
    "disable-swap",
    "min-distance",
    "default-value",
    "disabled",
];

/// Slider configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliderConfig {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub orientation: Orientation,
    /// Keep thumbs ordered and at least `min_distance` apart
    pub disable_swap: bool,
    pub min_distance: f64,
    /// Initial value for thumbs without a `value` attribute
    pub default_value: Option<f64>,
    pub disabled: bool,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
            step: 1.0,
            orientation: Orientation::Horizontal,
            disable_swap: false,
            min_distance: 0.0,
            default_value: None,
            disabled: false,
        }
    }
}

impl SliderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn disable_swap(mut self, min_distance: f64) -> Self {
        self.disable_swap = true;
        self.min_distance = min_distance;
        self
    }

    pub fn default_value(mut self, value: f64) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub(crate) fn apply_attribute(&mut self, name: &str, value: Option<&str>) -> Result<bool> {
        let number = |default: f64| -> Result<f64> {
            value.map(|v| parse_number(name, v)).transpose().map(|v| v.unwrap_or(default))
        };
        match name {
            "min" => self.min = number(0.0)?,
            "max" => self.max = number(100.0)?,
            "step" => {
                let step = number(1.0)?;
                if step <= 0.0 {
                    return Err(WidgetError::InvalidAttribute {
                        name: name.to_string(),
                        value: value.unwrap_or_default().to_string(),
                    });
                }
                self.step = step;
            }
            "min-distance" => self.min_distance = number(0.0)?.max(0.0),
            "default-value" => {
                self.default_value = value.map(|v| parse_number(name, v)).transpose()?;
            }
            "orientation" => {
                self.orientation = value
                    .map(|v| parse_enum(name, v))
                    .transpose()?
                    .unwrap_or_default();
            }
            "disable-swap" => self.disable_swap = parse_flag(value),
            "disabled" => self.disabled = parse_flag(value),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Clamp into `[min, max]` without panicking on an inverted range
    fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max.max(self.min))
    }

    fn snap(&self, value: f64) -> f64 {
        if self.step <= 0.0 {
            return self.clamp(value);
        }
        self.clamp(self.min + ((value - self.min) / self.step).round() * self.step)
    }

    /// Push clamped values apart so neighbors stay `min_distance` apart
    /// inside `[min, max]`. Returns false when the range cannot hold them.
    fn separate(&self, values: &mut [f64]) -> bool {
        if !self.disable_swap {
            return true;
        }
        let distance = self.min_distance;
        for i in 1..values.len() {
            values[i] = values[i].max(values[i - 1] + distance);
        }
        if let Some(last) = values.last_mut() {
            *last = last.min(self.max);
        }
        for i in (0..values.len().saturating_sub(1)).rev() {
            values[i] = values[i].min(values[i + 1] - distance);
        }
        self.is_separated(values)
    }

    fn is_separated(&self, values: &[f64]) -> bool {
        if !self.disable_swap {
            return true;
        }
        values.iter().all(|&v| v >= self.min && v <= self.max)
            && values.windows(2).all(|w| w[1] - w[0] >= self.min_distance)
    }
}

#[derive(Clone, Debug)]
struct Thumb {
    node: NodeId,
    value: f64,
    /// Set while a drag on this thumb is in progress
    movable: bool,
}

pub struct Slider {
    root: NodeId,
    config: SliderConfig,
    parts: Parts,
    thumbs: Vec<Thumb>,
    drag: StateMachine,
    focused: Option<NodeId>,
}

impl Slider {
    pub fn new(root: NodeId, config: SliderConfig) -> Result<Self> {
        let parts = Parts::new().declare("thumbs", PartQuery::all(THUMB_TAG)?);
        let drag = StateMachine::builder(states::IDLE)
            .on(states::IDLE, DRAG_START, states::DRAGGING)
            .on(states::DRAGGING, DRAG_END, states::IDLE)
            .build();
        Ok(Self {
            root,
            config,
            parts,
            thumbs: Vec::new(),
            drag,
            focused: None,
        })
    }

    pub fn config(&self) -> &SliderConfig {
        &self.config
    }

    pub fn thumbs(&self) -> Vec<NodeId> {
        self.thumbs.iter().map(|t| t.node).collect()
    }

    pub fn value_of(&self, thumb: NodeId) -> Option<f64> {
        self.thumbs.iter().find(|t| t.node == thumb).map(|t| t.value)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.current_state() == states::DRAGGING
    }

    /// Request a new value for the thumb at `index`. Returns false when the
    /// value is unchanged or the change was rejected by swap prevention.
    pub fn set_thumb_value(&mut self, cx: &mut WidgetCx<'_>, index: usize, value: f64) -> bool {
        self.refresh(cx.doc());
        let Some(current) = self.thumbs.get(index).map(|t| t.value) else {
            tracing::warn!(root = ?self.root, index, "set_thumb_value: no such thumb");
            return false;
        };
        let value = self.config.clamp(value);
        if value == current {
            return false;
        }
        if let Some((lo, hi)) = self.allowed_range(index).filter(|_| self.config.disable_swap) {
            if value < lo || value > hi {
                tracing::trace!(index, value, lo, hi, "slider change rejected by swap prevention");
                return false;
            }
        }
        let thumb = &mut self.thumbs[index];
        thumb.value = value;
        let node = thumb.node;
        tracing::debug!(?node, value, "slider value changed");
        cx.notify_part(node, NotificationKind::Changed);
        true
    }

    /// Range the thumb at `index` may move in without crossing a neighbor
    fn allowed_range(&self, index: usize) -> Option<(f64, f64)> {
        if index >= self.thumbs.len() {
            return None;
        }
        let distance = self.config.min_distance;
        let lo = index
            .checked_sub(1)
            .and_then(|i| self.thumbs.get(i))
            .map_or(self.config.min, |t| t.value + distance);
        let hi = self
            .thumbs
            .get(index + 1)
            .map_or(self.config.max, |t| t.value - distance);
        Some((lo, hi))
    }

    /// Pick up added and removed thumbs, keeping state by node
    fn refresh(&mut self, doc: &Document) {
        let nodes = self.parts.bind(doc, self.root).all("thumbs");
        if nodes.len() == self.thumbs.len() && nodes.iter().zip(&self.thumbs).all(|(n, t)| *n == t.node) {
            return;
        }
        let count = nodes.len();
        let mut previous = std::mem::take(&mut self.thumbs);
        for (index, node) in nodes.into_iter().enumerate() {
            let thumb = match previous.iter().position(|t| t.node == node) {
                Some(at) => previous.swap_remove(at),
                None => Thumb {
                    node,
                    value: self.initial_value(doc, node, index, count),
                    movable: false,
                },
            };
            self.thumbs.push(thumb);
        }
        let mut values = self.values();
        if self.config.separate(&mut values) {
            for (thumb, value) in self.thumbs.iter_mut().zip(values) {
                thumb.value = value;
            }
        } else {
            tracing::warn!(root = ?self.root, "slider range cannot keep thumbs apart");
        }
        if previous.iter().any(|t| t.movable) {
            self.end_drag_state();
        }
    }

    fn values(&self) -> Vec<f64> {
        self.thumbs.iter().map(|t| t.value).collect()
    }

    /// Store `values` and notify the thumbs whose value moved
    fn apply_values(&mut self, cx: &mut WidgetCx<'_>, values: Vec<f64>) -> bool {
        let mut changed = false;
        for (thumb, value) in self.thumbs.iter_mut().zip(values) {
            if thumb.value != value {
                thumb.value = value;
                tracing::debug!(node = ?thumb.node, value, "slider value changed");
                cx.notify_part(thumb.node, NotificationKind::Changed);
                changed = true;
            }
        }
        changed
    }

    fn initial_value(&self, doc: &Document, node: NodeId, index: usize, count: usize) -> f64 {
        let from_attribute = doc
            .attribute(node, "value")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite());
        let fallback = if count > 1 && index + 1 == count {
            self.config.max
        } else {
            self.config.min
        };
        self.config
            .clamp(from_attribute.or(self.config.default_value).unwrap_or(fallback))
    }

    fn index_of(&self, doc: &Document, target: NodeId) -> Option<usize> {
        let nodes = self.thumbs();
        let thumb = nav::part_containing(doc, &nodes, target)?;
        nav::position_of(&nodes, Some(thumb))
    }

    /// Value under a pointer position along the slider axis
    fn fraction_at(&self, bounds: Rect, x: f32, y: f32) -> f64 {
        let fraction = match self.config.orientation {
            Orientation::Horizontal => bounds.horizontal_fraction(x),
            Orientation::Vertical => bounds.vertical_fraction(y),
        };
        f64::from(fraction)
    }

    fn end_drag_state(&mut self) {
        for thumb in &mut self.thumbs {
            thumb.movable = false;
        }
        self.drag.send(DRAG_END);
    }

    // =========================================================================
    // Event handlers
    // =========================================================================

    fn handle_key(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event, index: usize) {
        let Some(key) = event.key() else {
            return;
        };
        let current = self.thumbs[index].value;
        let step = self.config.step;
        let next = match key.key {
            Key::ArrowRight | Key::ArrowUp => current + step,
            Key::ArrowLeft | Key::ArrowDown => current - step,
            Key::PageUp => current + step * PAGE_STEPS,
            Key::PageDown => current - step * PAGE_STEPS,
            Key::Home => self.config.min,
            Key::End => self.config.max,
            _ => return,
        };
        event.prevent_default();
        self.set_thumb_value(cx, index, next);
    }

    fn start_drag(&mut self, cx: &mut WidgetCx<'_>, index: usize) {
        if self.thumbs[index].movable {
            tracing::trace!(index, "thumb already dragging");
            return;
        }
        self.thumbs[index].movable = true;
        self.drag.send(DRAG_START);
        cx.capture_pointer();
        let node = self.thumbs[index].node;
        cx.focus(node);
        tracing::debug!(thumb = ?node, "slider drag started");
    }

    fn drag_to(&mut self, cx: &mut WidgetCx<'_>, x: f32, y: f32) {
        let Some(index) = self.thumbs.iter().position(|t| t.movable) else {
            tracing::trace!(root = ?self.root, "pointer move ignored, no movable thumb");
            return;
        };
        let Some(bounds) = cx.doc().bounds(self.root) else {
            tracing::trace!(root = ?self.root, "slider has no layout bounds");
            return;
        };
        let fraction = self.fraction_at(bounds, x, y);
        let value = self
            .config
            .snap(self.config.min + fraction * (self.config.max - self.config.min));
        self.set_thumb_value(cx, index, value);
    }

    fn end_drag(&mut self, cx: &mut WidgetCx<'_>) {
        if self.is_dragging() {
            tracing::debug!(root = ?self.root, "slider drag ended");
        }
        self.end_drag_state();
        cx.release_pointer();
    }

    /// A click on the track of a single-thumb slider jumps to the whole
    /// percentage under the pointer
    fn click_track(&mut self, cx: &mut WidgetCx<'_>, x: f32, y: f32) {
        if self.thumbs.len() != 1 {
            return;
        }
        let Some(bounds) = cx.doc().bounds(self.root) else {
            return;
        };
        let percent = (self.fraction_at(bounds, x, y) * 100.0).round() / 100.0;
        let value = self.config.min + (self.config.max - self.config.min) * percent;
        self.set_thumb_value(cx, 0, value);
    }
}

impl Controller for Slider {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self) -> &'static str {
        "slider"
    }

    fn observed_attributes(&self) -> &'static [&'static str] {
        OBSERVED
    }

    fn unmount(&mut self, cx: &mut WidgetCx<'_>) {
        self.end_drag(cx);
    }

    fn handle_event(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event) {
        self.refresh(cx.doc());
        let target = NodeId::from_raw(event.target);
        if self.config.disabled {
            if matches!(event.event_type, event_types::KEY_DOWN | event_types::POINTER_DOWN) {
                tracing::warn!(root = ?self.root, "slider is disabled");
            }
            return;
        }
        let index = self.index_of(cx.doc(), target);
        match (event.event_type, index) {
            (event_types::KEY_DOWN, Some(index)) => self.handle_key(cx, event, index),
            (event_types::POINTER_DOWN, Some(index)) => self.start_drag(cx, index),
            (event_types::POINTER_MOVE, _) => {
                if let Some((x, y)) = event.position() {
                    self.drag_to(cx, x, y);
                }
            }
            (event_types::POINTER_UP, _) => self.end_drag(cx),
            (event_types::CLICK, None) if target == self.root => {
                if let Some((x, y)) = event.position() {
                    self.click_track(cx, x, y);
                }
            }
            (event_types::FOCUS_IN, Some(index)) => self.focused = Some(self.thumbs[index].node),
            (event_types::FOCUS_OUT, _) => self.focused = None,
            _ => {}
        }
    }

    fn attribute_changed(
        &mut self,
        cx: &mut WidgetCx<'_>,
        name: &str,
        value: Option<&str>,
    ) -> Result<()> {
        let previous = self.config.clone();
        self.config.apply_attribute(name, value)?;
        self.refresh(cx.doc());
        let mut values: Vec<f64> = self.thumbs.iter().map(|t| self.config.clamp(t.value)).collect();
        if !self.config.separate(&mut values) {
            tracing::warn!(root = ?self.root, name, "slider range cannot keep thumbs apart");
            self.config = previous;
            return Err(WidgetError::InvalidAttribute {
                name: name.to_string(),
                value: value.unwrap_or_default().to_string(),
            });
        }
        self.apply_values(cx, values);
        if self.config.disabled && self.is_dragging() {
            self.end_drag(cx);
        }
        Ok(())
    }

    fn sync(&mut self, cx: &mut WidgetCx<'_>) {
        self.refresh(cx.doc());
        if self.focused.is_some_and(|f| !cx.doc().is_rendered(f)) {
            self.focused = None;
        }
        let root = self.root;
        aria::set_bool(cx, root, aria::DISABLED, self.config.disabled);
        cx.set_attr(root, "orientation", self.config.orientation.as_str());
        cx.toggle_attr(root, "dragging", self.is_dragging());

        for index in 0..self.thumbs.len() {
            let (lo, hi) = match self.allowed_range(index) {
                Some(range) if self.config.disable_swap => range,
                _ => (self.config.min, self.config.max),
            };
            let thumb = &self.thumbs[index];
            let (node, value, movable) = (thumb.node, thumb.value, thumb.movable);
            cx.set_attr(node, aria::ROLE, "slider");
            cx.set_attr(node, aria::TABINDEX, if self.config.disabled { "-1" } else { "0" });
            cx.set_attr(node, "aria-valuemin", aria::format_number(lo));
            cx.set_attr(node, "aria-valuemax", aria::format_number(hi));
            cx.set_attr(node, "aria-valuenow", aria::format_number(value));
            cx.set_attr(node, aria::ORIENTATION, self.config.orientation.as_str());
            cx.set_attr(node, "value", aria::format_number(value));
            cx.toggle_attr(node, "movable", movable);
        }
    }
}

impl Focusable for Slider {
    fn focused_part(&self, doc: &Document) -> Option<NodeId> {
        self.focused.filter(|&f| doc.is_rendered(f))
    }
}

impl ValueHolder for Slider {
    type Value = Vec<f64>;

    fn value(&self) -> Vec<f64> {
        self.values()
    }

    /// Replace all thumb values at once. Missing entries keep the current
    /// value; with swap prevention the whole vector is dropped unless it is
    /// ordered and spaced.
    fn set_value(&mut self, cx: &mut WidgetCx<'_>, value: Vec<f64>) -> bool {
        self.refresh(cx.doc());
        let mut next = self.values();
        for (slot, v) in next.iter_mut().zip(value) {
            *slot = self.config.clamp(v);
        }
        if !self.config.is_separated(&next) {
            tracing::trace!(?next, "slider values rejected by swap prevention");
            return false;
        }
        self.apply_values(cx, next)
    }
}
