//! Floating position adapter
//!
//! Overlays (combo box lists, submenus, tooltips) are positioned by an
//! external geometry collaborator behind the [`FloatingPositioner`] trait.
//! The [`FloatingManager`] owns the reference/floating pairs, applies the
//! computed coordinates to the floating element's `style` attribute and
//! tracks auto-update subscriptions so they can be torn down on collapse or
//! unmount.
//!
//! Adapter failures never propagate: the position is simply not updated for
//! that cycle, and a subscription whose update failed is not re-armed.
//!
//! [`AnchoredPositioner`] is a small built-in implementation working from
//! the layout bounds the host reports on each element.

use std::fmt;
use std::str::FromStr;

use aria_dom::{Document, NodeId, Rect};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::aria::format_number;
use crate::error::FloatingError;
use crate::widget::WidgetId;

new_key_type! {
    /// Handle for an active reference/floating pair
    pub struct SubscriptionId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    fn is_vertical(self) -> bool {
        matches!(self, Side::Top | Side::Bottom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    Start,
    End,
}

/// Where the floating element sits relative to its reference
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    Top,
    TopStart,
    TopEnd,
    Right,
    RightStart,
    RightEnd,
    #[default]
    Bottom,
    BottomStart,
    BottomEnd,
    Left,
    LeftStart,
    LeftEnd,
}

impl Placement {
    pub fn new(side: Side, alignment: Option<Alignment>) -> Self {
        use Alignment::*;
        match (side, alignment) {
            (Side::Top, None) => Placement::Top,
            (Side::Top, Some(Start)) => Placement::TopStart,
            (Side::Top, Some(End)) => Placement::TopEnd,
            (Side::Right, None) => Placement::Right,
            (Side::Right, Some(Start)) => Placement::RightStart,
            (Side::Right, Some(End)) => Placement::RightEnd,
            (Side::Bottom, None) => Placement::Bottom,
            (Side::Bottom, Some(Start)) => Placement::BottomStart,
            (Side::Bottom, Some(End)) => Placement::BottomEnd,
            (Side::Left, None) => Placement::Left,
            (Side::Left, Some(Start)) => Placement::LeftStart,
            (Side::Left, Some(End)) => Placement::LeftEnd,
        }
    }

    pub fn side(self) -> Side {
        match self {
            Placement::Top | Placement::TopStart | Placement::TopEnd => Side::Top,
            Placement::Right | Placement::RightStart | Placement::RightEnd => Side::Right,
            Placement::Bottom | Placement::BottomStart | Placement::BottomEnd => Side::Bottom,
            Placement::Left | Placement::LeftStart | Placement::LeftEnd => Side::Left,
        }
    }

    pub fn alignment(self) -> Option<Alignment> {
        match self {
            Placement::TopStart
            | Placement::RightStart
            | Placement::BottomStart
            | Placement::LeftStart => Some(Alignment::Start),
            Placement::TopEnd | Placement::RightEnd | Placement::BottomEnd | Placement::LeftEnd => {
                Some(Alignment::End)
            }
            _ => None,
        }
    }

    /// Same alignment on the opposite side
    pub fn flipped(self) -> Self {
        Self::new(self.side().opposite(), self.alignment())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Placement::Top => "top",
            Placement::TopStart => "top-start",
            Placement::TopEnd => "top-end",
            Placement::Right => "right",
            Placement::RightStart => "right-start",
            Placement::RightEnd => "right-end",
            Placement::Bottom => "bottom",
            Placement::BottomStart => "bottom-start",
            Placement::BottomEnd => "bottom-end",
            Placement::Left => "left",
            Placement::LeftStart => "left-start",
            Placement::LeftEnd => "left-end",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Placement {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        const ALL: [Placement; 12] = [
            Placement::Top,
            Placement::TopStart,
            Placement::TopEnd,
            Placement::Right,
            Placement::RightStart,
            Placement::RightEnd,
            Placement::Bottom,
            Placement::BottomStart,
            Placement::BottomEnd,
            Placement::Left,
            Placement::LeftStart,
            Placement::LeftEnd,
        ];
        let s = s.trim().to_ascii_lowercase();
        ALL.into_iter().find(|p| p.as_str() == s).ok_or(())
    }
}

/// CSS positioning strategy of the floating element
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Absolute,
    Fixed,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Absolute => "absolute",
            Strategy::Fixed => "fixed",
        }
    }
}

/// Position modifiers, applied in order
#[derive(Clone, Debug, PartialEq)]
pub enum Middleware {
    /// Gap between reference and floating element along the main axis
    Offset(f32),
    /// Move to the opposite side when the preferred side overflows
    Flip,
    /// Keep the floating element inside the viewport on the cross axis
    Shift { padding: f32 },
    /// Center an arrow element on the reference
    Arrow { element: NodeId, padding: f32 },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PositionOptions {
    pub placement: Placement,
    pub middleware: Vec<Middleware>,
    pub strategy: Strategy,
}

impl PositionOptions {
    pub fn new(placement: Placement) -> Self {
        Self {
            placement,
            ..Self::default()
        }
    }

    pub fn with(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn arrow(&self) -> Option<NodeId> {
        self.middleware.iter().find_map(|m| match m {
            Middleware::Arrow { element, .. } => Some(*element),
            _ => None,
        })
    }
}

/// Arrow offset within the floating element
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ArrowData {
    pub x: Option<f32>,
    pub y: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MiddlewareData {
    pub arrow: Option<ArrowData>,
    /// Cross-axis correction applied by [`Middleware::Shift`]
    pub shift: Option<(f32, f32)>,
    /// Whether [`Middleware::Flip`] changed the side
    pub flipped: bool,
}

/// Result of a position computation
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedPosition {
    pub x: f32,
    pub y: f32,
    pub placement: Placement,
    pub strategy: Strategy,
    pub middleware_data: MiddlewareData,
}

/// The external geometry collaborator
pub trait FloatingPositioner {
    /// Compute coordinates for `floating` relative to `reference`
    fn compute_position(
        &mut self,
        doc: &Document,
        reference: NodeId,
        floating: NodeId,
        options: &PositionOptions,
    ) -> Result<ComputedPosition, FloatingError>;

    /// Start observing scroll/resize for the pair. The host reports those
    /// through [`WidgetContext::reposition`](crate::WidgetContext::reposition).
    fn auto_update(&mut self, _reference: NodeId, _floating: NodeId) -> Result<(), FloatingError> {
        Ok(())
    }

    /// Stop observing the pair
    fn dispose(&mut self, _reference: NodeId, _floating: NodeId) {}
}

/// Positions floating elements from host-reported layout bounds
#[derive(Clone, Debug, Default)]
pub struct AnchoredPositioner {
    /// Visible area used by flip and shift; without one they do nothing
    pub viewport: Option<Rect>,
}

impl AnchoredPositioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewport(viewport: Rect) -> Self {
        Self {
            viewport: Some(viewport),
        }
    }

    fn base(reference: Rect, floating: Rect, placement: Placement, offset: f32) -> (f32, f32) {
        let side = placement.side();
        let (mut x, mut y) = match side {
            Side::Top => (0.0, reference.top() - floating.height - offset),
            Side::Bottom => (0.0, reference.bottom() + offset),
            Side::Left => (reference.left() - floating.width - offset, 0.0),
            Side::Right => (reference.right() + offset, 0.0),
        };
        if side.is_vertical() {
            x = match placement.alignment() {
                Some(Alignment::Start) => reference.left(),
                Some(Alignment::End) => reference.right() - floating.width,
                None => reference.left() + (reference.width - floating.width) / 2.0,
            };
        } else {
            y = match placement.alignment() {
                Some(Alignment::Start) => reference.top(),
                Some(Alignment::End) => reference.bottom() - floating.height,
                None => reference.top() + (reference.height - floating.height) / 2.0,
            };
        }
        (x, y)
    }

    fn overflows(viewport: Rect, side: Side, x: f32, y: f32, floating: Rect) -> bool {
        match side {
            Side::Top => y < viewport.top(),
            Side::Bottom => y + floating.height > viewport.bottom(),
            Side::Left => x < viewport.left(),
            Side::Right => x + floating.width > viewport.right(),
        }
    }
}

impl FloatingPositioner for AnchoredPositioner {
    fn compute_position(
        &mut self,
        doc: &Document,
        reference: NodeId,
        floating: NodeId,
        options: &PositionOptions,
    ) -> Result<ComputedPosition, FloatingError> {
        let reference_rect = doc
            .bounds(reference)
            .ok_or(FloatingError::MissingBounds(reference))?;
        let floating_rect = doc.bounds(floating).unwrap_or_default();

        let offset = options
            .middleware
            .iter()
            .map(|m| match m {
                Middleware::Offset(d) => *d,
                _ => 0.0,
            })
            .sum();

        let mut placement = options.placement;
        let (mut x, mut y) = Self::base(reference_rect, floating_rect, placement, offset);
        let mut data = MiddlewareData::default();

        for middleware in &options.middleware {
            match middleware {
                Middleware::Offset(_) => {}
                Middleware::Flip => {
                    let Some(viewport) = self.viewport else {
                        continue;
                    };
                    if Self::overflows(viewport, placement.side(), x, y, floating_rect) {
                        let flipped = placement.flipped();
                        let (fx, fy) = Self::base(reference_rect, floating_rect, flipped, offset);
                        if !Self::overflows(viewport, flipped.side(), fx, fy, floating_rect) {
                            placement = flipped;
                            (x, y) = (fx, fy);
                            data.flipped = true;
                        }
                    }
                }
                Middleware::Shift { padding } => {
                    let Some(viewport) = self.viewport else {
                        continue;
                    };
                    let (before_x, before_y) = (x, y);
                    if placement.side().is_vertical() {
                        let max = (viewport.right() - floating_rect.width - padding)
                            .max(viewport.left() + padding);
                        x = x.clamp(viewport.left() + padding, max);
                    } else {
                        let max = (viewport.bottom() - floating_rect.height - padding)
                            .max(viewport.top() + padding);
                        y = y.clamp(viewport.top() + padding, max);
                    }
                    data.shift = Some((x - before_x, y - before_y));
                }
                Middleware::Arrow { element, padding } => {
                    let arrow = doc.bounds(*element).unwrap_or_default();
                    let (cx, cy) = reference_rect.center();
                    let arrow_data = if placement.side().is_vertical() {
                        let max = (floating_rect.width - arrow.width - padding).max(*padding);
                        ArrowData {
                            x: Some((cx - x - arrow.width / 2.0).clamp(*padding, max)),
                            y: None,
                        }
                    } else {
                        let max = (floating_rect.height - arrow.height - padding).max(*padding);
                        ArrowData {
                            x: None,
                            y: Some((cy - y - arrow.height / 2.0).clamp(*padding, max)),
                        }
                    };
                    data.arrow = Some(arrow_data);
                }
            }
        }

        Ok(ComputedPosition {
            x,
            y,
            placement,
            strategy: options.strategy,
            middleware_data: data,
        })
    }
}

struct Subscription {
    owner: WidgetId,
    reference: NodeId,
    floating: NodeId,
    options: PositionOptions,
    armed: bool,
}

/// Tracks reference/floating pairs and applies computed positions
pub struct FloatingManager {
    positioner: Box<dyn FloatingPositioner>,
    subscriptions: SlotMap<SubscriptionId, Subscription>,
}

impl fmt::Debug for FloatingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FloatingManager")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl Default for FloatingManager {
    fn default() -> Self {
        Self::new(Box::new(AnchoredPositioner::new()))
    }
}

impl FloatingManager {
    pub fn new(positioner: Box<dyn FloatingPositioner>) -> Self {
        Self {
            positioner,
            subscriptions: SlotMap::with_key(),
        }
    }

    pub fn set_positioner(&mut self, positioner: Box<dyn FloatingPositioner>) {
        self.positioner = positioner;
    }

    /// Position `floating` against `reference` and keep it updated.
    ///
    /// An existing pair for the same floating element is replaced.
    pub fn attach(
        &mut self,
        doc: &mut Document,
        owner: WidgetId,
        reference: NodeId,
        floating: NodeId,
        options: PositionOptions,
    ) -> SubscriptionId {
        self.detach(floating);
        let mut subscription = Subscription {
            owner,
            reference,
            floating,
            options,
            armed: false,
        };
        if position(self.positioner.as_mut(), doc, &subscription) {
            match self.positioner.auto_update(reference, floating) {
                Ok(()) => subscription.armed = true,
                Err(error) => {
                    tracing::warn!(%error, ?floating, "floating auto-update failed to start")
                }
            }
        }
        self.subscriptions.insert(subscription)
    }

    /// Stop tracking `floating`
    pub fn detach(&mut self, floating: NodeId) {
        let ids: Vec<SubscriptionId> = self
            .subscriptions
            .iter()
            .filter(|(_, s)| s.floating == floating)
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            self.remove(id);
        }
    }

    /// Stop tracking every pair owned by `owner`
    pub fn detach_owner(&mut self, owner: WidgetId) {
        let ids: Vec<SubscriptionId> = self
            .subscriptions
            .iter()
            .filter(|(_, s)| s.owner == owner)
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            self.remove(id);
        }
    }

    fn remove(&mut self, id: SubscriptionId) {
        if let Some(subscription) = self.subscriptions.remove(id) {
            if subscription.armed {
                self.positioner
                    .dispose(subscription.reference, subscription.floating);
            }
        }
    }

    /// Recompute every armed pair. A pair whose computation fails is
    /// disarmed and stays where it was.
    pub fn update(&mut self, doc: &mut Document) {
        for subscription in self.subscriptions.values_mut() {
            if !subscription.armed {
                continue;
            }
            let ok = doc.is_connected(subscription.reference)
                && doc.is_connected(subscription.floating)
                && position(self.positioner.as_mut(), doc, subscription);
            if !ok {
                self.positioner
                    .dispose(subscription.reference, subscription.floating);
                subscription.armed = false;
            }
        }
    }

    /// Number of armed pairs
    pub fn active(&self) -> usize {
        self.subscriptions.values().filter(|s| s.armed).count()
    }

    pub fn is_tracking(&self, floating: NodeId) -> bool {
        self.subscriptions.values().any(|s| s.floating == floating)
    }
}

fn position(
    positioner: &mut dyn FloatingPositioner,
    doc: &mut Document,
    subscription: &Subscription,
) -> bool {
    let result = positioner.compute_position(
        doc,
        subscription.reference,
        subscription.floating,
        &subscription.options,
    );
    match result {
        Ok(computed) => {
            apply_position(doc, subscription.floating, subscription.options.arrow(), &computed);
            true
        }
        Err(error) => {
            tracing::warn!(%error, floating = ?subscription.floating, "floating position failed");
            false
        }
    }
}

fn apply_position(
    doc: &mut Document,
    floating: NodeId,
    arrow: Option<NodeId>,
    position: &ComputedPosition,
) {
    let style = format!(
        "position: {}; left: {}px; top: {}px;",
        position.strategy.as_str(),
        format_number(f64::from(position.x)),
        format_number(f64::from(position.y)),
    );
    doc.set_attribute(floating, "style", style);
    doc.set_attribute(floating, "data-placement", position.placement.as_str());

    if let (Some(arrow), Some(data)) = (arrow, position.middleware_data.arrow) {
        let mut style = String::new();
        if let Some(x) = data.x {
            style.push_str(&format!("left: {}px;", format_number(f64::from(x))));
        }
        if let Some(y) = data.y {
            style.push_str(&format!("top: {}px;", format_number(f64::from(y))));
        }
        doc.set_attribute(arrow, "style", style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aria_dom::el;

    fn pair(doc: &mut Document) -> (NodeId, NodeId) {
        let root = doc.root();
        let reference = doc
            .insert(root, el("button").bounds(Rect::new(100.0, 100.0, 80.0, 20.0)))
            .unwrap();
        let floating = doc
            .insert(root, el("div").bounds(Rect::new(0.0, 0.0, 120.0, 60.0)))
            .unwrap();
        (reference, floating)
    }

    fn compute(
        positioner: &mut AnchoredPositioner,
        doc: &Document,
        reference: NodeId,
        floating: NodeId,
        options: PositionOptions,
    ) -> ComputedPosition {
        positioner
            .compute_position(doc, reference, floating, &options)
            .unwrap()
    }

    #[test]
    fn test_basic_placements() {
        let mut doc = Document::new();
        let (reference, floating) = pair(&mut doc);
        let mut positioner = AnchoredPositioner::new();

        let options = PositionOptions::new(Placement::BottomStart);
        let p = compute(&mut positioner, &doc, reference, floating, options);
        assert_eq!((p.x, p.y), (100.0, 120.0));

        let options = PositionOptions::new(Placement::Top);
        let p = compute(&mut positioner, &doc, reference, floating, options);
        assert_eq!((p.x, p.y), (80.0, 40.0));

        let p = compute(
            &mut positioner,
            &doc,
            reference,
            floating,
            PositionOptions::new(Placement::RightStart).with(Middleware::Offset(4.0)),
        );
        assert_eq!((p.x, p.y), (184.0, 100.0));
    }

    #[test]
    fn test_flip_and_shift() {
        let mut doc = Document::new();
        let (reference, floating) = pair(&mut doc);
        let mut positioner = AnchoredPositioner::with_viewport(Rect::new(0.0, 0.0, 150.0, 150.0));

        let p = compute(
            &mut positioner,
            &doc,
            reference,
            floating,
            PositionOptions::new(Placement::BottomStart)
                .with(Middleware::Flip)
                .with(Middleware::Shift { padding: 5.0 }),
        );
        assert_eq!(p.placement, Placement::TopStart);
        assert!(p.middleware_data.flipped);
        assert_eq!(p.y, 40.0);
        assert_eq!(p.x, 25.0);
        assert_eq!(p.middleware_data.shift, Some((-75.0, 0.0)));
    }

    #[test]
    fn test_missing_bounds_is_an_error() {
        let mut doc = Document::new();
        let root = doc.root();
        let reference = doc.insert(root, el("button")).unwrap();
        let floating = doc.insert(root, el("div")).unwrap();
        let result = AnchoredPositioner::new().compute_position(
            &doc,
            reference,
            floating,
            &PositionOptions::default(),
        );
        assert_eq!(result, Err(FloatingError::MissingBounds(reference)));
    }

    struct Failing;

    impl FloatingPositioner for Failing {
        fn compute_position(
            &mut self,
            _doc: &Document,
            _reference: NodeId,
            _floating: NodeId,
            _options: &PositionOptions,
        ) -> Result<ComputedPosition, FloatingError> {
            Err(FloatingError::Adapter("boom".into()))
        }
    }

    #[test]
    fn test_manager_applies_and_disposes() {
        let mut doc = Document::new();
        let (reference, floating) = pair(&mut doc);
        let mut owners: SlotMap<WidgetId, ()> = SlotMap::with_key();
        let owner = owners.insert(());

        let mut manager = FloatingManager::default();
        manager.attach(
            &mut doc,
            owner,
            reference,
            floating,
            PositionOptions::new(Placement::BottomStart),
        );
        assert_eq!(
            doc.attribute(floating, "style"),
            Some("position: absolute; left: 100px; top: 120px;")
        );
        assert_eq!(manager.active(), 1);

        doc.set_bounds(reference, Rect::new(10.0, 10.0, 80.0, 20.0));
        manager.update(&mut doc);
        assert_eq!(
            doc.attribute(floating, "style"),
            Some("position: absolute; left: 10px; top: 30px;")
        );

        manager.detach_owner(owner);
        assert!(!manager.is_tracking(floating));
    }

    #[test]
    fn test_failure_is_swallowed_and_not_armed() {
        let mut doc = Document::new();
        let (reference, floating) = pair(&mut doc);
        let mut owners: SlotMap<WidgetId, ()> = SlotMap::with_key();
        let owner = owners.insert(());

        let mut manager = FloatingManager::new(Box::new(Failing));
        manager.attach(&mut doc, owner, reference, floating, PositionOptions::default());
        assert_eq!(doc.attribute(floating, "style"), None);
        assert_eq!(manager.active(), 0);
        assert!(manager.is_tracking(floating));
    }
}
