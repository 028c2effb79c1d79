//! Aria Widget Library
//!
//! Headless controllers for accessible composite widgets. Each controller is
//! attached to a root element of an [`aria_dom::Document`], keeps the ARIA
//! attributes of its parts in sync and reacts to host input events.
//!
//! # Architecture
//!
//! 1. **Live Parts**: Controllers never cache element handles across calls.
//!    Parts are declared once and re-resolved from the document on read, so
//!    host-side additions and removals are picked up automatically.
//!
//! 2. **State Machines**: Expanded/collapsed, open/closed and idle/dragging
//!    states are small [`aria_core::StateMachine`] transition tables.
//!
//! 3. **Host Clock**: Debounced focus loss, typeahead reset and tooltip
//!    delays are timers on the [`WidgetContext`] clock, advanced by the host.
//!
//! 4. **Notifications and Dirty Tracking**: Semantic changes (expanded,
//!    value changed, activated) are queued as [`Notification`]s and widgets
//!    whose attributes changed are marked dirty.
//!
//! # Example
//!
//! ```rust
//! use aria_core::Key;
//! use aria_dom::el;
//! use aria_widgets::prelude::*;
//!
//! let mut cx = WidgetContext::default();
//! let body = cx.doc().root();
//! let root = cx
//!     .doc_mut()
//!     .insert(
//!         body,
//!         el("ui-listbox").children([
//!             el("ui-listbox-option").text("Apple"),
//!             el("ui-listbox-option").text("Pear"),
//!         ]),
//!     )
//!     .unwrap();
//! let id = cx.mount(root, ListBoxConfig::default()).unwrap();
//!
//! cx.focus(root);
//! cx.press(Key::ArrowDown);
//! assert!(cx.doc().attribute(root, "aria-activedescendant").is_some());
//! assert!(cx.is_dirty(id));
//! ```

pub mod aria;
pub mod carousel;
pub mod combobox;
pub mod config;
pub mod context;
pub mod dialog;
pub mod error;
pub mod floating;
pub mod focus_trap;
pub mod listbox;
pub mod menu;
pub mod nav;
pub mod notification;
pub mod registry;
pub mod slider;
pub mod tooltip;
pub mod widget;

pub use carousel::{Carousel, CarouselConfig};
pub use combobox::{ComboBox, ComboBoxConfig, ComboBoxValue};
pub use config::{Autocomplete, Orientation, ScrollAlign, ScrollBehavior, ScrollOptions};
pub use context::{Timer, WidgetContext, WidgetCx};
pub use dialog::{Dialog, DialogConfig};
pub use error::{FloatingError, FocusTrapError, Result, WidgetError};
pub use floating::{
    AnchoredPositioner, ComputedPosition, FloatingManager, FloatingPositioner, Middleware,
    Placement, PositionOptions, Strategy,
};
pub use focus_trap::{FocusTrap, TabCycleTrap, TrapOptions};
pub use listbox::{ListBox, ListBoxConfig};
pub use menu::{Menu, MenuConfig, MenuNodeKind, MenuTree};
pub use notification::{Notification, NotificationKind};
pub use registry::WidgetRegistry;
pub use slider::{Slider, SliderConfig};
pub use tooltip::{Tooltip, TooltipConfig};
pub use widget::{
    Controller, Expandable, FloatingPositioned, Focusable, ValueHolder, Widget, WidgetConfig,
    WidgetId, WidgetType,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::carousel::{Carousel, CarouselConfig};
    pub use crate::combobox::{ComboBox, ComboBoxConfig};
    pub use crate::config::{Autocomplete, Orientation};
    pub use crate::context::{WidgetContext, WidgetCx};
    pub use crate::dialog::{Dialog, DialogConfig};
    pub use crate::floating::Placement;
    pub use crate::listbox::{ListBox, ListBoxConfig};
    pub use crate::menu::{Menu, MenuConfig};
    pub use crate::notification::{Notification, NotificationKind};
    pub use crate::slider::{Slider, SliderConfig};
    pub use crate::tooltip::{Tooltip, TooltipConfig};
    pub use crate::widget::{Expandable, Focusable, ValueHolder, WidgetConfig, WidgetId};
}
