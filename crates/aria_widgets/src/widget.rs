//! Widget identity, controller trait and capability traits
//!
//! Every mounted widget is one variant of the [`Widget`] enum. Behavior
//! shared between families is expressed as small capability traits
//! ([`Focusable`], [`Expandable`], [`ValueHolder`], [`FloatingPositioned`])
//! implemented per concrete controller.

use aria_core::Event;
use aria_dom::{Document, NodeId};
use slotmap::new_key_type;

use crate::carousel::{Carousel, CarouselConfig};
use crate::combobox::{ComboBox, ComboBoxConfig};
use crate::context::{Timer, WidgetCx};
use crate::dialog::{Dialog, DialogConfig};
use crate::error::Result;
use crate::listbox::{ListBox, ListBoxConfig};
use crate::menu::{Menu, MenuConfig};
use crate::slider::{Slider, SliderConfig};
use crate::tooltip::{Tooltip, TooltipConfig};

new_key_type! {
    /// Unique identifier for a mounted widget
    pub struct WidgetId;
}

/// Behavior every widget controller provides to the context
pub trait Controller {
    /// The element the widget is mounted on
    fn root(&self) -> NodeId;

    /// Short kind name, used in logs and generated ids
    fn kind(&self) -> &'static str;

    /// Host attributes this widget reacts to
    fn observed_attributes(&self) -> &'static [&'static str];

    /// Called once after the widget is registered
    fn mount(&mut self, cx: &mut WidgetCx<'_>) {
        self.sync(cx);
    }

    /// Called before the widget is removed; release anything held outside
    /// the controller
    fn unmount(&mut self, _cx: &mut WidgetCx<'_>) {}

    /// Handle an event whose target is inside the widget root
    fn handle_event(&mut self, cx: &mut WidgetCx<'_>, event: &mut Event);

    /// Handle a pointer or focus event whose target is outside the root
    fn handle_outside(&mut self, _cx: &mut WidgetCx<'_>, _event: &Event) {}

    /// A timer scheduled by this widget fired
    fn on_timer(&mut self, _cx: &mut WidgetCx<'_>, _timer: Timer) {}

    /// An observed attribute changed on the root element
    fn attribute_changed(
        &mut self,
        cx: &mut WidgetCx<'_>,
        name: &str,
        value: Option<&str>,
    ) -> Result<()>;

    /// Project state onto `role`, `aria-*` and `tabindex` attributes
    fn sync(&mut self, cx: &mut WidgetCx<'_>);
}

/// A widget with a single focused part
pub trait Focusable {
    /// The focused part, if it is still connected and visible
    fn focused_part(&self, doc: &Document) -> Option<NodeId>;
}

/// A widget that expands and collapses
pub trait Expandable {
    fn is_expanded(&self) -> bool;
    fn expand(&mut self, cx: &mut WidgetCx<'_>) -> bool;
    fn collapse(&mut self, cx: &mut WidgetCx<'_>) -> bool;

    fn toggle(&mut self, cx: &mut WidgetCx<'_>) -> bool {
        if self.is_expanded() {
            self.collapse(cx)
        } else {
            self.expand(cx)
        }
    }
}

/// A widget holding a user-editable value
pub trait ValueHolder {
    type Value;

    fn value(&self) -> Self::Value;

    /// Request a new value. Returns false when the change was rejected or
    /// had no effect.
    fn set_value(&mut self, cx: &mut WidgetCx<'_>, value: Self::Value) -> bool;
}

/// A widget that overlays content positioned against a reference element
pub trait FloatingPositioned {
    /// Current `(reference, floating)` pairs
    fn floating_pairs(&self, doc: &Document) -> Vec<(NodeId, NodeId)>;
}

/// Typed access to one [`Widget`] variant
pub trait WidgetType: Controller + Sized {
    fn from_widget(widget: &Widget) -> Option<&Self>;
    fn from_widget_mut(widget: &mut Widget) -> Option<&mut Self>;
}

macro_rules! widgets {
    ($($variant:ident($ty:ty, $config:ty)),* $(,)?) => {
        /// A mounted widget controller
        pub enum Widget {
            $($variant($ty),)*
        }

        impl Widget {
            pub fn controller(&self) -> &dyn Controller {
                match self {
                    $(Widget::$variant(w) => w,)*
                }
            }

            pub fn controller_mut(&mut self) -> &mut dyn Controller {
                match self {
                    $(Widget::$variant(w) => w,)*
                }
            }
        }

        $(
            impl From<$ty> for Widget {
                fn from(widget: $ty) -> Self {
                    Widget::$variant(widget)
                }
            }

            impl WidgetType for $ty {
                fn from_widget(widget: &Widget) -> Option<&Self> {
                    match widget {
                        Widget::$variant(w) => Some(w),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn from_widget_mut(widget: &mut Widget) -> Option<&mut Self> {
                    match widget {
                        Widget::$variant(w) => Some(w),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }

            impl From<$config> for WidgetConfig {
                fn from(config: $config) -> Self {
                    WidgetConfig::$variant(config)
                }
            }
        )*

        /// Configuration for any widget family
        #[derive(Clone, Debug)]
        pub enum WidgetConfig {
            $($variant($config),)*
        }

        impl WidgetConfig {
            /// Apply a host attribute. Returns false if the attribute is not
            /// observed by this family.
            pub fn apply_attribute(&mut self, name: &str, value: Option<&str>) -> Result<bool> {
                match self {
                    $(WidgetConfig::$variant(c) => c.apply_attribute(name, value),)*
                }
            }

            /// Build the controller for `root`
            pub fn build(self, root: NodeId) -> Result<Widget> {
                match self {
                    $(WidgetConfig::$variant(c) => Ok(Widget::$variant(<$ty>::new(root, c)?)),)*
                }
            }
        }
    };
}

widgets! {
    ComboBox(ComboBox, ComboBoxConfig),
    Menu(Menu, MenuConfig),
    ListBox(ListBox, ListBoxConfig),
    Slider(Slider, SliderConfig),
    Dialog(Dialog, DialogConfig),
    Carousel(Carousel, CarouselConfig),
    Tooltip(Tooltip, TooltipConfig),
}

impl WidgetConfig {
    /// Default configuration for a widget root tag
    pub fn for_tag(tag: &str) -> Option<Self> {
        let config = match tag {
            crate::combobox::TAG => ComboBoxConfig::default().into(),
            crate::menu::TAG => MenuConfig::default().into(),
            crate::menu::MENUBAR_TAG => MenuConfig::default().menubar(true).into(),
            crate::listbox::TAG => ListBoxConfig::default().into(),
            crate::slider::TAG => SliderConfig::default().into(),
            crate::dialog::TAG => DialogConfig::default().into(),
            crate::carousel::TAG => CarouselConfig::default().into(),
            crate::tooltip::TAG => TooltipConfig::default().into(),
            _ => return None,
        };
        Some(config)
    }
}
