//! Notifications emitted by widgets
//!
//! Controllers never call back into host code. State changes the host may
//! care about are queued as [`Notification`]s and drained with
//! [`WidgetContext::take_notifications`](crate::WidgetContext::take_notifications).

use aria_dom::NodeId;

use crate::config::ScrollOptions;
use crate::widget::WidgetId;

#[derive(Clone, Debug, PartialEq)]
pub enum NotificationKind {
    /// The widget (or one of its submenus) expanded
    Expanded,
    /// The widget (or one of its submenus) collapsed
    Collapsed,
    /// The widget's value changed
    Changed,
    /// A leaf menu item was activated
    Activated { item: NodeId, href: Option<String> },
    /// The host should scroll `target` into view inside `container`
    ScrollIntoView {
        container: Option<NodeId>,
        target: NodeId,
        options: ScrollOptions,
    },
    /// The input text was completed with an option label; the first
    /// `typed` characters were typed by the user
    InlineCompletion {
        input: NodeId,
        typed: usize,
        completion: String,
    },
    /// The editable input was cleared
    InputCleared,
    /// A dialog finished opening (focus has landed inside)
    Open,
    /// A dialog finished closing (focus has been returned)
    Close,
    /// A carousel moved to another slide
    SlideChanged { index: usize },
}

/// A notification tagged with its source widget
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub widget: WidgetId,
    pub root: NodeId,
    /// Submenu or thumb the notification refers to, when narrower than the root
    pub part: Option<NodeId>,
    pub kind: NotificationKind,
}
