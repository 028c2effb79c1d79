//! Error types for aria_widgets

use aria_dom::{DomError, NodeId, SelectorError};
use thiserror::Error;

use crate::widget::WidgetId;

/// Errors from widget lifecycle and configuration APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WidgetError {
    /// The widget id is not (or no longer) mounted
    #[error("Unknown widget: {0:?}")]
    UnknownWidget(WidgetId),

    /// No controller is registered for this element's tag
    #[error("Unsupported widget element <{0}>")]
    UnsupportedElement(String),

    /// The element already hosts a mounted widget
    #[error("Element {0:?} already hosts a widget")]
    AlreadyMounted(NodeId),

    /// Widgets can only be mounted on connected elements
    #[error("Element {0:?} is not connected to the document")]
    Detached(NodeId),

    /// The attribute is not observed by this widget
    #[error("Attribute `{0}` is not observed by this widget")]
    UnobservedAttribute(String),

    /// An observed attribute carried a value that does not parse
    #[error("Invalid value {value:?} for attribute `{name}`")]
    InvalidAttribute { name: String, value: String },

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Failures reported by a floating position adapter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FloatingError {
    /// The element has no layout bounds to position against
    #[error("Element {0:?} has no layout bounds")]
    MissingBounds(NodeId),

    /// The adapter itself failed
    #[error("Floating position adapter failed: {0}")]
    Adapter(String),
}

/// Failures reported by a focus trap
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FocusTrapError {
    /// Neither the configured targets nor the container can take focus
    #[error("Focus trap container {0:?} has no focusable element")]
    NoFocusableElement(NodeId),

    #[error("Focus trap is already active")]
    AlreadyActive,

    #[error("Focus trap is not active")]
    NotActive,
}

/// Result type for widget operations
pub type Result<T> = std::result::Result<T, WidgetError>;
