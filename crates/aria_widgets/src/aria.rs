//! Accessibility attribute projection helpers
//!
//! Controllers keep their state in typed fields and project it onto the
//! document through these functions after every change. Writes go through
//! [`WidgetCx`] so a widget is only marked dirty when an attribute value
//! actually changed.

use aria_dom::NodeId;

use crate::context::WidgetCx;

pub const ROLE: &str = "role";
pub const TABINDEX: &str = "tabindex";
pub const ACTIVE_DESCENDANT: &str = "aria-activedescendant";
pub const CONTROLS: &str = "aria-controls";
pub const EXPANDED: &str = "aria-expanded";
pub const SELECTED: &str = "aria-selected";
pub const DISABLED: &str = "aria-disabled";
pub const READONLY: &str = "aria-readonly";
pub const HASPOPUP: &str = "aria-haspopup";
pub const ORIENTATION: &str = "aria-orientation";

/// `"true"` / `"false"`
pub fn bool_value(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Write `"true"` / `"false"`
pub fn set_bool(cx: &mut WidgetCx<'_>, node: NodeId, name: &str, value: bool) {
    cx.set_attr(node, name, bool_value(value));
}

/// Write `"true"` when set, remove the attribute otherwise
pub fn set_true_or_remove(cx: &mut WidgetCx<'_>, node: NodeId, name: &str, value: bool) {
    if value {
        cx.set_attr(node, name, "true");
    } else {
        cx.remove_attr(node, name);
    }
}

/// Write the value when present, remove the attribute otherwise
pub fn set_optional(cx: &mut WidgetCx<'_>, node: NodeId, name: &str, value: Option<&str>) {
    match value {
        Some(value) => cx.set_attr(node, name, value),
        None => cx.remove_attr(node, name),
    }
}

/// Roving tabindex: `"0"` for the tab stop, `"-1"` otherwise
pub fn set_tab_stop(cx: &mut WidgetCx<'_>, node: NodeId, tab_stop: bool) {
    cx.set_attr(node, TABINDEX, if tab_stop { "0" } else { "-1" });
}

/// Format a number without a trailing `.0` for integral values
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let mut s = format!("{value:.6}");
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}
