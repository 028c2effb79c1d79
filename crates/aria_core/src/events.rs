//! Input event model
//!
//! Hosts translate their platform input (DOM events, winit events, test
//! scripts) into [`Event`] values. The event type is a plain `u32` so it can
//! drive [`StateMachine`](crate::fsm::StateMachine) transitions directly,
//! while the payload carries key, pointer, focus or input details.

use std::fmt;

/// Event type identifier
pub type EventType = u32;

/// Milliseconds on the host clock
pub type Timestamp = u64;

/// Built-in event types
pub mod event_types {
    use super::EventType;

    pub const POINTER_ENTER: EventType = 1;
    pub const POINTER_LEAVE: EventType = 2;
    pub const POINTER_DOWN: EventType = 3;
    pub const POINTER_MOVE: EventType = 4;
    pub const POINTER_UP: EventType = 5;
    pub const CLICK: EventType = 6;
    pub const KEY_DOWN: EventType = 10;
    pub const KEY_UP: EventType = 11;
    pub const FOCUS_IN: EventType = 20;
    pub const FOCUS_OUT: EventType = 21;
    pub const INPUT: EventType = 30;

    /// First id available for widget-defined events (FSM-only)
    pub const USER: EventType = 1000;
}

/// A logical key, modelled after the DOM `KeyboardEvent.key` values the
/// widgets care about
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,
    Enter,
    Space,
    Escape,
    Tab,
    Backspace,
    Delete,
    /// A single printable character
    Character(char),
    /// Any other named key ("F1", "Shift", "Unidentified", ...)
    Named(String),
}

impl Key {
    /// Parse a DOM `KeyboardEvent.key` string
    pub fn from_dom(key: &str) -> Self {
        match key {
            "ArrowUp" | "Up" => Key::ArrowUp,
            "ArrowDown" | "Down" => Key::ArrowDown,
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            "Home" => Key::Home,
            "End" => Key::End,
            "PageUp" => Key::PageUp,
            "PageDown" => Key::PageDown,
            "Enter" => Key::Enter,
            " " | "Spacebar" => Key::Space,
            "Escape" | "Esc" => Key::Escape,
            "Tab" => Key::Tab,
            "Backspace" => Key::Backspace,
            "Delete" | "Del" => Key::Delete,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Character(c),
                    _ => Key::Named(other.to_string()),
                }
            }
        }
    }

    /// The printable character for this key, if it is a single character
    pub fn character(&self) -> Option<char> {
        match self {
            Key::Character(c) => Some(*c),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Character(c) => write!(f, "{c}"),
            Key::Named(name) => f.write_str(name),
            Key::Space => f.write_str(" "),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Keyboard modifier state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };
    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };
    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };
    pub const ALT: Self = Self {
        alt: true,
        ..Self::NONE
    };
    pub const META: Self = Self {
        meta: true,
        ..Self::NONE
    };

    /// No modifier held
    pub fn is_empty(&self) -> bool {
        !(self.shift || self.ctrl || self.alt || self.meta)
    }

    /// Ctrl on most platforms, Cmd on macOS
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Any modifier that turns a key press into a shortcut (shift excluded)
    pub fn has_shortcut_modifier(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }

    /// Combine two modifier sets
    pub fn with(self, other: Self) -> Self {
        Self {
            shift: self.shift || other.shift,
            ctrl: self.ctrl || other.ctrl,
            alt: self.alt || other.alt,
            meta: self.meta || other.meta,
        }
    }
}

/// Key press payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    pub repeat: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            repeat: false,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Parse from DOM `key` string
    pub fn from_dom(key: &str, modifiers: Modifiers) -> Self {
        Self::new(Key::from_dom(key)).with_modifiers(modifiers)
    }
}

/// Kind of pointing device
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

/// Event payload
#[derive(Clone, Debug, PartialEq)]
pub enum EventData {
    Key(KeyEvent),
    Pointer {
        x: f32,
        y: f32,
        button: u8,
        kind: PointerKind,
    },
    Focus {
        /// The element losing (for focus-in) or gaining (for focus-out) focus
        related: Option<u64>,
    },
    Input {
        value: String,
    },
    None,
}

/// An input event addressed to an element
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub event_type: EventType,
    /// Raw id of the target element
    pub target: u64,
    pub data: EventData,
    pub timestamp: Timestamp,
    pub propagation_stopped: bool,
    pub default_prevented: bool,
}

impl Event {
    pub fn new(event_type: EventType, target: u64, data: EventData) -> Self {
        Self {
            event_type,
            target,
            data,
            timestamp: 0,
            propagation_stopped: false,
            default_prevented: false,
        }
    }

    pub fn key_down(target: u64, key: KeyEvent) -> Self {
        Self::new(event_types::KEY_DOWN, target, EventData::Key(key))
    }

    pub fn pointer(event_type: EventType, target: u64, x: f32, y: f32) -> Self {
        Self::new(
            event_type,
            target,
            EventData::Pointer {
                x,
                y,
                button: 0,
                kind: PointerKind::Mouse,
            },
        )
    }

    pub fn touch(event_type: EventType, target: u64, x: f32, y: f32) -> Self {
        Self::new(
            event_type,
            target,
            EventData::Pointer {
                x,
                y,
                button: 0,
                kind: PointerKind::Touch,
            },
        )
    }

    pub fn click(target: u64) -> Self {
        Self::pointer(event_types::CLICK, target, 0.0, 0.0)
    }

    pub fn pointer_enter(target: u64) -> Self {
        Self::pointer(event_types::POINTER_ENTER, target, 0.0, 0.0)
    }

    pub fn pointer_leave(target: u64) -> Self {
        Self::pointer(event_types::POINTER_LEAVE, target, 0.0, 0.0)
    }

    pub fn focus_in(target: u64, related: Option<u64>) -> Self {
        Self::new(event_types::FOCUS_IN, target, EventData::Focus { related })
    }

    pub fn focus_out(target: u64, related: Option<u64>) -> Self {
        Self::new(event_types::FOCUS_OUT, target, EventData::Focus { related })
    }

    pub fn input(target: u64, value: impl Into<String>) -> Self {
        Self::new(
            event_types::INPUT,
            target,
            EventData::Input {
                value: value.into(),
            },
        )
    }

    /// Set the timestamp
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn key(&self) -> Option<&KeyEvent> {
        match &self.data {
            EventData::Key(key) => Some(key),
            _ => None,
        }
    }

    /// Pointer coordinates, if this is a pointer event
    pub fn position(&self) -> Option<(f32, f32)> {
        match self.data {
            EventData::Pointer { x, y, .. } => Some((x, y)),
            _ => None,
        }
    }

    pub fn pointer_kind(&self) -> Option<PointerKind> {
        match self.data {
            EventData::Pointer { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn related_target(&self) -> Option<u64> {
        match self.data {
            EventData::Focus { related } => related,
            _ => None,
        }
    }

    pub fn input_value(&self) -> Option<&str> {
        match &self.data {
            EventData::Input { value } => Some(value),
            _ => None,
        }
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
}
