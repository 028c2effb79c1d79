//! Aria Core Runtime
//!
//! Foundational primitives shared by every Aria widget controller:
//!
//! - **Events**: A host-neutral input model (keys, pointers, focus, input)
//! - **State Machines**: Small transition tables for widget interaction states
//! - **Debouncing**: Keyed, cancellable delays driven by a host clock
//! - **Typeahead**: Character-buffer matching with wrap-around search
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use aria_core::{Debouncer, Key, KeyEvent, Typeahead};
//!
//! let mut typeahead = Typeahead::default();
//! let options = ["cat", "dog", "cow"];
//! let hit = typeahead.handle(
//!     &KeyEvent::new(Key::Character('c')),
//!     0,
//!     &options,
//!     Some(0),
//!     |label, _, _, buffer| aria_core::typeahead::prefix_match(label, buffer),
//! );
//! assert_eq!(hit, Some(2));
//!
//! let mut debouncer = Debouncer::new();
//! debouncer.schedule("focus-loss", (), 0, Duration::from_millis(200));
//! assert_eq!(debouncer.poll(200).len(), 1);
//! ```

pub mod debounce;
pub mod events;
pub mod fsm;
pub mod typeahead;

pub use debounce::{Debouncer, DEFAULT_COLLAPSE_DEBOUNCE};
pub use events::{
    event_types, Event, EventData, EventType, Key, KeyEvent, Modifiers, PointerKind, Timestamp,
};
pub use fsm::{EventId, StateId, StateMachine, StateMachineBuilder, Transition};
pub use typeahead::{prefix_match, Typeahead, DEFAULT_TYPEAHEAD_DEBOUNCE};
