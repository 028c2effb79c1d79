//! Finite state machines for widget interaction states
//!
//! Widgets describe their discrete interaction states (collapsed/expanded,
//! idle/dragging, hidden/visible) as small transition tables. Sending an event
//! either follows a matching transition or leaves the state unchanged.
//!
//! ```rust
//! use aria_core::fsm::StateMachine;
//!
//! const COLLAPSED: u32 = 0;
//! const EXPANDED: u32 = 1;
//! const TOGGLE: u32 = 1000;
//!
//! let mut fsm = StateMachine::builder(COLLAPSED)
//!     .on(COLLAPSED, TOGGLE, EXPANDED)
//!     .on(EXPANDED, TOGGLE, COLLAPSED)
//!     .build();
//!
//! assert!(fsm.send(TOGGLE));
//! assert_eq!(fsm.current_state(), EXPANDED);
//! ```

use smallvec::SmallVec;

use crate::events::EventType;

/// State identifier
pub type StateId = u32;

/// Event identifier accepted by a state machine
pub type EventId = EventType;

/// A single `from --event--> to` edge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: StateId,
    pub event: EventId,
    pub to: StateId,
}

/// A flat (non-hierarchical) state machine
#[derive(Clone, Debug)]
pub struct StateMachine {
    initial: StateId,
    current: StateId,
    transitions: SmallVec<[Transition; 8]>,
}

impl StateMachine {
    /// Start building a machine with the given initial state
    pub fn builder(initial: StateId) -> StateMachineBuilder {
        StateMachineBuilder {
            initial,
            transitions: SmallVec::new(),
        }
    }

    /// Current state
    pub fn current_state(&self) -> StateId {
        self.current
    }

    /// Whether `event` has a transition out of the current state
    pub fn can(&self, event: EventId) -> bool {
        self.find(self.current, event).is_some()
    }

    /// Send an event. Returns true if the machine changed state.
    pub fn send(&mut self, event: EventId) -> bool {
        match self.find(self.current, event) {
            Some(to) if to != self.current => {
                tracing::trace!(from = self.current, to, event, "fsm transition");
                self.current = to;
                true
            }
            _ => false,
        }
    }

    /// Force the machine into a state, bypassing the transition table.
    ///
    /// Used when state is imposed from outside (a host attribute or a
    /// programmatic setter) rather than by an event.
    pub fn force(&mut self, state: StateId) {
        self.current = state;
    }

    /// Return to the initial state
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    fn find(&self, from: StateId, event: EventId) -> Option<StateId> {
        self.transitions
            .iter()
            .find(|t| t.from == from && t.event == event)
            .map(|t| t.to)
    }
}

/// Builder for [`StateMachine`]
#[derive(Debug)]
pub struct StateMachineBuilder {
    initial: StateId,
    transitions: SmallVec<[Transition; 8]>,
}

impl StateMachineBuilder {
    /// Add a transition; later duplicates of `(from, event)` are ignored
    pub fn on(mut self, from: StateId, event: EventId, to: StateId) -> Self {
        if !self
            .transitions
            .iter()
            .any(|t| t.from == from && t.event == event)
        {
            self.transitions.push(Transition { from, event, to });
        }
        self
    }

    pub fn build(self) -> StateMachine {
        StateMachine {
            initial: self.initial,
            current: self.initial,
            transitions: self.transitions,
        }
    }
}
