//! Typeahead: match a list by characters typed in quick succession
//!
//! Each widget owns its own [`Typeahead`]. Printable characters accumulate in
//! a buffer which resets when the user pauses longer than the debounce
//! window. Every keystroke searches the candidates starting just after the
//! current position and wrapping around.

use std::time::Duration;

use crate::events::{KeyEvent, Timestamp};

/// Default idle time after which the buffer starts over
pub const DEFAULT_TYPEAHEAD_DEBOUNCE: Duration = Duration::from_millis(500);

/// Per-widget typeahead buffer
#[derive(Clone, Debug)]
pub struct Typeahead {
    buffer: String,
    last_input: Option<Timestamp>,
    debounce: Duration,
}

impl Default for Typeahead {
    fn default() -> Self {
        Self::new(DEFAULT_TYPEAHEAD_DEBOUNCE)
    }
}

impl Typeahead {
    pub fn new(debounce: Duration) -> Self {
        Self {
            buffer: String::new(),
            last_input: None,
            debounce,
        }
    }

    /// Current search buffer
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_input = None;
    }

    /// Feed a key press and search `candidates`.
    ///
    /// Keys with ctrl/alt/meta held and keys that are not a single character
    /// are ignored and return `None` without touching the buffer. The
    /// predicate receives `(candidate, index, candidates, buffer)` and is
    /// evaluated for `start + 1, start + 2, ...` wrapping around, so the
    /// candidate at `start` is tried last. Returns the index of the first
    /// match.
    pub fn handle<T, P>(
        &mut self,
        key: &KeyEvent,
        now: Timestamp,
        candidates: &[T],
        start: Option<usize>,
        mut predicate: P,
    ) -> Option<usize>
    where
        P: FnMut(&T, usize, &[T], &str) -> bool,
    {
        if key.modifiers.has_shortcut_modifier() {
            return None;
        }
        let c = key.key.character()?;

        let debounce_ms = u64::try_from(self.debounce.as_millis()).unwrap_or(u64::MAX);
        let idle = match self.last_input {
            Some(last) => now.saturating_sub(last) > debounce_ms,
            None => true,
        };
        if idle {
            self.buffer.clear();
        }
        self.buffer.push(c);
        self.last_input = Some(now);

        let len = candidates.len();
        if len == 0 {
            return None;
        }
        let first = start.map_or(0, |s| (s + 1) % len);
        (0..len)
            .map(|offset| (first + offset) % len)
            .find(|&index| predicate(&candidates[index], index, candidates, &self.buffer))
    }
}

/// Case-insensitive prefix match of `label` against `buffer`.
///
/// Leading whitespace in the label is ignored.
pub fn prefix_match(label: &str, buffer: &str) -> bool {
    let label = label.trim_start().to_lowercase();
    label.starts_with(&buffer.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Key, Modifiers};

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(Key::Character(c))
    }

    fn labels() -> Vec<&'static str> {
        vec!["Apple", "Banana", "Cherry", "avocado", "Blueberry"]
    }

    fn find(t: &mut Typeahead, c: char, now: Timestamp, start: Option<usize>) -> Option<usize> {
        let items = labels();
        t.handle(&key(c), now, &items, start, |label, _, _, buffer| {
            prefix_match(label, buffer)
        })
    }

    #[test]
    fn test_search_starts_after_current() {
        let mut t = Typeahead::default();
        assert_eq!(find(&mut t, 'a', 0, Some(0)), Some(3));
    }

    #[test]
    fn test_search_wraps() {
        let mut t = Typeahead::default();
        // From "avocado" (3), 'b' finds "Blueberry" (4), then wraps to "Banana"
        assert_eq!(find(&mut t, 'b', 0, Some(3)), Some(4));
        t.reset();
        assert_eq!(find(&mut t, 'b', 0, Some(4)), Some(1));
        t.reset();
        // Match only before the current position
        assert_eq!(find(&mut t, 'c', 0, Some(4)), Some(2));
    }

    #[test]
    fn test_buffer_accumulates_and_expires() {
        let mut t = Typeahead::default();
        find(&mut t, 'b', 0, None);
        assert_eq!(find(&mut t, 'l', 100, Some(1)), Some(4));
        assert_eq!(t.buffer(), "bl");

        // Idle longer than the window resets the buffer
        find(&mut t, 'c', 1000, Some(4));
        assert_eq!(t.buffer(), "c");
    }

    #[test]
    fn test_modified_and_named_keys_ignored() {
        let mut t = Typeahead::default();
        let items = labels();
        let ctrl_a = key('a').with_modifiers(Modifiers::CTRL);
        assert_eq!(t.handle(&ctrl_a, 0, &items, None, |_, _, _, _| true), None);
        let arrow = KeyEvent::new(Key::ArrowDown);
        assert_eq!(t.handle(&arrow, 0, &items, None, |_, _, _, _| true), None);
        assert_eq!(t.buffer(), "");

        // Shift alone still types
        let shifted = key('B').with_modifiers(Modifiers::SHIFT);
        assert_eq!(
            t.handle(&shifted, 0, &items, None, |l, _, _, b| prefix_match(l, b)),
            Some(1)
        );
    }

    #[test]
    fn test_no_match() {
        let mut t = Typeahead::default();
        assert_eq!(find(&mut t, 'z', 0, Some(2)), None);
        let empty: Vec<&str> = Vec::new();
        assert_eq!(t.handle(&key('a'), 0, &empty, None, |_, _, _, _| true), None);
    }

    #[test]
    fn test_independent_buffers() {
        let mut first = Typeahead::default();
        let mut second = Typeahead::default();
        find(&mut first, 'b', 0, None);
        find(&mut second, 'c', 10, None);
        find(&mut first, 'l', 20, None);
        assert_eq!(first.buffer(), "bl");
        assert_eq!(second.buffer(), "c");
    }
}
