use crate::{GpioInput, GpioResult};
use std::cell::Cell;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A debounced GPIO input that suppresses level changes shorter than a fixed
/// time window, filtering mechanical contact noise.
///
/// Owns the wrapped input so the whole stack can be moved onto the thread
/// that polls it.
pub struct TimedDebounce<'a> {
    input: Box<dyn GpioInput + 'a>,
    state: AtomicBool,
    changed_since: Cell<Option<Instant>>,
    window: Duration,
}

impl<'a> TimedDebounce<'a> {
    pub fn new(input: Box<dyn GpioInput + 'a>) -> Self {
        Self {
            input,
            state: AtomicBool::default(),
            changed_since: Cell::new(None),
            window: Duration::from_millis(20),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

impl Debug for TimedDebounce<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}(debounced)", self.input)
    }
}

impl GpioInput for TimedDebounce<'_> {
    fn read(&self) -> GpioResult<bool> {
        let previous_state = self.state.load(Ordering::Relaxed);
        let new_state = self.input.read()?;

        if let Some(instant) = self.changed_since.get() {
            if instant.elapsed() < self.window {
                // Still inside the window. A bounce back to the previous
                // level cancels the pending change.
                if previous_state == new_state {
                    self.changed_since.set(None);
                }
                return Ok(previous_state);
            } else {
                self.changed_since.set(None);
                self.state.store(new_state, Ordering::Relaxed);
                return Ok(new_state);
            }
        }

        if previous_state != new_state {
            self.changed_since.set(Some(Instant::now()));
            self.state.store(new_state, Ordering::Relaxed);
        }

        Ok(previous_state)
    }
}
