//! The periodic input sampler.
//!
//! Runs on the 1 ms tick thread and is the only code that touches the
//! encoder. It distills the raw samples into the small shared snapshot the
//! controller polls: the menu selection, the digit under the knob, and a
//! button edge flag. Nothing here blocks or draws.

use crate::app::MAX_SELECTION;
use knoblock_gpio::GpioResult;
use knoblock_gpio::rotenc::{EncoderState, RotaryEncoder};
use log::warn;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// The snapshot shared between the tick thread and the main loop.
///
/// Each field has a single logical writer: the sampler owns `selection`,
/// `digit` and the setting of `button_edge`; the controller only consumes
/// the edge flag and resets the digit after a completed attempt. All
/// accesses are relaxed since no field orders another.
#[derive(Debug, Default)]
pub struct SharedInput {
    selection: AtomicU8,
    digit: AtomicU8,
    button_edge: AtomicBool,
}

impl SharedInput {
    /// The menu selection, `0..=MAX_SELECTION`.
    pub fn selection(&self) -> u8 {
        self.selection.load(Ordering::Relaxed)
    }

    /// The digit currently under the knob, `0..=9`.
    pub fn digit(&self) -> u8 {
        self.digit.load(Ordering::Relaxed)
    }

    /// Consumes a pending button edge.
    ///
    /// The flag is cleared in the same operation that observes it, so a
    /// physical press can never be acted on twice no matter what the caller
    /// does afterwards.
    pub fn take_button_edge(&self) -> bool {
        self.button_edge.swap(false, Ordering::Relaxed)
    }

    /// Controller-side reset after a completed attempt.
    pub fn reset_digit(&self) {
        self.digit.store(0, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn force_digit(&self, digit: u8) {
        self.digit.store(digit, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn force_selection(&self, selection: u8) {
        self.selection.store(selection, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn force_button_edge(&self) {
        self.button_edge.store(true, Ordering::Relaxed);
    }
}

/// Samples the encoder once per tick and updates [SharedInput].
///
/// Owns the encoder and the raw state pair outright; the rest of the system
/// only ever sees the shared snapshot.
pub struct Sampler<'a> {
    encoder: RotaryEncoder<'a>,
    shared: Arc<SharedInput>,
    previous: EncoderState,
}

impl<'a> Sampler<'a> {
    /// Takes an initial sample so the first tick has a previous state to
    /// compare against (otherwise a button held at boot would register as a
    /// press).
    pub fn new(encoder: RotaryEncoder<'a>, shared: Arc<SharedInput>) -> GpioResult<Self> {
        let previous = encoder.sample()?;
        Ok(Self {
            encoder,
            shared,
            previous,
        })
    }

    pub fn tick(&mut self) {
        let current = match self.encoder.sample() {
            Ok(state) => state,
            Err(e) => {
                // Drop the sample; the next tick is 1 ms away.
                warn!("Encoder sample failed: {}", e);
                return;
            }
        };

        // Rising edge only. Holding the button must not re-trigger, and an
        // edge the controller has not consumed yet stays set.
        if current.button_pressed() && !self.previous.button_pressed() {
            self.shared.button_edge.store(true, Ordering::Relaxed);
        }

        // Rotation does not move the selection while there is a single
        // screen; the clamp keeps the invariant should that change.
        let selection = self.shared.selection.load(Ordering::Relaxed);
        if selection > MAX_SELECTION {
            self.shared.selection.store(MAX_SELECTION, Ordering::Relaxed);
        }

        let delta = current.rotation_from(self.previous);
        if delta != 0 {
            let digit = self.shared.digit.load(Ordering::Relaxed) as i16 + delta as i16;
            self.shared.digit.store(digit.clamp(0, 9) as u8, Ordering::Relaxed);
        }

        self.previous = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knoblock_gpio::soft::{SoftPin, SoftPinHandle};

    const GRAY_CYCLE: [(bool, bool); 4] = [
        (false, false),
        (true, false),
        (true, true),
        (false, true),
    ];

    struct Knob {
        a: SoftPinHandle,
        b: SoftPinHandle,
        button: SoftPinHandle,
        phase: usize,
    }

    impl Knob {
        fn turn(&mut self, sampler: &mut Sampler<'_>, steps: i32) {
            for _ in 0..steps.abs() {
                self.phase = if steps > 0 {
                    (self.phase + 1) % GRAY_CYCLE.len()
                } else {
                    (self.phase + GRAY_CYCLE.len() - 1) % GRAY_CYCLE.len()
                };
                let (a, b) = GRAY_CYCLE[self.phase];
                self.a.set(a);
                self.b.set(b);
                sampler.tick();
            }
        }

        fn press(&self, sampler: &mut Sampler<'_>) {
            self.button.set(true);
            sampler.tick();
        }

        fn release(&self, sampler: &mut Sampler<'_>) {
            self.button.set(false);
            sampler.tick();
        }
    }

    fn fixture() -> (Sampler<'static>, Arc<SharedInput>, Knob) {
        let pins = [SoftPin::new(), SoftPin::new(), SoftPin::new()];
        let knob = Knob {
            a: pins[0].handle(),
            b: pins[1].handle(),
            button: pins[2].handle(),
            phase: 0,
        };
        let [a, b, button] = pins;
        let encoder = RotaryEncoder::new(Box::new(a), Box::new(b), Box::new(button));
        let shared = Arc::new(SharedInput::default());
        let sampler = Sampler::new(encoder, shared.clone()).unwrap();
        (sampler, shared, knob)
    }

    #[test]
    fn digit_follows_rotation() {
        let (mut sampler, shared, mut knob) = fixture();

        knob.turn(&mut sampler, 3);
        assert_eq!(shared.digit(), 3);

        knob.turn(&mut sampler, -2);
        assert_eq!(shared.digit(), 1);
    }

    #[test]
    fn digit_saturates_at_both_ends() {
        let (mut sampler, shared, mut knob) = fixture();

        knob.turn(&mut sampler, -5);
        assert_eq!(shared.digit(), 0);

        knob.turn(&mut sampler, 25);
        assert_eq!(shared.digit(), 9);

        knob.turn(&mut sampler, -25);
        assert_eq!(shared.digit(), 0);
    }

    #[test]
    fn held_button_raises_exactly_one_edge() {
        let (mut sampler, shared, knob) = fixture();

        knob.press(&mut sampler);
        sampler.tick();
        sampler.tick();

        assert!(shared.take_button_edge());
        assert!(!shared.take_button_edge());

        // A new press after release raises a new edge.
        knob.release(&mut sampler);
        knob.press(&mut sampler);
        assert!(shared.take_button_edge());
    }

    #[test]
    fn button_held_at_startup_is_not_an_edge() {
        let pins = [SoftPin::new(), SoftPin::new(), SoftPin::new()];
        pins[2].handle().set(true);
        let [a, b, button] = pins;
        let encoder = RotaryEncoder::new(Box::new(a), Box::new(b), Box::new(button));
        let shared = Arc::new(SharedInput::default());
        let mut sampler = Sampler::new(encoder, shared.clone()).unwrap();

        sampler.tick();
        assert!(!shared.take_button_edge());
    }

    #[test]
    fn unconsumed_edge_survives_further_ticks() {
        let (mut sampler, shared, mut knob) = fixture();

        knob.press(&mut sampler);
        knob.turn(&mut sampler, 2);
        assert!(shared.take_button_edge());
    }

    #[test]
    fn selection_is_clamped_into_range() {
        let (mut sampler, shared, _knob) = fixture();

        shared.force_selection(7);
        sampler.tick();
        assert_eq!(shared.selection(), MAX_SELECTION);
    }
}
