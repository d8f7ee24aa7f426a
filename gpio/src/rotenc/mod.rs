use crate::{GpioInput, GpioResult};

/// The A/B quadrature states in clockwise order. Adjacent entries differ in
/// exactly one line (Gray sequence), so a single valid step is always one
/// position forward or backward in this cycle.
const GRAY_CYCLE: [(bool, bool); 4] = [
    (false, false),
    (true, false),
    (true, true),
    (false, true),
];

/// One sampled snapshot of the encoder lines, including the push button.
///
/// Opaque to consumers: direction only has meaning between two snapshots,
/// via [EncoderState::rotation_from].
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct EncoderState {
    a: bool,
    b: bool,
    button: bool,
}

impl EncoderState {
    pub fn new(a: bool, b: bool, button: bool) -> Self {
        Self { a, b, button }
    }

    pub fn button_pressed(&self) -> bool {
        self.button
    }

    /// Decodes the rotation between two consecutive samples: +1 for one
    /// clockwise step, -1 for one counter-clockwise step, 0 otherwise.
    ///
    /// A transition that skips a cycle position (the sampler missed a state,
    /// or the contacts bounced) also decodes to 0 rather than guessing.
    pub fn rotation_from(&self, previous: EncoderState) -> i8 {
        if (self.a, self.b) == (previous.a, previous.b) {
            return 0;
        }

        let previous_index = GRAY_CYCLE.iter().position(|&s| s == (previous.a, previous.b));
        let current_index = GRAY_CYCLE.iter().position(|&s| s == (self.a, self.b));

        match (previous_index, current_index) {
            (Some(prev), Some(curr)) if (prev + 1) % GRAY_CYCLE.len() == curr => 1,
            (Some(prev), Some(curr)) if (curr + 1) % GRAY_CYCLE.len() == prev => -1,
            _ => 0,
        }
    }
}

/// A rotary encoder with an integrated push button, read as three GPIO
/// inputs. Owns its lines so a sampling thread can take the whole device.
#[derive(Debug)]
pub struct RotaryEncoder<'a> {
    pin_a: Box<dyn GpioInput + 'a>,
    pin_b: Box<dyn GpioInput + 'a>,
    button: Box<dyn GpioInput + 'a>,
}

impl<'a> RotaryEncoder<'a> {
    pub fn new(
        pin_a: Box<dyn GpioInput + 'a>,
        pin_b: Box<dyn GpioInput + 'a>,
        button: Box<dyn GpioInput + 'a>,
    ) -> Self {
        Self {
            pin_a,
            pin_b,
            button,
        }
    }

    pub fn sample(&self) -> GpioResult<EncoderState> {
        Ok(EncoderState {
            a: self.pin_a.read()?,
            b: self.pin_b.read()?,
            button: self.button.read()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soft::{SoftPin, SoftPinHandle};

    fn encoder_with_handles() -> (RotaryEncoder<'static>, [SoftPinHandle; 3]) {
        let pins = [SoftPin::new(), SoftPin::new(), SoftPin::new()];
        let handles = [pins[0].handle(), pins[1].handle(), pins[2].handle()];
        let [a, b, button] = pins;
        let encoder = RotaryEncoder::new(Box::new(a), Box::new(b), Box::new(button));
        (encoder, handles)
    }

    #[test]
    fn clockwise_walk_decodes_plus_one_each_step() {
        let mut previous = EncoderState::new(false, false, false);
        for (a, b) in [(true, false), (true, true), (false, true), (false, false)] {
            let current = EncoderState::new(a, b, false);
            assert_eq!(current.rotation_from(previous), 1);
            previous = current;
        }
    }

    #[test]
    fn counter_clockwise_walk_decodes_minus_one_each_step() {
        let mut previous = EncoderState::new(false, false, false);
        for (a, b) in [(false, true), (true, true), (true, false), (false, false)] {
            let current = EncoderState::new(a, b, false);
            assert_eq!(current.rotation_from(previous), -1);
            previous = current;
        }
    }

    #[test]
    fn skipped_state_decodes_to_zero() {
        let previous = EncoderState::new(false, false, false);
        let current = EncoderState::new(true, true, false);
        assert_eq!(current.rotation_from(previous), 0);
    }

    #[test]
    fn unchanged_phase_decodes_to_zero() {
        let previous = EncoderState::new(true, false, false);
        let current = EncoderState::new(true, false, true);
        assert_eq!(current.rotation_from(previous), 0);
    }

    #[test]
    fn sample_reflects_line_levels() {
        let (encoder, [a, _b, button]) = encoder_with_handles();

        a.set(true);
        button.set(true);
        let state = encoder.sample().unwrap();
        assert_eq!(state, EncoderState::new(true, false, true));
        assert!(state.button_pressed());
    }
}
