//! RGB indicator output driver.

use crate::{GpioOutput, GpioResult};
use std::fmt::{Debug, Formatter};

/// The colors the indicator can show. One channel at a time is enough for a
/// status light; mixing is intentionally not exposed.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum LedColor {
    #[default]
    Off,
    Red,
    Green,
    Blue,
}

impl LedColor {
    fn channels(self) -> (bool, bool, bool) {
        match self {
            LedColor::Off => (false, false, false),
            LedColor::Red => (true, false, false),
            LedColor::Green => (false, true, false),
            LedColor::Blue => (false, false, true),
        }
    }
}

/// An RGB LED driven through three GPIO output lines.
pub struct RgbLed<'a> {
    red: Box<dyn GpioOutput + 'a>,
    green: Box<dyn GpioOutput + 'a>,
    blue: Box<dyn GpioOutput + 'a>,
}

impl<'a> RgbLed<'a> {
    pub fn new(
        red: Box<dyn GpioOutput + 'a>,
        green: Box<dyn GpioOutput + 'a>,
        blue: Box<dyn GpioOutput + 'a>,
    ) -> Self {
        Self { red, green, blue }
    }

    pub fn set(&mut self, color: LedColor) -> GpioResult<()> {
        let (red, green, blue) = color.channels();
        self.red.write(red)?;
        self.green.write(green)?;
        self.blue.write(blue)?;
        Ok(())
    }

    pub fn off(&mut self) -> GpioResult<()> {
        self.set(LedColor::Off)
    }
}

impl Debug for RgbLed<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RgbLed(r: {:?}, g: {:?}, b: {:?})",
            self.red, self.green, self.blue
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soft::SoftPin;

    fn led_with_handles() -> (RgbLed<'static>, [crate::soft::SoftPinHandle; 3]) {
        let pins = [SoftPin::new(), SoftPin::new(), SoftPin::new()];
        let handles = [pins[0].handle(), pins[1].handle(), pins[2].handle()];
        let [red, green, blue] = pins;
        let led = RgbLed::new(Box::new(red), Box::new(green), Box::new(blue));
        (led, handles)
    }

    #[test]
    fn set_drives_exactly_one_channel() {
        let (mut led, [red, green, blue]) = led_with_handles();

        led.set(LedColor::Green).unwrap();
        assert!(!red.get());
        assert!(green.get());
        assert!(!blue.get());

        led.set(LedColor::Red).unwrap();
        assert!(red.get());
        assert!(!green.get());
        assert!(!blue.get());
    }

    #[test]
    fn off_clears_all_channels() {
        let (mut led, [red, green, blue]) = led_with_handles();

        led.set(LedColor::Blue).unwrap();
        led.off().unwrap();
        assert!(!red.get());
        assert!(!green.get());
        assert!(!blue.get());
    }
}
