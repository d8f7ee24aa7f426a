//! Software GPIO: in-memory pins and buses implementing the same traits as
//! the hardware backends.
//!
//! Useful for desk bring-up without wired hardware and for driving the rest
//! of the stack from tests. A [SoftPinHandle] can poke or observe a pin from
//! another thread while the pin itself is owned by a driver.

use crate::{GpioBus, GpioBusInput, GpioBusOutput, GpioInput, GpioOutput, GpioResult};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory GPIO pin. Readable and writable; the level is shared with
/// every handle cloned from it.
#[derive(Clone, Default)]
pub struct SoftPin {
    level: Arc<AtomicBool>,
}

impl SoftPin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a handle that sets and reads the level independently of the pin.
    pub fn handle(&self) -> SoftPinHandle {
        SoftPinHandle {
            level: self.level.clone(),
        }
    }
}

impl Debug for SoftPin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SoftPin({})", self.level.load(Ordering::Relaxed))
    }
}

impl GpioInput for SoftPin {
    fn read(&self) -> GpioResult<bool> {
        Ok(self.level.load(Ordering::Relaxed))
    }
}

impl GpioOutput for SoftPin {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.level.store(value, Ordering::Relaxed);
        Ok(())
    }
}

/// Sets and observes a [SoftPin] level without owning the pin.
#[derive(Clone, Debug)]
pub struct SoftPinHandle {
    level: Arc<AtomicBool>,
}

impl SoftPinHandle {
    pub fn set(&self, value: bool) {
        self.level.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> bool {
        self.level.load(Ordering::Relaxed)
    }
}

/// A bus composed of [SoftPin]s, LSb first.
#[derive(Clone)]
pub struct SoftBus<const N: usize> {
    pins: [SoftPin; N],
}

impl<const N: usize> Default for SoftBus<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SoftBus<N> {
    pub fn new() -> Self {
        Self {
            pins: std::array::from_fn(|_| SoftPin::new()),
        }
    }

    pub fn handles(&self) -> [SoftPinHandle; N] {
        std::array::from_fn(|i| self.pins[i].handle())
    }

    /// Reads the bus value as an integer, LSb first.
    pub fn value(&self) -> u8 {
        let mut value = 0u8;
        for (i, pin) in self.pins.iter().enumerate() {
            if pin.level.load(Ordering::Relaxed) {
                value |= 1 << i;
            }
        }
        value
    }
}

impl<const N: usize> Debug for SoftBus<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SoftBus({:?})", self.pins)
    }
}

impl<const N: usize> GpioBus<N> for SoftBus<N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        Ok(Box::new(SoftBusInput {
            pins: self.pins.clone(),
        }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        Ok(Box::new(SoftBusOutput {
            pins: self.pins.clone(),
        }))
    }
}

struct SoftBusInput<const N: usize> {
    pins: [SoftPin; N],
}

impl<const N: usize> Debug for SoftBusInput<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SoftBusInput({:?})", self.pins)
    }
}

impl<const N: usize> GpioBusInput<N> for SoftBusInput<N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        let mut values = [false; N];
        for (i, pin) in self.pins.iter().enumerate() {
            values[i] = pin.read()?;
        }
        Ok(values)
    }
}

struct SoftBusOutput<const N: usize> {
    pins: [SoftPin; N],
}

impl<const N: usize> Debug for SoftBusOutput<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SoftBusOutput({:?})", self.pins)
    }
}

impl<const N: usize> GpioBusOutput<N> for SoftBusOutput<N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        for (i, pin) in self.pins.iter().enumerate() {
            pin.write(values[i])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_level_is_shared_with_handles() {
        let pin = SoftPin::new();
        let handle = pin.handle();

        assert!(!pin.read().unwrap());
        handle.set(true);
        assert!(pin.read().unwrap());

        pin.write(false).unwrap();
        assert!(!handle.get());
    }

    #[test]
    fn bus_nibble_round_trip() {
        let mut bus = SoftBus::<4>::new();

        {
            let out = bus.as_output().unwrap();
            out.write_nibble(0b1010).unwrap();
        }
        assert_eq!(bus.value(), 0b1010);

        let input = bus.as_input().unwrap();
        assert_eq!(input.read_nibble().unwrap(), 0b1010);
    }

    #[test]
    fn bus_rejects_out_of_range_nibble() {
        let mut bus = SoftBus::<4>::new();
        let out = bus.as_output().unwrap();
        assert!(out.write_nibble(0b10000).is_err());
    }
}
