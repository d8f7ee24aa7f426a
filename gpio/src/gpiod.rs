//! GPIO backend built on the Linux GPIO character device via the `gpiod` crate.

use crate::{
    GpioActiveLevel, GpioBias, GpioBus, GpioBusInput, GpioBusOutput, GpioDriver, GpioError,
    GpioInput, GpioOutput, GpioPin, GpioResult,
};
use bitvec::vec::BitVec;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;

/// GpiodDriver is a GPIO driver that manages its pins through a gpiod chip.
pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_lines: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let lines = chip.num_lines() as usize;
        Self {
            chip,
            used_lines: BitVec::repeat(false, lines),
        }
    }

    /// Opens a chip by path (e.g. `/dev/gpiochip0`) and wraps it.
    pub fn open(path: &str) -> GpioResult<Self> {
        let chip = gpiod::Chip::new(path)?;
        Ok(Self::new(chip))
    }

    fn claim(&self, index: usize) -> GpioResult<()> {
        if index >= self.used_lines.len() {
            return Err(GpioError::InvalidArgument);
        }
        if self.used_lines[index] {
            return Err(GpioError::AlreadyInUse);
        }
        self.used_lines.set_aliased(index, true);
        Ok(())
    }

    fn release(&self, index: usize) {
        self.used_lines.set_aliased(index, false);
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        self.claim(index)?;

        Ok(Box::new(GpiodPin {
            driver: self,
            index,
            active_level: GpioActiveLevel::High,
            bias: GpioBias::None,
        }))
    }

    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        if indices.iter().any(|&index| index >= self.used_lines.len()) {
            return Err(GpioError::InvalidArgument);
        }
        if indices.iter().any(|&index| self.used_lines[index]) {
            return Err(GpioError::AlreadyInUse);
        }
        for index in indices {
            self.used_lines.set_aliased(index, true);
        }

        Ok(Box::new(GpiodBus {
            driver: self,
            indices,
            active_level: GpioActiveLevel::High,
            bias: GpioBias::None,
        }))
    }
}

impl From<GpioActiveLevel> for gpiod::Active {
    fn from(level: GpioActiveLevel) -> Self {
        match level {
            GpioActiveLevel::High => gpiod::Active::High,
            GpioActiveLevel::Low => gpiod::Active::Low,
        }
    }
}

impl From<GpioBias> for gpiod::Bias {
    fn from(bias: GpioBias) -> Self {
        match bias {
            GpioBias::None => gpiod::Bias::Disable,
            GpioBias::PullUp => gpiod::Bias::PullUp,
            GpioBias::PullDown => gpiod::Bias::PullDown,
        }
    }
}

struct GpiodPin<'a> {
    driver: &'a GpiodDriver,
    index: usize,
    active_level: GpioActiveLevel,
    bias: GpioBias,
}

impl Debug for GpiodPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.index)
    }
}

impl GpioPin for GpiodPin<'_> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>> {
        let line = self.driver.chip.request_lines(
            gpiod::Options::input([self.index as u32])
                .consumer(env!("CARGO_PKG_NAME"))
                .active(self.active_level.into())
                .bias(self.bias.into()),
        )?;
        // The line handle carries everything it needs, so it can be moved
        // onto the sampling thread.
        Ok(Box::new(GpiodInput {
            label: format!("{:?}[input]", self),
            line,
        }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        let line = self.driver.chip.request_lines(
            gpiod::Options::output([self.index as u32])
                .consumer(env!("CARGO_PKG_NAME"))
                .active(self.active_level.into())
                .bias(self.bias.into()),
        )?;
        Ok(Box::new(GpiodOutput {
            label: format!("{:?}[output]", self),
            line,
        }))
    }

    fn supports_active_level(&self) -> bool {
        true
    }

    fn active_level(&self) -> GpioActiveLevel {
        self.active_level
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.active_level = level;
        Ok(())
    }

    fn supports_bias(&self) -> bool {
        true
    }

    fn bias(&self) -> GpioBias {
        self.bias
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.bias = bias;
        Ok(())
    }
}

impl Drop for GpiodPin<'_> {
    fn drop(&mut self) {
        self.driver.release(self.index);
    }
}

struct GpiodInput {
    label: String,
    line: gpiod::Lines<gpiod::Input>,
}

impl Debug for GpiodInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl GpioInput for GpiodInput {
    fn read(&self) -> GpioResult<bool> {
        let values = self.line.get_values([false])?;
        Ok(values[0])
    }
}

struct GpiodOutput {
    label: String,
    line: gpiod::Lines<gpiod::Output>,
}

impl Debug for GpiodOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl GpioOutput for GpiodOutput {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.line.set_values([value])?;
        Ok(())
    }
}

struct GpiodBus<'a, const N: usize> {
    driver: &'a GpiodDriver,
    indices: [usize; N],
    active_level: GpioActiveLevel,
    bias: GpioBias,
}

impl<const N: usize> Debug for GpiodBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.indices)
    }
}

impl<const N: usize> GpioBus<N> for GpiodBus<'_, N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        let line = self.driver.chip.request_lines(
            gpiod::Options::input(
                self.indices
                    .iter()
                    .map(|&index| index as u32)
                    .collect::<Vec<_>>(),
            )
            .consumer(env!("CARGO_PKG_NAME"))
            .active(self.active_level.into())
            .bias(self.bias.into()),
        )?;
        Ok(Box::new(GpiodBusInput {
            label: format!("{:?}[input]", self),
            line,
        }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        let line = self.driver.chip.request_lines(
            gpiod::Options::output(
                self.indices
                    .iter()
                    .map(|&index| index as u32)
                    .collect::<Vec<_>>(),
            )
            .consumer(env!("CARGO_PKG_NAME"))
            .active(self.active_level.into())
            .bias(self.bias.into()),
        )?;
        Ok(Box::new(GpiodBusOutput {
            label: format!("{:?}[output]", self),
            line,
        }))
    }

    fn supports_active_level(&self) -> bool {
        true
    }

    fn active_level(&self) -> GpioActiveLevel {
        self.active_level
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.active_level = level;
        Ok(())
    }

    fn supports_bias(&self) -> bool {
        true
    }

    fn bias(&self) -> GpioBias {
        self.bias
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.bias = bias;
        Ok(())
    }
}

impl<const N: usize> Drop for GpiodBus<'_, N> {
    fn drop(&mut self) {
        for index in self.indices {
            self.driver.release(index);
        }
    }
}

struct GpiodBusInput<const N: usize> {
    label: String,
    line: gpiod::Lines<gpiod::Input>,
}

impl<const N: usize> Debug for GpiodBusInput<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl<const N: usize> GpioBusInput<N> for GpiodBusInput<N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        let values = self.line.get_values([false; N])?;
        Ok(values)
    }
}

struct GpiodBusOutput<const N: usize> {
    label: String,
    line: gpiod::Lines<gpiod::Output>,
}

impl<const N: usize> Debug for GpiodBusOutput<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl<const N: usize> GpioBusOutput<N> for GpiodBusOutput<N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        self.line.set_values(*values)?;
        Ok(())
    }
}
