use knoblock_gpio::lcd::hd44780::driver::HD44780Driver;
use knoblock_gpio::{GpioError, GpioResult};
use log::warn;
use std::ops::RangeBounds;

pub trait WithinExt {
    fn within(&self, range: impl RangeBounds<Self>) -> bool;
}

impl<T: PartialOrd<T>> WithinExt for T {
    fn within(&self, range: impl RangeBounds<Self>) -> bool {
        range.contains(self)
    }
}

/// Convenience text operations for the 16x2 panel.
pub trait DisplayExt {
    fn print(&mut self, s: &str) -> GpioResult<()>;
    fn set_cursor(&mut self, row: usize, col: usize) -> GpioResult<()>;
}

impl<T: ?Sized + HD44780Driver> DisplayExt for T {
    fn print(&mut self, s: &str) -> GpioResult<()> {
        for c in s.chars() {
            if c.is_ascii() {
                self.send_data(c as u8)?;
            } else {
                warn!("Non-ASCII character: {}", c);
                self.send_data(b'?')?
            }
        }
        Ok(())
    }

    fn set_cursor(&mut self, row: usize, col: usize) -> GpioResult<()> {
        if !row.within(0..2) || !col.within(0..16) {
            return Err(GpioError::InvalidArgument);
        }
        self.set_ddram_address((col + 0x40 * row) as u8)
    }
}
