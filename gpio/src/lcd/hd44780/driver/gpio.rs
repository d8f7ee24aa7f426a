use crate::lcd::hd44780::driver::{CursorDirection, HD44780Driver};
use crate::{GpioBus, GpioOutput, GpioResult};
use log::trace;
use std::thread::sleep;
use std::time::Duration;

#[derive(Debug)]
pub enum GpioHD44780Bus<'a> {
    Bus8Bit(&'a mut dyn GpioBus<8>),
    Bus4Bit(&'a mut dyn GpioBus<4>),
}

impl GpioHD44780Bus<'_> {
    pub fn is_8bit(&self) -> bool {
        matches!(self, GpioHD44780Bus::Bus8Bit(_))
    }

    pub fn is_4bit(&self) -> bool {
        matches!(self, GpioHD44780Bus::Bus4Bit(_))
    }
}

/// Bit-banged HD44780 driver over GPIO lines: E and RS control pins and a
/// 4- or 8-bit data bus. The RW pin is optional and, when present, is only
/// ever driven low (the driver never reads back from the controller).
#[derive(Debug)]
pub struct GpioHD44780Driver<'a> {
    pin_e: &'a dyn GpioOutput,
    pin_rw: Option<&'a dyn GpioOutput>,
    pin_rs: &'a dyn GpioOutput,
    data_bus: GpioHD44780Bus<'a>,
}

impl<'a> GpioHD44780Driver<'a> {
    pub fn new_4bit(
        pin_e: &'a dyn GpioOutput,
        pin_rw: Option<&'a dyn GpioOutput>,
        pin_rs: &'a dyn GpioOutput,
        data_bus: &'a mut dyn GpioBus<4>,
    ) -> Self {
        GpioHD44780Driver {
            pin_e,
            pin_rw,
            pin_rs,
            data_bus: GpioHD44780Bus::Bus4Bit(data_bus),
        }
    }

    pub fn new_8bit(
        pin_e: &'a dyn GpioOutput,
        pin_rw: Option<&'a dyn GpioOutput>,
        pin_rs: &'a dyn GpioOutput,
        data_bus: &'a mut dyn GpioBus<8>,
    ) -> Self {
        GpioHD44780Driver {
            pin_e,
            pin_rw,
            pin_rs,
            data_bus: GpioHD44780Bus::Bus8Bit(data_bus),
        }
    }

    fn pulse_e(pin: &dyn GpioOutput) -> GpioResult<()> {
        pin.write(true)?;
        sleep(Duration::from_micros(1));
        pin.write(false)?;
        // Leaves time for the controller to latch and execute.
        sleep(Duration::from_millis(1));
        Ok(())
    }

    fn send(&mut self, data: u8, rs: bool) -> GpioResult<()> {
        trace!("Sending data: {:08b}, RS: {}", data, rs);

        self.pin_rs.write(rs)?;

        if let Some(rw) = self.pin_rw {
            rw.write(false)?;
        }

        match &mut self.data_bus {
            GpioHD44780Bus::Bus8Bit(bus) => {
                let out = bus.as_output()?;
                out.write_byte(data)?;
                Self::pulse_e(self.pin_e)?;
            }
            GpioHD44780Bus::Bus4Bit(bus) => {
                let out = bus.as_output()?;
                let high_nibble = (data >> 4) & 0x0F;
                let low_nibble = data & 0x0F;
                trace!("Writing HN: {:04b}", high_nibble);
                out.write_nibble(high_nibble)?;
                Self::pulse_e(self.pin_e)?;
                trace!("Writing LN: {:04b}", low_nibble);
                out.write_nibble(low_nibble)?;
                Self::pulse_e(self.pin_e)?;
            }
        }

        Ok(())
    }
}

impl HD44780Driver for GpioHD44780Driver<'_> {
    fn init(&mut self, two_lines: bool, alt_font: bool) -> GpioResult<()> {
        // Synchronize the interface width, then configure.
        match self.data_bus {
            GpioHD44780Bus::Bus8Bit(_) => {
                self.send(0b00111000, false)?;
                self.send(0b00111000, false)?;
                self.send(0b00111000, false)?;
            }
            GpioHD44780Bus::Bus4Bit(_) => {
                self.send(0b00110011, false)?;
                self.send(0b00110010, false)?;
            }
        }
        self.function_set(self.data_bus.is_8bit(), two_lines, alt_font)?;
        self.clear_display()?;
        self.set_display_control(true, false, false)?;
        self.set_entry_mode(CursorDirection::Right, false)?;
        Ok(())
    }

    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, false)
    }

    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.send(data, true)
    }
}
