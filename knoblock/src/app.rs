//! The module for the main app state and logic: screen rendering and the
//! code-entry flow.

use crate::config::Config;
use crate::sampler::SharedInput;
use crate::utils::DisplayExt;
use knoblock_gpio::GpioResult;
use knoblock_gpio::lcd::hd44780::driver::HD44780Driver;
use knoblock_gpio::led::{LedColor, RgbLed};
use log::{info, warn};
use std::sync::Arc;
use std::thread;

/// CGRAM code point of the heart glyph shown on a successful unlock.
pub const HEART_GLYPH: u8 = 0x02;
/// CGRAM code point of the prompt arrow glyph.
pub const ARROW_GLYPH: u8 = 0x03;

pub const HEART_BITMAP: [u8; 8] = [
    0b00000,
    0b01010,
    0b11111,
    0b11111,
    0b11111,
    0b01110,
    0b00100,
    0b00000,
];

pub const ARROW_BITMAP: [u8; 8] = [
    0b01000,
    0b01100,
    0b01110,
    0b01111,
    0b01110,
    0b01100,
    0b01000,
    0b00000,
];

/// Number of digits in the code.
const CODE_LEN: u8 = 4;
/// The display row the entry slots and results live on.
const ENTRY_ROW: usize = 1;

/// The menu screens, in selection order.
///
/// There is exactly one today; adding a screen means adding a variant here
/// and an arm to [Screen::render] and [App::handle_press]. The selection
/// range follows the list.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Screen {
    CodeEntry,
}

impl Screen {
    pub const ALL: [Screen; 1] = [Screen::CodeEntry];

    /// Full redraw of this screen's static parts. The caller clears first.
    fn render(&self, lcd: &mut dyn HD44780Driver) -> GpioResult<()> {
        match self {
            Screen::CodeEntry => {
                lcd.set_cursor(0, 1)?;
                lcd.print("ENTER PASSWORD")?;
                lcd.set_cursor(ENTRY_ROW, 0)?;
                lcd.send_data(ARROW_GLYPH)?;
            }
        }
        Ok(())
    }
}

/// Largest valid menu selection index.
pub const MAX_SELECTION: u8 = (Screen::ALL.len() - 1) as u8;

/// The main app state struct: polls the shared input snapshot and drives the
/// display and the indicator.
pub struct App<'a> {
    /// The configuration for the app.
    config: Config,
    /// The LCD driver for the app.
    lcd: &'a mut dyn HD44780Driver,
    /// The lock state indicator.
    led: RgbLed<'a>,
    /// The snapshot fed by the sampling thread.
    shared: Arc<SharedInput>,

    /// The selection the display currently shows, if any.
    rendered_selection: Option<u8>,
    /// The active entry slot, 1 through 4; 5 means the code is complete.
    cursor: u8,
    /// Digits committed so far, in entry order.
    entry: [u8; 4],
}

impl<'a> App<'a> {
    pub fn new(
        config: Config,
        lcd: &'a mut dyn HD44780Driver,
        led: RgbLed<'a>,
        shared: Arc<SharedInput>,
    ) -> App<'a> {
        App {
            config,
            lcd,
            led,
            shared,
            rendered_selection: None,
            cursor: 1,
            entry: [0; 4],
        }
    }

    /// One iteration of the main loop.
    pub fn update(&mut self) -> GpioResult<()> {
        let selection = self.shared.selection().min(MAX_SELECTION);

        // Redraw only when the selection actually moved; never per poll.
        if self.rendered_selection != Some(selection) {
            self.lcd.clear_display()?;
            Screen::ALL[selection as usize].render(self.lcd)?;
            self.cursor = 1;
            self.draw_active_digit()?;
            self.rendered_selection = Some(selection);
        }

        // Keep the active slot tracking the knob so rotation is visible
        // before the digit is committed.
        if self.cursor <= CODE_LEN {
            self.draw_active_digit()?;
        }

        if self.shared.take_button_edge() {
            self.handle_press(selection)?;
        }

        Ok(())
    }

    fn draw_active_digit(&mut self) -> GpioResult<()> {
        self.lcd.set_cursor(ENTRY_ROW, self.cursor as usize)?;
        self.lcd.send_data(b'0' + self.shared.digit())
    }

    fn handle_press(&mut self, selection: u8) -> GpioResult<()> {
        match Screen::ALL[selection as usize] {
            Screen::CodeEntry => self.commit_digit(),
        }
    }

    fn commit_digit(&mut self) -> GpioResult<()> {
        if self.cursor <= CODE_LEN {
            let digit = self.shared.digit();
            self.entry[(self.cursor - 1) as usize] = digit;
            self.lcd.set_cursor(ENTRY_ROW, self.cursor as usize)?;
            self.lcd.send_data(b'0' + digit)?;
            self.cursor += 1;
        }
        // Out of range without being complete writes nothing; unreachable
        // while the cursor invariant holds.

        if self.cursor == CODE_LEN + 1 {
            self.evaluate()?;
        }

        Ok(())
    }

    /// Compares the completed entry against the reference code, shows the
    /// verdict for the dwell window, then rearms for the next attempt.
    fn evaluate(&mut self) -> GpioResult<()> {
        let unlocked = self.entry == self.config.code;

        self.lcd.set_cursor(ENTRY_ROW, 1)?;
        if unlocked {
            info!("Correct code entered. Unlocking.");
            self.led.set(LedColor::Green)?;
            self.lcd.print("UNLOCKED")?;
            for col in 10..=12 {
                self.lcd.set_cursor(ENTRY_ROW, col)?;
                self.lcd.send_data(HEART_GLYPH)?;
            }
        } else {
            warn!("Incorrect code entered.");
            self.led.set(LedColor::Red)?;
            self.lcd.print("LOCKED")?;
        }

        // Sampling continues on the tick thread during the wait.
        thread::sleep(self.config.dwell());

        self.led.set(LedColor::Off)?;
        self.lcd.clear_display()?;

        // Rearm for the next attempt.
        self.cursor = 1;
        self.shared.reset_digit();
        if let Some(selection) = self.rendered_selection {
            Screen::ALL[selection as usize].render(self.lcd)?;
        }
        self.draw_active_digit()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knoblock_gpio::GpioOutput;
    use std::sync::Mutex;

    /// In-memory display. Everything the trait's default methods emit comes
    /// through `send_command`/`send_data`, so interpreting clear and DDRAM
    /// addressing is enough to reconstruct the visible panel.
    #[derive(Debug)]
    struct TestLcd {
        rows: [[u8; 16]; 2],
        address: usize,
        clears: usize,
        data_log: Vec<u8>,
    }

    impl Default for TestLcd {
        fn default() -> Self {
            Self {
                rows: [[b' '; 16]; 2],
                address: 0,
                clears: 0,
                data_log: Vec::new(),
            }
        }
    }

    impl HD44780Driver for TestLcd {
        fn init(&mut self, _two_lines: bool, _alt_font: bool) -> GpioResult<()> {
            Ok(())
        }

        fn send_command(&mut self, command: u8) -> GpioResult<()> {
            if command == 0b00000001 {
                self.clears += 1;
                self.rows = [[b' '; 16]; 2];
                self.address = 0;
            } else if command & 0b10000000 != 0 {
                self.address = (command & 0b01111111) as usize;
            }
            Ok(())
        }

        fn send_data(&mut self, data: u8) -> GpioResult<()> {
            self.data_log.push(data);
            let row = self.address / 0x40;
            let col = self.address % 0x40;
            if row < 2 && col < 16 {
                self.rows[row][col] = data;
            }
            self.address += 1;
            Ok(())
        }
    }

    impl TestLcd {
        fn row_text(&self, row: usize) -> String {
            String::from_utf8_lossy(&self.rows[row]).into_owned()
        }

        fn log_text(&self) -> String {
            String::from_utf8_lossy(&self.data_log).into_owned()
        }
    }

    #[derive(Debug, Clone, Default)]
    struct RecordingPin(Arc<Mutex<Vec<bool>>>);

    impl RecordingPin {
        fn history(&self) -> Vec<bool> {
            self.0.lock().unwrap().clone()
        }
    }

    impl GpioOutput for RecordingPin {
        fn write(&self, value: bool) -> GpioResult<()> {
            self.0.lock().unwrap().push(value);
            Ok(())
        }
    }

    fn recording_led() -> (RgbLed<'static>, RecordingPin, RecordingPin) {
        let red = RecordingPin::default();
        let green = RecordingPin::default();
        let blue = RecordingPin::default();
        let led = RgbLed::new(
            Box::new(red.clone()),
            Box::new(green.clone()),
            Box::new(blue),
        );
        (led, red, green)
    }

    fn config(code: [u8; 4]) -> Config {
        Config { code, dwell_ms: 0 }
    }

    fn press_digit(app: &mut App<'_>, shared: &SharedInput, digit: u8) {
        shared.force_digit(digit);
        shared.force_button_edge();
        app.update().unwrap();
    }

    #[test]
    fn first_update_renders_prompt_exactly_once() {
        let mut lcd = TestLcd::default();
        let (led, _red, _green) = recording_led();
        let shared = Arc::new(SharedInput::default());
        {
            let mut app = App::new(config([2, 3, 4, 5]), &mut lcd, led, shared.clone());
            for _ in 0..5 {
                app.update().unwrap();
            }
        }

        assert_eq!(lcd.clears, 1);
        assert!(lcd.row_text(0).contains("ENTER PASSWORD"));
        assert_eq!(lcd.rows[1][0], ARROW_GLYPH);
        assert_eq!(lcd.rows[1][1], b'0');
    }

    #[test]
    fn rotation_is_visible_before_commit() {
        let mut lcd = TestLcd::default();
        let (led, _red, _green) = recording_led();
        let shared = Arc::new(SharedInput::default());
        {
            let mut app = App::new(config([2, 3, 4, 5]), &mut lcd, led, shared.clone());
            app.update().unwrap();
            shared.force_digit(7);
            app.update().unwrap();
        }

        assert_eq!(lcd.rows[1][1], b'7');
    }

    #[test]
    fn committed_digit_stays_and_entry_advances() {
        let mut lcd = TestLcd::default();
        let (led, _red, _green) = recording_led();
        let shared = Arc::new(SharedInput::default());
        {
            let mut app = App::new(config([2, 3, 4, 5]), &mut lcd, led, shared.clone());
            app.update().unwrap();
            press_digit(&mut app, &shared, 1);
            shared.force_digit(5);
            app.update().unwrap();
        }

        assert_eq!(lcd.rows[1][1], b'1');
        assert_eq!(lcd.rows[1][2], b'5');
    }

    #[test]
    fn reference_code_unlocks() {
        let mut lcd = TestLcd::default();
        let (led, red, green) = recording_led();
        let shared = Arc::new(SharedInput::default());
        {
            let mut app = App::new(config([2, 3, 4, 5]), &mut lcd, led, shared.clone());
            app.update().unwrap();
            for digit in [2, 3, 4, 5] {
                press_digit(&mut app, &shared, digit);
            }
        }

        // Exactly one evaluation: green on, then off again after the dwell.
        assert_eq!(green.history(), vec![true, false]);
        assert_eq!(red.history(), vec![false, false]);
        assert!(lcd.log_text().contains("UNLOCKED"));
        assert_eq!(
            lcd.data_log.iter().filter(|&&b| b == HEART_GLYPH).count(),
            3
        );
    }

    #[test]
    fn wrong_code_locks() {
        let mut lcd = TestLcd::default();
        let (led, red, green) = recording_led();
        let shared = Arc::new(SharedInput::default());
        {
            let mut app = App::new(config([2, 3, 4, 5]), &mut lcd, led, shared.clone());
            app.update().unwrap();
            for digit in [1, 1, 1, 1] {
                press_digit(&mut app, &shared, digit);
            }
        }

        assert_eq!(red.history(), vec![true, false]);
        assert_eq!(green.history(), vec![false, false]);
        assert!(lcd.log_text().contains("LOCKED"));
        assert!(!lcd.log_text().contains("UNLOCKED"));
    }

    #[test]
    fn entry_order_matters() {
        let mut lcd = TestLcd::default();
        let (led, red, green) = recording_led();
        let shared = Arc::new(SharedInput::default());
        {
            let mut app = App::new(config([1, 2, 3, 4]), &mut lcd, led, shared.clone());
            app.update().unwrap();
            for digit in [4, 3, 2, 1] {
                press_digit(&mut app, &shared, digit);
            }
        }

        assert_eq!(red.history(), vec![true, false]);
        assert_eq!(green.history(), vec![false, false]);
    }

    #[test]
    fn attempt_resets_and_can_repeat() {
        let mut lcd = TestLcd::default();
        let (led, _red, green) = recording_led();
        let shared = Arc::new(SharedInput::default());
        {
            let mut app = App::new(config([2, 3, 4, 5]), &mut lcd, led, shared.clone());
            app.update().unwrap();
            for _ in 0..2 {
                for digit in [2, 3, 4, 5] {
                    press_digit(&mut app, &shared, digit);
                }
            }
        }

        // Both attempts evaluated, independently.
        assert_eq!(green.history(), vec![true, false, true, false]);
        // And the display is back at the prompt with the digit rearmed.
        assert_eq!(shared.digit(), 0);
        assert!(lcd.row_text(0).contains("ENTER PASSWORD"));
        assert_eq!(lcd.rows[1][1], b'0');
    }

    #[test]
    fn out_of_range_selection_falls_back_to_last_screen() {
        let mut lcd = TestLcd::default();
        let (led, _red, _green) = recording_led();
        let shared = Arc::new(SharedInput::default());
        shared.force_selection(3);
        {
            let mut app = App::new(config([2, 3, 4, 5]), &mut lcd, led, shared.clone());
            app.update().unwrap();
        }

        assert!(lcd.row_text(0).contains("ENTER PASSWORD"));
    }
}
