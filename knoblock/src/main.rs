mod app;
mod config;
mod sampler;
mod utils;

use crate::app::{ARROW_BITMAP, ARROW_GLYPH, App, HEART_BITMAP, HEART_GLYPH};
use crate::config::Config;
use crate::sampler::{Sampler, SharedInput};
use crate::utils::DisplayExt;
use dotenv::dotenv;
use knoblock_gpio::GpioActiveLevel::Low;
use knoblock_gpio::GpioBias::PullUp;
use knoblock_gpio::GpioDriver;
use knoblock_gpio::debounce::TimedDebounce;
use knoblock_gpio::gpiod::GpiodDriver;
use knoblock_gpio::lcd::hd44780::driver::{GpioHD44780Driver, HD44780Driver};
use knoblock_gpio::led::RgbLed;
use knoblock_gpio::rotenc::RotaryEncoder;
use knoblock_gpio::ticker::Ticker;
use log::{debug, info};
use std::env::var;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Sampling period of the encoder task.
const TICK_PERIOD: Duration = Duration::from_millis(1);
/// Pace of the main polling loop.
const POLL_PERIOD: Duration = Duration::from_millis(50);

fn parse_pin_bus(pin_str: &str) -> eyre::Result<[usize; 4]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| eyre::eyre!("Invalid number of data pins"))
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv()?;
    pretty_env_logger::init();

    info!("knoblock starting...");

    // Get pin numbers from env
    let lcd_e_pin_no: usize = var("KNOBLOCK_LCD_PIN_E")?.parse()?;
    let lcd_rw_pin_no: usize = var("KNOBLOCK_LCD_PIN_RW")?.parse()?;
    let lcd_rs_pin_no: usize = var("KNOBLOCK_LCD_PIN_RS")?.parse()?;
    let lcd_data_pin_nos: [usize; 4] = parse_pin_bus(&var("KNOBLOCK_LCD_PINS_DATA")?)?;

    let enc_a_pin_no: usize = var("KNOBLOCK_ENC_PIN_A")?.parse()?;
    let enc_b_pin_no: usize = var("KNOBLOCK_ENC_PIN_B")?.parse()?;
    let enc_btn_pin_no: usize = var("KNOBLOCK_ENC_PIN_BTN")?.parse()?;

    let led_r_pin_no: usize = var("KNOBLOCK_LED_PIN_R")?.parse()?;
    let led_g_pin_no: usize = var("KNOBLOCK_LED_PIN_G")?.parse()?;
    let led_b_pin_no: usize = var("KNOBLOCK_LED_PIN_B")?.parse()?;

    let chip_path = var("KNOBLOCK_GPIO_CHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());

    info!(
        "LCD @ E: {}, RW: {}, RS: {}, Data: {:?}",
        lcd_e_pin_no, lcd_rw_pin_no, lcd_rs_pin_no, lcd_data_pin_nos
    );
    info!(
        "Encoder @ A: {}, B: {}, Btn: {}",
        enc_a_pin_no, enc_b_pin_no, enc_btn_pin_no
    );
    info!(
        "LED @ R: {}, G: {}, B: {}",
        led_r_pin_no, led_g_pin_no, led_b_pin_no
    );

    debug!("Initializing GPIO driver...");
    let gpio = GpiodDriver::open(&chip_path)?;
    debug!("{:?} initialized.", gpio);

    debug!("Initializing LCD driver...");
    let mut lcd_e_pin = gpio.get_pin(lcd_e_pin_no)?;
    let lcd_e_out = lcd_e_pin.as_output()?;
    let mut lcd_rw_pin = gpio.get_pin(lcd_rw_pin_no)?;
    let lcd_rw_out = lcd_rw_pin.as_output()?;
    let mut lcd_rs_pin = gpio.get_pin(lcd_rs_pin_no)?;
    let lcd_rs_out = lcd_rs_pin.as_output()?;
    let mut lcd_data_bus = gpio.get_pin_bus(lcd_data_pin_nos)?;
    let mut lcd = GpioHD44780Driver::new_4bit(
        &*lcd_e_out,
        Some(&*lcd_rw_out),
        &*lcd_rs_out,
        &mut *lcd_data_bus,
    );

    lcd.init(true, false)?;

    lcd.create_char(HEART_GLYPH, HEART_BITMAP)?;
    lcd.create_char(ARROW_GLYPH, ARROW_BITMAP)?;

    lcd.set_cursor(0, 0)?;
    lcd.print("knoblock")?;

    const LAST_LINE: &'static str = concat!("v.", env!("CARGO_PKG_VERSION"), "...");

    lcd.set_cursor(1, 16 - LAST_LINE.len())?;
    lcd.print(LAST_LINE)?;

    debug!("{:?} initialized.", lcd);

    debug!("Initializing encoder...");
    let mut enc_a_pin = gpio.get_pin(enc_a_pin_no)?;
    enc_a_pin.set_bias(PullUp)?;
    let enc_a_in = enc_a_pin.as_input()?;
    let mut enc_b_pin = gpio.get_pin(enc_b_pin_no)?;
    enc_b_pin.set_bias(PullUp)?;
    let enc_b_in = enc_b_pin.as_input()?;
    let mut enc_btn_pin = gpio.get_pin(enc_btn_pin_no)?;
    enc_btn_pin.set_bias(PullUp)?;
    enc_btn_pin.set_active_level(Low)?;
    let enc_btn_in = enc_btn_pin.as_input()?;
    let enc_btn = TimedDebounce::new(enc_btn_in).with_window(Duration::from_millis(20));

    let encoder = RotaryEncoder::new(enc_a_in, enc_b_in, Box::new(enc_btn));
    debug!("{:?} initialized.", encoder);

    debug!("Initializing indicator...");
    let mut led_r_pin = gpio.get_pin(led_r_pin_no)?;
    let led_r_out = led_r_pin.as_output()?;
    let mut led_g_pin = gpio.get_pin(led_g_pin_no)?;
    let led_g_out = led_g_pin.as_output()?;
    let mut led_b_pin = gpio.get_pin(led_b_pin_no)?;
    let led_b_out = led_b_pin.as_output()?;
    let mut led = RgbLed::new(led_r_out, led_g_out, led_b_out);
    led.off()?;
    debug!("{:?} initialized.", led);

    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load() {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };

    debug!("Result dwell is {} ms.", config.dwell_ms);

    info!("knoblock initialized.");

    thread::sleep(Duration::from_secs(1));

    let shared = Arc::new(SharedInput::default());
    let mut sampler = Sampler::new(encoder, shared.clone())?;
    let mut app = App::new(config, &mut lcd, led, shared);

    info!("Starting main loop...");

    thread::scope(|scope| -> eyre::Result<()> {
        let _sampler_thread = Ticker::spawn_in(scope, TICK_PERIOD, move || sampler.tick());

        loop {
            app.update()?;
            thread::sleep(POLL_PERIOD);
        }
    })
}
