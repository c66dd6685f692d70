#![deny(unsafe_code)]
#![deny(warnings)]
//! SSD1306 OLED (128x64, I2C) as the engine's text display

use defmt::warn;
use embedded_graphics::mono_font::ascii::FONT_5X7;
use embedded_graphics::mono_font::MonoTextStyleBuilder;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use hal_abstractions::{Color, Display};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

use crate::SharedI2c;

type Driver = Ssd1306<
    I2CInterface<SharedI2c>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// The panel did not acknowledge a transfer
#[derive(Debug, Clone, Copy, defmt::Format)]
pub struct OledError;

/// Buffered SSD1306 panel
pub struct OledDisplay {
    driver: Driver,
}

impl OledDisplay {
    /// Initialize the panel; it is left on with an empty frame
    pub fn new(i2c: SharedI2c) -> Result<Self, OledError> {
        let interface = I2CDisplayInterface::new(i2c);
        let mut driver = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        driver.init().map_err(log_error)?;
        driver.clear_buffer();
        driver.flush().map_err(log_error)?;
        Ok(Self { driver })
    }
}

fn log_error<E: core::fmt::Debug>(e: E) -> OledError {
    warn!("SSD1306 error: {:?}", defmt::Debug2Format(&e));
    OledError
}

fn binary(color: Color) -> BinaryColor {
    match color {
        Color::On => BinaryColor::On,
        Color::Off => BinaryColor::Off,
    }
}

impl Display for OledDisplay {
    type Error = OledError;

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.driver.clear_buffer();
        Ok(())
    }

    fn draw_text(
        &mut self,
        x: i32,
        y: i32,
        text: &str,
        foreground: Color,
        background: Color,
    ) -> Result<(), Self::Error> {
        let style = MonoTextStyleBuilder::new()
            .font(&FONT_5X7)
            .text_color(binary(foreground))
            .background_color(binary(background))
            .build();
        Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
            .draw(&mut self.driver)
            .map_err(log_error)?;
        Ok(())
    }

    fn present(&mut self) -> Result<(), Self::Error> {
        self.driver.flush().map_err(log_error)
    }

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        self.driver.set_display_on(on).map_err(log_error)
    }
}
