use anyhow::anyhow;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

use crate::status::{draw_status, Status, StatusDisplay};

type Panel<I2C> = Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// 128x64 SSD1306 panel on I2C.
pub struct Oled<I2C> {
    panel: Panel<I2C>,
}

impl<I2C> Oled<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// Initializes the panel at `address` (0x3C or 0x3D) and shows a
    /// start-up message.
    pub fn new(i2c: I2C, address: u8) -> anyhow::Result<Oled<I2C>> {
        log::info!("Starting display initialization...");
        let interface = I2CDisplayInterface::new_custom_address(i2c, address);
        let mut panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        panel
            .init()
            .map_err(|e| anyhow!("SSD1306 init at {:#04x} failed: {:?}", address, e))?;

        let mut oled = Oled { panel };
        oled.splash("Starting...")?;
        log::info!("Display initialized");
        Ok(oled)
    }

    fn splash(&mut self, message: &str) -> anyhow::Result<()> {
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        self.panel
            .clear(BinaryColor::Off)
            .map_err(|e| anyhow!("display clear failed: {:?}", e))?;
        Text::with_baseline(message, Point::zero(), style, Baseline::Top)
            .draw(&mut self.panel)
            .map_err(|e| anyhow!("display draw failed: {:?}", e))?;
        self.flush()
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.panel
            .flush()
            .map_err(|e| anyhow!("display flush failed: {:?}", e))
    }
}

impl<I2C> StatusDisplay for Oled<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    fn show(&mut self, status: &Status) -> anyhow::Result<()> {
        draw_status(&mut self.panel, status).map_err(|e| anyhow!("display draw failed: {:?}", e))?;
        self.flush()
    }
}
