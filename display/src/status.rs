use core::f32::consts::FRAC_PI_2;
use core::fmt::Write;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle, Triangle};
use embedded_graphics::text::{Baseline, Text};
use heapless::String;
use sensors::ClimateReading;

// 128x64 layout: text panel on the left, compass on the right.
const TITLE: &str = "Light Tracker";
const DIVIDER_X: i32 = 78;
const TITLE_RULE_Y: i32 = 10;
const LINE_Y: [i32; 4] = [15, 25, 35, 45];
const COMPASS_CENTER: Point = Point::new(105, 32);
const COMPASS_RADIUS: i32 = 25;
const ARROW_HEAD: i32 = 6;

/// What the operator sees each cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
    pub bearing: f32,
    pub average_lux: f32,
    pub climate: Option<ClimateReading>,
}

pub trait StatusDisplay {
    fn show(&mut self, status: &Status) -> anyhow::Result<()>;
}

/// A display that is not fitted.
impl<T: StatusDisplay> StatusDisplay for Option<T> {
    fn show(&mut self, status: &Status) -> anyhow::Result<()> {
        match self {
            Some(display) => display.show(status),
            None => Ok(()),
        }
    }
}

pub type StatusLine = String<24>;

fn line(label: &str, value: Option<f32>) -> StatusLine {
    let mut s = StatusLine::new();
    // Values too long for the panel are cut off, like on the screen.
    let _ = match value {
        Some(v) => write!(s, "{}: {:.1}", label, v),
        None => write!(s, "{}: --", label),
    };
    s
}

pub fn status_lines(status: &Status) -> [StatusLine; 4] {
    [
        line("Ang", Some(status.bearing)),
        line("Lux", Some(status.average_lux)),
        line("Tmp", status.climate.map(|c| c.temperature)),
        line("Hum", status.climate.map(|c| c.humidity)),
    ]
}

/// Compass needle in screen coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrow {
    pub tip: Point,
    pub left: Point,
    pub right: Point,
}

pub fn compass_arrow(bearing: f32, center: Point, radius: i32, head: i32) -> Arrow {
    let rad = bearing.to_radians();
    let perp = rad + FRAC_PI_2;
    let (sin, cos) = rad.sin_cos();
    let (psin, pcos) = perp.sin_cos();
    let r = radius as f32;
    let h = head as f32;
    let half = (head / 2) as f32;

    let tip_x = (center.x as f32 + r * cos) as i32;
    let tip_y = (center.y as f32 - r * sin) as i32;
    let (tx, ty) = (tip_x as f32, tip_y as f32);

    Arrow {
        tip: Point::new(tip_x, tip_y),
        left: Point::new(
            (tx - h * cos + half * pcos) as i32,
            (ty + h * sin - half * psin) as i32,
        ),
        right: Point::new(
            (tx - h * cos - half * pcos) as i32,
            (ty + h * sin + half * psin) as i32,
        ),
    }
}

/// Renders the whole status screen onto `target`, clearing it first.
pub fn draw_status<D>(target: &mut D, status: &Status) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let text = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let stroke = PrimitiveStyle::with_stroke(BinaryColor::On, 1);

    target.clear(BinaryColor::Off)?;

    Text::with_baseline(TITLE, Point::zero(), text, Baseline::Top).draw(target)?;
    Line::new(Point::new(0, TITLE_RULE_Y), Point::new(DIVIDER_X, TITLE_RULE_Y))
        .into_styled(stroke)
        .draw(target)?;
    Line::new(Point::new(DIVIDER_X, 0), Point::new(DIVIDER_X, 64))
        .into_styled(stroke)
        .draw(target)?;

    for (y, s) in LINE_Y.iter().zip(status_lines(status).iter()) {
        Text::with_baseline(s.as_str(), Point::new(0, *y), text, Baseline::Top).draw(target)?;
    }

    Circle::with_center(COMPASS_CENTER, (2 * COMPASS_RADIUS + 1) as u32)
        .into_styled(stroke)
        .draw(target)?;
    let arrow = compass_arrow(status.bearing, COMPASS_CENTER, COMPASS_RADIUS, ARROW_HEAD);
    Line::new(COMPASS_CENTER, arrow.tip)
        .into_styled(stroke)
        .draw(target)?;
    Triangle::new(arrow.tip, arrow.left, arrow.right)
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(target)?;
    Ok(())
}
