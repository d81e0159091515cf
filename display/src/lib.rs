pub mod oled;
pub mod status;

pub use oled::Oled;
pub use status::{compass_arrow, draw_status, status_lines, Arrow, Status, StatusDisplay};
