pub mod datalog {
    use anyhow::Context;
    use clock::Stamp;
    use gradient::IlluminanceSample;
    use sensors::ClimateReading;
    use std::fmt::Write as _;
    use std::io::Write;

    pub const HEADER: &str = "Time, Lux1, Lux2, Lux3, Bearing, Angle, Temp, Humidity";

    /// One line of the tracking log.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Record {
        pub stamp: Stamp,
        pub sample: IlluminanceSample,
        pub bearing: f32,
        pub position: i32,
        pub climate: Option<ClimateReading>,
    }

    impl Record {
        /// Comma separated, two decimals, empty climate fields when the
        /// sensor is absent or failed.
        pub fn to_line(&self) -> String {
            let [lux1, lux2, lux3] = self.sample.lux;
            let mut line = format!(
                "{}, {:.2}, {:.2}, {:.2}, {:.2}, {:.2}",
                self.stamp, lux1, lux2, lux3, self.bearing, self.position as f32
            );
            match self.climate {
                Some(c) => {
                    let _ = write!(line, ", {:.2}, {:.2}", c.temperature, c.humidity);
                }
                None => line.push_str(", , "),
            }
            line
        }
    }

    /// Append-only CSV log.
    pub struct Logbook<W> {
        out: W,
        lines: u64,
    }

    impl<W: Write> Logbook<W> {
        pub fn new(out: W) -> Logbook<W> {
            Logbook { out, lines: 0 }
        }

        /// Starts a fresh file with the column header.
        pub fn with_header(mut out: W) -> anyhow::Result<Logbook<W>> {
            writeln!(out, "{}", HEADER).context("writing log header")?;
            out.flush().context("flushing log header")?;
            Ok(Logbook { out, lines: 0 })
        }

        pub fn append(&mut self, record: &Record) -> anyhow::Result<()> {
            let line = record.to_line();
            writeln!(self.out, "{}", line).context("writing log record")?;
            self.out.flush().context("flushing log record")?;
            self.lines += 1;
            log::debug!("Logged: {}", line);
            Ok(())
        }

        /// Records appended since the logbook was opened.
        pub fn lines(&self) -> u64 {
            self.lines
        }

        pub fn into_inner(self) -> W {
            self.out
        }
    }

}

pub use datalog::{Logbook, Record, HEADER};
