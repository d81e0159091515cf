pub mod clock {
    use anyhow::anyhow;
    use chrono::NaiveDateTime;
    use core::fmt::{self, Debug, Display};
    use ds323x::interface::I2cInterface;
    use ds323x::{ic, DateTimeAccess, Ds323x};
    use std::time::Instant;

    /// When a cycle happened: wall time if an RTC is fitted, otherwise
    /// milliseconds since boot.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Stamp {
        Uptime(u64),
        Wall(NaiveDateTime),
    }

    impl Display for Stamp {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Stamp::Uptime(ms) => write!(f, "{}", ms),
                Stamp::Wall(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            }
        }
    }

    pub trait Timestamp {
        fn now(&mut self) -> Stamp;
    }

    /// Milliseconds since construction.
    pub struct Uptime {
        started: Instant,
    }

    impl Uptime {
        pub fn new() -> Uptime {
            Uptime {
                started: Instant::now(),
            }
        }

        pub fn millis(&self) -> u64 {
            self.started.elapsed().as_millis() as u64
        }
    }

    impl Default for Uptime {
        fn default() -> Self {
            Uptime::new()
        }
    }

    impl Timestamp for Uptime {
        fn now(&mut self) -> Stamp {
            Stamp::Uptime(self.millis())
        }
    }

    /// DS3231 real-time clock on I2C.
    pub struct Clock<I2C> {
        rtc: Ds323x<I2cInterface<I2C>, ic::DS3231>,
        uptime: Uptime,
    }

    impl<I2C, E> Clock<I2C>
    where
        I2C: embedded_hal::i2c::I2c<Error = E>,
        E: Debug,
    {
        pub fn new(i2c: I2C) -> Clock<I2C> {
            Clock {
                rtc: Ds323x::new_ds3231(i2c),
                uptime: Uptime::new(),
            }
        }

        /// Method for setting the RTC date and time
        pub fn set_date_time(&mut self, date_time: &NaiveDateTime) -> anyhow::Result<()> {
            self.rtc
                .set_datetime(date_time)
                .map_err(|e| anyhow!("RTC write failed: {:?}", e))
        }

        /// Method for returning the RTC date and time
        pub fn get_date_time(&mut self) -> anyhow::Result<NaiveDateTime> {
            self.rtc
                .datetime()
                .map_err(|e| anyhow!("RTC read failed: {:?}", e))
        }

        pub fn destroy(self) -> I2C {
            self.rtc.destroy_ds3231()
        }
    }

    impl<I2C, E> Timestamp for Clock<I2C>
    where
        I2C: embedded_hal::i2c::I2c<Error = E>,
        E: Debug,
    {
        /// Falls back to uptime when the RTC does not answer.
        fn now(&mut self) -> Stamp {
            match self.get_date_time() {
                Ok(dt) => Stamp::Wall(dt),
                Err(e) => {
                    log::warn!("{}, using uptime", e);
                    self.uptime.now()
                }
            }
        }
    }

    /// The configured time source; boards without an RTC use uptime.
    pub enum TimeSource<I2C> {
        Rtc(Clock<I2C>),
        Uptime(Uptime),
    }

    impl<I2C, E> Timestamp for TimeSource<I2C>
    where
        I2C: embedded_hal::i2c::I2c<Error = E>,
        E: Debug,
    {
        fn now(&mut self) -> Stamp {
            match self {
                TimeSource::Rtc(clock) => clock.now(),
                TimeSource::Uptime(uptime) => uptime.now(),
            }
        }
    }

}

pub use clock::{Clock, Stamp, TimeSource, Timestamp, Uptime};
