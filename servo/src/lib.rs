pub mod servo {
    use anyhow::anyhow;
    use embedded_hal::pwm::SetDutyCycle;
    use gradient::ActuatorRange;

    /// Something that can be pointed at an angle in whole degrees.
    pub trait AngleActuator {
        /// Moves to `angle`, saturating at the actuator's travel limits.
        fn set_angle(&mut self, angle: i32) -> anyhow::Result<()>;

        /// Last commanded angle.
        fn angle(&self) -> i32;
    }

    /// Pulse timing of a standard hobby servo.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct PulseTiming {
        /// Pulse width at 0 degrees.
        pub min_pulse_us: u32,
        /// Pulse width at `travel` degrees.
        pub max_pulse_us: u32,
        pub period_us: u32,
        pub travel: u32,
    }

    impl Default for PulseTiming {
        /// SG90 style: 0.5-2.5 ms over 180 degrees at 50 Hz.
        fn default() -> Self {
            PulseTiming {
                min_pulse_us: 500,
                max_pulse_us: 2500,
                period_us: 20_000,
                travel: 180,
            }
        }
    }

    impl PulseTiming {
        pub fn pulse_us(&self, angle: u32) -> u32 {
            let angle = angle.min(self.travel);
            let span = self.max_pulse_us.saturating_sub(self.min_pulse_us);
            self.min_pulse_us + angle * span / self.travel.max(1)
        }
    }

    /// Servo driven from any PWM channel configured for the servo frame rate.
    pub struct Servo<P> {
        pwm: P,
        timing: PulseTiming,
        range: ActuatorRange,
        angle: i32,
    }

    impl<P> Servo<P>
    where
        P: SetDutyCycle,
    {
        pub fn new(pwm: P, timing: PulseTiming, range: ActuatorRange) -> anyhow::Result<Servo<P>> {
            if timing.period_us == 0 || timing.max_pulse_us > timing.period_us {
                return Err(anyhow!(
                    "pulse of {} us does not fit a {} us period",
                    timing.max_pulse_us,
                    timing.period_us
                ));
            }
            Ok(Servo {
                pwm,
                timing,
                range,
                angle: range.midpoint(),
            })
        }

        pub fn range(&self) -> ActuatorRange {
            self.range
        }

        /// Moves to the middle of the travel range.
        pub fn center(&mut self) -> anyhow::Result<()> {
            self.set_angle(self.range.midpoint())
        }

        /// Stops driving pulses so the servo no longer holds position.
        pub fn release(&mut self) -> anyhow::Result<()> {
            self.pwm
                .set_duty_cycle_fully_off()
                .map_err(|e| anyhow!("servo pwm off failed: {:?}", e))
        }

        fn duty_for(&self, angle: i32) -> u16 {
            let pulse = self.timing.pulse_us(angle.max(0) as u32) as u64;
            let max_duty = self.pwm.max_duty_cycle() as u64;
            (pulse * max_duty / self.timing.period_us as u64) as u16
        }
    }

    impl<P> AngleActuator for Servo<P>
    where
        P: SetDutyCycle,
    {
        fn set_angle(&mut self, angle: i32) -> anyhow::Result<()> {
            let clamped = self.range.clamp(angle);
            if clamped != angle {
                log::debug!("Servo angle {} clamped to {}", angle, clamped);
            }
            let duty = self.duty_for(clamped);
            self.pwm
                .set_duty_cycle(duty)
                .map_err(|e| anyhow!("servo pwm write failed: {:?}", e))?;
            self.angle = clamped;
            Ok(())
        }

        fn angle(&self) -> i32 {
            self.angle
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use core::convert::Infallible;
        use embedded_hal::pwm::ErrorType;

        struct Channel {
            max: u16,
            duty: u16,
        }

        impl ErrorType for Channel {
            type Error = Infallible;
        }

        impl SetDutyCycle for Channel {
            fn max_duty_cycle(&self) -> u16 {
                self.max
            }

            fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
                self.duty = duty;
                Ok(())
            }
        }

        fn servo(range: ActuatorRange) -> Servo<Channel> {
            // 14-bit LEDC resolution
            Servo::new(Channel { max: 16383, duty: 0 }, PulseTiming::default(), range).unwrap()
        }

        #[test]
        fn pulse_width_is_linear_in_angle() {
            let timing = PulseTiming::default();
            assert_eq!(timing.pulse_us(0), 500);
            assert_eq!(timing.pulse_us(90), 1500);
            assert_eq!(timing.pulse_us(180), 2500);
            assert_eq!(timing.pulse_us(400), 2500);
        }

        #[test]
        fn writes_duty_for_angle() {
            let mut s = servo(ActuatorRange::default());
            s.set_angle(90).unwrap();
            assert_eq!(s.angle(), 90);
            // 1500 us of 20 ms
            assert_eq!(s.pwm.duty, (1500u64 * 16383 / 20_000) as u16);
            s.set_angle(0).unwrap();
            assert_eq!(s.pwm.duty, (500u64 * 16383 / 20_000) as u16);
        }

        #[test]
        fn saturates_at_range_ends() {
            let mut s = servo(ActuatorRange::new(20, 160));
            s.set_angle(-45).unwrap();
            assert_eq!(s.angle(), 20);
            s.set_angle(400).unwrap();
            assert_eq!(s.angle(), 160);
            // 500 + 160 * 2000 / 180 = 2277 us
            assert_eq!(s.pwm.duty, (2277u64 * 16383 / 20_000) as u16);
        }

        #[test]
        fn starts_and_centers_at_midpoint() {
            let mut s = servo(ActuatorRange::default());
            assert_eq!(s.angle(), 90);
            s.set_angle(10).unwrap();
            s.center().unwrap();
            assert_eq!(s.angle(), 90);
            s.release().unwrap();
            assert_eq!(s.pwm.duty, 0);
        }

        #[test]
        fn rejects_pulse_longer_than_period() {
            let timing = PulseTiming {
                period_us: 2000,
                ..PulseTiming::default()
            };
            assert!(Servo::new(Channel { max: 255, duty: 0 }, timing, ActuatorRange::default()).is_err());
        }
    }
}

pub use servo::{AngleActuator, PulseTiming, Servo};
