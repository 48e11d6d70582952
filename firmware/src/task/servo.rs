//! Scan Servo
//!
//! The Pi Pico2 is out of PWM slices, so the servo under the distance sensor is
//! driven by a PIO state machine running the PWM program from `embassy_rp::pio_programs`.

use core::time::Duration;
use embassy_rp::pio::Instance;
use embassy_rp::pio_programs::pwm::PioPwm;
use robot_car::distance::ScanServo;

/// Servo frame period
const REFRESH_INTERVAL: Duration = Duration::from_micros(20_000);

/// Servo travel, 0 is right and 180 left
const MAX_DEGREES: u32 = 180;

/// Servo on a PIO PWM state machine, pulse width linear in the angle
pub struct PioServo<'d, T: Instance, const SM: usize> {
    pwm: PioPwm<'d, T, SM>,
    /// Pulse at 0 degrees
    min_pulse: Duration,
    /// Pulse at [`MAX_DEGREES`]
    max_pulse: Duration,
}

impl<'d, T: Instance, const SM: usize> PioServo<'d, T, SM> {
    /// Set the frame period and start the output
    pub fn start(mut pwm: PioPwm<'d, T, SM>, min_pulse: Duration, max_pulse: Duration) -> Self {
        pwm.set_period(REFRESH_INTERVAL);
        pwm.start();
        Self {
            pwm,
            min_pulse,
            max_pulse,
        }
    }
}

impl<T: Instance, const SM: usize> ScanServo for PioServo<'_, T, SM> {
    fn set_angle(&mut self, degrees: u8) {
        let degrees = u32::from(degrees).min(MAX_DEGREES);
        let span = self.max_pulse.saturating_sub(self.min_pulse);
        self.pwm.write(self.min_pulse + span * degrees / MAX_DEGREES);
    }
}
