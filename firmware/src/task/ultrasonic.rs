//! HC-SR04 as the scan head's range sensor
//!
//! The driver measures until the echo arrives, so each reading is bounded by the
//! time sound needs to travel the scan timeout distance and back.

use embassy_rp::gpio::{Input, Output};
use embassy_time::{with_timeout, Duration};
use hcsr04_async::Hcsr04;
use robot_car::distance::DistanceSensor;

/// Fixed ambient temperature for distance calculations
/// Slight inaccuracy acceptable as we care more about consistent readings
const TEMPERATURE: f64 = 21.5;

/// Round trip of sound per centimeter of distance, in microseconds
const ECHO_US_PER_CM: u64 = 59;

/// Trigger pulse and sensor setup time before the echo can start
const TRIGGER_OVERHEAD: Duration = Duration::from_millis(1);

pub struct UltrasonicSensor<'d> {
    sensor: Hcsr04<Output<'d>, Input<'d>>,
}

impl<'d> UltrasonicSensor<'d> {
    pub fn new(sensor: Hcsr04<Output<'d>, Input<'d>>) -> Self {
        Self { sensor }
    }
}

impl DistanceSensor for UltrasonicSensor<'_> {
    async fn read_distance_cm(&mut self, timeout_cm: u8) -> Option<u16> {
        let timeout =
            TRIGGER_OVERHEAD + Duration::from_micros(u64::from(timeout_cm) * ECHO_US_PER_CM);
        match with_timeout(timeout, self.sensor.measure(TEMPERATURE)).await {
            Ok(Ok(distance_cm)) if distance_cm >= 0.0 => {
                Some(distance_cm.min(f64::from(u16::MAX)) as u16)
            }
            _ => None,
        }
    }
}
