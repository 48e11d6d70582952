//! Distance scanning
//!
//! A range sensor sits on a servo in front of the car. The [`DistanceScanner`] sweeps it
//! from right to left in fixed steps, takes one fused reading per step and hands the
//! result to [`ForwardDistances::post_process`] to find the nearest and farthest
//! obstacle, the first gap wider than a threshold and walls on both sides.
//!
//! Servo and sensors stay outside, reached through [`ScanServo`] and
//! [`DistanceSensor`].

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

mod forward;
mod scanner;
pub mod wall;

pub use forward::ForwardDistances;
pub use scanner::{DistanceScanner, ScanMode, ScanReport};

/// Servo angle pointing straight ahead
pub const FORWARD_ANGLE: u8 = 90;

/// Fired by another task to stop a running sweep
pub type AbortSignal = Signal<CriticalSectionRawMutex, ()>;

/// Servo that turns the scan head
pub trait ScanServo {
    /// Turn to `degrees`, 0 is right, 90 forward, 180 left
    fn set_angle(&mut self, degrees: u8);
}

/// Range sensor on the scan head
#[allow(async_fn_in_trait)]
pub trait DistanceSensor {
    /// Measure the distance in centimeters, `None` if nothing answered within `timeout_cm`
    async fn read_distance_cm(&mut self, timeout_cm: u8) -> Option<u16>;

    /// Returns whether the sensor can take a reading now
    fn is_ready(&mut self) -> bool {
        true
    }
}

/// Placeholder for a car without an optical distance sensor
pub struct NoOpticalSensor;

impl DistanceSensor for NoOpticalSensor {
    async fn read_distance_cm(&mut self, _timeout_cm: u8) -> Option<u16> {
        None
    }
}

/// Last commanded servo angle and the settling time still owed for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoPosition {
    last_angle: Option<u8>,
    /// Settling time in ms not waited for yet
    delay_pending: Option<u32>,
}

impl ServoPosition {
    /// Angle the servo was last turned to, `None` before the first move
    pub fn last_angle(&self) -> Option<u8> {
        self.last_angle
    }

    /// Returns whether the servo may still be moving
    pub fn is_delay_pending(&self) -> bool {
        self.delay_pending.is_some()
    }

    /// Turn the servo unless it is already at `angle`
    ///
    /// The settling time grows with the angle moved. An unknown start position counts
    /// as the full 180°. Returns whether the servo was commanded.
    pub fn move_to<S: ScanServo>(
        &mut self,
        servo: &mut S,
        angle: u8,
        ms_per_degree: u8,
        extra_ms: u32,
    ) -> bool {
        if self.last_angle == Some(angle) {
            return false;
        }
        let degrees = self.last_angle.map_or(180, |last| last.abs_diff(angle));
        let settle = u32::from(degrees) * u32::from(ms_per_degree) + extra_ms;

        servo.set_angle(angle);
        self.last_angle = Some(angle);
        self.delay_pending = Some(self.delay_pending.map_or(settle, |owed| owed.max(settle)));
        true
    }

    /// Take the pending settling time, clearing it
    pub fn take_delay_ms(&mut self) -> Option<u32> {
        self.delay_pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[derive(Default)]
    struct AngleLog(Vec<u8>);

    impl ScanServo for AngleLog {
        fn set_angle(&mut self, degrees: u8) {
            self.0.push(degrees);
        }
    }

    #[test]
    fn settle_time_follows_distance_moved() {
        let mut servo = AngleLog::default();
        let mut position = ServoPosition::default();

        assert!(position.move_to(&mut servo, 90, 2, 0));
        assert_eq!(position.take_delay_ms(), Some(360));

        assert!(position.move_to(&mut servo, 108, 2, 50));
        assert_eq!(position.take_delay_ms(), Some(86));
        assert!(!position.is_delay_pending());
    }

    #[test]
    fn same_angle_is_not_commanded_again() {
        let mut servo = AngleLog::default();
        let mut position = ServoPosition::default();
        position.move_to(&mut servo, 45, 2, 0);
        position.take_delay_ms();

        assert!(!position.move_to(&mut servo, 45, 2, 0));
        assert_eq!(position.take_delay_ms(), None);
        assert_eq!(servo.0, [45]);
    }
}
