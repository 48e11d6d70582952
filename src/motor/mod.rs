//! Encoder feedback motor control
//!
//! A [`RampMotorController`] drives one motor a given number of encoder ticks with an
//! acceleration, cruise and deceleration phase. The [`MotorSynchronizer`] compares two
//! such controllers and slows the one that runs ahead, and [`MotorPair`] bundles the
//! two motors of the car.
//!
//! The physical driver (H-bridge, PWM) stays outside. It is reached through the
//! [`MotorDrive`] trait.

mod pair;
mod ramp;
mod sync;

pub use pair::{MotorPair, POLL_INTERVAL_MS, STANDSTILL};
pub use ramp::{RampMotorController, RampPhase};
pub use sync::{MotorSynchronizer, SyncCorrection};

/// Motor rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// The other direction
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// How a motor is stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopMode {
    /// Short the motor terminals, stops within a tick or two
    Brake,
    /// Release the motor and let it run out
    Coast,
}

/// Motor driver output of one motor
pub trait MotorDrive {
    /// Drive with a speed level of 0 (off) to 255 (full) in the given direction
    fn set_speed(&mut self, level: u8, direction: Direction);

    /// Stop the motor
    fn stop(&mut self, mode: StopMode);
}

impl<T: MotorDrive + ?Sized> MotorDrive for &mut T {
    fn set_speed(&mut self, level: u8, direction: Direction) {
        (**self).set_speed(level, direction);
    }

    fn stop(&mut self, mode: StopMode) {
        (**self).stop(mode);
    }
}
