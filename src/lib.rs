//! Motion and perception core of a small two wheeled robot car
//!
//! - [`encoder`]: debounced encoder tick counting, fed from the edge interrupt
//! - [`motor`]: ramp controlled distance moves and straight line synchronization
//! - [`distance`]: servo sweeps of a range sensor and what can be read from them
//!
//! Hardware is reached through small port traits ([`motor::MotorDrive`],
//! [`distance::ScanServo`], [`distance::DistanceSensor`]), time is passed in as
//! [`embassy_time::Instant`] and waiting is done through
//! [`embedded_hal_async::delay::DelayNs`], so the whole crate runs on the host as well.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod distance;
pub mod encoder;
pub mod error;
pub mod motor;

pub use config::{
    DistanceSourceMode, EncoderConfig, MotorCalibration, RampConfig, ScanConfig, SyncConfig,
};
pub use distance::{DistanceScanner, ForwardDistances, ScanMode, ScanReport};
pub use encoder::{EncoderTickCounter, TickSnapshot};
pub use error::{MotorError, ScanError};
pub use motor::{
    Direction, MotorDrive, MotorPair, MotorSynchronizer, RampMotorController, RampPhase, StopMode,
};
