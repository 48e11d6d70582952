//! Configuration
//!
//! Tuning constants for encoders, ramps, synchronization and scanning, grouped into
//! plain structs with defaults matching the robot car hardware:
//! - Encoder disks generate about 110 Hz at full speed, so one period is ~8 ms and a
//!   single disk slot lasts roughly a third of that. A 3 ms mask swallows the ringing.
//! - The SG90 scan servo moves about 60° in 100 ms.
//! - The HC-SR04 is not trusted beyond one meter while driving.
//!
//! Persisted values (start speed, drive speed) are not owned here. They arrive as a
//! [`MotorCalibration`] from whoever stores them.

use embassy_time::Duration;

/// Encoder edge handling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderConfig {
    /// Edges within this window after an accepted edge are ringing and get dropped
    pub debounce: Duration,
    /// Longest tick interval that still counts as moving
    pub tick_timeout: Duration,
    /// Velocity is reported as `velocity_scale / tick interval in ms`
    pub velocity_scale: u16,
}

impl EncoderConfig {
    /// Default encoder settings, usable in const context for static counters
    pub const fn new() -> Self {
        Self {
            debounce: Duration::from_millis(3),
            tick_timeout: Duration::from_millis(500),
            velocity_scale: 500,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Ramp profile of a distance move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampConfig {
    /// Ticks used to accelerate from start speed to drive speed.
    /// The same number of ticks is reserved for slowing down.
    pub ramp_up_ticks: u16,
    /// Ticks for an orderly stop requested while moving
    pub ramp_down_min_ticks: u16,
    /// Moves of at most this many ticks skip the ramp and run at start speed
    pub max_distance_delta: u16,
    /// Highest speed level accepted by the motor driver
    pub max_speed: u8,
    /// Speed level increment per calibration step
    pub calibration_step: u8,
    /// Wait per calibration step before looking for a tick
    pub calibration_settle: Duration,
}

impl RampConfig {
    /// Shortest ramp that still gives a usable acceleration
    pub const MIN_RAMP_TICKS: u16 = 3;

    /// Set the ramp length, at least [`Self::MIN_RAMP_TICKS`]
    pub fn with_ramp_up_ticks(mut self, ticks: u16) -> Self {
        self.ramp_up_ticks = ticks.max(Self::MIN_RAMP_TICKS);
        self
    }

    /// Set the longest move that runs at start speed without a ramp
    pub fn with_max_distance_delta(mut self, ticks: u16) -> Self {
        self.max_distance_delta = ticks;
        self
    }

    /// Ramp length actually used, never below the minimum even if set directly
    pub fn effective_ramp_up_ticks(&self) -> u16 {
        self.ramp_up_ticks.max(Self::MIN_RAMP_TICKS)
    }
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            ramp_up_ticks: 5,
            ramp_down_min_ticks: 3,
            max_distance_delta: 8,
            max_speed: u8::MAX,
            calibration_step: 1,
            calibration_settle: Duration::from_millis(20),
        }
    }
}

/// Calibrated speed values of one motor
///
/// Below `start_speed` the motor does not move reliably. `drive_speed` is the cruise
/// level of a distance move. `compensation` is subtracted from `drive_speed` to match
/// a weaker motor on the other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorCalibration {
    /// Lowest level that reliably moves the motor
    pub start_speed: u8,
    /// Cruise level
    pub drive_speed: u8,
    /// Level subtracted from the cruise level
    pub compensation: u8,
}

impl MotorCalibration {
    /// Create a calibration, raising the drive speed to at least the start speed
    pub fn new(start_speed: u8, drive_speed: u8) -> Self {
        Self {
            start_speed,
            drive_speed: drive_speed.max(start_speed),
            compensation: 0,
        }
    }

    /// Cruise level with compensation applied, never below the start speed
    pub fn compensated_drive_speed(&self) -> u8 {
        self.drive_speed
            .saturating_sub(self.compensation)
            .max(self.start_speed)
    }
}

impl Default for MotorCalibration {
    fn default() -> Self {
        Self::new(40, 160)
    }
}

/// Straight line synchronization of two motors
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncConfig {
    /// Ticks of the first motor between two checks
    pub check_interval_ticks: u16,
    /// Tick difference that is left alone
    pub tolerance_ticks: u16,
    /// Compensation level per tick of difference
    pub gain: u8,
    /// Upper bound of the compensation level
    pub max_compensation: u8,
}

impl SyncConfig {
    /// Set the check interval, at least one tick
    pub fn with_check_interval(mut self, ticks: u16) -> Self {
        self.check_interval_ticks = ticks.max(1);
        self
    }

    /// Set the compensation per tick of difference
    pub fn with_gain(mut self, gain: u8) -> Self {
        self.gain = gain;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            check_interval_ticks: 4,
            tolerance_ticks: 1,
            gain: 2,
            max_compensation: 24,
        }
    }
}

/// How the readings of ultrasonic and optical sensor are combined per scan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DistanceSourceMode {
    /// Nearest of both. Ultrasonic misses thin and slanted objects, the optical sensor
    /// has a narrow field and short range.
    #[default]
    Minimum,
    /// Farthest of both
    Maximum,
    /// Ultrasonic only
    Ultrasonic,
    /// Infrared or time of flight only
    Optical,
}

/// Scan head sweep and post processing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanConfig {
    /// Servo degrees between two samples
    pub degrees_per_step: u8,
    /// Readings at or beyond this distance are stored as this value
    pub timeout_cm: u8,
    /// Sensor combination per step
    pub source_mode: DistanceSourceMode,
    /// Servo settling time per degree moved
    pub settle_ms_per_degree: u8,
    /// Add [`Self::slow_scan_extra`] after every servo move
    pub slow_scan: bool,
    /// Extra settling time for slow scans
    pub slow_scan_extra: Duration,
    /// Neighbours on each side taken into the glitch filter
    pub filter_radius: usize,
    /// Only distances below this are used for wall detection
    pub wall_detection_max_cm: u8,
    /// Allowed distance between middle sample and the assumed wall
    pub wall_tolerance_cm: u8,
}

impl ScanConfig {
    /// Set the sensor combination
    pub fn with_source_mode(mut self, mode: DistanceSourceMode) -> Self {
        self.source_mode = mode;
        self
    }

    /// Set the distance ceiling
    pub fn with_timeout_cm(mut self, timeout_cm: u8) -> Self {
        self.timeout_cm = timeout_cm;
        self
    }

    /// Enable or disable the extra settling time
    pub fn with_slow_scan(mut self, slow: bool) -> Self {
        self.slow_scan = slow;
        self
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            degrees_per_step: 18,
            timeout_cm: 100,
            source_mode: DistanceSourceMode::Minimum,
            settle_ms_per_degree: 2,
            slow_scan: false,
            slow_scan_extra: Duration::from_millis(50),
            filter_radius: 1,
            wall_detection_max_cm: 40,
            wall_tolerance_cm: 3,
        }
    }
}
