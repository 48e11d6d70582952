//! Error types
//!
//! Everything here is local and recoverable by the caller. The core never retries on
//! its own; whether a stalled move or a failed scan is repeated is up to the
//! driving logic above it.

/// Motor control errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorError {
    /// No encoder tick within the tick timeout while the motor was commanded to run.
    /// The motor has been stopped and the move is abandoned.
    #[error("motor stalled after {ticks} of {target} ticks")]
    Stalled {
        /// Ticks counted before the stall
        ticks: u16,
        /// Target of the abandoned move
        target: u16,
    },

    /// Calibration ramp reached the highest speed level without a single tick
    #[error("no encoder tick observed up to speed level {max_level}")]
    CalibrationFailed {
        /// Highest level that was tried
        max_level: u8,
    },
}

/// Distance scan errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanError {
    /// A distance source needed for this scan is not ready, no data was taken
    #[error("distance sensor not ready")]
    NotReady,

    /// The scan was aborted before the sweep completed, the partial data is dropped
    #[error("scan aborted after {completed} of {total} steps")]
    Aborted {
        /// Number of samples taken before the abort
        completed: usize,
        /// Number of samples of a complete sweep
        total: usize,
    },

    /// The configured source mode needs the optical sensor, but none is fitted
    #[error("source mode needs an optical distance sensor")]
    SourceUnavailable,
}
