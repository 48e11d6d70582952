//! Results Module
//!
//! Outcomes of drive and scan commands. Each is a Signal holding the latest result,
//! so a task that does not listen never blocks the one reporting.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use robot_car::{MotorError, ScanError, ScanReport};

/// Latest finished or failed move
pub static MOVE: Signal<CriticalSectionRawMutex, Result<Moved, MotorError>> = Signal::new();

/// Latest calibration outcome, start speed levels of left and right motor
pub static CALIBRATION: Signal<CriticalSectionRawMutex, Result<[u8; 2], MotorError>> =
    Signal::new();

/// Latest scan outcome
pub static SCAN: Signal<CriticalSectionRawMutex, Result<ScanReport, ScanError>> = Signal::new();

/// Ticks both wheels covered in a finished move
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct Moved {
    pub left: u16,
    pub right: u16,
}
