//! Drive Command Module
//!
//! Commands for the drive task, passed through an embassy-sync Signal. A newer
//! command replaces one the drive task has not picked up yet.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use robot_car::{Direction, StopMode};

/// Signal for drive commands
pub static DRIVE: Signal<CriticalSectionRawMutex, Command> = Signal::new();

/// Sends a new drive command
pub fn update(command: Command) {
    DRIVE.signal(command);
}

/// Waits for the next drive command
pub async fn wait() -> Command {
    DRIVE.wait().await
}

/// Commands understood by the drive task
#[derive(Debug, Clone, Copy, defmt::Format)]
pub enum Command {
    /// Move both wheels `ticks` encoder ticks with ramped speed
    GoDistance { ticks: u16, direction: Direction },
    /// End the current move early, ramping down over the next ticks
    RampDown,
    /// Stop at once, shorting the motors
    Brake,
    /// Stop at once, letting the car roll out
    Coast,
    /// Find the lowest speed level at which each motor turns
    Calibrate,
}
