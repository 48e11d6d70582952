//! Scan Command Module
//!
//! Requests for the scan task and the signal that aborts a running sweep.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use robot_car::distance::AbortSignal;
use robot_car::ScanMode;

/// Signal for scan requests
pub static SCAN: Signal<CriticalSectionRawMutex, ScanMode> = Signal::new();

/// Fired to stop a sweep in progress
pub static ABORT: AbortSignal = AbortSignal::new();

/// Requests a scan
pub fn request(mode: ScanMode) {
    SCAN.signal(mode);
}

/// Waits for the next scan request
pub async fn wait() -> ScanMode {
    SCAN.wait().await
}

/// Stops the running sweep, its partial data is dropped
pub fn abort() {
    ABORT.signal(());
}
