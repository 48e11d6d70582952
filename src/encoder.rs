//! Encoder tick counting
//!
//! Counts the edges of a slotted encoder disk on the motor shaft. The edge handler is
//! called from interrupt context on both edges; the control loop reads the counters
//! through [`EncoderTickCounter::snapshot`].
//!
//! # Debouncing
//! The optocoupler output rings for a short time after every slot edge. Any edge that
//! follows the previously accepted edge within the debounce window (3 ms by default) is
//! dropped, as is any edge with a timestamp older than the last accepted one.
//!
//! # Interrupt safety
//! Count and timestamp live together in one record behind a critical section mutex,
//! so the control loop can never see a new count with an old timestamp or the other way
//! round. The "changed" flag is a separate atomic, it is only a hint for telemetry.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embassy_time::{Duration, Instant};

use crate::config::EncoderConfig;

/// Counter state shared between edge interrupt and control loop
#[derive(Debug, Clone, Copy)]
struct TickRecord {
    /// Ticks since the last reset
    count: u16,
    /// Ticks since the start of the current ride, survives stops
    last_ride_count: u16,
    /// Ticks since power up
    total_count: u32,
    /// Last accepted edge, or the reset time if no edge came since
    last_tick: Instant,
    /// Time from the previous tick (or the reset) to the last tick
    interval: Option<Duration>,
    /// Last accepted edge, kept across resets for debouncing
    last_edge: Option<Instant>,
}

impl TickRecord {
    const fn new() -> Self {
        Self {
            count: 0,
            last_ride_count: 0,
            total_count: 0,
            last_tick: Instant::from_ticks(0),
            interval: None,
            last_edge: None,
        }
    }
}

/// Consistent copy of the tick counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSnapshot {
    /// Ticks since the last reset
    pub count: u16,
    /// Ticks since the start of the current ride, including coasting after a stop
    pub last_ride_count: u16,
    /// Ticks since power up, wrapping
    pub total_count: u32,
    /// Time of the last tick, or of the last reset if there was no tick since
    pub last_tick: Instant,
    /// Time from the previous tick, or from the reset, to the last tick.
    /// `None` until the first tick after a reset.
    pub interval: Option<Duration>,
}

impl TickSnapshot {
    /// Time passed since the last tick, zero if `now` lies before it
    pub fn since_last_tick(&self, now: Instant) -> Duration {
        now.checked_duration_since(self.last_tick)
            .unwrap_or(Duration::from_ticks(0))
    }
}

/// Debounced tick counter of one encoder
pub struct EncoderTickCounter {
    config: EncoderConfig,
    record: Mutex<CriticalSectionRawMutex, Cell<TickRecord>>,
    changed: AtomicBool,
}

impl EncoderTickCounter {
    /// Create a counter with default encoder settings
    pub const fn new() -> Self {
        Self::with_config(EncoderConfig::new())
    }

    /// Create a counter with custom encoder settings
    pub const fn with_config(config: EncoderConfig) -> Self {
        Self {
            config,
            record: Mutex::new(Cell::new(TickRecord::new())),
            changed: AtomicBool::new(false),
        }
    }

    /// Encoder settings of this counter
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Handle one encoder edge
    ///
    /// Call this from the edge interrupt, for rising and falling edges alike.
    /// Returns whether the edge was counted as a tick.
    pub fn on_edge(&self, now: Instant) -> bool {
        let accepted = self.record.lock(|cell| {
            let mut record = cell.get();

            if let Some(last_edge) = record.last_edge {
                match now.checked_duration_since(last_edge) {
                    // Ringing of the previous edge
                    Some(delta) if delta <= self.config.debounce => return false,
                    // Out of order timestamp
                    None => return false,
                    Some(_) => {}
                }
            }

            // The first tick of a move measures from the reset
            record.interval = now.checked_duration_since(record.last_tick);

            record.count = record.count.wrapping_add(1);
            record.last_ride_count = record.last_ride_count.wrapping_add(1);
            record.total_count = record.total_count.wrapping_add(1);
            record.last_tick = now;
            record.last_edge = Some(now);
            cell.set(record);
            true
        });

        if accepted {
            self.changed.store(true, Ordering::Release);
        }
        accepted
    }

    /// Read all counters at once
    pub fn snapshot(&self) -> TickSnapshot {
        self.record.lock(|cell| {
            let record = cell.get();
            TickSnapshot {
                count: record.count,
                last_ride_count: record.last_ride_count,
                total_count: record.total_count,
                last_tick: record.last_tick,
                interval: record.interval,
            }
        })
    }

    /// Ticks since the last reset
    pub fn count(&self) -> u16 {
        self.snapshot().count
    }

    /// Clear the tick count of the current move
    ///
    /// `now` becomes the reference for stall detection until the first tick arrives.
    /// The last ride count is kept, see [`Self::reset_last_ride`].
    pub fn reset(&self, now: Instant) {
        self.record.lock(|cell| {
            let mut record = cell.get();
            record.count = 0;
            record.interval = None;
            record.last_tick = now;
            cell.set(record);
        });
    }

    /// Start a new ride
    pub fn reset_last_ride(&self) {
        self.record.lock(|cell| {
            let mut record = cell.get();
            record.last_ride_count = 0;
            cell.set(record);
        });
    }

    /// Returns whether a tick was counted since the last call, and clears the flag
    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }
}

impl Default for EncoderTickCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn edges_within_debounce_window_count_once() {
        let counter = EncoderTickCounter::new();
        assert!(counter.on_edge(at(100)));
        assert!(!counter.on_edge(at(101)));
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn edges_outside_debounce_window_both_count() {
        let counter = EncoderTickCounter::new();
        assert!(counter.on_edge(at(100)));
        assert!(counter.on_edge(at(105)));
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn debounce_window_is_inclusive() {
        let counter = EncoderTickCounter::new();
        counter.on_edge(at(100));
        assert!(!counter.on_edge(at(103)));
        assert!(counter.on_edge(at(104)));
    }

    #[test]
    fn out_of_order_edge_is_dropped() {
        let counter = EncoderTickCounter::new();
        counter.on_edge(at(100));
        assert!(!counter.on_edge(at(50)));
        assert_eq!(counter.count(), 1);
        assert_eq!(counter.snapshot().last_tick, at(100));
    }

    #[test]
    fn snapshot_carries_interval_between_ticks() {
        let counter = EncoderTickCounter::new();
        counter.reset(at(0));
        assert_eq!(counter.snapshot().interval, None);
        counter.on_edge(at(10));
        assert_eq!(counter.snapshot().interval, Some(Duration::from_millis(10)));
        counter.on_edge(at(18));
        let snapshot = counter.snapshot();
        assert_eq!(snapshot.interval, Some(Duration::from_millis(8)));
        assert_eq!(snapshot.last_tick, at(18));
    }

    #[test]
    fn reset_keeps_last_ride_and_total() {
        let counter = EncoderTickCounter::new();
        for i in 1..=4 {
            counter.on_edge(at(i * 10));
        }
        counter.reset(at(100));
        let snapshot = counter.snapshot();
        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.last_ride_count, 4);
        assert_eq!(snapshot.total_count, 4);
        assert_eq!(snapshot.last_tick, at(100));
        assert_eq!(snapshot.since_last_tick(at(130)), Duration::from_millis(30));
    }

    #[test]
    fn last_ride_counts_across_reset() {
        let counter = EncoderTickCounter::new();
        counter.on_edge(at(10));
        counter.reset(at(15));
        counter.on_edge(at(20));
        assert_eq!(counter.snapshot().last_ride_count, 2);

        counter.reset_last_ride();
        assert_eq!(counter.snapshot().last_ride_count, 0);
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn changed_flag_is_read_and_cleared() {
        let counter = EncoderTickCounter::new();
        assert!(!counter.take_changed());
        counter.on_edge(at(10));
        counter.on_edge(at(11));
        assert!(counter.take_changed());
        assert!(!counter.take_changed());
    }
}
