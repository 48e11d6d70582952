//! Ramp motor controller
//!
//! Drives one motor a commanded number of encoder ticks:
//!
//! ```text
//! Stopped -> RampUp -> FullSpeed -> RampDown -> Stopped
//! ```
//!
//! - **RampUp**: starts at the calibrated start speed and adds a fixed speed step per
//!   tick until the drive speed is reached.
//! - **FullSpeed**: holds the drive speed (minus synchronization compensation).
//! - **RampDown**: entered as soon as the remaining distance is no longer than the
//!   distance used for ramping up, so deceleration mirrors acceleration. Short moves
//!   use a steeper ramp so that both ramps fit into the distance. Moves of at most
//!   `max_distance_delta` ticks skip the ramp and run at start speed in RampDown.
//! - **Stopped**: the target count is reached, or the motor stalled.
//!
//! [`RampMotorController::update_motor`] is the only entry point of the control loop.
//! It never blocks and has to be called frequently while a move is running.
//!
//! # Stall detection
//! No tick for longer than the encoder tick timeout (500 ms) while the motor is
//! commanded to run stops the motor and reports [`MotorError::Stalled`], in every phase.

use embassy_time::Instant;
use embedded_hal_async::delay::DelayNs;
use moving_median::MovingMedian;

use super::{Direction, MotorDrive, MotorSynchronizer, StopMode, SyncCorrection};
use crate::config::{MotorCalibration, RampConfig};
use crate::encoder::{EncoderTickCounter, TickSnapshot};
use crate::error::MotorError;

/// Number of velocity samples for median filtering
const VELOCITY_WINDOW: usize = 3;

/// Phase of a distance move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampPhase {
    #[default]
    Stopped,
    RampUp,
    FullSpeed,
    RampDown,
}

impl RampPhase {
    /// Returns whether the motor is commanded to run
    pub fn is_moving(self) -> bool {
        self != RampPhase::Stopped
    }
}

/// Closed loop distance control of one motor
pub struct RampMotorController<'a, M> {
    drive: M,
    encoder: &'a EncoderTickCounter,
    config: RampConfig,
    calibration: MotorCalibration,
    phase: RampPhase,
    direction: Direction,
    /// Level last sent to the driver
    current_speed: u8,
    target_count: u16,
    last_target_count: u16,
    /// Speed step per tick while ramping
    ramp_delta: u8,
    /// Tick count at the end of ramp up, mirrored for ramp down
    count_after_ramp_up: u16,
    /// Tick count seen by the previous update
    last_seen_count: u16,
    /// Scaled velocity, see [`crate::config::EncoderConfig::velocity_scale`]
    velocity: u16,
    velocity_filter: MovingMedian<f32, VELOCITY_WINDOW>,
    /// Speed changes sent to the driver during the current move
    debug_count: u16,
    speed_at_target_reached: u8,
    stalled: bool,
}

impl<'a, M: MotorDrive> RampMotorController<'a, M> {
    /// Create a stopped controller
    ///
    /// `encoder` is the counter fed by this motor's encoder interrupt.
    pub fn new(
        drive: M,
        encoder: &'a EncoderTickCounter,
        config: RampConfig,
        calibration: MotorCalibration,
    ) -> Self {
        Self {
            drive,
            encoder,
            config,
            calibration,
            phase: RampPhase::Stopped,
            direction: Direction::Forward,
            current_speed: 0,
            target_count: 0,
            last_target_count: 0,
            ramp_delta: 1,
            count_after_ramp_up: 0,
            last_seen_count: 0,
            velocity: 0,
            velocity_filter: MovingMedian::new(),
            debug_count: 0,
            speed_at_target_reached: 0,
            stalled: false,
        }
    }

    /// Start a move of `target` ticks
    ///
    /// Whatever move is running gets dropped, all control values start from zero.
    pub fn init_go_distance_count(&mut self, target: u16, direction: Direction, now: Instant) {
        self.reset_values(now);
        self.direction = direction;
        self.target_count = target;

        if target == 0 {
            self.drive.stop(StopMode::Brake);
            return;
        }

        let start = self.calibration.start_speed;
        let cruise = self.calibration.compensated_drive_speed();

        // Too short to ramp without overshooting, crawl at start speed and stop on target
        if target <= self.config.max_distance_delta {
            self.phase = RampPhase::RampDown;
            self.current_speed = start;
            debug!("go {} ticks at start speed {}", target, start);
            self.drive.set_speed(self.current_speed, self.direction);
            return;
        }

        // Leave room for a ramp down of the same length
        let ramp_ticks = self.config.effective_ramp_up_ticks().min(target / 2).max(1);
        let span = u16::from(cruise.saturating_sub(start));
        self.ramp_delta = span.div_ceil(ramp_ticks).clamp(1, u16::from(u8::MAX)) as u8;

        if span == 0 {
            self.phase = RampPhase::FullSpeed;
            self.current_speed = cruise;
        } else {
            self.phase = RampPhase::RampUp;
            self.current_speed = start;
        }

        debug!(
            "go {} ticks, speed {} -> {} in steps of {}",
            target, start, cruise, self.ramp_delta
        );
        self.drive.set_speed(self.current_speed, self.direction);
    }

    /// Start a move of `distance` ticks, backward if negative
    pub fn init_go_distance_count_signed(&mut self, distance: i16, now: Instant) {
        let direction = if distance < 0 {
            Direction::Backward
        } else {
            Direction::Forward
        };
        self.init_go_distance_count(distance.unsigned_abs(), direction, now);
    }

    /// Advance the move, call this every control loop iteration
    ///
    /// Returns `Ok(true)` while the motor is moving and `Ok(false)` once it stopped.
    /// A stall stops the motor and returns the error once; later calls return
    /// `Ok(false)` until the next move is started.
    pub fn update_motor(&mut self, now: Instant) -> Result<bool, MotorError> {
        if !self.phase.is_moving() {
            return Ok(false);
        }

        let snapshot = self.encoder.snapshot();
        self.update_velocity(&snapshot, now);
        let count = snapshot.count;

        if count >= self.target_count {
            self.finish_move();
            return Ok(false);
        }

        if snapshot.since_last_tick(now) > self.encoder.config().tick_timeout {
            return Err(self.stall(count));
        }
        let remaining = self.target_count - count;

        let new_ticks = count.saturating_sub(self.last_seen_count);
        self.last_seen_count = count;
        let previous_speed = self.current_speed;
        let cruise = self.calibration.compensated_drive_speed();

        if self.phase == RampPhase::RampUp && new_ticks > 0 {
            let raised = u16::from(self.current_speed)
                .saturating_add(u16::from(self.ramp_delta).saturating_mul(new_ticks));
            self.current_speed = raised.min(u16::from(cruise)) as u8;
            if self.current_speed >= cruise {
                self.phase = RampPhase::FullSpeed;
                self.count_after_ramp_up = count;
                debug!("full speed {} after {} ticks", cruise, count);
            }
        }

        if self.phase == RampPhase::FullSpeed {
            self.current_speed = cruise;
        }

        match self.phase {
            RampPhase::RampUp | RampPhase::FullSpeed => {
                let ramp_up_ticks = if self.phase == RampPhase::RampUp {
                    count
                } else {
                    self.count_after_ramp_up
                };
                if remaining <= ramp_up_ticks {
                    self.phase = RampPhase::RampDown;
                    self.count_after_ramp_up = ramp_up_ticks;
                    debug!("ramp down at {} ticks from speed {}", count, self.current_speed);
                }
            }
            RampPhase::RampDown if new_ticks > 0 => {
                let lowered = u16::from(self.current_speed)
                    .saturating_sub(u16::from(self.ramp_delta).saturating_mul(new_ticks));
                self.current_speed = (lowered as u8).max(self.calibration.start_speed);
            }
            _ => {}
        }

        if self.current_speed != previous_speed {
            self.debug_count = self.debug_count.wrapping_add(1);
            self.drive.set_speed(self.current_speed, self.direction);
        }

        Ok(true)
    }

    /// Slow down and stop within a few ticks instead of at the target
    pub fn start_ramp_down(&mut self) {
        if matches!(self.phase, RampPhase::RampUp | RampPhase::FullSpeed) {
            let count = self.encoder.count();
            let stop_at = count.saturating_add(self.config.ramp_down_min_ticks);
            self.target_count = self.target_count.min(stop_at);
            self.phase = RampPhase::RampDown;
            debug!("ramp down requested at {} ticks", count);
        }
    }

    /// Stop immediately and clear the control values
    ///
    /// The encoder count and the stall flag are left alone, so the outcome of the move
    /// stays readable.
    pub fn stop(&mut self, mode: StopMode) {
        self.drive.stop(mode);
        self.last_target_count = self.target_count;
        self.clear_control_values();
    }

    /// Stop, clear all control values including the encoder count, direction forward
    pub fn reset_control_values(&mut self, now: Instant) {
        self.drive.stop(StopMode::Brake);
        self.reset_values(now);
    }

    /// Find the lowest speed level that moves the motor
    ///
    /// Raises the level step by step, waiting the settle time after each step, until the
    /// encoder reports a tick. The level found becomes the start speed. If the drive speed
    /// is not above it, the drive speed is set to twice the start speed.
    pub async fn calibrate<D: DelayNs>(&mut self, delay: &mut D) -> Result<u8, MotorError> {
        self.clear_control_values();
        self.stalled = false;
        let initial_total = self.encoder.snapshot().total_count;
        let step = self.config.calibration_step.max(1);
        let settle_ms = self.config.calibration_settle.as_millis() as u32;
        let mut level = 0u8;

        while level < self.config.max_speed {
            level = level.saturating_add(step).min(self.config.max_speed);
            self.drive.set_speed(level, Direction::Forward);
            delay.delay_ms(settle_ms).await;

            if self.encoder.snapshot().total_count != initial_total {
                self.drive.stop(StopMode::Brake);
                self.calibration.start_speed = level;
                if self.calibration.drive_speed <= level {
                    self.calibration.drive_speed = level.saturating_mul(2).min(self.config.max_speed);
                }
                info!(
                    "calibrated start speed {}, drive speed {}",
                    level, self.calibration.drive_speed
                );
                return Ok(level);
            }
        }

        self.drive.stop(StopMode::Brake);
        warn!("no encoder tick up to speed {}", self.config.max_speed);
        Err(MotorError::CalibrationFailed {
            max_level: self.config.max_speed,
        })
    }

    /// Synchronize this motor with `peer` for straight driving
    pub fn synchronize_motor<P: MotorDrive>(
        &mut self,
        peer: &mut RampMotorController<'_, P>,
        synchronizer: &mut MotorSynchronizer,
    ) -> Option<SyncCorrection> {
        synchronizer.synchronize(self, peer)
    }

    /// Set the level subtracted from the drive speed, applied at once when cruising
    pub fn set_speed_compensation(&mut self, compensation: u8) {
        self.calibration.compensation = compensation;
        if self.phase == RampPhase::FullSpeed {
            let cruise = self.calibration.compensated_drive_speed();
            if cruise != self.current_speed {
                self.current_speed = cruise;
                self.debug_count = self.debug_count.wrapping_add(1);
                self.drive.set_speed(cruise, self.direction);
            }
        }
    }

    /// Current phase
    pub fn phase(&self) -> RampPhase {
        self.phase
    }

    /// Direction of the current or last move
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Level last sent to the driver, 0 when stopped
    pub fn current_speed(&self) -> u8 {
        self.current_speed
    }

    /// Scaled velocity, 0 when stopped or stalled
    pub fn velocity(&self) -> u16 {
        self.velocity
    }

    /// Ticks since the move started
    pub fn tick_count(&self) -> u16 {
        self.encoder.count()
    }

    /// Ticks since the current move started, including coasting after it stopped
    pub fn last_ride_count(&self) -> u16 {
        self.encoder.snapshot().last_ride_count
    }

    /// Target of the current move
    pub fn target_count(&self) -> u16 {
        self.target_count
    }

    /// Target of the last finished move
    pub fn last_target_count(&self) -> u16 {
        self.last_target_count
    }

    /// Speed changes sent during the current move
    pub fn debug_count(&self) -> u16 {
        self.debug_count
    }

    /// Speed level at the moment the target was reached
    pub fn speed_at_target_reached(&self) -> u8 {
        self.speed_at_target_reached
    }

    /// Returns whether the last move ended in a stall
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Calibrated speeds and compensation
    pub fn calibration(&self) -> MotorCalibration {
        self.calibration
    }

    /// Replace the calibrated speeds, e.g. with values loaded from storage
    pub fn set_calibration(&mut self, calibration: MotorCalibration) {
        self.calibration = calibration;
    }

    /// Tick counter of this motor
    pub fn encoder(&self) -> &'a EncoderTickCounter {
        self.encoder
    }

    /// Ramp settings
    pub fn config(&self) -> &RampConfig {
        &self.config
    }

    /// Motor driver output
    pub fn drive(&self) -> &M {
        &self.drive
    }

    /// Motor driver output, mutable
    pub fn drive_mut(&mut self) -> &mut M {
        &mut self.drive
    }

    fn update_velocity(&mut self, snapshot: &TickSnapshot, now: Instant) {
        let since_last_tick = snapshot.since_last_tick(now);
        let Some(interval) = snapshot.interval else {
            self.velocity = 0;
            return;
        };
        if since_last_tick > self.encoder.config().tick_timeout {
            self.velocity = 0;
            self.velocity_filter.clear();
            return;
        }

        // A motor slowing down has its next tick overdue, use the longer of both
        let millis = interval.max(since_last_tick).as_millis();
        if millis == 0 {
            return;
        }
        let raw = f32::from(self.encoder.config().velocity_scale) / millis as f32;
        self.velocity_filter.add_value(raw);
        self.velocity = self.velocity_filter.median() as u16;
    }

    fn finish_move(&mut self) {
        self.drive.stop(StopMode::Brake);
        self.speed_at_target_reached = self.current_speed;
        self.last_target_count = self.target_count;
        self.phase = RampPhase::Stopped;
        self.current_speed = 0;
        self.velocity = 0;
        self.velocity_filter.clear();
        debug!(
            "target {} reached at speed {}",
            self.target_count, self.speed_at_target_reached
        );
    }

    fn stall(&mut self, count: u16) -> MotorError {
        warn!("motor stalled at {} of {} ticks", count, self.target_count);
        self.drive.stop(StopMode::Brake);
        self.last_target_count = self.target_count;
        self.phase = RampPhase::Stopped;
        self.current_speed = 0;
        self.velocity = 0;
        self.velocity_filter.clear();
        self.stalled = true;
        MotorError::Stalled {
            ticks: count,
            target: self.target_count,
        }
    }

    fn clear_control_values(&mut self) {
        self.phase = RampPhase::Stopped;
        self.current_speed = 0;
        self.target_count = 0;
        self.ramp_delta = 1;
        self.count_after_ramp_up = 0;
        self.last_seen_count = 0;
        self.velocity = 0;
        self.velocity_filter.clear();
        self.debug_count = 0;
        self.speed_at_target_reached = 0;
        self.calibration.compensation = 0;
    }

    fn reset_values(&mut self, now: Instant) {
        self.last_target_count = self.target_count;
        self.clear_control_values();
        self.direction = Direction::Forward;
        self.stalled = false;
        self.encoder.reset_last_ride();
        self.encoder.reset(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use embassy_futures::block_on;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingDrive {
        level: Rc<Cell<u8>>,
        commands: Vec<(u8, Direction)>,
        stops: Vec<StopMode>,
    }

    impl MotorDrive for RecordingDrive {
        fn set_speed(&mut self, level: u8, direction: Direction) {
            self.level.set(level);
            self.commands.push((level, direction));
        }

        fn stop(&mut self, mode: StopMode) {
            self.level.set(0);
            self.stops.push(mode);
        }
    }

    /// Delay that produces a tick once the motor level reaches `moves_at`
    struct MotorTestDelay<'a> {
        encoder: &'a EncoderTickCounter,
        level: Rc<Cell<u8>>,
        moves_at: u8,
        elapsed_ms: u64,
    }

    impl DelayNs for MotorTestDelay<'_> {
        async fn delay_ns(&mut self, ns: u32) {
            self.elapsed_ms += u64::from(ns / 1_000_000);
            if self.level.get() >= self.moves_at {
                self.encoder.on_edge(Instant::from_millis(self.elapsed_ms));
            }
        }
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn controller(encoder: &EncoderTickCounter) -> RampMotorController<'_, RecordingDrive> {
        RampMotorController::new(
            RecordingDrive::default(),
            encoder,
            RampConfig::default(),
            MotorCalibration::new(40, 200),
        )
    }

    #[test]
    fn init_starts_ramp_at_start_speed() {
        let encoder = EncoderTickCounter::new();
        let mut motor = controller(&encoder);
        motor.init_go_distance_count(100, Direction::Backward, at(0));

        assert_eq!(motor.phase(), RampPhase::RampUp);
        assert_eq!(motor.current_speed(), 40);
        assert_eq!(motor.target_count(), 100);
        assert_eq!(motor.drive().commands.last(), Some(&(40, Direction::Backward)));
    }

    #[test]
    fn new_move_discards_running_move() {
        let encoder = EncoderTickCounter::new();
        let mut motor = controller(&encoder);
        motor.init_go_distance_count(100, Direction::Forward, at(0));
        for tick in 1..=6u64 {
            encoder.on_edge(at(tick * 10));
            motor.update_motor(at(tick * 10)).unwrap();
        }
        assert_eq!(motor.phase(), RampPhase::FullSpeed);

        assert_eq!(motor.last_ride_count(), 6);
        motor.init_go_distance_count(30, Direction::Backward, at(100));
        assert_eq!(motor.tick_count(), 0);
        assert_eq!(motor.last_ride_count(), 0);
        assert_eq!(motor.last_target_count(), 100);
        assert_eq!(motor.phase(), RampPhase::RampUp);
        assert_eq!(motor.velocity(), 0);
        assert_eq!(motor.debug_count(), 0);
        assert_eq!(motor.direction(), Direction::Backward);
    }

    #[test]
    fn zero_target_stays_stopped() {
        let encoder = EncoderTickCounter::new();
        let mut motor = controller(&encoder);
        motor.init_go_distance_count(0, Direction::Forward, at(0));
        assert_eq!(motor.phase(), RampPhase::Stopped);
        assert_eq!(motor.update_motor(at(1)), Ok(false));
    }

    #[test]
    fn short_move_uses_steeper_ramp() {
        let encoder = EncoderTickCounter::new();
        let mut motor = controller(&encoder);
        motor.init_go_distance_count(9, Direction::Forward, at(0));

        // 160 levels in 4 ticks of 40
        let mut speeds = Vec::new();
        for tick in 1..=8u64 {
            encoder.on_edge(at(tick * 10));
            assert_eq!(motor.update_motor(at(tick * 10)), Ok(true));
            speeds.push(motor.current_speed());
        }
        assert_eq!(speeds, [80, 120, 160, 200, 200, 160, 120, 80]);
        assert_eq!(motor.phase(), RampPhase::RampDown);

        encoder.on_edge(at(90));
        assert_eq!(motor.update_motor(at(90)), Ok(false));
        assert_eq!(motor.tick_count(), 9);
        assert_eq!(motor.speed_at_target_reached(), 80);
        assert_eq!(motor.drive().stops.last(), Some(&StopMode::Brake));
    }

    #[test]
    fn tiny_move_crawls_at_start_speed() {
        let encoder = EncoderTickCounter::new();
        let mut motor = controller(&encoder);
        motor.init_go_distance_count(4, Direction::Backward, at(0));
        assert_eq!(motor.phase(), RampPhase::RampDown);
        assert_eq!(motor.drive().commands, [(40, Direction::Backward)]);

        for tick in 1..=3u64 {
            encoder.on_edge(at(tick * 10));
            assert_eq!(motor.update_motor(at(tick * 10)), Ok(true));
            assert_eq!(motor.current_speed(), 40);
        }
        encoder.on_edge(at(40));
        assert_eq!(motor.update_motor(at(40)), Ok(false));
        assert_eq!(motor.tick_count(), 4);
        assert_eq!(motor.drive().commands.len(), 1);
    }

    #[test]
    fn stall_while_ramping_down_is_reported() {
        let encoder = EncoderTickCounter::new();
        let mut motor = controller(&encoder);
        motor.init_go_distance_count(100, Direction::Forward, at(0));
        for tick in 1..=97u64 {
            encoder.on_edge(at(tick * 10));
            motor.update_motor(at(tick * 10)).unwrap();
        }
        assert_eq!(motor.phase(), RampPhase::RampDown);

        let result = motor.update_motor(at(970 + 600));
        assert_eq!(result, Err(MotorError::Stalled { ticks: 97, target: 100 }));
        assert!(motor.is_stalled());
        assert_eq!(motor.phase(), RampPhase::Stopped);
        assert_eq!(motor.last_target_count(), 100);
        assert_eq!(motor.drive().stops.last(), Some(&StopMode::Brake));
    }

    #[test]
    fn negative_distance_moves_backward() {
        let encoder = EncoderTickCounter::new();
        let mut motor = controller(&encoder);
        motor.init_go_distance_count_signed(-50, at(0));
        assert_eq!(motor.target_count(), 50);
        assert_eq!(motor.direction(), Direction::Backward);

        motor.init_go_distance_count_signed(i16::MIN, at(10));
        assert_eq!(motor.target_count(), 32768);
        assert_eq!(motor.direction(), Direction::Backward);

        motor.init_go_distance_count_signed(30, at(20));
        assert_eq!(motor.direction(), Direction::Forward);
        assert_eq!(motor.drive().commands.last(), Some(&(40, Direction::Forward)));
    }

    #[test]
    fn burst_of_ticks_saturates_speed_change() {
        let encoder = EncoderTickCounter::new();
        let mut motor = RampMotorController::new(
            RecordingDrive::default(),
            &encoder,
            RampConfig::default(),
            MotorCalibration::new(1, 255),
        );
        motor.init_go_distance_count(u16::MAX, Direction::Forward, at(0));
        assert_eq!(motor.ramp_delta, 51);

        // Thousands of ticks between two updates
        for tick in 1..=2_000u64 {
            encoder.on_edge(at(tick * 4));
        }
        assert_eq!(motor.update_motor(at(8_000)), Ok(true));
        assert_eq!(motor.current_speed(), 255);
    }

    #[test]
    fn velocity_follows_tick_interval() {
        let encoder = EncoderTickCounter::new();
        let mut motor = controller(&encoder);
        motor.init_go_distance_count(100, Direction::Forward, at(0));
        for tick in 1..=5u64 {
            encoder.on_edge(at(tick * 10));
            motor.update_motor(at(tick * 10)).unwrap();
        }
        // 500 / 10 ms
        assert_eq!(motor.velocity(), 50);

        // Overdue tick lowers the velocity
        motor.update_motor(at(90)).unwrap();
        motor.update_motor(at(91)).unwrap();
        motor.update_motor(at(92)).unwrap();
        assert!(motor.velocity() < 50);
    }

    #[test]
    fn compensation_lowers_cruise_speed() {
        let encoder = EncoderTickCounter::new();
        let mut motor = controller(&encoder);
        motor.init_go_distance_count(100, Direction::Forward, at(0));
        for tick in 1..=5u64 {
            encoder.on_edge(at(tick * 10));
            motor.update_motor(at(tick * 10)).unwrap();
        }
        assert_eq!(motor.phase(), RampPhase::FullSpeed);
        assert_eq!(motor.current_speed(), 200);

        motor.set_speed_compensation(12);
        assert_eq!(motor.current_speed(), 188);
        assert_eq!(motor.drive().level.get(), 188);
    }

    #[test]
    fn requested_ramp_down_stops_within_min_ticks() {
        let encoder = EncoderTickCounter::new();
        let mut motor = controller(&encoder);
        motor.init_go_distance_count(100, Direction::Forward, at(0));
        for tick in 1..=10u64 {
            encoder.on_edge(at(tick * 10));
            motor.update_motor(at(tick * 10)).unwrap();
        }

        motor.start_ramp_down();
        assert_eq!(motor.phase(), RampPhase::RampDown);
        assert_eq!(motor.target_count(), 13);
    }

    #[test]
    fn stop_keeps_encoder_count() {
        let encoder = EncoderTickCounter::new();
        let mut motor = controller(&encoder);
        motor.init_go_distance_count(100, Direction::Forward, at(0));
        encoder.on_edge(at(10));
        motor.update_motor(at(10)).unwrap();

        motor.stop(StopMode::Coast);
        assert_eq!(motor.phase(), RampPhase::Stopped);
        assert_eq!(motor.tick_count(), 1);
        assert_eq!(motor.drive().stops.last(), Some(&StopMode::Coast));

        motor.reset_control_values(at(20));
        assert_eq!(motor.tick_count(), 0);
        assert_eq!(motor.direction(), Direction::Forward);
    }

    #[test]
    fn calibration_finds_first_moving_level() {
        let encoder = EncoderTickCounter::new();
        let drive = RecordingDrive::default();
        let level = drive.level.clone();
        let mut motor =
            RampMotorController::new(drive, &encoder, RampConfig::default(), MotorCalibration::new(0, 0));
        let mut delay = MotorTestDelay {
            encoder: &encoder,
            level,
            moves_at: 57,
            elapsed_ms: 0,
        };

        let start = block_on(motor.calibrate(&mut delay));
        assert_eq!(start, Ok(57));
        assert_eq!(motor.calibration().start_speed, 57);
        assert_eq!(motor.calibration().drive_speed, 114);
        assert_eq!(motor.drive().stops.last(), Some(&StopMode::Brake));
    }

    #[test]
    fn calibration_fails_without_ticks() {
        let encoder = EncoderTickCounter::new();
        let drive = RecordingDrive::default();
        let level = drive.level.clone();
        let mut motor = RampMotorController::new(
            drive,
            &encoder,
            RampConfig::default(),
            MotorCalibration::default(),
        );
        let mut delay = MotorTestDelay {
            encoder: &encoder,
            level,
            moves_at: u8::MAX,
            elapsed_ms: 0,
        };
        motor.config.max_speed = 100;

        let result = block_on(motor.calibrate(&mut delay));
        assert_eq!(result, Err(MotorError::CalibrationFailed { max_level: 100 }));
        assert_eq!(motor.drive().level.get(), 0);
    }
}
