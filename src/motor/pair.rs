//! Left and right motor of the car
//!
//! Bundles both [`RampMotorController`]s with their [`MotorSynchronizer`], so the drive
//! task can start, update and stop the car with one call each.
//!
//! The `async` helpers poll [`MotorPair::update_all`] every [`POLL_INTERVAL_MS`] until
//! the car reached the state asked for. They read the time from the `now` function
//! passed in, `Instant::now` on the target.

use embassy_time::{Duration, Instant};
use embedded_hal_async::delay::DelayNs;

use super::{
    Direction, MotorDrive, MotorSynchronizer, RampMotorController, RampPhase, StopMode,
    SyncCorrection,
};
use crate::error::MotorError;

/// Index of the left motor
pub const LEFT: usize = 0;
/// Index of the right motor
pub const RIGHT: usize = 1;

/// Time between two updates in the waiting helpers
pub const POLL_INTERVAL_MS: u32 = 5;

/// Time without encoder ticks after which a braked motor counts as standing still
pub const STANDSTILL: Duration = Duration::from_millis(100);

/// Both motors of the car
pub struct MotorPair<'a, M> {
    motors: [RampMotorController<'a, M>; 2],
    sync: MotorSynchronizer,
}

impl<'a, M: MotorDrive> MotorPair<'a, M> {
    pub fn new(
        left: RampMotorController<'a, M>,
        right: RampMotorController<'a, M>,
        sync: MotorSynchronizer,
    ) -> Self {
        Self {
            motors: [left, right],
            sync,
        }
    }

    pub fn left(&self) -> &RampMotorController<'a, M> {
        &self.motors[LEFT]
    }

    pub fn right(&self) -> &RampMotorController<'a, M> {
        &self.motors[RIGHT]
    }

    pub fn left_mut(&mut self) -> &mut RampMotorController<'a, M> {
        &mut self.motors[LEFT]
    }

    pub fn right_mut(&mut self) -> &mut RampMotorController<'a, M> {
        &mut self.motors[RIGHT]
    }

    pub fn motors(&self) -> &[RampMotorController<'a, M>; 2] {
        &self.motors
    }

    /// Start both motors on a move of `target` ticks
    pub fn init_go_distance_count_for_all(&mut self, target: u16, direction: Direction, now: Instant) {
        self.sync.reset();
        for motor in self.motors.iter_mut() {
            motor.init_go_distance_count(target, direction, now);
        }
    }

    /// Start both motors on a move of `distance` ticks, backward if negative
    pub fn init_go_distance_count_signed_for_all(&mut self, distance: i16, now: Instant) {
        self.sync.reset();
        for motor in self.motors.iter_mut() {
            motor.init_go_distance_count_signed(distance, now);
        }
    }

    /// Update both motors, then synchronize them
    ///
    /// Both motors are always updated. Returns `Ok(true)` while any motor is moving; on a
    /// stall the other motor is stopped too and the first error is returned.
    pub fn update_all(&mut self, now: Instant) -> Result<bool, MotorError> {
        let mut moving = false;
        let mut first_error = None;

        for motor in self.motors.iter_mut() {
            match motor.update_motor(now) {
                Ok(running) => moving |= running,
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }

        if let Some(error) = first_error {
            self.stop_all(StopMode::Brake);
            return Err(error);
        }

        if moving {
            self.synchronize();
        }
        Ok(moving)
    }

    /// Run a synchronization check of left against right
    pub fn synchronize(&mut self) -> Option<SyncCorrection> {
        let [left, right] = &mut self.motors;
        self.sync.synchronize(left, right)
    }

    /// Slow both motors down to an orderly stop
    pub fn start_ramp_down_all(&mut self) {
        for motor in self.motors.iter_mut() {
            motor.start_ramp_down();
        }
    }

    pub fn stop_all(&mut self, mode: StopMode) {
        for motor in self.motors.iter_mut() {
            motor.stop(mode);
        }
        self.sync.reset();
    }

    pub fn reset_all(&mut self, now: Instant) {
        for motor in self.motors.iter_mut() {
            motor.reset_control_values(now);
        }
        self.sync.reset();
    }

    /// Returns whether no motor is moving
    pub fn all_stopped(&self) -> bool {
        self.motors.iter().all(|motor| !motor.phase().is_moving())
    }

    /// Returns whether every motor is moving
    pub fn all_started(&self) -> bool {
        self.motors.iter().all(|motor| motor.phase().is_moving())
    }

    /// Drive `distance` ticks, backward if negative, and wait until both motors stopped
    pub async fn go_distance_count_for_all<D: DelayNs>(
        &mut self,
        distance: i16,
        delay: &mut D,
        now: impl Fn() -> Instant,
    ) -> Result<(), MotorError> {
        self.init_go_distance_count_signed_for_all(distance, now());
        self.wait_until_all_stopped(delay, now).await
    }

    /// Ramp both motors up and return once both run at drive speed
    ///
    /// The move has no practical end, stop it with [`Self::start_ramp_down_all`] or
    /// [`Self::stop_all`] and keep calling [`Self::update_all`] meanwhile.
    pub async fn init_ramp_up_and_wait_for_drive_speed_for_all<D: DelayNs>(
        &mut self,
        direction: Direction,
        delay: &mut D,
        now: impl Fn() -> Instant,
    ) -> Result<(), MotorError> {
        self.init_go_distance_count_for_all(u16::MAX, direction, now());
        loop {
            let moving = self.update_all(now())?;
            let cruising = self
                .motors
                .iter()
                .all(|motor| motor.phase() == RampPhase::FullSpeed);
            if cruising || !moving {
                return Ok(());
            }
            delay.delay_ms(POLL_INTERVAL_MS).await;
        }
    }

    /// Keep updating both motors until the running move ended
    pub async fn wait_until_all_stopped<D: DelayNs>(
        &mut self,
        delay: &mut D,
        now: impl Fn() -> Instant,
    ) -> Result<(), MotorError> {
        while self.update_all(now())? {
            delay.delay_ms(POLL_INTERVAL_MS).await;
        }
        Ok(())
    }

    /// Brake both motors and wait until no encoder ticked for [`STANDSTILL`]
    pub async fn stop_all_and_wait_until_stopped<D: DelayNs>(
        &mut self,
        delay: &mut D,
        now: impl Fn() -> Instant,
    ) {
        self.stop_all(StopMode::Brake);
        loop {
            let time = now();
            let rolling = self
                .motors
                .iter()
                .any(|motor| motor.encoder().snapshot().since_last_tick(time) < STANDSTILL);
            if !rolling {
                return;
            }
            delay.delay_ms(POLL_INTERVAL_MS).await;
        }
    }

    /// Calibrate left, then right motor
    ///
    /// Returns the start speeds found.
    pub async fn calibrate_all<D: DelayNs>(&mut self, delay: &mut D) -> Result<[u8; 2], MotorError> {
        let left = self.motors[LEFT].calibrate(delay).await?;
        let right = self.motors[RIGHT].calibrate(delay).await?;
        Ok([left, right])
    }
}
