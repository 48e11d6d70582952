//! Straight line synchronization
//!
//! Two motors at the same drive level rarely turn at the same rate. Every few ticks the
//! tick counts of both motors are compared and the one ahead is slowed down in
//! proportion to its lead. The motor behind always runs at its full drive level.
//!
//! Synchronization only acts while both motors cruise. Ramps have their own speed
//! profile and are left alone.

use super::{MotorDrive, RampMotorController, RampPhase};
use crate::config::SyncConfig;

/// Result of one synchronization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncCorrection {
    /// Ticks of the first motor minus ticks of the second
    pub gap: i32,
    /// Compensation now applied to the first motor
    pub first_compensation: u8,
    /// Compensation now applied to the second motor
    pub second_compensation: u8,
}

/// Periodic tick count comparison of two motors
#[derive(Debug, Clone)]
pub struct MotorSynchronizer {
    config: SyncConfig,
    /// Tick count of the first motor at which the next check is due
    next_check: Option<u16>,
}

impl MotorSynchronizer {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            next_check: None,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Forget the check schedule, the next cruising update checks at once
    pub fn reset(&mut self) {
        self.next_check = None;
    }

    /// Compare both motors and adjust their compensation if a check is due
    ///
    /// Returns the correction if a check took place.
    pub fn synchronize<A: MotorDrive, B: MotorDrive>(
        &mut self,
        first: &mut RampMotorController<'_, A>,
        second: &mut RampMotorController<'_, B>,
    ) -> Option<SyncCorrection> {
        if first.phase() != RampPhase::FullSpeed || second.phase() != RampPhase::FullSpeed {
            self.next_check = None;
            return None;
        }

        let first_count = first.tick_count();
        if matches!(self.next_check, Some(due) if first_count < due) {
            return None;
        }
        self.next_check = Some(
            first_count.saturating_add(self.config.check_interval_ticks.max(1)),
        );

        let gap = i32::from(first_count) - i32::from(second.tick_count());
        let lead = gap.unsigned_abs();

        let (first_compensation, second_compensation) =
            if lead <= u32::from(self.config.tolerance_ticks) {
                (0, 0)
            } else if gap > 0 {
                (self.compensation_for(first, lead), 0)
            } else {
                (0, self.compensation_for(second, lead))
            };

        first.set_speed_compensation(first_compensation);
        second.set_speed_compensation(second_compensation);

        if lead > u32::from(self.config.tolerance_ticks) {
            debug!(
                "sync gap {} ticks, compensation {} / {}",
                gap, first_compensation, second_compensation
            );
        }

        Some(SyncCorrection {
            gap,
            first_compensation,
            second_compensation,
        })
    }

    fn compensation_for<M: MotorDrive>(&self, leader: &RampMotorController<'_, M>, lead: u32) -> u8 {
        let calibration = leader.calibration();
        let headroom = calibration.drive_speed.saturating_sub(calibration.start_speed);
        let wanted = lead.saturating_mul(u32::from(self.config.gain));
        wanted
            .min(u32::from(self.config.max_compensation))
            .min(u32::from(headroom)) as u8
    }
}

impl Default for MotorSynchronizer {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}
