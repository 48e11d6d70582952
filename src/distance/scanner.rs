//! Scan head sweep

use embedded_hal_async::delay::DelayNs;

use super::{
    AbortSignal, DistanceSensor, ForwardDistances, NoOpticalSensor, ScanServo, ServoPosition,
    FORWARD_ANGLE,
};
use crate::config::{DistanceSourceMode, ScanConfig};
use crate::error::ScanError;

/// What a scan measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanMode {
    /// One reading straight ahead
    Forward,
    /// Full sweep, `threshold_cm` is used for [`ForwardDistances::threshold_index`]
    Sweep { threshold_cm: u8 },
}

/// Result of a scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanReport<const N: usize = 10> {
    Forward { distance_cm: u8 },
    Sweep(ForwardDistances<N>),
}

/// Servo, sensors and the result of the last sweep
pub struct DistanceScanner<S, U, O = NoOpticalSensor, const N: usize = 10> {
    servo: S,
    ultrasonic: U,
    optical: Option<O>,
    config: ScanConfig,
    position: ServoPosition,
    distances: ForwardDistances<N>,
}

impl<S: ScanServo, U: DistanceSensor, const N: usize> DistanceScanner<S, U, NoOpticalSensor, N> {
    /// Scanner with an ultrasonic sensor only
    pub fn new(servo: S, ultrasonic: U, config: ScanConfig) -> Self {
        Self::with_optical(servo, ultrasonic, None, config)
    }
}

impl<S, U, O, const N: usize> DistanceScanner<S, U, O, N>
where
    S: ScanServo,
    U: DistanceSensor,
    O: DistanceSensor,
{
    /// Scanner with an optional second, optical sensor
    pub fn with_optical(servo: S, ultrasonic: U, optical: Option<O>, config: ScanConfig) -> Self {
        Self {
            servo,
            ultrasonic,
            optical,
            config,
            position: ServoPosition::default(),
            distances: ForwardDistances::new(config),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Change scan settings, the stored sweep is kept until the next one
    pub fn set_config(&mut self, config: ScanConfig) {
        self.config = config;
    }

    /// Result of the last completed sweep
    pub fn distances(&self) -> &ForwardDistances<N> {
        &self.distances
    }

    pub fn position(&self) -> &ServoPosition {
        &self.position
    }

    pub fn servo_mut(&mut self) -> &mut S {
        &mut self.servo
    }

    /// Turn the scan head to `angle` and wait until it settled
    pub async fn point_to<D: DelayNs>(&mut self, angle: u8, delay: &mut D) {
        let extra_ms = if self.config.slow_scan {
            self.config.slow_scan_extra.as_millis() as u32
        } else {
            0
        };
        self.position
            .move_to(&mut self.servo, angle, self.config.settle_ms_per_degree, extra_ms);
        if let Some(settle_ms) = self.position.take_delay_ms() {
            delay.delay_ms(settle_ms).await;
        }
    }

    /// Run a scan
    ///
    /// A sweep starts at the end nearer to the scan head and always stores samples from right
    /// to left. When `abort` fires during a sweep the samples taken so far are dropped and
    /// the last completed sweep stays available.
    pub async fn scan<D: DelayNs>(
        &mut self,
        mode: ScanMode,
        delay: &mut D,
        abort: Option<&AbortSignal>,
    ) -> Result<ScanReport<N>, ScanError> {
        self.check_sources()?;

        match mode {
            ScanMode::Forward => {
                self.point_to(FORWARD_ANGLE, delay).await;
                let distance_cm = self.read_fused().await;
                debug!("forward distance {} cm", distance_cm);
                Ok(ScanReport::Forward { distance_cm })
            }
            ScanMode::Sweep { threshold_cm } => {
                let mut sweep = ForwardDistances::<N>::new(self.config);
                let from_left = self.position.last_angle().unwrap_or(0) > FORWARD_ANGLE;

                for step in 0..N {
                    if abort.is_some_and(|signal| signal.try_take().is_some()) {
                        warn!("sweep aborted after {} of {} samples", step, N);
                        return Err(ScanError::Aborted {
                            completed: step,
                            total: N,
                        });
                    }

                    let index = if from_left { N - 1 - step } else { step };
                    let angle = sweep.angle_of(index).min(180) as u8;
                    self.point_to(angle, delay).await;
                    let distance_cm = self.read_fused().await;
                    sweep.set_raw(index, distance_cm);
                }

                sweep.post_process(threshold_cm);
                self.distances = sweep;
                Ok(ScanReport::Sweep(sweep))
            }
        }
    }

    /// Sweep and return the degrees to turn towards the nearest target closer than `max_cm`
    ///
    /// `Ok(None)` if the sweep found nothing in range.
    pub async fn scan_for_target<D: DelayNs>(
        &mut self,
        max_cm: u8,
        delay: &mut D,
        abort: Option<&AbortSignal>,
    ) -> Result<Option<i16>, ScanError> {
        self.scan(ScanMode::Sweep { threshold_cm: max_cm }, delay, abort)
            .await?;
        let direction = self.distances.target_direction(max_cm);
        debug!("target within {} cm at {:?} degrees", max_cm, direction);
        Ok(direction)
    }

    fn uses_ultrasonic(&self) -> bool {
        self.config.source_mode != DistanceSourceMode::Optical
    }

    fn uses_optical(&self) -> bool {
        self.optical.is_some() && self.config.source_mode != DistanceSourceMode::Ultrasonic
    }

    fn check_sources(&mut self) -> Result<(), ScanError> {
        if self.config.source_mode == DistanceSourceMode::Optical && self.optical.is_none() {
            warn!("optical distance source requested but not fitted");
            return Err(ScanError::SourceUnavailable);
        }

        let ultrasonic_ready = !self.uses_ultrasonic() || self.ultrasonic.is_ready();
        let optical_ready = !self.uses_optical()
            || self.optical.as_mut().is_some_and(|sensor| sensor.is_ready());
        if !(ultrasonic_ready && optical_ready) {
            warn!("distance sensor not ready");
            return Err(ScanError::NotReady);
        }
        Ok(())
    }

    /// One reading of the configured sources, clamped to the timeout
    async fn read_fused(&mut self) -> u8 {
        let timeout_cm = self.config.timeout_cm;

        let ultrasonic = if self.uses_ultrasonic() {
            Some(clamp(self.ultrasonic.read_distance_cm(timeout_cm).await, timeout_cm))
        } else {
            None
        };
        let optical = match self.optical.as_mut() {
            Some(sensor) if self.config.source_mode != DistanceSourceMode::Ultrasonic => {
                Some(clamp(sensor.read_distance_cm(timeout_cm).await, timeout_cm))
            }
            _ => None,
        };

        let fused = match (self.config.source_mode, ultrasonic, optical) {
            (DistanceSourceMode::Minimum, Some(us), Some(ir)) => us.min(ir),
            (DistanceSourceMode::Maximum, Some(us), Some(ir)) => us.max(ir),
            (_, Some(us), None) => us,
            (_, None, Some(ir)) => ir,
            _ => timeout_cm,
        };
        trace!("fused distance {} cm", fused);
        fused
    }
}

/// Timeouts and readings at or beyond the timeout become the timeout value
fn clamp(reading: Option<u16>, timeout_cm: u8) -> u8 {
    reading.map_or(timeout_cm, |cm| cm.min(u16::from(timeout_cm)) as u8)
}
