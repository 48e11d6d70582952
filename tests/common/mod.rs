//! Host doubles for motors, encoders and the scan head
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embassy_time::Instant;
use embedded_hal_async::delay::DelayNs;
use robot_car::distance::{AbortSignal, DistanceSensor, ScanServo};
use robot_car::{Direction, EncoderTickCounter, MotorDrive, StopMode};

/// Motor driver output that only remembers the level
#[derive(Clone, Default)]
pub struct SimDrive {
    pub level: Rc<Cell<u8>>,
    pub direction: Rc<Cell<Direction>>,
}

impl MotorDrive for SimDrive {
    fn set_speed(&mut self, level: u8, direction: Direction) {
        self.level.set(level);
        self.direction.set(direction);
    }

    fn stop(&mut self, _mode: StopMode) {
        self.level.set(0);
    }
}

/// Motor and encoder disk: ticks at a rate proportional to the drive level
pub struct SimPlant<'a> {
    encoder: &'a EncoderTickCounter,
    level: Rc<Cell<u8>>,
    /// Ticks per ms per level
    efficiency: f32,
    /// Level below which the motor does not turn
    breakaway: u8,
    /// Tick count at which the motor jams
    jam_at: Option<u16>,
    phase: f32,
}

impl<'a> SimPlant<'a> {
    /// One tick per 5 ms at full level
    pub const EFFICIENCY: f32 = 1.0 / (255.0 * 5.0);

    pub fn new(encoder: &'a EncoderTickCounter, drive: &SimDrive) -> Self {
        Self {
            encoder,
            level: drive.level.clone(),
            efficiency: Self::EFFICIENCY,
            breakaway: 1,
            jam_at: None,
            phase: 0.0,
        }
    }

    pub fn with_efficiency(mut self, factor: f32) -> Self {
        self.efficiency = Self::EFFICIENCY * factor;
        self
    }

    pub fn with_breakaway(mut self, level: u8) -> Self {
        self.breakaway = level;
        self
    }

    pub fn jam_at(mut self, ticks: u16) -> Self {
        self.jam_at = Some(ticks);
        self
    }

    /// Advance the motor by one millisecond ending at `now_ms`
    pub fn step(&mut self, now_ms: u64) {
        let level = self.level.get();
        let jammed = self
            .jam_at
            .is_some_and(|ticks| self.encoder.count() >= ticks);
        if level < self.breakaway || jammed {
            return;
        }
        self.phase += f32::from(level) * self.efficiency;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
            self.encoder.on_edge(Instant::from_millis(now_ms));
        }
    }
}

/// Delay that only adds up the requested time
#[derive(Default)]
pub struct RecordingDelay<'a> {
    pub total_ms: u64,
    pub calls: usize,
    /// Fire the signal when this many delays have been requested
    pub abort: Option<(usize, &'a AbortSignal)>,
}

impl DelayNs for RecordingDelay<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ms += u64::from(ns) / 1_000_000;
        self.calls += 1;
        if let Some((after, signal)) = self.abort {
            if self.calls == after {
                signal.signal(());
            }
        }
    }
}

/// Scan servo sharing its angle with the fake sensors
#[derive(Default)]
pub struct FakeServo {
    pub angle: Rc<Cell<u8>>,
    pub commands: Vec<u8>,
}

impl ScanServo for FakeServo {
    fn set_angle(&mut self, degrees: u8) {
        self.angle.set(degrees);
        self.commands.push(degrees);
    }
}

/// Range sensor answering from a function of the scan head angle
pub struct FakeSensor {
    angle: Rc<Cell<u8>>,
    reading: Box<dyn Fn(u8) -> Option<u16>>,
    pub ready: bool,
    pub reads: Rc<RefCell<Vec<u8>>>,
}

impl FakeSensor {
    pub fn new(servo: &FakeServo, reading: impl Fn(u8) -> Option<u16> + 'static) -> Self {
        Self {
            angle: servo.angle.clone(),
            reading: Box::new(reading),
            ready: true,
            reads: Rc::default(),
        }
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }
}

impl DistanceSensor for FakeSensor {
    async fn read_distance_cm(&mut self, _timeout_cm: u8) -> Option<u16> {
        let angle = self.angle.get();
        self.reads.borrow_mut().push(angle);
        (self.reading)(angle)
    }

    fn is_ready(&mut self) -> bool {
        self.ready
    }
}

/// Distance from the scan head at `angle_deg` to the wall
/// `x·cos(normal) + y·sin(normal) = offset`, `None` if the ray misses it
pub fn wall_distance(angle_deg: u8, normal_deg: f32, offset_cm: f32) -> Option<u16> {
    let projection = (f32::from(angle_deg) - normal_deg).to_radians().cos();
    if projection <= 0.0 {
        return None;
    }
    let distance = (offset_cm / projection).round();
    (distance < 1000.0).then_some(distance as u16)
}
