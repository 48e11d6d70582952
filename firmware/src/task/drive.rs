//! Drive Task Module
//!
//! Runs both motors through the ramp controllers of `robot_car`. Commands arrive via
//! [`drive_command`], and a 5 ms ticker advances the running move. Outcomes are
//! reported through [`event`].
//!
//! The TB6612FNG takes a duty cycle in percent, speed levels 0-255 are scaled down
//! to that range.

use crate::system::drive_command::{self, Command};
use crate::system::event::{self, Moved};
use crate::system::resources::MotorDriverResources;
use defmt::{error, info, warn};
use embassy_futures::select::{select, Either};
use embassy_rp::gpio;
use embassy_rp::pwm;
use embassy_time::{Delay, Duration, Instant, Ticker, Timer};
use robot_car::{
    Direction, MotorCalibration, MotorDrive, MotorPair, MotorSynchronizer, RampConfig,
    RampMotorController, StopMode,
};
use tb6612fng::{DriveCommand, Motor};

use super::encoder::{LEFT_ENCODER, RIGHT_ENCODER};

/// Interval at which a running move is updated, well below one encoder tick at full speed
const UPDATE_INTERVAL: Duration = Duration::from_millis(5);

type DriverMotor = Motor<gpio::Output<'static>, gpio::Output<'static>, pwm::Pwm<'static>>;

/// One motor channel of the TB6612FNG
struct TrackMotor {
    motor: DriverMotor,
    name: &'static str,
}

impl TrackMotor {
    fn drive(&mut self, command: DriveCommand) {
        if self.motor.drive(command).is_err() {
            warn!("{} motor: driver rejected command", self.name);
        }
    }
}

impl MotorDrive for TrackMotor {
    fn set_speed(&mut self, level: u8, direction: Direction) {
        let percent = (u16::from(level) * 100 / 255) as u8;
        match direction {
            Direction::Forward => self.drive(DriveCommand::Forward(percent)),
            Direction::Backward => self.drive(DriveCommand::Backward(percent)),
        }
    }

    fn stop(&mut self, mode: StopMode) {
        match mode {
            StopMode::Brake => self.drive(DriveCommand::Brake),
            StopMode::Coast => self.drive(DriveCommand::Stop),
        }
    }
}

#[embassy_executor::task]
pub async fn drive(r: MotorDriverResources) {
    // Configure PWM for motor control
    // We use 10kHz frequency as cheaper DC motors often work better at lower frequencies
    let desired_freq_hz = 10_000;
    let clock_freq_hz = embassy_rp::clocks::clk_sys_freq(); // 150MHz

    // Calculate minimum divider needed to keep period under 16-bit limit (65535)
    let divider = ((clock_freq_hz / desired_freq_hz) / 65535 + 1) as u8;
    let period = (clock_freq_hz / (desired_freq_hz * divider as u32)) as u16 - 1;

    let mut pwm_config = pwm::Config::default();
    pwm_config.divider = divider.into();
    pwm_config.top = period;

    let mut standby = gpio::Output::new(r.standby_pin, gpio::Level::Low);

    // motor A, here defined to be the left motor
    let left_fwd = gpio::Output::new(r.left_forward_pin, gpio::Level::Low);
    let left_bckw = gpio::Output::new(r.left_backward_pin, gpio::Level::Low);
    let left_pwm = pwm::Pwm::new_output_a(r.left_slice, r.left_pwm_pin, pwm_config.clone());

    // motor B, here defined to be the right motor
    let right_fwd = gpio::Output::new(r.right_forward_pin, gpio::Level::Low);
    let right_bckw = gpio::Output::new(r.right_backward_pin, gpio::Level::Low);
    let right_pwm = pwm::Pwm::new_output_b(r.right_slice, r.right_pwm_pin, pwm_config);

    let (Ok(left_motor), Ok(right_motor)) = (
        Motor::new(left_fwd, left_bckw, left_pwm),
        Motor::new(right_fwd, right_bckw, right_pwm),
    ) else {
        error!("motor driver setup failed, drive task ends");
        return;
    };

    let calibration = MotorCalibration::default();
    let mut motors = MotorPair::new(
        RampMotorController::new(
            TrackMotor {
                motor: left_motor,
                name: "left",
            },
            &LEFT_ENCODER,
            RampConfig::default(),
            calibration,
        ),
        RampMotorController::new(
            TrackMotor {
                motor: right_motor,
                name: "right",
            },
            &RIGHT_ENCODER,
            RampConfig::default(),
            calibration,
        ),
        MotorSynchronizer::default(),
    );

    // Leave standby, the driver needs a moment before it takes commands
    standby.set_high();
    Timer::after(Duration::from_millis(100)).await;

    let mut ticker = Ticker::every(UPDATE_INTERVAL);
    loop {
        match select(drive_command::wait(), ticker.next()).await {
            Either::First(command) => handle_command(&mut motors, command).await,
            Either::Second(()) => {
                if motors.all_stopped() {
                    continue;
                }
                match motors.update_all(Instant::now()) {
                    Ok(true) => {}
                    Ok(false) => {
                        let moved = Moved {
                            left: motors.left().tick_count(),
                            right: motors.right().tick_count(),
                        };
                        info!("move finished {}", moved);
                        event::MOVE.signal(Ok(moved));
                    }
                    Err(e) => {
                        warn!("move failed: {}", e);
                        event::MOVE.signal(Err(e));
                    }
                }
            }
        }
    }
}

async fn handle_command(motors: &mut MotorPair<'static, TrackMotor>, command: Command) {
    info!("drive command {}", command);
    match command {
        Command::GoDistance { ticks, direction } => {
            motors.init_go_distance_count_for_all(ticks, direction, Instant::now());
        }
        Command::RampDown => motors.start_ramp_down_all(),
        Command::Brake => motors.stop_all(StopMode::Brake),
        Command::Coast => motors.stop_all(StopMode::Coast),
        Command::Calibrate => {
            let result = motors.calibrate_all(&mut Delay).await;
            match result {
                Ok([left, right]) => info!("calibrated start speed left {} right {}", left, right),
                Err(e) => warn!("calibration failed: {}", e),
            }
            event::CALIBRATION.signal(result);
        }
    }
}
