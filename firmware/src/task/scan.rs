//! Scan Task Module
//!
//! Owns the scan head servo and the ultrasonic sensor. Waits for scan requests from
//! [`scan_command`], runs them through the [`DistanceScanner`] and reports the
//! outcome through [`event`].

use crate::system::event;
use crate::system::resources::{Irqs, SweepServoResources, UltrasonicDistanceSensorResources};
use crate::system::scan_command;
use core::time::Duration;
use defmt::{info, warn};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::pio::Pio;
use embassy_rp::pio_programs::pwm::{PioPwm, PioPwmProgram};
use embassy_time::Delay;
use hcsr04_async::{Config, DistanceUnit, Hcsr04, TemperatureUnit};
use robot_car::{DistanceScanner, ScanConfig, ScanReport};

use super::servo::PioServo;
use super::ultrasonic::UltrasonicSensor;

#[embassy_executor::task]
pub async fn scan(s: SweepServoResources, u: UltrasonicDistanceSensorResources) {
    let Pio {
        mut common, sm0, ..
    } = Pio::new(s.pio, Irqs);

    let prg = PioPwmProgram::new(&mut common);
    let pwm_pio = PioPwm::new(&mut common, sm0, s.pin, &prg);
    // Pulse range of the MG996R, found by a rough experiment
    let servo = PioServo::start(
        pwm_pio,
        Duration::from_micros(500),
        Duration::from_micros(2400),
    );

    let config = Config {
        distance_unit: DistanceUnit::Centimeters,
        temperature_unit: TemperatureUnit::Celsius,
    };
    let trigger = Output::new(u.trigger_pin, Level::Low);
    let echo = Input::new(u.echo_pin, Pull::None);
    let sensor = UltrasonicSensor::new(Hcsr04::new(trigger, echo, config));

    let mut scanner: DistanceScanner<_, _> =
        DistanceScanner::new(servo, sensor, ScanConfig::default());
    let mut delay = Delay;

    loop {
        let mode = scan_command::wait().await;
        // An abort fired while idle belongs to an earlier sweep
        scan_command::ABORT.reset();

        let result = scanner
            .scan(mode, &mut delay, Some(&scan_command::ABORT))
            .await;
        match &result {
            Ok(ScanReport::Forward { distance_cm }) => info!("forward distance {} cm", distance_cm),
            Ok(ScanReport::Sweep(distances)) => info!(
                "sweep min {:?} max {:?} gap {:?} walls right {:?} left {:?}",
                distances.min_index(),
                distances.max_index(),
                distances.threshold_index(),
                distances.wall_right_angle(),
                distances.wall_left_angle()
            ),
            Err(e) => warn!("scan failed: {}", e),
        }
        event::SCAN.signal(result);
    }
}
