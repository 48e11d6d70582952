//! Hardware Resource Management
//!
//! Allocates pins and peripherals to the tasks that own them.
//!
//! # Resource Groups
//! - Distance Sensor: HC-SR04 ultrasonic sensor pins
//! - Sweep Servo: servo turning the distance sensor, driven by PIO
//! - Motor Control: dual motor driver pins and PWM channels
//! - Motor Encoders: one optical encoder input per wheel

use assign_resources::assign_resources;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{self, PIO0};
use embassy_rp::pio::InterruptHandler as PioInterruptHandler;

assign_resources! {
    /// HC-SR04 ultrasonic distance sensor pins
    us_distance_sensor: UltrasonicDistanceSensorResources {
       trigger_pin: PIN_15,
       echo_pin: PIN_14,
    },
    /// Servo under the distance sensor, out of PWM slices so it runs on PIO
    sweep_servo: SweepServoResources {
        pin: PIN_5,
        pio: PIO0,
    },
    /// TB6612FNG dual motor driver pins and PWM channels
    motor_driver: MotorDriverResources {
        standby_pin: PIN_22,
        // Motor drive PWM
        left_slice: PWM_SLICE6,
        left_pwm_pin: PIN_28,
        left_forward_pin: PIN_21,
        left_backward_pin: PIN_20,
        right_slice: PWM_SLICE5,
        right_pwm_pin: PIN_27,
        right_forward_pin: PIN_19,
        right_backward_pin: PIN_18,
    },
    /// Wheel encoder inputs
    motor_encoders: MotorEncoderResources {
        left_encoder_pin: PIN_7,
        right_encoder_pin: PIN_9,
    },
}

bind_interrupts!(pub struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});
