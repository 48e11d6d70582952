//! Robot firmware entry point
//!
//! Initializes the system and spawns the encoder, drive and scan tasks. Deciding
//! where to go is left to whoever sends drive and scan commands.

#![no_std]
#![no_main]

use crate::task::{
    drive::drive,
    encoder::{encoder, LEFT_ENCODER, RIGHT_ENCODER},
    scan::scan,
};
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::config::Config;
use embassy_rp::gpio::{Input, Pull};
use system::resources::{
    AssignedResources, MotorDriverResources, MotorEncoderResources, SweepServoResources,
    UltrasonicDistanceSensorResources,
};
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// System core modules
mod system;
/// Task implementations
mod task;

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());

    // Split the resources into separate groups for each task
    let r = split_resources!(p);

    // Encoders first, the drive task reads their counters
    let left = Input::new(r.motor_encoders.left_encoder_pin, Pull::Up);
    let right = Input::new(r.motor_encoders.right_encoder_pin, Pull::Up);
    spawner.spawn(encoder(left, &LEFT_ENCODER)).unwrap();
    spawner.spawn(encoder(right, &RIGHT_ENCODER)).unwrap();

    spawner.spawn(drive(r.motor_driver)).unwrap();
    spawner
        .spawn(scan(r.sweep_servo, r.us_distance_sensor))
        .unwrap();
}
