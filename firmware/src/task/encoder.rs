//! Encoder Task Module
//!
//! Feeds every edge of a wheel encoder into its tick counter. Debouncing and
//! counting happen in [`EncoderTickCounter::on_edge`], the drive task reads the
//! counters through the motor controllers.

use embassy_rp::gpio::Input;
use embassy_time::Instant;
use robot_car::EncoderTickCounter;

/// Tick counter of the left wheel
pub static LEFT_ENCODER: EncoderTickCounter = EncoderTickCounter::new();
/// Tick counter of the right wheel
pub static RIGHT_ENCODER: EncoderTickCounter = EncoderTickCounter::new();

/// One instance per wheel
#[embassy_executor::task(pool_size = 2)]
pub async fn encoder(mut pin: Input<'static>, counter: &'static EncoderTickCounter) {
    loop {
        pin.wait_for_any_edge().await;
        counter.on_edge(Instant::now());
    }
}
