pub mod drive;
pub mod encoder;
pub mod scan;
pub mod servo;
pub mod ultrasonic;
