pub mod drive_command;
pub mod event;
pub mod resources;
pub mod scan_command;
