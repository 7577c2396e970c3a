pub mod config;
pub mod main_thread;
pub mod ports;
pub mod serial_session;
pub mod threads;
pub mod utils;
