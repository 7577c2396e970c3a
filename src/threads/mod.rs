use log::warn;
use thread_priority::{set_current_thread_priority, ThreadPriority};

pub mod file_logger_thread;

pub const FILE_LOGGER_THREAD_PRIORITY: u8 = 0;

/// Best effort: most platforms refuse priority changes without privileges.
pub fn set_thread_priority<const PRIORITY: u8>() {
    let priority = match PRIORITY.try_into() {
        Ok(value) => ThreadPriority::Crossplatform(value),
        Err(e) => return warn!("[set_thread_priority] {} rejected: {:?}", PRIORITY, e),
    };
    if let Err(e) = set_current_thread_priority(priority) {
        warn!("[set_thread_priority] {:?}", e);
    }
}
