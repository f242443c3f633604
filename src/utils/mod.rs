pub mod format;
pub mod reply;
pub mod time;
