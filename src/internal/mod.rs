pub mod config;
pub mod error;
pub mod exec;
pub mod files;
pub mod live_keyboard;
pub mod localed;
pub mod returncode_eval;
pub mod strings;

pub use returncode_eval::*;
pub use strings::crash;
