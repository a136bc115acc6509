pub mod install;
pub mod keyboard;
pub mod locale;
pub mod localization;
