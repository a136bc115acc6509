//! Keyboard configuration of a running live desktop session.

use crate::internal::config::CapabilityFlags;
use crate::internal::exec::{exec_capture, ExecMode};
use crate::internal::localed::join_layout_variant;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INPUT_SOURCE_RE: Regex = Regex::new(r"\(\s*'([^']*)'\s*,\s*'([^']*)'\s*\)").unwrap();
}

/// Reads the layouts configured in a live desktop session.
pub trait LiveEnvironmentReader {
    /// Configured layouts in session order.
    fn layouts(&self) -> Vec<String>;
    /// The active layout, or an empty string if the session reports none.
    fn current_layout(&self) -> String;
}

/// Converts a gsettings `a(ss)` input source list to layout specs.
///
/// Only `xkb` sources are layouts; input methods such as ibus are skipped.
pub fn parse_input_sources(output: &str) -> Vec<String> {
    INPUT_SOURCE_RE
        .captures_iter(output)
        .filter(|caps| &caps[1] == "xkb")
        .map(|caps| {
            let source = &caps[2];
            match source.split_once('+') {
                Some((layout, variant)) => join_layout_variant(layout, variant),
                None => source.to_string(),
            }
        })
        .collect()
}

/// The active layout from a `mru-sources` list: its first xkb entry, most
/// recently used source first.
pub fn current_from_sources(output: &str) -> String {
    parse_input_sources(output)
        .into_iter()
        .next()
        .unwrap_or_default()
}

/// `gsettings` arguments reading an input source key.
pub fn input_sources_args(key: &str) -> Vec<String> {
    vec![
        "get".to_string(),
        "org.gnome.desktop.input-sources".to_string(),
        key.to_string(),
    ]
}

pub struct GnomeShellKeyboard {
    user: String,
}

impl GnomeShellKeyboard {
    pub fn new(user: impl Into<String>) -> Self {
        GnomeShellKeyboard { user: user.into() }
    }

    fn read_key(&self, key: &str) -> String {
        let mode = ExecMode::AsUser { user: &self.user };
        match exec_capture(mode, "gsettings", input_sources_args(key)) {
            Ok(output) => output,
            Err(e) => {
                log::debug!("Reading live input sources '{}' failed: {}", key, e);
                String::new()
            }
        }
    }
}

impl LiveEnvironmentReader for GnomeShellKeyboard {
    fn layouts(&self) -> Vec<String> {
        parse_input_sources(&self.read_key("sources"))
    }

    fn current_layout(&self) -> String {
        current_from_sources(&self.read_key("mru-sources"))
    }
}

/// The live session reader, if the environment provides one.
pub fn get_live_keyboard_instance(flags: &CapabilityFlags) -> Option<GnomeShellKeyboard> {
    if flags.provides_live_session {
        Some(GnomeShellKeyboard::new(flags.live_user.clone()))
    } else {
        None
    }
}
