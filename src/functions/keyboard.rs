//! Keyboard configuration decisions: filling in a missing half of the
//! (layouts, keymap) pair, routing a generic keyboard value, and activating
//! the configuration on the running system.

use crate::internal::config::{CapabilityFlags, DEFAULT_KEYBOARD};
use crate::internal::error::{KeyboardError, Result};
use crate::internal::exec::{exec_unit, ExecMode, OnFail};
use crate::internal::live_keyboard::LiveEnvironmentReader;
use crate::internal::localed::ConversionService;
use std::io;
use std::process::ExitStatus;

/// X layouts and console keymap, in that order.
pub type KeyboardPair = (Vec<String>, String);

/// Outcome of trying to load a console keymap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Accepted,
    Rejected,
    /// The loader could not be run at all.
    ProbeFailed(String),
}

pub trait KeymapProbe {
    fn try_load(&self, keymap: &str) -> ProbeResult;
}

/// Probes keymaps with `loadkeys`.
pub struct LoadkeysProbe;

impl KeymapProbe for LoadkeysProbe {
    fn try_load(&self, keymap: &str) -> ProbeResult {
        try_to_load_keymap(keymap)
    }
}

pub fn try_to_load_keymap(keymap: &str) -> ProbeResult {
    let status = exec_unit(
        ExecMode::Direct,
        "loadkeys",
        vec![keymap.to_string()],
        OnFail::Continue,
    );
    keymap_load_result(keymap, status)
}

/// Maps the outcome of running `loadkeys` to a [`ProbeResult`].
pub fn keymap_load_result(keymap: &str, status: io::Result<ExitStatus>) -> ProbeResult {
    match status {
        Ok(status) if status.success() => ProbeResult::Accepted,
        Ok(status) => {
            log::debug!("loadkeys rejected keymap '{}' ({})", keymap, status);
            ProbeResult::Rejected
        }
        Err(e) => ProbeResult::ProbeFailed(format!("Failed to run loadkeys: {e}")),
    }
}

/// Completes a partial keyboard configuration.
///
/// Layouts missing on input are taken from the live session when there is
/// one, then converted from the keymap. A missing keymap is converted from
/// the live session's active layout if the layouts came from there, from the
/// layouts otherwise. With nothing to
/// go on, [`DEFAULT_KEYBOARD`] is used.
pub fn resolve_missing(
    x_layouts: &[String],
    vc_keymap: &str,
    conversion: &dyn ConversionService,
    live_reader: Option<&dyn LiveEnvironmentReader>,
) -> KeyboardPair {
    let mut x_layouts = x_layouts.to_vec();
    let mut vc_keymap = vc_keymap.to_string();

    if !x_layouts.is_empty() && !vc_keymap.is_empty() {
        return (x_layouts, vc_keymap);
    }

    // Set once the keymap was converted from the live session's layout.
    let mut live_converted = false;

    if x_layouts.is_empty() {
        if let Some(live) = live_reader {
            log::debug!("Keyboard configuration from Live system is used");
            let live_layouts = live.layouts();
            if !live_layouts.is_empty() {
                x_layouts = live_layouts;
                if vc_keymap.is_empty() {
                    live_converted = true;
                    let mut current = live.current_layout();
                    if current.is_empty() {
                        current = x_layouts[0].clone();
                    }
                    vc_keymap = conversion.convert_layouts_to_keymap(&[current]);
                }
            }
        }
    }

    if vc_keymap.is_empty() && x_layouts.is_empty() {
        log::debug!(
            "Using default value {} for missing virtual console keymap",
            DEFAULT_KEYBOARD
        );
        vc_keymap = DEFAULT_KEYBOARD.to_string();
        x_layouts = conversion.convert_keymap_to_layouts(&vc_keymap);
        if x_layouts.is_empty() {
            x_layouts = vec![DEFAULT_KEYBOARD.to_string()];
        }
    }

    if vc_keymap.is_empty() && !live_converted {
        vc_keymap = conversion.convert_layouts_to_keymap(&x_layouts);
    }

    if x_layouts.is_empty() {
        x_layouts = conversion.convert_keymap_to_layouts(&vc_keymap);
    }

    (x_layouts, vc_keymap)
}

/// Routes a generic keyboard value to the keymap slot if it loads as a
/// console keymap, otherwise to the layouts slot.
pub fn resolve_generic(identifier: &str, probe: &dyn KeymapProbe) -> Result<KeyboardPair> {
    if identifier.is_empty() {
        return Ok((Vec::new(), String::new()));
    }

    match probe.try_load(identifier) {
        ProbeResult::Accepted => {
            log::debug!("'{}' is a valid console keymap", identifier);
            Ok((Vec::new(), identifier.to_string()))
        }
        ProbeResult::Rejected => {
            log::debug!("'{}' is not a console keymap, using it as X layout", identifier);
            Ok((vec![identifier.to_string()], String::new()))
        }
        ProbeResult::ProbeFailed(reason) => Err(KeyboardError::Configuration(reason)),
    }
}

/// Assigns a generic keyboard value. Without permission to touch the running
/// keyboard the value cannot be probed and is taken as a console keymap.
pub fn assign_generic_keyboard_setting(
    flags: &CapabilityFlags,
    keyboard: &str,
    probe: &dyn KeymapProbe,
) -> Result<KeyboardPair> {
    if !flags.can_activate_keyboard {
        log::debug!("Keyboard can't be activated, '{}' is used as console keymap", keyboard);
        return Ok((Vec::new(), keyboard.to_string()));
    }
    resolve_generic(keyboard, probe)
}

/// Activates the keyboard configuration on the running system.
///
/// Returns the pair in effect afterwards. When the keyboard can't be
/// activated the input pair is returned untouched and the service is not
/// called.
pub fn apply_keyboard(
    flags: &CapabilityFlags,
    x_layouts: &[String],
    vc_keymap: &str,
    switch_options: &[String],
    conversion: &dyn ConversionService,
    probe: &dyn KeymapProbe,
) -> Result<KeyboardPair> {
    let mut x_layouts = x_layouts.to_vec();
    let mut vc_keymap = vc_keymap.to_string();

    if !flags.can_activate_keyboard {
        log::debug!("Keyboard can't be activated in this environment");
        return Ok((x_layouts, vc_keymap));
    }

    if !vc_keymap.is_empty() {
        match probe.try_load(&vc_keymap) {
            ProbeResult::Accepted => {
                log::info!("Activating console keymap {}", vc_keymap);
                let converted = conversion.apply_keymap_and_convert(&vc_keymap);
                if x_layouts.is_empty() {
                    x_layouts = converted;
                }
                return Ok((x_layouts, vc_keymap));
            }
            ProbeResult::Rejected => {
                log::error!("'{}' is not a valid console keymap, not loading", vc_keymap);
                vc_keymap.clear();
            }
            ProbeResult::ProbeFailed(reason) => {
                return Err(KeyboardError::Configuration(reason));
            }
        }
    }

    if !x_layouts.is_empty() {
        log::info!("Activating X layouts {:?}", x_layouts);
        vc_keymap = conversion.apply_layouts_and_convert(&x_layouts, switch_options);
    }

    Ok((x_layouts, vc_keymap))
}
