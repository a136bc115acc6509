//! Access to the system locale service (`systemd-localed`) through `localectl`.
//!
//! The service is the single source of truth for converting between console
//! keymaps and X11 layouts. It may be missing entirely (containers, image
//! builds), so every call degrades to an empty value or a no-op instead of
//! failing.

use crate::internal::config::CapabilityFlags;
use crate::internal::exec::{exec, exec_capture, ExecMode};
use crate::internal::strings::split_list;
use lazy_static::lazy_static;
use regex::Regex;
use std::io;

lazy_static! {
    static ref LAYOUT_VARIANT_RE: Regex =
        Regex::new(r"^\s*([/\w]+)\s*(?:\(\s*([-\w]+)\s*\))?\s*$").unwrap();
}

/// Converts between console keymaps and X11 layouts and exposes the
/// keyboard configuration of the running system.
///
/// Layouts are `"layout"` or `"layout (variant)"` strings. Implementations
/// never fail: an unreachable service yields empty values.
pub trait ConversionService {
    /// False when the service can't be reached and every call degrades.
    fn is_available(&self) -> bool;
    fn current_keymap(&self) -> String;
    fn current_layouts_variants(&self) -> Vec<String>;
    fn current_switch_options(&self) -> Vec<String>;
    fn convert_keymap_to_layouts(&self, keymap: &str) -> Vec<String>;
    fn convert_layouts_to_keymap(&self, layouts: &[String]) -> String;
    /// Activates the keymap and returns the layouts the service derived from it.
    fn apply_keymap_and_convert(&self, keymap: &str) -> Vec<String>;
    /// Activates the layouts and returns the keymap the service derived from them.
    fn apply_layouts_and_convert(&self, layouts: &[String], options: &[String]) -> String;
    fn apply_layouts(&self, layouts: &[String], options: &[String]);
}

pub fn join_layout_variant(layout: &str, variant: &str) -> String {
    if variant.is_empty() {
        layout.to_string()
    } else {
        format!("{layout} ({variant})")
    }
}

/// Splits `"cz (qwerty)"` into `("cz", "qwerty")`; `None` if malformed.
pub fn parse_layout_variant(spec: &str) -> Option<(String, String)> {
    let caps = LAYOUT_VARIANT_RE.captures(spec)?;
    let layout = caps.get(1)?.as_str().to_string();
    let variant = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
    Some((layout, variant))
}

/// Builds layout specs from the service's comma separated wire values.
pub fn layouts_from_wire(layouts: &str, variants: &str) -> Vec<String> {
    let layouts: Vec<&str> = if layouts.is_empty() {
        Vec::new()
    } else {
        layouts.split(',').collect()
    };
    let mut variants: Vec<&str> = if variants.is_empty() {
        Vec::new()
    } else {
        variants.split(',').collect()
    };
    if variants.len() < layouts.len() {
        variants.resize(layouts.len(), "");
    }

    layouts
        .iter()
        .zip(variants.iter())
        .map(|(layout, variant)| join_layout_variant(layout, variant))
        .collect()
}

/// Inverse of [`layouts_from_wire`]: `(layouts, variants)` comma joined.
///
/// Empty specs are skipped. Parsing stops at the first malformed spec; `None`
/// means nothing usable was parsed before it.
pub fn layouts_to_wire(specs: &[String]) -> Option<(String, String)> {
    let mut layouts = Vec::new();
    let mut variants = Vec::new();
    let mut parsing_failed = false;

    for spec in specs.iter().filter(|s| !s.is_empty()) {
        match parse_layout_variant(spec) {
            Some((layout, variant)) => {
                layouts.push(layout);
                variants.push(variant);
            }
            None => {
                log::debug!("Parsing of layout spec '{}' failed", spec);
                parsing_failed = true;
                break;
            }
        }
    }

    if layouts.is_empty() && parsing_failed {
        return None;
    }
    Some((layouts.join(","), variants.join(",")))
}

/// Keyboard related fields of `localectl status`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocaledStatus {
    pub keymap: String,
    pub layouts: String,
    pub variants: String,
    pub options: String,
}

fn status_value(value: &str) -> String {
    match value.trim() {
        "(unset)" | "n/a" => String::new(),
        v => v.to_string(),
    }
}

pub fn parse_status(output: &str) -> LocaledStatus {
    let mut status = LocaledStatus::default();
    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "VC Keymap" => status.keymap = status_value(value),
            "X11 Layout" => status.layouts = status_value(value),
            "X11 Variant" => status.variants = status_value(value),
            "X11 Options" => status.options = status_value(value),
            _ => {}
        }
    }
    status
}

/// Transport to localed; [`Localectl`] runs the real tool.
pub trait LocaledBackend {
    /// Output of `localectl status`.
    fn status(&self) -> io::Result<String>;
    /// Runs `localectl` with `args`.
    fn run(&self, args: Vec<String>) -> io::Result<()>;
}

pub struct Localectl;

impl LocaledBackend for Localectl {
    fn status(&self) -> io::Result<String> {
        exec_capture(ExecMode::Direct, "localectl", vec!["status".to_string()])
    }

    fn run(&self, args: Vec<String>) -> io::Result<()> {
        exec(ExecMode::Direct, "localectl", args)
    }
}

/// `localectl` arguments setting the console keymap. An empty keymap unsets it.
pub fn set_keymap_args(keymap: &str, convert: bool) -> Vec<String> {
    let mut args = Vec::new();
    if !convert {
        args.push("--no-convert".to_string());
    }
    args.push("set-keymap".to_string());
    args.push(keymap.to_string());
    args
}

/// `localectl` arguments setting X layouts and options; `None` if no spec
/// could be parsed. No specs unset the layouts.
pub fn set_layouts_args(
    specs: &[String],
    options: &[String],
    convert: bool,
) -> Option<Vec<String>> {
    let (layouts, variants) = layouts_to_wire(specs)?;
    let mut args = Vec::new();
    if !convert {
        args.push("--no-convert".to_string());
    }
    args.extend([
        "set-x11-keymap".to_string(),
        layouts,
        String::new(),
        variants,
        options.join(","),
    ]);
    Some(args)
}

/// [`ConversionService`] backed by localed.
pub struct LocaledWrapper<B: LocaledBackend = Localectl> {
    backend: B,
    available: bool,
}

impl LocaledWrapper<Localectl> {
    pub fn new(flags: &CapabilityFlags) -> Self {
        let available = if !flags.provides_system_bus {
            log::debug!("Not connecting to localed: system bus is not provided");
            false
        } else {
            match exec_capture(ExecMode::Direct, "localectl", vec!["--version".to_string()]) {
                Ok(_) => true,
                Err(e) => {
                    log::debug!("localed is not available: {}", e);
                    false
                }
            }
        };
        LocaledWrapper::with_backend(Localectl, available)
    }
}

impl<B: LocaledBackend> LocaledWrapper<B> {
    pub fn with_backend(backend: B, available: bool) -> Self {
        LocaledWrapper { backend, available }
    }

    fn status(&self) -> LocaledStatus {
        if !self.available {
            return LocaledStatus::default();
        }
        match self.backend.status() {
            Ok(output) => parse_status(&output),
            Err(e) => {
                log::debug!("Reading localed status failed: {}", e);
                LocaledStatus::default()
            }
        }
    }

    fn run(&self, args: Vec<String>) {
        if !self.available {
            return;
        }
        if let Err(e) = self.backend.run(args) {
            log::debug!("localectl failed: {}", e);
        }
    }

    fn set_keymap(&self, keymap: &str, convert: bool) {
        if keymap.is_empty() {
            log::debug!("No keymap to set");
            return;
        }
        self.run(set_keymap_args(keymap, convert));
    }

    fn set_layouts(&self, specs: &[String], options: &[String], convert: bool) {
        match set_layouts_args(specs, options, convert) {
            Some(args) => self.run(args),
            None => log::debug!("No valid X layouts in {:?}", specs),
        }
    }

    // Puts back runtime values read earlier, unset ones included.
    fn restore(&self, keymap: &str, layouts: &[String], options: &[String]) {
        self.run(set_keymap_args(keymap, false));
        self.set_layouts(layouts, options, false);
    }
}

impl<B: LocaledBackend> ConversionService for LocaledWrapper<B> {
    fn is_available(&self) -> bool {
        self.available
    }

    fn current_keymap(&self) -> String {
        self.status().keymap
    }

    fn current_layouts_variants(&self) -> Vec<String> {
        let status = self.status();
        layouts_from_wire(&status.layouts, &status.variants)
    }

    fn current_switch_options(&self) -> Vec<String> {
        split_list(&self.status().options)
    }

    // localed has no pure conversion call: set with conversion, read the
    // result and restore what was there before.
    fn convert_keymap_to_layouts(&self, keymap: &str) -> Vec<String> {
        let orig_layouts = self.current_layouts_variants();
        let orig_options = self.current_switch_options();
        let orig_keymap = self.current_keymap();
        let converted = self.apply_keymap_and_convert(keymap);
        self.restore(&orig_keymap, &orig_layouts, &orig_options);
        converted
    }

    fn convert_layouts_to_keymap(&self, layouts: &[String]) -> String {
        let orig_layouts = self.current_layouts_variants();
        let orig_options = self.current_switch_options();
        let orig_keymap = self.current_keymap();
        let converted = self.apply_layouts_and_convert(layouts, &[]);
        self.restore(&orig_keymap, &orig_layouts, &orig_options);
        converted
    }

    fn apply_keymap_and_convert(&self, keymap: &str) -> Vec<String> {
        self.set_keymap(keymap, true);
        self.current_layouts_variants()
    }

    fn apply_layouts_and_convert(&self, layouts: &[String], options: &[String]) -> String {
        self.set_layouts(layouts, options, true);
        self.current_keymap()
    }

    fn apply_layouts(&self, layouts: &[String], options: &[String]) {
        self.set_layouts(layouts, options, false);
    }
}
