//! Persisting the keyboard configuration into the installed system.

use crate::functions::keyboard::{resolve_missing, KeyboardPair};
use crate::internal::config::{DEFAULT_VC_FONT, VC_CONF_FILE_PATH, X_CONF_DIR, X_CONF_FILE_NAME};
use crate::internal::error::{KeyboardError, Result};
use crate::internal::files::{self, target_path};
use crate::internal::live_keyboard::LiveEnvironmentReader;
use crate::internal::localed::{layouts_to_wire, ConversionService};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::path::Path;

lazy_static! {
    // Console fonts for languages eurlatgr does not cover.
    static ref CONSOLE_FONTS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        for lang in ["ru", "uk", "be", "bg", "mk", "sr", "kk", "ky", "tg", "mn", "tt", "ba", "cv", "os"] {
            m.insert(lang, "latarcyrheb-sun16");
        }
        for lang in ["he", "yi", "ar", "fa", "ur", "ps", "ckb"] {
            m.insert(lang, "latarcyrheb-sun16");
        }
        m.insert("el", "iso07u-16");
        m.insert("hy", "LatArCyrHeb-16");
        m.insert("ka", "LatArCyrHeb-16");
        m.insert("th", "lat0-16");
        m.insert("sr_ME", "eurlatgr");
        m
    };
}

/// Console font for a locale such as `ru_RU.UTF-8`.
pub fn console_font_for_locale(locale: &str) -> &'static str {
    let base = locale
        .split(['.', '@'])
        .next()
        .unwrap_or_default();
    let lang = base.split('_').next().unwrap_or_default();
    CONSOLE_FONTS
        .get(base)
        .or_else(|| CONSOLE_FONTS.get(lang))
        .copied()
        .unwrap_or(DEFAULT_VC_FONT)
}

/// Writes `/etc/vconsole.conf` into `root`, picking the font for `$LANG`.
pub fn write_vc_configuration(vc_keymap: &str, root: &Path) -> Result<()> {
    let lang = std::env::var("LANG").unwrap_or_default();
    write_vc_configuration_for_locale(vc_keymap, root, &lang)
}

pub fn write_vc_configuration_for_locale(vc_keymap: &str, root: &Path, locale: &str) -> Result<()> {
    if !target_path(root, "/etc").is_dir() {
        return Err(KeyboardError::Installation(format!(
            "Cannot write virtual console configuration: {} has no /etc directory",
            root.display()
        )));
    }

    let font = console_font_for_locale(locale);
    log::info!("Console keymap {} with font {}", vc_keymap, font);
    let content = format!("KEYMAP=\"{vc_keymap}\"\nFONT=\"{font}\"\n");
    files::write_file(&target_path(root, VC_CONF_FILE_PATH), &content).map_err(|e| {
        KeyboardError::Installation(format!("Cannot write virtual console configuration: {e}"))
    })
}

/// The X keyboard stanza localed writes for the given layouts.
pub fn render_x_configuration(x_layouts: &[String], switch_options: &[String]) -> String {
    let (layouts, variants) = layouts_to_wire(x_layouts).unwrap_or_default();
    let mut content = String::from(
        "# Written by aegis-keyboard.\n\
         Section \"InputClass\"\n        Identifier \"system-keyboard\"\n        MatchIsKeyboard \"on\"\n",
    );
    if !layouts.is_empty() {
        content.push_str(&format!("        Option \"XkbLayout\" \"{layouts}\"\n"));
    }
    if !variants.replace(',', "").is_empty() {
        content.push_str(&format!("        Option \"XkbVariant\" \"{variants}\"\n"));
    }
    if !switch_options.is_empty() {
        content.push_str(&format!(
            "        Option \"XkbOptions\" \"{}\"\n",
            switch_options.join(",")
        ));
    }
    content.push_str("EndSection\n");
    content
}

/// Writes the X keyboard configuration into `root`.
///
/// The configured layouts are set through the conversion service, which
/// writes them into `x_conf_dir` of the running system, and the result is
/// copied to the target. If the service is unavailable the stanza is rendered
/// from the configured values instead. When the installer runs from a live image the
/// running session shares that directory, so the runtime layouts are set back
/// afterwards. The last call decides what the running system describes.
pub fn write_x_configuration(
    conversion: &dyn ConversionService,
    x_layouts: &[String],
    switch_options: &[String],
    x_conf_dir: &Path,
    root: &Path,
) -> Result<()> {
    let mut errors = Vec::new();

    if !x_conf_dir.is_dir() {
        if let Err(e) = files::create_directory(x_conf_dir) {
            errors.push(format!("Cannot create directory {}: {}", x_conf_dir.display(), e));
        }
    }

    if x_conf_dir.is_dir() {
        let runtime_x_layouts = conversion.current_layouts_variants();
        let runtime_options = conversion.current_switch_options();

        conversion.apply_layouts(x_layouts, switch_options);

        let source = x_conf_dir.join(X_CONF_FILE_NAME);
        let target_dir = target_path(root, X_CONF_DIR);
        let dest = target_dir.join(X_CONF_FILE_NAME);
        if let Err(e) = files::create_directory(&target_dir) {
            errors.push(format!("Cannot create directory {}: {}", target_dir.display(), e));
        } else if source == dest {
            log::debug!("X configuration is already in place at {}", dest.display());
        } else if conversion.is_available() && source.exists() {
            if let Err(e) = files::copy_file(&source, &dest) {
                errors.push(format!("Cannot copy X configuration to {}: {}", dest.display(), e));
            }
        } else {
            // A file left in place by a degraded service is stale.
            log::debug!("{} was not written by localed, writing it directly", source.display());
            let content = render_x_configuration(x_layouts, switch_options);
            if let Err(e) = files::write_file(&dest, &content) {
                errors.push(format!("Cannot write X configuration to {}: {}", dest.display(), e));
            }
        }

        conversion.apply_layouts(&runtime_x_layouts, &runtime_options);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(KeyboardError::Installation(errors.join("\n")))
    }
}

/// Writes both keyboard configuration files into `sysroot`.
///
/// The values may be stale or partial at installation time, so a missing
/// half is reconciled first. Returns the pair that was written.
pub fn write_final_configuration(
    conversion: &dyn ConversionService,
    live_reader: Option<&dyn LiveEnvironmentReader>,
    x_layouts: &[String],
    vc_keymap: &str,
    switch_options: &[String],
    x_conf_dir: &Path,
    sysroot: &Path,
) -> Result<KeyboardPair> {
    if !target_path(sysroot, "/etc").is_dir() {
        return Err(KeyboardError::Installation(format!(
            "Cannot write keyboard configuration: {} has no /etc directory",
            sysroot.display()
        )));
    }

    let (x_layouts, vc_keymap) = if x_layouts.is_empty() || vc_keymap.is_empty() {
        resolve_missing(x_layouts, vc_keymap, conversion, live_reader)
    } else {
        (x_layouts.to_vec(), vc_keymap.to_string())
    };

    write_x_configuration(conversion, &x_layouts, switch_options, x_conf_dir, sysroot)?;
    write_vc_configuration(&vc_keymap, sysroot)?;
    Ok((x_layouts, vc_keymap))
}
