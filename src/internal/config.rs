use crate::functions::keyboard::LoadkeysProbe;
use crate::functions::localization::LocalizationService;
use crate::internal::error::{KeyboardError, Result};
use crate::internal::live_keyboard::{get_live_keyboard_instance, LiveEnvironmentReader};
use crate::internal::localed::LocaledWrapper;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_KEYBOARD: &str = "us";
pub const DEFAULT_VC_FONT: &str = "eurlatgr";
pub const DEFAULT_LANG: &str = "en_US.UTF-8";
pub const DEFAULT_SYSROOT: &str = "/mnt";
pub const DEFAULT_FLAGS_FILE: &str = "/etc/aegis/keyboard.toml";
pub const VC_CONF_FILE_PATH: &str = "/etc/vconsole.conf";
pub const X_CONF_DIR: &str = "/etc/X11/xorg.conf.d";
pub const X_CONF_FILE_NAME: &str = "00-keyboard.conf";
pub const LOCALE_CONF_FILE_PATH: &str = "/etc/locale.conf";

/// What the environment the installer runs in allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityFlags {
    /// Loading a keymap into the running system is safe.
    pub can_activate_keyboard: bool,
    /// A live desktop session can be asked for its layouts.
    pub provides_live_session: bool,
    /// The system bus (and with it localed) can be reached.
    pub provides_system_bus: bool,
    /// User owning the live desktop session.
    pub live_user: String,
}

impl Default for CapabilityFlags {
    fn default() -> Self {
        CapabilityFlags {
            can_activate_keyboard: true,
            provides_live_session: false,
            provides_system_bus: true,
            live_user: "liveuser".to_string(),
        }
    }
}

impl CapabilityFlags {
    pub fn from_toml(data: &str) -> Result<Self> {
        toml::from_str(data).map_err(|e| KeyboardError::Config(e.to_string()))
    }
}

/// Loads the capability flags. A missing file means defaults.
pub fn load_flags(path: &Path) -> Result<CapabilityFlags> {
    if !path.exists() {
        log::debug!("No capability file {}, using defaults", path.display());
        return Ok(CapabilityFlags::default());
    }
    let data = std::fs::read_to_string(path)
        .map_err(|e| KeyboardError::io(format!("Read capability file {}", path.display()), e))?;
    let flags = CapabilityFlags::from_toml(&data)?;
    log::debug!("Capability flags from {}: {:?}", path.display(), flags);
    Ok(flags)
}

/// Installation document consumed by the `config` subcommand.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub lang: String,
    /// Legacy single keyboard value; keymap or layout.
    pub keyboard: String,
    pub vc_keymap: String,
    pub x_layouts: Vec<String>,
    pub switch_options: Vec<String>,
    pub sysroot: Option<PathBuf>,
}

impl InstallConfig {
    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(|e| KeyboardError::Config(e.to_string()))
    }
}

/// Reads an installation document and runs the whole keyboard flow:
/// generic value, live activation, then the target configuration.
pub fn read_config(configpath: &Path, flags: CapabilityFlags) -> Result<()> {
    let data = std::fs::read_to_string(configpath)
        .map_err(|e| KeyboardError::io(format!("Read config file {configpath:?}"), e))?;
    log::debug!("[ \x1b[2;1;32mOK\x1b[0m ] Read config file {configpath:?}");
    let config = InstallConfig::from_json(&data)?;
    log::debug!("[ \x1b[2;1;32mOK\x1b[0m ] Parse config file {configpath:?}");

    let sysroot = config
        .sysroot
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSROOT));
    let localed = LocaledWrapper::new(&flags);
    let live = get_live_keyboard_instance(&flags);
    let live_reader = live.as_ref().map(|l| l as &dyn LiveEnvironmentReader);

    let mut localization = LocalizationService::new(flags);
    if !config.lang.is_empty() {
        log::info!("Language : {}", config.lang);
        localization.set_language(&config.lang);
    }
    log::info!("Console keymap : {:?}", config.vc_keymap);
    log::info!("X layouts : {:?}", config.x_layouts);
    log::info!("Layout switching options : {:?}", config.switch_options);
    localization.set_vc_keymap(&config.vc_keymap);
    localization.set_x_layouts(config.x_layouts);
    localization.set_switch_options(config.switch_options);
    if !config.keyboard.is_empty() {
        log::info!("Generic keyboard : {}", config.keyboard);
        localization.set_from_generic_keyboard_setting(&config.keyboard, &LoadkeysProbe)?;
        if localization.keyboard_seen() {
            log::info!(
                "Generic keyboard resolved to keymap {:?}, X layouts {:?}",
                localization.vc_keymap(),
                localization.x_layouts()
            );
        }
    }

    localization.apply_keyboard(&localed, &LoadkeysProbe)?;
    println!();
    log::info!("Installing keyboard configuration to : {}", sysroot.display());
    localization.install(&localed, live_reader, Path::new(X_CONF_DIR), &sysroot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn flags_default_when_fields_are_missing() {
        let flags = CapabilityFlags::from_toml("provides_live_session = true\n").unwrap();
        assert!(flags.provides_live_session);
        assert!(flags.can_activate_keyboard);
        assert!(flags.provides_system_bus);
        assert_eq!(flags.live_user, "liveuser");
    }

    #[test]
    fn invalid_flags_are_a_config_error() {
        assert!(matches!(
            CapabilityFlags::from_toml("can_activate_keyboard = \"maybe\""),
            Err(KeyboardError::Config(_))
        ));
    }

    #[test]
    fn missing_flags_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let flags = load_flags(&dir.path().join("keyboard.toml")).unwrap();
        assert_eq!(flags, CapabilityFlags::default());
    }

    #[test]
    fn flags_file_is_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keyboard.toml");
        std::fs::write(&path, "can_activate_keyboard = false\nlive_user = \"anaconda\"\n").unwrap();
        let flags = load_flags(&path).unwrap();
        assert!(!flags.can_activate_keyboard);
        assert_eq!(flags.live_user, "anaconda");
    }

    #[test]
    fn install_config_fields_are_optional() {
        let config = InstallConfig::from_json(r#"{"x_layouts": ["cz (qwerty)"], "sysroot": "/mnt/sysimage"}"#)
            .unwrap();
        assert_eq!(config.x_layouts, vec!["cz (qwerty)".to_string()]);
        assert_eq!(config.vc_keymap, "");
        assert!(config.switch_options.is_empty());
        assert_eq!(config.sysroot, Some(PathBuf::from("/mnt/sysimage")));
    }

    #[test]
    fn unreadable_install_config_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let result = read_config(&dir.path().join("missing.json"), CapabilityFlags::default());
        assert!(matches!(result, Err(KeyboardError::Io { .. })));
    }
}
