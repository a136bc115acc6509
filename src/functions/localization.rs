//! Localization settings collected while the installer is being configured.

use crate::functions::install::write_final_configuration;
use crate::functions::keyboard::{
    apply_keyboard, assign_generic_keyboard_setting, resolve_missing, KeyboardPair, KeymapProbe,
};
use crate::functions::locale::install_language;
use crate::internal::config::{CapabilityFlags, DEFAULT_LANG};
use crate::internal::error::Result;
use crate::internal::live_keyboard::LiveEnvironmentReader;
use crate::internal::localed::ConversionService;
use std::path::Path;

pub struct LocalizationService {
    flags: CapabilityFlags,
    language: String,
    language_seen: bool,
    vc_keymap: String,
    x_layouts: Vec<String>,
    switch_options: Vec<String>,
    keyboard_seen: bool,
}

impl LocalizationService {
    pub fn new(flags: CapabilityFlags) -> Self {
        LocalizationService {
            flags,
            language: String::new(),
            language_seen: false,
            vc_keymap: String::new(),
            x_layouts: Vec::new(),
            switch_options: Vec::new(),
            keyboard_seen: false,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
        self.language_seen = true;
        log::debug!("Language is set to {}.", language);
    }

    pub fn language_seen(&self) -> bool {
        self.language_seen
    }

    pub fn vc_keymap(&self) -> &str {
        &self.vc_keymap
    }

    pub fn set_vc_keymap(&mut self, vc_keymap: &str) {
        self.vc_keymap = vc_keymap.to_string();
        log::debug!("Virtual console keymap is set to {}.", vc_keymap);
    }

    pub fn x_layouts(&self) -> &[String] {
        &self.x_layouts
    }

    pub fn set_x_layouts(&mut self, x_layouts: Vec<String>) {
        log::debug!("X Layouts are set to {:?}.", x_layouts);
        self.x_layouts = x_layouts;
    }

    pub fn switch_options(&self) -> &[String] {
        &self.switch_options
    }

    pub fn set_switch_options(&mut self, switch_options: Vec<String>) {
        log::debug!("Switch options are set to {:?}.", switch_options);
        self.switch_options = switch_options;
    }

    pub fn keyboard_seen(&self) -> bool {
        self.keyboard_seen
    }

    /// Stores the pair a keyboard operation ended up with.
    pub fn update_settings_from_task(&mut self, (x_layouts, vc_keymap): KeyboardPair) {
        self.set_x_layouts(x_layouts);
        self.set_vc_keymap(&vc_keymap);
    }

    /// Assigns a legacy single keyboard value, unless a keymap or layouts
    /// are already set.
    pub fn set_from_generic_keyboard_setting(
        &mut self,
        keyboard: &str,
        probe: &dyn KeymapProbe,
    ) -> Result<()> {
        if !self.vc_keymap.is_empty() || !self.x_layouts.is_empty() {
            log::debug!(
                "Generic keyboard setting '{}' ignored, keymap or layouts are already set",
                keyboard
            );
            return Ok(());
        }
        let result = assign_generic_keyboard_setting(&self.flags, keyboard, probe)?;
        self.update_settings_from_task(result);
        self.keyboard_seen = true;
        Ok(())
    }

    pub fn populate_missing_keyboard_configuration(
        &mut self,
        conversion: &dyn ConversionService,
        live_reader: Option<&dyn LiveEnvironmentReader>,
    ) {
        let result = resolve_missing(&self.x_layouts, &self.vc_keymap, conversion, live_reader);
        self.update_settings_from_task(result);
    }

    pub fn apply_keyboard(
        &mut self,
        conversion: &dyn ConversionService,
        probe: &dyn KeymapProbe,
    ) -> Result<()> {
        let result = apply_keyboard(
            &self.flags,
            &self.x_layouts,
            &self.vc_keymap,
            &self.switch_options,
            conversion,
            probe,
        )?;
        self.update_settings_from_task(result);
        Ok(())
    }

    /// Writes the language and keyboard configuration into `sysroot`.
    pub fn install(
        &self,
        conversion: &dyn ConversionService,
        live_reader: Option<&dyn LiveEnvironmentReader>,
        x_conf_dir: &Path,
        sysroot: &Path,
    ) -> Result<()> {
        let language = if self.language_seen() && !self.language().is_empty() {
            self.language()
        } else {
            DEFAULT_LANG
        };
        install_language(language, sysroot)?;
        let (x_layouts, vc_keymap) = write_final_configuration(
            conversion,
            live_reader,
            &self.x_layouts,
            &self.vc_keymap,
            &self.switch_options,
            x_conf_dir,
            sysroot,
        )?;
        log::info!("Installed console keymap {} and X layouts {:?}", vc_keymap, x_layouts);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::keyboard::tests::{strings, FakeConversion, FakeLive, FakeProbe};
    use std::fs;
    use tempfile::TempDir;

    fn service() -> LocalizationService {
        LocalizationService::new(CapabilityFlags::default())
    }

    #[test]
    fn generic_setting_is_ignored_when_keymap_is_set() {
        let mut localization = service();
        localization.set_vc_keymap("cz");
        localization.set_x_layouts(vec![]);
        let probe = FakeProbe::accepting();
        localization.set_from_generic_keyboard_setting("us", &probe).unwrap();
        assert_eq!(localization.vc_keymap(), "cz");
        assert!(localization.x_layouts().is_empty());
        assert_eq!(probe.count.get(), 0);
    }

    #[test]
    fn generic_setting_is_ignored_when_layouts_are_set() {
        let mut localization = service();
        localization.set_vc_keymap("");
        localization.set_x_layouts(strings(&["cz"]));
        localization
            .set_from_generic_keyboard_setting("us", &FakeProbe::accepting())
            .unwrap();
        assert_eq!(localization.vc_keymap(), "");
        assert_eq!(localization.x_layouts(), strings(&["cz"]).as_slice());
    }

    #[test]
    fn generic_setting_is_assigned() {
        let mut localization = service();
        localization
            .set_from_generic_keyboard_setting("us", &FakeProbe::accepting())
            .unwrap();
        assert_eq!(localization.vc_keymap(), "us");
        assert!(localization.keyboard_seen());

        let mut localization = service();
        localization
            .set_from_generic_keyboard_setting("us", &FakeProbe::rejecting())
            .unwrap();
        assert_eq!(localization.vc_keymap(), "");
        assert_eq!(localization.x_layouts(), strings(&["us"]).as_slice());
    }

    #[test]
    fn settings_are_updated_from_task() {
        let mut localization = service();
        localization.update_settings_from_task((strings(&["cz (qwerty)"]), "us".to_string()));
        assert_eq!(localization.vc_keymap(), "us");
        assert_eq!(localization.x_layouts(), strings(&["cz (qwerty)"]).as_slice());

        localization.update_settings_from_task((vec![], String::new()));
        assert_eq!(localization.vc_keymap(), "");
        assert!(localization.x_layouts().is_empty());
    }

    #[test]
    fn applying_layouts_adopts_converted_keymap() {
        let mut localization = service();
        localization.set_x_layouts(strings(&["cz (qwerty)"]));
        let conversion = FakeConversion::converting(&[], "cz-qwerty");
        localization
            .apply_keyboard(&conversion, &FakeProbe::accepting())
            .unwrap();
        assert_eq!(localization.x_layouts(), strings(&["cz (qwerty)"]).as_slice());
        assert_eq!(localization.vc_keymap(), "cz-qwerty");
        assert_eq!(
            conversion.calls(),
            vec!["apply_layouts_and_convert(cz (qwerty);)"]
        );
    }

    #[test]
    fn missing_configuration_is_populated() {
        let mut localization = service();
        let conversion = FakeConversion::converting(&[], "cz");
        let live = FakeLive::new(&["cz", "us"], "cz");
        localization.populate_missing_keyboard_configuration(&conversion, Some(&live));
        assert_eq!(localization.x_layouts(), strings(&["cz", "us"]).as_slice());
        assert_eq!(localization.vc_keymap(), "cz");
    }

    #[test]
    fn language_is_seen_once_set() {
        let mut localization = service();
        assert!(!localization.language_seen());
        localization.set_language("cs_CZ.UTF-8");
        assert!(localization.language_seen());
        assert_eq!(localization.language(), "cs_CZ.UTF-8");
    }

    #[test]
    fn resolving_keeps_given_keymap() {
        let mut localization = service();
        localization.set_vc_keymap("cz");
        let conversion = FakeConversion::converting(&["cz"], "");
        localization.populate_missing_keyboard_configuration(&conversion, None);
        assert_eq!(localization.x_layouts(), strings(&["cz"]).as_slice());
        assert_eq!(localization.vc_keymap(), "cz");
        assert_eq!(conversion.calls(), vec!["convert_keymap_to_layouts(cz)"]);
    }

    #[test]
    fn install_writes_language_and_keyboard() {
        let live_root = TempDir::new().unwrap();
        let sysroot = live_root.path().join("mnt/sysimage");
        fs::create_dir_all(sysroot.join("etc")).unwrap();
        let x_conf_dir = live_root.path().join("etc/X11/xorg.conf.d");

        let mut localization = service();
        localization.set_language("cs_CZ.UTF-8");
        localization.set_vc_keymap("us");
        localization.set_x_layouts(strings(&["cz", "cz (qwerty)"]));
        localization.set_switch_options(strings(&["grp:alt_shift_toggle"]));

        let conversion = FakeConversion::default();
        localization
            .install(&conversion, None, &x_conf_dir, &sysroot)
            .unwrap();

        let locale_conf = fs::read_to_string(sysroot.join("etc/locale.conf")).unwrap();
        assert!(locale_conf.starts_with("LANG=\""));
        let vconsole = fs::read_to_string(sysroot.join("etc/vconsole.conf")).unwrap();
        assert!(vconsole.starts_with("KEYMAP=\"us\"\n"));
        let x_conf =
            fs::read_to_string(sysroot.join("etc/X11/xorg.conf.d/00-keyboard.conf")).unwrap();
        assert!(x_conf.contains("Option \"XkbLayout\" \"cz,cz\"\n"));
        assert!(x_conf.contains("Option \"XkbVariant\" \",qwerty\"\n"));
        assert!(x_conf.contains("Option \"XkbOptions\" \"grp:alt_shift_toggle\"\n"));
    }
}
