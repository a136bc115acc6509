use crate::internal::config::LOCALE_CONF_FILE_PATH;
use crate::internal::error::{KeyboardError, Result};
use crate::internal::exec::{exec_capture, ExecMode};
use crate::internal::files::{self, target_path};
use std::path::Path;

const C_LOCALE: &str = "C.UTF-8";

/// `cs_CZ.UTF-8` and `cs_CZ.utf8` name the same locale.
fn normalize_locale(locale: &str) -> String {
    match locale.split_once('.') {
        Some((name, encoding)) => {
            let encoding = encoding.to_lowercase().replace('-', "");
            format!("{name}.{encoding}")
        }
        None => locale.to_string(),
    }
}

fn is_c_locale(locale: &str) -> bool {
    matches!(normalize_locale(locale).as_str(), "C" | "POSIX" | "C.utf8")
}

/// Picks the language to write given the locales installed in the target.
///
/// `None` means the installed locales are unknown and the language is kept.
/// A target with nothing but the C locale can't use anything else.
pub fn effective_language(lang: &str, available_locales: Option<&[String]>) -> String {
    let Some(available) = available_locales else {
        return lang.to_string();
    };

    if !available.is_empty() && available.iter().all(|l| is_c_locale(l)) {
        if !is_c_locale(lang) {
            log::warn!("Only the C locale is installed, using {} instead of {}", C_LOCALE, lang);
        }
        return C_LOCALE.to_string();
    }

    let wanted = normalize_locale(lang);
    if !available.iter().any(|l| normalize_locale(l) == wanted) {
        log::warn!("Locale {} is not installed in the target system", lang);
    }
    lang.to_string()
}

/// Writes `/etc/locale.conf` into `sysroot`.
pub fn write_language_configuration(
    lang: &str,
    sysroot: &Path,
    available_locales: Option<&[String]>,
) -> Result<()> {
    if !target_path(sysroot, "/etc").is_dir() {
        return Err(KeyboardError::Installation(format!(
            "Cannot write language configuration: {} has no /etc directory",
            sysroot.display()
        )));
    }
    let lang = effective_language(lang, available_locales);
    log::info!("Setting language {}", lang);
    files::write_file(
        &target_path(sysroot, LOCALE_CONF_FILE_PATH),
        &format!("LANG=\"{lang}\"\n"),
    )
    .map_err(|e| KeyboardError::Installation(format!("Cannot write language configuration: {e}")))
}

/// Locales installed in `sysroot`, or `None` if they can't be listed.
pub fn installed_locales(sysroot: &Path) -> Option<Vec<String>> {
    let root = sysroot.to_string_lossy();
    match exec_capture(ExecMode::Chroot { root: &root }, "locale", vec!["-a".to_string()]) {
        Ok(output) => Some(
            output
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        ),
        Err(e) => {
            log::debug!("Listing installed locales failed: {}", e);
            None
        }
    }
}

pub fn install_language(lang: &str, sysroot: &Path) -> Result<()> {
    let available = installed_locales(sysroot);
    write_language_configuration(lang, sysroot, available.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn run(lang: &str, available: Option<&[&str]>) -> String {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("etc")).unwrap();
        let available: Option<Vec<String>> =
            available.map(|a| a.iter().map(|l| l.to_string()).collect());
        write_language_configuration(lang, root.path(), available.as_deref()).unwrap();
        fs::read_to_string(root.path().join("etc/locale.conf")).unwrap()
    }

    #[test]
    fn only_c_locale_installed() {
        let available: &[&str] = &["C.utf8"];
        for lang in ["C.UTF-8", "en_US", "cs_CZ.UTF-8", "en_GB.ISO8859-15@euro"] {
            assert_eq!(run(lang, Some(available)), "LANG=\"C.UTF-8\"\n");
        }
    }

    #[test]
    fn unknown_installed_locales() {
        for lang in ["C.UTF-8", "en_US", "cs_CZ.UTF-8", "en_GB.ISO8859-15@euro"] {
            assert_eq!(run(lang, None), format!("LANG=\"{lang}\"\n"));
        }
    }

    #[test]
    fn installed_locales_keep_language() {
        let available: &[&str] = &[
            "C.utf8",
            "cs_CZ",
            "cs_CZ.iso88592",
            "cs_CZ.utf8",
            "en_US",
            "en_US.iso88591",
            "en_US.iso885915",
            "en_US.utf8",
        ];
        for lang in ["C.UTF-8", "en_US", "cs_CZ.UTF-8", "en_GB.ISO8859-15@euro"] {
            assert_eq!(run(lang, Some(available)), format!("LANG=\"{lang}\"\n"));
        }
    }

    #[test]
    fn missing_etc_is_an_installation_error() {
        let root = TempDir::new().unwrap();
        assert!(matches!(
            write_language_configuration("cs_CZ.UTF-8", root.path(), None),
            Err(KeyboardError::Installation(_))
        ));
    }
}
