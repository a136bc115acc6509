use crate::internal::*;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Joins an absolute in-system path onto a target root.
///
/// `target_path("/mnt/sysimage", "/etc/vconsole.conf")` is
/// `/mnt/sysimage/etc/vconsole.conf`.
pub fn target_path(root: impl AsRef<Path>, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let relative = path.strip_prefix("/").unwrap_or(path);
    root.as_ref().join(relative)
}

pub fn write_file(path: &Path, content: &str) -> io::Result<()> {
    log::info!("Write {}", path.display());
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn copy_file(path: &Path, destpath: &Path) -> io::Result<()> {
    fs::copy(path, destpath)?;
    log::info!("Copy {} to {}", path.display(), destpath.display());
    Ok(())
}

pub fn remove_file(path: &str) {
    let returncode = fs::remove_file(path);
    match returncode {
        Ok(_) => {
            log::info!("Remove {}", path);
        }
        Err(e) => {
            crash(format!("Remove {}: Failed with error {}", path, e), 1);
        }
    }
}

pub fn create_directory(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}
