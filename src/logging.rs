use crate::internal::files;
use flexi_logger::{style, DeferredNow, Duplicate, FileSpec, LogSpecification, Logger};
use log::LevelFilter;
use std::{fs, io::Write, path::Path};

fn log_specification(verbosity: u8) -> LogSpecification {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    LogSpecification::builder().default(level).build()
}

pub fn init(verbosity: u8, log_file_path: &str) {
    // Start every run with a fresh log file
    if fs::metadata(log_file_path).is_ok() {
        files::remove_file(log_file_path);
    }

    let p = Path::new(log_file_path);
    let dir = p.parent().unwrap_or_else(|| Path::new("."));
    let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or("aegis-keyboard");

    let mut spec = FileSpec::default()
        .directory(dir)
        .basename(stem)
        .suppress_timestamp();

    // Only add suffix if there is one; avoids trailing dot
    if let Some(ext) = p.extension().and_then(|s| s.to_str()).filter(|ext| !ext.is_empty()) {
        spec = spec.suffix(ext);
    }

    let started = Logger::with(log_specification(verbosity))
        .log_to_file(spec)
        .duplicate_to_stderr(Duplicate::All)
        .format(format_log_entry)
        .start();
    if let Err(e) = started {
        eprintln!("Failed to start logging to {log_file_path}: {e}");
    }
}

/// Formats a log entry with color
fn format_log_entry(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> std::io::Result<()> {
    let msg = record.args().to_string();
    let level = record.level();
    let time_str = now.now().time().format("%H:%M:%S").to_string();

    write!(
        w,
        "[ {} ] {} {}",
        style(level).paint(level.to_string()),
        time_str,
        msg
    )
}

