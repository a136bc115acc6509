use crate::internal::strings::fmt_cmdline;
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Output, Stdio};

/// Where a command runs: on the running system or inside the target root.
#[derive(Clone, Copy, Debug)]
pub enum ExecMode<'a> {
    Direct,
    Chroot { root: &'a str },
    AsUser { user: &'a str },
}

/// What to do when a command exits with a non-zero status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnFail {
    Error,
    Continue,
}

fn command_line(mode: ExecMode<'_>, command: &str, args: Vec<String>) -> (String, Vec<String>) {
    match mode {
        ExecMode::Direct => (command.to_string(), args),
        ExecMode::Chroot { root } => {
            let mut v = Vec::with_capacity(2 + args.len());
            v.push(root.to_string());
            v.push(command.to_string());
            v.extend(args);
            ("chroot".to_string(), v)
        }
        ExecMode::AsUser { user } => {
            let mut v = Vec::with_capacity(4 + args.len());
            v.push("-u".to_string());
            v.push(user.to_string());
            v.push("--".to_string());
            v.push(command.to_string());
            v.extend(args);
            ("runuser".to_string(), v)
        }
    }
}

/// Runs a command, logging its stdout line by line.
///
/// Spawn and I/O failures are always errors. A non-zero exit status is an
/// error only with [`OnFail::Error`]; with [`OnFail::Continue`] it is logged
/// and returned to the caller.
pub fn exec_unit(
    mode: ExecMode<'_>,
    command: &str,
    args: Vec<String>,
    on_fail: OnFail,
) -> io::Result<ExitStatus> {
    let (program, full_args) = command_line(mode, command, args);

    let mut child = Command::new(&program)
        .args(&full_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("stdout was not captured"))?;
    let stdout_handle = std::thread::spawn(move || -> io::Result<()> {
        let mut reader = BufReader::new(stdout);
        let mut line = Vec::<u8>::new();
        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&line)
                .trim_end_matches(&['\r', '\n'][..])
                .to_string();
            log::info!("{text}");
        }
        Ok(())
    });

    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("stderr was not captured"))?;
    let stderr_handle = std::thread::spawn(move || -> io::Result<Vec<u8>> {
        let mut v = Vec::new();
        stderr.read_to_end(&mut v)?;
        Ok(v)
    });

    let status = child.wait()?;
    stdout_handle
        .join()
        .map_err(|_| io::Error::other("stdout reader panicked"))??;
    let stderr_buf = stderr_handle
        .join()
        .map_err(|_| io::Error::other("stderr reader panicked"))??;

    if status.success() {
        return Ok(status);
    }

    let err_text = String::from_utf8_lossy(&stderr_buf).trim().to_string();
    let cmdline = fmt_cmdline(&program, &full_args);

    let msg = if err_text.is_empty() {
        format!("'{cmdline}' command exited with {status}")
    } else {
        format!("'{cmdline}' command failed. {err_text}")
    };

    match on_fail {
        OnFail::Error => Err(io::Error::other(msg)),
        OnFail::Continue => {
            log::warn!("{msg}");
            Ok(status)
        }
    }
}

pub fn exec(mode: ExecMode<'_>, command: &str, args: Vec<String>) -> io::Result<()> {
    exec_unit(mode, command, args, OnFail::Error).map(|_| ())
}

/// Runs a command and captures its output; a non-zero status is an error.
pub fn exec_output(mode: ExecMode<'_>, command: &str, args: Vec<String>) -> io::Result<Output> {
    let (program, full_args) = command_line(mode, command, args);
    let output = Command::new(&program)
        .args(&full_args)
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        let err_msg = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let cmdline = fmt_cmdline(&program, &full_args);
        return Err(io::Error::other(format!("'{cmdline}' command failed. {err_msg}")));
    }

    Ok(output)
}

/// Like [`exec_output`] but returns stdout as text.
pub fn exec_capture(mode: ExecMode<'_>, command: &str, args: Vec<String>) -> io::Result<String> {
    let output = exec_output(mode, command, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
