use crate::internal::error::KeyboardError;
use crate::internal::strings::crash;
use log::info;

fn exit_code(e: &KeyboardError) -> i32 {
    match e {
        KeyboardError::Io { source, .. } => source.raw_os_error().unwrap_or(1),
        KeyboardError::Configuration(_) => 2,
        KeyboardError::Installation(_) => 3,
        KeyboardError::Config(_) => 4,
    }
}

/// Logs `logmsg` on success and returns the value, or exits the process.
pub fn keyboard_eval<T>(result: Result<T, KeyboardError>, logmsg: &str) -> T {
    match result {
        Ok(val) => {
            info!("{}", logmsg);
            val
        }
        Err(e) => {
            let code = exit_code(&e);
            crash(format!("{}  ERROR: {}", logmsg, e), code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn exit_codes_distinguish_error_kinds() {
        assert_eq!(exit_code(&KeyboardError::Configuration("x".into())), 2);
        assert_eq!(exit_code(&KeyboardError::Installation("x".into())), 3);
        assert_eq!(
            exit_code(&KeyboardError::io("read", io::Error::from_raw_os_error(2))),
            2
        );
    }

    #[test]
    fn success_passes_value_through() {
        let value = keyboard_eval(Ok::<_, KeyboardError>(7), "seven");
        assert_eq!(value, 7);
    }
}
