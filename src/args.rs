use crate::internal::config::{CapabilityFlags, DEFAULT_FLAGS_FILE, DEFAULT_SYSROOT};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "aegis-keyboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"), long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// TOML file describing what the environment allows
    #[arg(long = "flags", global = true, default_value = DEFAULT_FLAGS_FILE)]
    pub flags: PathBuf,

    /// Never load a keymap into the running system
    #[arg(long = "no-activate", global = true)]
    pub no_activate: bool,

    /// Read layouts from the live desktop session
    #[arg(long = "live", global = true)]
    pub live: bool,
}

impl Cli {
    /// Applies the command line overrides on top of the loaded flags.
    pub fn override_flags(&self, mut flags: CapabilityFlags) -> CapabilityFlags {
        if self.no_activate {
            flags.can_activate_keyboard = false;
        }
        if self.live {
            flags.provides_live_session = true;
        }
        flags
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fill in a missing console keymap or X layouts and print the result
    #[command(name = "resolve")]
    Resolve(KeyboardArgs),

    /// Decide whether a single keyboard value is a console keymap or an X layout
    #[command(name = "generic")]
    Generic {
        /// The keyboard value to assign
        keyboard: String,
    },

    /// Activate the keyboard configuration on the running system
    #[command(name = "apply")]
    Apply(KeyboardArgs),

    /// Write the keyboard and language configuration into the target system
    #[command(name = "install")]
    Install(InstallArgs),

    /// Read an installation config file and run the whole keyboard setup
    #[command(name = "config")]
    Config {
        /// The config file to read
        config: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct KeyboardArgs {
    /// Console keymap, e.g. "cz-qwerty"
    #[arg(long = "vckeymap", default_value = "")]
    pub vc_keymap: String,

    /// Comma separated X layouts, e.g. "cz (qwerty),us"
    #[arg(long = "xlayouts", value_delimiter = ',')]
    pub x_layouts: Vec<String>,

    /// Comma separated layout switching options
    #[arg(long = "switch", value_delimiter = ',')]
    pub switch_options: Vec<String>,
}

#[derive(Debug, Args)]
pub struct InstallArgs {
    #[command(flatten)]
    pub keyboard: KeyboardArgs,

    /// Root of the installed system
    #[arg(long = "root", default_value = DEFAULT_SYSROOT)]
    pub root: PathBuf,

    /// Language for /etc/locale.conf
    #[arg(long = "lang", default_value = "")]
    pub lang: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_args_are_split() {
        let cli = Cli::parse_from([
            "aegis-keyboard",
            "apply",
            "--xlayouts",
            "cz (qwerty),us",
            "--switch",
            "grp:alt_shift_toggle",
        ]);
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.x_layouts, vec!["cz (qwerty)".to_string(), "us".to_string()]);
                assert_eq!(args.switch_options, vec!["grp:alt_shift_toggle".to_string()]);
                assert_eq!(args.vc_keymap, "");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn missing_lists_are_empty() {
        let cli = Cli::parse_from(["aegis-keyboard", "resolve", "--vckeymap", "us"]);
        match cli.command {
            Command::Resolve(args) => {
                assert!(args.x_layouts.is_empty());
                assert!(args.switch_options.is_empty());
                assert_eq!(args.vc_keymap, "us");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flag_overrides() {
        let cli = Cli::parse_from(["aegis-keyboard", "--no-activate", "--live", "generic", "cz"]);
        let flags = cli.override_flags(CapabilityFlags::default());
        assert!(!flags.can_activate_keyboard);
        assert!(flags.provides_live_session);
    }
}
