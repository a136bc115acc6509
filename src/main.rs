mod args;
mod functions;
mod internal;
mod logging;

use crate::args::{Cli, Command};
use crate::functions::keyboard::{self, KeyboardPair, LoadkeysProbe};
use crate::functions::localization::LocalizationService;
use crate::internal::config::{self, X_CONF_DIR};
use crate::internal::live_keyboard::{get_live_keyboard_instance, LiveEnvironmentReader};
use crate::internal::localed::LocaledWrapper;
use crate::internal::*;
use clap::Parser;
use std::path::Path;

fn print_pair((x_layouts, vc_keymap): &KeyboardPair) {
    let pair = serde_json::json!({
        "x_layouts": x_layouts,
        "vc_keymap": vc_keymap,
    });
    println!("{pair}");
}

fn main() {
    human_panic::setup_panic!();
    let cli = Cli::parse();
    let log_file_path = "/tmp/aegis-keyboard.log";
    logging::init(cli.verbose, log_file_path);

    let flags = keyboard_eval(config::load_flags(&cli.flags), "Load capability flags");
    let flags = cli.override_flags(flags);
    log::debug!("Capability flags: {:?}", flags);

    let localed = LocaledWrapper::new(&flags);
    let live = get_live_keyboard_instance(&flags);
    let live_reader = live.as_ref().map(|l| l as &dyn LiveEnvironmentReader);

    match cli.command {
        Command::Resolve(args) => {
            let mut localization = LocalizationService::new(flags);
            localization.set_vc_keymap(&args.vc_keymap);
            localization.set_x_layouts(args.x_layouts);
            localization.populate_missing_keyboard_configuration(&localed, live_reader);
            let pair = (
                localization.x_layouts().to_vec(),
                localization.vc_keymap().to_string(),
            );
            print_pair(&pair);
        }
        Command::Generic { keyboard } => {
            let pair = keyboard_eval(
                keyboard::assign_generic_keyboard_setting(&flags, &keyboard, &LoadkeysProbe),
                "Assign generic keyboard setting",
            );
            print_pair(&pair);
        }
        Command::Apply(args) => {
            let pair = keyboard_eval(
                keyboard::apply_keyboard(
                    &flags,
                    &args.x_layouts,
                    &args.vc_keymap,
                    &args.switch_options,
                    &localed,
                    &LoadkeysProbe,
                ),
                "Apply keyboard configuration",
            );
            print_pair(&pair);
        }
        Command::Install(args) => {
            let mut localization = LocalizationService::new(flags);
            if !args.lang.is_empty() {
                localization.set_language(&args.lang);
            }
            localization.set_vc_keymap(&args.keyboard.vc_keymap);
            localization.set_x_layouts(args.keyboard.x_layouts);
            localization.set_switch_options(args.keyboard.switch_options);
            keyboard_eval(
                localization.install(&localed, live_reader, Path::new(X_CONF_DIR), &args.root),
                "Install keyboard configuration",
            );
        }
        Command::Config { config: config_path } => {
            keyboard_eval(
                config::read_config(&config_path, flags),
                "Install keyboard configuration from config file",
            );
        }
    }
}
