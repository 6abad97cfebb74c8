//! `netweave config` subcommands.

use crate::cli::{ConfigArgs, ConfigCommand};
use crate::config;
use crate::error::CliError;

pub fn handle(args: &ConfigArgs) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let mut cfg = config::load_config_or_default();
            // Never echo plaintext tokens.
            for profile in cfg.profiles.values_mut() {
                if profile.api_token.is_some() {
                    profile.api_token = Some("<redacted>".into());
                }
            }
            print!("{}", toml::to_string_pretty(&cfg)?);
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}
