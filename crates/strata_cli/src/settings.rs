//! `strata settings` reads and toggles persisted build settings.

use strata_config::SettingsStore;

use crate::pipeline::{load_project, settings_store};
use crate::{GlobalArgs, SettingsCommand};

/// Runs the `strata settings` command.
pub fn run(command: &SettingsCommand, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let store = settings_store(&project.layout);
    match command {
        SettingsCommand::Get { key } => {
            match store.get_bool(key)? {
                Some(value) => println!("{value}"),
                None => println!("unset"),
            }
            Ok(0)
        }
        SettingsCommand::Set { key, value } => {
            store.set_bool(key, *value)?;
            if !global.quiet {
                eprintln!("     Set {key} = {value} in {}", store.path().display());
            }
            Ok(0)
        }
    }
}
