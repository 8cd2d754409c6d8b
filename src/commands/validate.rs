use super::common::{GlobalArgs, print_warnings};
use healthdeck::Result;
use healthdeck::config::Config;

#[expect(clippy::unnecessary_wraps, reason = "Consistent interface with other subcommands")]
pub fn validate_config(global: &GlobalArgs) -> Result<()> {
    let config_path = global.config.as_ref();

    match Config::load(&global.project_root, config_path) {
        Ok((_, warnings)) => {
            println!("Configuration validation successful");
            if let Some(path) = config_path {
                println!("Config file: {path}");
            } else {
                println!("Using the configuration found in {} or the defaults", global.project_root);
            }

            print_warnings(&warnings);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {e}");
            std::process::exit(1);
        }
    }
}
