use std::env;

use crate::cli::commands::InitArgs;
use crate::io::config_io::{self, BOARD_DIR};
use crate::model::config::BoardConfig;

/// Create `.plank/plank.toml` in the current directory
pub fn cmd_init(args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(BOARD_DIR);
    if dir.exists() && !args.force {
        return Err(format!(
            "{} already exists (use --force to reinitialize)",
            dir.display()
        )
        .into());
    }

    let name = args.name.unwrap_or_else(|| {
        cwd.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "board".to_string())
    });

    config_io::save_config(&cwd, &BoardConfig::named(&name))?;
    println!("Initialized board '{}' in {}", name, dir.display());
    Ok(())
}
