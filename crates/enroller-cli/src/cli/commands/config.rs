//! `fabric-enroller config` - CLI configuration management.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;
use crate::output::emit;

pub fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Set { key, value } => set_config(&key, &value),
        ConfigCommands::Path => show_path(),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = Config::load()?;

    emit(ctx.output_format, &config, |config| {
        let unset = || "(not set)".dimmed().to_string();

        println!("{}", "Current Configuration:".bold());
        println!();
        println!(
            "  {} {}",
            "ca_client_bin:".bold(),
            config
                .ca_client_bin
                .as_ref()
                .map_or_else(unset, |p| p.display().to_string())
        );
        println!(
            "  {} {}",
            "timeout_secs:".bold(),
            config.timeout_secs.map_or_else(unset, |s| s.to_string())
        );
        println!(
            "  {} {}",
            "output_format:".bold(),
            config.output_format.map_or_else(unset, |f| f.to_string())
        );
        println!(
            "  {} {}",
            "material_selection:".bold(),
            config.material_selection.map_or_else(unset, |m| m.to_string())
        );
        println!(
            "  {} {}",
            "log_level:".bold(),
            config.log_level.clone().unwrap_or_else(unset)
        );
    })
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    println!("{} {} set to {}.", "Success:".green().bold(), key, value.cyan());
    Ok(())
}

fn show_path() -> Result<()> {
    let path = Config::path()?;
    println!("{}", path.display());
    Ok(())
}
