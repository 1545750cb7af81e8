use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use rpdiag::config::Config;
use rpdiag::menu::Menu;
use rpdiag::signal::StopFlag;
use rpdiag::suite;

fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() -> Result<()> {
    let config = Config::parse();

    // RUST_LOG takes precedence over -v
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter(config.verbose)),
    )
    .init();

    config.validate().context("Invalid configuration")?;
    info!("Starting with {:?}", config);

    let stop = StopFlag::new();
    stop.install();

    let stdout = io::stdout();
    let mut menu = Menu::new(suite::hardware_commands(&config, &stop), stop.clone());
    menu.set_clear_screen(stdout.is_terminal());

    println!("Raspberry Pi peripheral diagnostics");
    menu.run(io::stdin().lock(), stdout.lock())
        .context("Menu I/O failed")?;

    Ok(())
}
