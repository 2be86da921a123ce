use clap::Parser;
use unikmer::cli::{self, Cli};
use unikmer::logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    logging::init(&config.logging)?;

    let stdout = std::io::stdout();
    cli::run(&cli, &config, &mut stdout.lock())?;
    Ok(())
}
