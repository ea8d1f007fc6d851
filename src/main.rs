use clap::Parser;

use sheath::cli::Cli;
use sheath::config::Config;
use sheath::{relay, trace};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    trace::init_tracing(&config.log.level);

    let (command, args) = cli.wrap_command();
    let outcome = relay::run(&command, &args, &config)?;

    // The wrapper's exit status mirrors the wrapped shell's.
    if outcome.status.success() {
        return Ok(());
    }
    std::process::exit(outcome.status.exit_code() as i32);
}
