mod commands;
mod terminal;

use commands::{CommandLine, Commands, discover, expand};
use terminal::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init(commands.verbose);

    match commands.command {
        Commands::Discover { config, workers } => discover::discover(&config, workers).await,
        Commands::Expand { ranges } => expand::expand(&ranges),
    }
}
