use clap::Parser;

mod cli;
mod demo;
mod replay;
mod schema;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Schema => schema::run(),
        cli::Command::Validate { file } => replay::validate(&file),
        cli::Command::Replay { file, twice } => replay::run(&file, twice),
        cli::Command::Demo => demo::run(),
        cli::Command::Api { host, port } => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(bitgpt_core::api::serve(&host, port)),
    }
}
