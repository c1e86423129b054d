use anyhow::Result;
use clap::Parser;

mod agent;
mod cli;
mod commands;
mod config;
mod famly;
mod platform;
mod presence;
mod resolver;
mod sensor;
#[cfg(test)]
mod testing;

use cli::{Args, Commands};
use commands::agent::{self as cmd, SetupOptions};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Setup {
            email,
            password,
            children,
            poll_interval,
            base_url,
            day_boundary,
        } => cmd::setup(
            SetupOptions {
                email,
                password,
                children,
                poll_interval,
                base_url,
                day_boundary,
            },
            args.config,
            args.verbose,
        ),
        Commands::Children => cmd::children(args.config, args.verbose),
        Commands::CheckNow { json } => cmd::check_now(json, args.config, args.verbose),
        Commands::Start => cmd::start(args.config, args.verbose),
        Commands::Status => cmd::status(args.config),
    }
}
