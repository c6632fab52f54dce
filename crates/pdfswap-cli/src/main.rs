mod cli;
mod config;
mod page_range;
mod replace_cmd;
mod shared;
mod text_cmd;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        cli::Commands::Text {
            ref file,
            ref pages,
            ref format,
        } => text_cmd::run(file, pages.as_deref(), format),
        cli::Commands::Replace(ref args) => replace_cmd::run(args),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
