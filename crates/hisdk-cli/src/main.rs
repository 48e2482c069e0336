use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = hisdk_cli::Cli::parse();
    match hisdk_cli::run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
