use std::process::ExitCode;
use clap::Parser as ClapParser;
use aurora_lang::Config;

fn main() -> ExitCode {
    let config: Config = Config::parse();
    aurora_lang::init_tracing(config.verbose);

    match aurora_lang::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
