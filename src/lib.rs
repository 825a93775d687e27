pub mod cli;
pub mod config;
pub mod env_detect;
pub mod executor;
pub mod output;
pub mod redact;
pub mod release;

/// Run the command line interface and return an exit code.
pub fn run_cli() -> i32 {
    cli::run()
}
