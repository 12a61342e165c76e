use clap::Parser;
use mbart_relay::cli;

fn main() {
    let args = cli::Args::parse();
    match cli::dispatch(args) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            // Dispatch failures can predate logging init, so report directly.
            eprintln!("mbart-relay: {err:#}");
            std::process::exit(2);
        }
    }
}
