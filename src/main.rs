// picoctl - Serial command console for Raspberry Pi Pico boards
use clap::Parser;
use picoctl::cli::{execute_command, Args};

fn main() {
    let args = Args::parse();

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {}", e);
        for (index, hint) in e.hints().iter().enumerate() {
            eprintln!("  {}. {}", index + 1, hint);
        }
        std::process::exit(1);
    }
}
