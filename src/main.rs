use clap::Parser;

use aquarium::{Args, Config, flow};

fn main() {
    let config = match Config::from_args(Args::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = flow::run(config) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
