//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = mapsnap_cli::run() {
        eprintln!("mapsnap: {err}");
        std::process::exit(1);
    }
}
