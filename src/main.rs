//! analyst CLI binary
//!
//! Minimal entrypoint: all logic is in the library; main only maps the
//! returned code to the process exit status.

fn main() {
    std::process::exit(analyst::cli::run());
}
