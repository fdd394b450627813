//! architect CLI binary
//!
//! All logic is in the library; main.rs only invokes cli::run().

fn main() {
    // cli::run() prints everything, including errors
    if let Err(code) = architect::cli::run() {
        std::process::exit(code.as_i32());
    }
}
