use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    process::exit(holeshot::cli::run_with_args(&args));
}
