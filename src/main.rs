use std::process;

fn main() {
    if let Err(err) = priority_window::app::run() {
        eprintln!("fatal: {err:#}");
        process::exit(1);
    }
}
