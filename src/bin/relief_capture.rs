use relief3d::cli::run_capture_cli;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run_capture_cli(&argv) {
        eprintln!("[relief_capture] error: {e:#}");
        std::process::exit(1);
    }
}
