//! toolsmith CLI application

fn main() {
    // NOTE: tracing may be unusable during a panic, so write directly.
    #[allow(clippy::print_stderr)]
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = toolsmith::cli::parse();
    let exit_code = toolsmith::run_with_tokio(cli);
    std::process::exit(exit_code);
}
