use std::process::ExitCode;

use tracing::info;

mod app;

fn main() -> ExitCode {
    app::bootstrap::init_tracing();
    info!("=== tilestep harness startup ===");
    app::loop_runner::run(std::env::args().skip(1))
}
