//! Binary entrypoint that starts the nutrition coach server.

use std::process::ExitCode;

use nutri_coach::start_nutri_coach;

/// Load configuration from the environment and serve the HTTP API.
fn main() -> ExitCode {
    start_nutri_coach::run()
}
