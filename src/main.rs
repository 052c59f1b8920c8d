use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
  fit_daily_lib::run().await
}
