use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,sqlx=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialise structured JSON logging on stdout.
/// The level is controlled with `RUST_LOG`; auth events carry
/// `session_id` / `user_id` / `request_id` fields, never secrets.
pub fn init_telemetry() {
    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .json();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(formatting_layer)
        .init();
}

/// Like [`init_telemetry`] but tolerates an already-installed subscriber,
/// so it can be called from every test that wants log output.
pub fn try_init_test_telemetry() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_can_be_initialised_twice() {
        try_init_test_telemetry();
        try_init_test_telemetry();
        tracing::info!("telemetry initialised");
    }
}
