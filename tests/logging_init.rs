//! Global subscriber installation.
//!
//! Kept in its own test binary: installing the global subscriber inside the
//! library's unit tests would capture events that `#[traced_test]` expects.

use microfpga::config::MicroFpgaConfig;
use microfpga::logging::{self, OutputFormat, TracingConfig};
use tracing::Level;

#[test]
fn init_twice_is_harmless() {
    let config = TracingConfig::new(Level::WARN).with_format(OutputFormat::Compact);
    assert!(logging::init(config).is_ok());
    assert!(tracing::dispatcher::has_been_set());

    assert!(logging::init(TracingConfig::default()).is_ok());
    assert!(logging::init_from_config(&MicroFpgaConfig::default()).is_ok());
}

#[test]
fn invalid_level_fails_before_installing() {
    let mut config = MicroFpgaConfig::default();
    config.application.log_level = "verbose".to_string();
    assert!(logging::init_from_config(&config).is_err());
}
