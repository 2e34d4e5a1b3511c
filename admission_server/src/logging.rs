//! Structured logging configuration.
//!
//! Installs a tracing subscriber for the server binary. Records emitted
//! through the `log` facade by the `admission` library are bridged into it.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use admission_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `user` - Optional subject (email or user id)
/// * `ip_address` - Optional IP address
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use admission_server::logging::log_security_event;
///
/// log_security_event(
///     "failed_login",
///     Some("alice@example.com"),
///     Some("192.168.1.1"),
///     "Invalid password attempt"
/// );
/// ```
pub fn log_security_event(
    event_type: &str,
    user: Option<&str>,
    ip_address: Option<&str>,
    message: &str,
) {
    tracing::warn!(
        event_type = event_type,
        user = user,
        ip_address = ip_address,
        "SECURITY: {}",
        message
    );
}

/// Log an unexpected failure that was turned into a generic response
pub fn log_unexpected_error(operation: &str, error: &dyn std::error::Error) {
    tracing::error!(operation = operation, error = %error, "Unexpected failure");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_security_event() {
        // Just ensure it doesn't panic
        log_security_event("test_event", Some("alice@example.com"), Some("127.0.0.1"), "Test message");
        log_security_event("policy_denied", None, None, "No token");
    }

    #[test]
    fn test_log_unexpected_error() {
        let err = std::io::Error::other("disk gone");
        log_unexpected_error("upload", &err);
    }
}
