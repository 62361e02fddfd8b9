//! Serialized settings schema.
//!
//! This is the file form of the service configuration. All types derive Serde
//! traits so a deployment can keep its bind target and tuning knobs in TOML;
//! the router is never part of it and is supplied in code.

use serde::{Deserialize, Serialize};

use crate::config::service::{
    DEFAULT_ACCEPTOR_THREADS, DEFAULT_MAX_AGGREGATED_REQUEST_BYTES, DEFAULT_PORT,
    DEFAULT_SHUTDOWN_GRACE_PERIOD,
};
use crate::net::buffer::BufferPolicy;

/// Root settings for the HTTP front end.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Host to bind; absent binds every interface.
    pub host: Option<String>,

    /// Port to bind (0 picks an ephemeral port).
    pub port: u16,

    /// Upper bound on an aggregated request body, in bytes.
    pub max_aggregated_request_bytes: usize,

    /// Threads in the acceptance pool.
    pub acceptor_threads: usize,

    /// Threads in the worker pool; absent uses twice the available cores.
    pub worker_threads: Option<usize>,

    /// Bounded drain window on shutdown, in seconds.
    pub shutdown_grace_secs: u64,

    /// Socket and buffer tuning.
    pub buffer: BufferSettings,

    /// Log filter used by [`crate::observability::logging::init_logging`].
    pub logging: LoggingSettings,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            max_aggregated_request_bytes: DEFAULT_MAX_AGGREGATED_REQUEST_BYTES,
            acceptor_threads: DEFAULT_ACCEPTOR_THREADS,
            worker_threads: None,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_PERIOD.as_secs(),
            buffer: BufferSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Socket and buffer tuning, flattened for the file format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BufferSettings {
    pub keep_alive: bool,
    pub backlog: u32,
    pub tcp_nodelay: bool,
    pub recv_buffer_size: usize,
    pub send_buffer_size: usize,

    /// Ceiling for the decoder's adaptive read buffer.
    pub read_buffer_max: usize,
}

impl Default for BufferSettings {
    fn default() -> Self {
        BufferPolicy::default().into()
    }
}

impl From<BufferPolicy> for BufferSettings {
    fn from(policy: BufferPolicy) -> Self {
        Self {
            keep_alive: policy.keep_alive,
            backlog: policy.backlog,
            tcp_nodelay: policy.tcp_nodelay,
            recv_buffer_size: policy.recv_buffer_size,
            send_buffer_size: policy.send_buffer_size,
            read_buffer_max: policy.read_buffer_max,
        }
    }
}

impl From<&BufferSettings> for BufferPolicy {
    fn from(settings: &BufferSettings) -> Self {
        Self {
            keep_alive: settings.keep_alive,
            backlog: settings.backlog,
            tcp_nodelay: settings.tcp_nodelay,
            recv_buffer_size: settings.recv_buffer_size,
            send_buffer_size: settings.send_buffer_size,
            read_buffer_max: settings.read_buffer_max,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "http_front=info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings: ServiceSettings = toml::from_str("").unwrap();
        assert_eq!(settings, ServiceSettings::default());
        assert_eq!(settings.port, 80);
        assert_eq!(settings.max_aggregated_request_bytes, 2 * 1024 * 1024);
        assert!(settings.host.is_none());
    }

    #[test]
    fn buffer_settings_round_trip_through_policy() {
        let settings = BufferSettings {
            tcp_nodelay: false,
            read_buffer_max: 16 * 1024,
            ..BufferSettings::default()
        };
        let policy = BufferPolicy::from(&settings);
        assert!(!policy.tcp_nodelay);
        assert_eq!(policy.read_buffer_max, 16 * 1024);
        assert_eq!(BufferSettings::from(policy), settings);
    }

    #[test]
    fn partial_buffer_table_keeps_other_defaults() {
        let settings: ServiceSettings = toml::from_str(
            r#"
            port = 8080
            [buffer]
            backlog = 128
            "#,
        )
        .unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.buffer.backlog, 128);
        assert_eq!(settings.buffer.recv_buffer_size, 256 * 1024);
        assert!(settings.buffer.keep_alive);
    }
}
