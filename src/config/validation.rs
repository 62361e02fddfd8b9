//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thread counts, socket buffers, backlog)
//! - Guard limits the HTTP decoder asserts on at runtime
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function over the knobs it checks
//! - Runs before a configuration is accepted into the system

use std::fmt;

use crate::config::schema::ServiceSettings;
use crate::config::service::default_worker_threads;
use crate::net::buffer::{BufferPolicy, MIN_READ_BUFFER};

/// A single rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate thread pool sizes and the buffer policy together.
pub fn validate_runtime(
    acceptor_threads: usize,
    worker_threads: usize,
    policy: &BufferPolicy,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if acceptor_threads == 0 {
        errors.push(ValidationError::new(
            "acceptor_threads",
            "must be greater than zero",
        ));
    }
    if worker_threads == 0 {
        errors.push(ValidationError::new(
            "worker_threads",
            "must be greater than zero",
        ));
    }
    check_buffer_policy(policy, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate deserialized settings before they seed a builder.
pub fn validate_settings(settings: &ServiceSettings) -> Result<(), Vec<ValidationError>> {
    validate_runtime(
        settings.acceptor_threads,
        settings.worker_threads.unwrap_or_else(default_worker_threads),
        &BufferPolicy::from(&settings.buffer),
    )
}

fn check_buffer_policy(policy: &BufferPolicy, errors: &mut Vec<ValidationError>) {
    if policy.backlog == 0 || i32::try_from(policy.backlog).is_err() {
        errors.push(ValidationError::new(
            "backlog",
            format!("must be between 1 and {}", i32::MAX),
        ));
    }
    if policy.recv_buffer_size == 0 {
        errors.push(ValidationError::new(
            "recv_buffer_size",
            "must be greater than zero",
        ));
    }
    if policy.send_buffer_size == 0 {
        errors.push(ValidationError::new(
            "send_buffer_size",
            "must be greater than zero",
        ));
    }
    if policy.read_buffer_max < MIN_READ_BUFFER {
        errors.push(ValidationError::new(
            "read_buffer_max",
            format!("must be at least {MIN_READ_BUFFER} bytes"),
        ));
    }
}
