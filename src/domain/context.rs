//! Operation Context
//!
//! Caller metadata for one transfer attempt: correlation for tracing and an
//! optional deadline bounding the whole attempt.

use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Context for an operation, used for tracing and cooperative cancellation.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    /// Correlation ID for request tracing
    pub correlation_id: Option<Uuid>,

    /// Client IP address
    pub client_ip: Option<IpAddr>,

    /// Point in time after which the attempt must not start moving money
    pub deadline: Option<Instant>,
}

impl OperationContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create context with correlation ID
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Create context with client IP
    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }

    /// Bound the attempt by an absolute deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Bound the attempt by a timeout starting now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Generate a new correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has already passed
    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Clamp a per-step timeout to the time left in the attempt
    pub fn bounded(&self, timeout: Duration) -> Duration {
        match self.remaining() {
            Some(left) => left.min(timeout),
            None => timeout,
        }
    }
}
