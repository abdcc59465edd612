//! Gateway Configuration Module
//!
//! Timeouts, retry hints, the response mapping and the endpoint/step tables.
//! Configuration is loaded from environment variables with defaults suited
//! to development, then checked by [`GatewayConfig::validate`].

use std::collections::BTreeMap;
use std::time::Duration;

use datagate_core::{ConfigError, ContentVersion, Priority, ProcessingGraph};

use crate::constants::*;
use crate::response::ResponsePolicy;

// ============================================================================
// RETRY POLICY
// ============================================================================

/// How the Retry-After hint of a pending response is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAfterPolicy {
    /// Always the same hint.
    Fixed(Duration),
    /// `base + per_job * pending_jobs`, capped at `max`.
    QueueDepth {
        base: Duration,
        per_job: Duration,
        max: Duration,
    },
}

impl RetryAfterPolicy {
    /// Whether computing the hint needs the queue's pending count.
    pub fn needs_queue_depth(&self) -> bool {
        matches!(self, RetryAfterPolicy::QueueDepth { .. })
    }

    /// The hint for a queue holding `pending` live jobs.
    pub fn compute(&self, pending: u64) -> Duration {
        match *self {
            RetryAfterPolicy::Fixed(hint) => hint,
            RetryAfterPolicy::QueueDepth { base, per_job, max } => {
                let factor = u32::try_from(pending).unwrap_or(u32::MAX);
                let extra = per_job.checked_mul(factor).unwrap_or(max);
                base.saturating_add(extra).min(max)
            }
        }
    }
}

impl Default for RetryAfterPolicy {
    fn default() -> Self {
        RetryAfterPolicy::Fixed(Duration::from_secs(DEFAULT_RETRY_AFTER_SECS))
    }
}

// ============================================================================
// ENDPOINTS
// ============================================================================

/// Mapping from public endpoint to the processing steps backing it.
///
/// When an endpoint lists several steps, the first one is the primary step:
/// it drives admission when none of them holds a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    endpoints: BTreeMap<String, Vec<String>>,
}

impl EndpointConfig {
    pub fn empty() -> Self {
        Self {
            endpoints: BTreeMap::new(),
        }
    }

    /// One endpoint per step of the graph, named after it.
    pub fn for_graph(graph: &ProcessingGraph) -> Self {
        let endpoints = graph
            .steps()
            .map(|step| (step.name.clone(), vec![step.name.clone()]))
            .collect();
        Self { endpoints }
    }

    pub fn with_endpoint<I, S>(mut self, endpoint: impl Into<String>, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints
            .insert(endpoint.into(), steps.into_iter().map(Into::into).collect());
        self
    }

    pub fn steps_for(&self, endpoint: &str) -> Option<&[String]> {
        self.endpoints.get(endpoint).map(Vec::as_slice)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.endpoints
            .iter()
            .map(|(endpoint, steps)| (endpoint.as_str(), steps.as_slice()))
    }

    /// Parse `endpoint=step|step;endpoint=step` overrides.
    pub fn parse_overrides(raw: &str) -> Result<Vec<(String, Vec<String>)>, ConfigError> {
        let mut overrides = Vec::new();
        for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (endpoint, steps) = entry.split_once('=').ok_or_else(|| invalid(
                "DATAGATE_ENDPOINT_STEPS",
                entry,
                "expected endpoint=step|step",
            ))?;
            let steps: Vec<String> = steps
                .split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if endpoint.trim().is_empty() || steps.is_empty() {
                return Err(invalid(
                    "DATAGATE_ENDPOINT_STEPS",
                    entry,
                    "endpoint and at least one step are required",
                ));
            }
            overrides.push((endpoint.trim().to_string(), steps));
        }
        Ok(overrides)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::for_graph(&ProcessingGraph::builtin())
    }
}

// ============================================================================
// GATEWAY CONFIGURATION
// ============================================================================

/// Configuration of one gateway instance.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bound on each cache store or job queue call.
    pub call_timeout: Duration,

    /// Live job bound for the in-memory queue. `None` is unbounded.
    pub queue_capacity: Option<usize>,

    /// Retry-After for pending responses.
    pub retry_after: RetryAfterPolicy,

    /// Retry-After for capacity rejections.
    pub capacity_retry_after: Duration,

    /// Retry-After for transient store failures.
    pub transient_retry_after: Duration,

    /// Priority of jobs the gateway creates.
    pub job_priority: Priority,

    /// Status codes and cache headers of rendered responses.
    pub response: ResponsePolicy,

    /// Required content version overrides, by step name.
    pub step_versions: Vec<(String, ContentVersion)>,

    /// Endpoint overrides applied on top of the graph's default endpoints.
    pub endpoint_overrides: Vec<(String, Vec<String>)>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
            queue_capacity: None,
            retry_after: RetryAfterPolicy::default(),
            capacity_retry_after: Duration::from_secs(DEFAULT_CAPACITY_RETRY_AFTER_SECS),
            transient_retry_after: Duration::from_secs(DEFAULT_TRANSIENT_RETRY_AFTER_SECS),
            job_priority: Priority::Normal,
            response: ResponsePolicy::default(),
            step_versions: Vec::new(),
            endpoint_overrides: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Create GatewayConfig from environment variables.
    ///
    /// Environment variables:
    /// - `DATAGATE_CALL_TIMEOUT_MS`: Per-call store timeout (default: 2000)
    /// - `DATAGATE_QUEUE_CAPACITY`: Live job bound, 0 = unbounded (default: 0)
    /// - `DATAGATE_RETRY_AFTER_SECS`: Pending retry hint (default: 10)
    /// - `DATAGATE_RETRY_AFTER_PER_JOB_MS`: Enables the queue-depth hint
    /// - `DATAGATE_RETRY_AFTER_MAX_SECS`: Cap of the queue-depth hint (default: 300)
    /// - `DATAGATE_CAPACITY_RETRY_AFTER_SECS`: Capacity retry hint (default: 60)
    /// - `DATAGATE_TRANSIENT_RETRY_AFTER_SECS`: Transient retry hint (default: 5)
    /// - `DATAGATE_PENDING_STATUS`: Status of pending responses (default: 500)
    /// - `DATAGATE_CAPACITY_STATUS`: Status of capacity rejections (default: 429)
    /// - `DATAGATE_INVALID_REQUEST_STATUS`: Status of invalid requests (default: 422)
    /// - `DATAGATE_MAX_AGE_LONG_SECS`: Cache-Control max-age of hits (default: 120)
    /// - `DATAGATE_MAX_AGE_SHORT_SECS`: Cache-Control max-age of errors (default: 10)
    /// - `DATAGATE_STEP_VERSIONS`: `step=version,...` required version overrides
    /// - `DATAGATE_ENDPOINT_STEPS`: `endpoint=step|step;...` endpoint overrides
    ///
    /// Unparseable numbers fall back to their default; malformed version or
    /// endpoint lists are reported as errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let call_timeout = Duration::from_millis(env_parse("CALL_TIMEOUT_MS", DEFAULT_CALL_TIMEOUT_MS));

        let queue_capacity = match env_parse("QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY) {
            0 => None,
            capacity => Some(capacity),
        };

        let base = Duration::from_secs(env_parse("RETRY_AFTER_SECS", DEFAULT_RETRY_AFTER_SECS));
        let retry_after = match env_var("RETRY_AFTER_PER_JOB_MS").and_then(|s| s.parse::<u64>().ok()) {
            Some(per_job_ms) => RetryAfterPolicy::QueueDepth {
                base,
                per_job: Duration::from_millis(per_job_ms),
                max: Duration::from_secs(env_parse(
                    "RETRY_AFTER_MAX_SECS",
                    DEFAULT_RETRY_AFTER_MAX_SECS,
                )),
            },
            None => RetryAfterPolicy::Fixed(base),
        };

        let response = ResponsePolicy {
            pending_status: env_parse("PENDING_STATUS", DEFAULT_PENDING_STATUS),
            capacity_status: env_parse("CAPACITY_STATUS", DEFAULT_CAPACITY_STATUS),
            invalid_request_status: env_parse(
                "INVALID_REQUEST_STATUS",
                DEFAULT_INVALID_REQUEST_STATUS,
            ),
            max_age_long: Duration::from_secs(env_parse(
                "MAX_AGE_LONG_SECS",
                DEFAULT_MAX_AGE_LONG_SECS,
            )),
            max_age_short: Duration::from_secs(env_parse(
                "MAX_AGE_SHORT_SECS",
                DEFAULT_MAX_AGE_SHORT_SECS,
            )),
        };

        let step_versions = match env_var("STEP_VERSIONS") {
            Some(raw) => parse_step_versions(&raw)?,
            None => Vec::new(),
        };

        let endpoint_overrides = match env_var("ENDPOINT_STEPS") {
            Some(raw) => EndpointConfig::parse_overrides(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            call_timeout,
            queue_capacity,
            retry_after,
            capacity_retry_after: Duration::from_secs(env_parse(
                "CAPACITY_RETRY_AFTER_SECS",
                DEFAULT_CAPACITY_RETRY_AFTER_SECS,
            )),
            transient_retry_after: Duration::from_secs(env_parse(
                "TRANSIENT_RETRY_AFTER_SECS",
                DEFAULT_TRANSIENT_RETRY_AFTER_SECS,
            )),
            job_priority: Priority::Normal,
            response,
            step_versions,
            endpoint_overrides,
        })
    }

    /// Check values that would make the gateway misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.call_timeout.is_zero() {
            return Err(invalid("DATAGATE_CALL_TIMEOUT_MS", "0", "must be positive"));
        }
        if let RetryAfterPolicy::QueueDepth { base, max, .. } = self.retry_after {
            if max < base {
                return Err(invalid(
                    "DATAGATE_RETRY_AFTER_MAX_SECS",
                    &max.as_secs().to_string(),
                    "must not be below DATAGATE_RETRY_AFTER_SECS",
                ));
            }
        }
        self.response.validate()
    }

    /// The built-in graph with the configured version overrides applied.
    pub fn processing_graph(&self) -> Result<ProcessingGraph, ConfigError> {
        let mut graph = ProcessingGraph::builtin();
        for (step, version) in &self.step_versions {
            if !graph.set_version(step, version.clone()) {
                return Err(invalid(
                    "DATAGATE_STEP_VERSIONS",
                    step,
                    "no such processing step",
                ));
            }
        }
        Ok(graph)
    }

    /// Endpoints for `graph`, with the configured overrides applied.
    pub fn endpoint_config(&self, graph: &ProcessingGraph) -> Result<EndpointConfig, ConfigError> {
        let mut endpoints = EndpointConfig::for_graph(graph);
        for (endpoint, steps) in &self.endpoint_overrides {
            if let Some(unknown) = steps.iter().find(|step| graph.get(step).is_none()) {
                return Err(invalid(
                    "DATAGATE_ENDPOINT_STEPS",
                    unknown,
                    "no such processing step",
                ));
            }
            endpoints = endpoints.with_endpoint(endpoint.clone(), steps.iter().cloned());
        }
        Ok(endpoints)
    }
}

/// Parse `step=version,step=version`.
pub fn parse_step_versions(raw: &str) -> Result<Vec<(String, ContentVersion)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((step, version)) if !step.trim().is_empty() => {
                let version = ContentVersion::new(version.trim());
                if version.major().is_none() {
                    return Err(invalid(
                        "DATAGATE_STEP_VERSIONS",
                        entry,
                        "version must start with a numeric major component",
                    ));
                }
                Ok((step.trim().to_string(), version))
            }
            _ => Err(invalid(
                "DATAGATE_STEP_VERSIONS",
                entry,
                "expected step=version",
            )),
        })
        .collect()
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name)).ok()
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env_var(name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
