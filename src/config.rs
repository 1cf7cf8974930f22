use crate::error::MonitorError;
use crate::packet::MAX_PAYLOAD_SIZE;
use std::time::Duration;

pub const DEFAULT_THRESHOLD_MS: f64 = 100.0;
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;
pub const DEFAULT_PAYLOAD_SIZE: usize = 56;

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub threshold_ms: f64,
    pub interval: Duration,
    /// Timestamp included.
    pub payload_size: usize,
    pub verbose: bool,
    pub poll_timeout: Duration,
    pub idle_sleep: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            threshold_ms: DEFAULT_THRESHOLD_MS,
            interval: Duration::from_secs_f64(DEFAULT_INTERVAL_SECS),
            payload_size: DEFAULT_PAYLOAD_SIZE,
            verbose: false,
            poll_timeout: Duration::from_millis(100),
            idle_sleep: Duration::from_millis(10),
        }
    }
}

impl MonitorConfig {
    pub fn new(threshold_ms: f64, interval_secs: f64, payload_size: usize, verbose: bool) -> Result<Self, MonitorError> {
        if !threshold_ms.is_finite() || threshold_ms < 0.0 {
            return Err(MonitorError::Config(format!("fail threshold must be a non-negative number, got {threshold_ms}")));
        }
        let interval = match Duration::try_from_secs_f64(interval_secs) {
            Ok(interval) if !interval.is_zero() => interval,
            _ => return Err(MonitorError::Config(format!("interval must be a positive number of seconds, got {interval_secs}"))),
        };
        if payload_size > MAX_PAYLOAD_SIZE {
            return Err(MonitorError::Config(format!("payload size {payload_size} exceeds {MAX_PAYLOAD_SIZE} bytes")));
        }
        Ok(MonitorConfig { threshold_ms, interval, payload_size, verbose, ..Default::default() })
    }
}
