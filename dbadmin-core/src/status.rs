//! Server health snapshot and the status document.

use crate::Result;
use crate::models::{ConnectionUsage, MemoryUsage, Payload, ResultDocument, StatusMetrics};
use crate::operations::SqlExecutor;
use std::collections::HashMap;

const SECONDS_PER_DAY: u64 = 86_400;
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Global buffers allocated once per server.
const GLOBAL_BUFFERS: &[&str] = &[
    "key_buffer_size",
    "query_cache_size",
    "tmp_table_size",
    "innodb_buffer_pool_size",
    "innodb_additional_mem_pool_size",
    "innodb_log_buffer_size",
];

/// Buffers allocated for every connection thread.
const THREAD_BUFFERS: &[&str] = &[
    "sort_buffer_size",
    "read_buffer_size",
    "read_rnd_buffer_size",
    "join_buffer_size",
    "thread_stack",
    "binlog_cache_size",
];

/// Raw health counters read from the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerHealth {
    /// `Uptime` status value
    pub uptime_seconds: u64,
    /// Buffer estimate at `Max_used_connections`
    pub memory_current_bytes: u64,
    /// Buffer estimate at `max_connections`
    pub memory_max_bytes: u64,
    /// `Threads_connected`
    pub connections_current: u64,
    /// `max_connections`
    pub connections_max: u64,
}

impl ServerHealth {
    /// Derives health counters from `SHOW GLOBAL STATUS` and
    /// `SHOW GLOBAL VARIABLES` name/value pairs.
    ///
    /// Names are matched case-insensitively. Missing or non-numeric values
    /// count as zero; servers without a query cache (8.0+) simply contribute
    /// nothing for it.
    pub fn from_server_variables(
        status: &HashMap<String, String>,
        variables: &HashMap<String, String>,
    ) -> Self {
        let base: u64 = GLOBAL_BUFFERS
            .iter()
            .map(|name| numeric(variables, name))
            .fold(0, u64::saturating_add);
        let per_thread: u64 = THREAD_BUFFERS
            .iter()
            .map(|name| numeric(variables, name))
            .fold(0, u64::saturating_add);

        let max_connections = numeric(variables, "max_connections");
        let max_used_connections = numeric(status, "Max_used_connections");

        Self {
            uptime_seconds: numeric(status, "Uptime"),
            memory_current_bytes: base
                .saturating_add(max_used_connections.saturating_mul(per_thread)),
            memory_max_bytes: base.saturating_add(max_connections.saturating_mul(per_thread)),
            connections_current: numeric(status, "Threads_connected"),
            connections_max: max_connections,
        }
    }

    /// Converts the raw counters into the reported metrics.
    pub fn metrics(&self) -> StatusMetrics {
        let current_mb = self.memory_current_bytes / BYTES_PER_MB;
        let max_mb = self.memory_max_bytes / BYTES_PER_MB;
        StatusMetrics {
            uptime_days: self.uptime_seconds / SECONDS_PER_DAY,
            memory: MemoryUsage {
                current_mb,
                max_mb,
                percent_used: percent(current_mb, max_mb),
            },
            connections: ConnectionUsage {
                current: self.connections_current,
                max: self.connections_max,
                percent_used: percent(self.connections_current, self.connections_max),
            },
        }
    }
}

fn numeric(values: &HashMap<String, String>, name: &str) -> u64 {
    values
        .get(name)
        .or_else(|| {
            values
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

/// `current / max` as a percentage rounded to two decimals; 0 when `max` is 0.
pub fn percent(current: u64, max: u64) -> f64 {
    if max == 0 {
        return 0.0;
    }
    let ratio = current as f64 / max as f64 * 100.0;
    (ratio * 100.0).round() / 100.0
}

/// Builds status documents from a fresh health snapshot.
pub struct StatusCollector;

impl StatusCollector {
    /// Refreshes server health once and wraps it in a `status` document.
    ///
    /// # Errors
    /// A failed refresh is returned unchanged; nothing is retried.
    pub async fn collect(executor: &dyn SqlExecutor) -> Result<ResultDocument> {
        let health = executor.refresh_health().await?;
        tracing::debug!("Health snapshot for {}: {:?}", executor.server_name(), health);
        Ok(ResultDocument::new(
            executor.server_name(),
            "status",
            Payload::Status(health.metrics()),
        ))
    }
}
