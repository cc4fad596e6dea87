use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "admission-interview-backend";
const SLOW_QUERY_MS: u128 = 1000;

/// Emits one JSON record per event through `tracing`.
#[derive(Debug)]
pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_request(&self, method: &str, path: &str, user_id: Option<&str>, status: u16) {
        let log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "http_request",
            "method": method,
            "path": path,
            "user_id": user_id,
            "status_code": status,
            "service": SERVICE_NAME
        });

        info!("{}", log_entry);
    }

    pub fn log_database_query(&self, query: &str, duration_ms: u128, result_count: Option<usize>) {
        let log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "database_query",
            "query_hash": format!("{:x}", md5::compute(query)),
            "query_preview": preview(query, 100),
            "duration_ms": duration_ms,
            "result_count": result_count,
            "service": SERVICE_NAME
        });

        if duration_ms > SLOW_QUERY_MS {
            warn!("Slow query detected: {}", log_entry);
        } else {
            info!("{}", log_entry);
        }
    }

    pub fn log_error(&self, error: &str, context: HashMap<String, Value>) {
        let mut log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "error",
            "error_message": error,
            "service": SERVICE_NAME
        });

        for (key, value) in context {
            log_entry[key] = value;
        }

        error!("{}", log_entry);
    }

    pub fn log_performance_metric(&self, metric_name: &str, value: f64) {
        let log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "performance_metric",
            "metric_name": metric_name,
            "value": value,
            "service": SERVICE_NAME
        });

        info!("{}", log_entry);
    }

    pub fn log_business_event(
        &self,
        event_name: &str,
        user_id: Option<&str>,
        metadata: HashMap<String, Value>,
    ) {
        let mut log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "business_event",
            "event_name": event_name,
            "user_id": user_id,
            "service": SERVICE_NAME
        });

        for (key, value) in metadata {
            log_entry[key] = value;
        }

        info!("{}", log_entry);
    }
}

/// Builds the metadata map taken by `log_business_event`.
pub fn event_fields<const N: usize>(fields: [(&str, Value); N]) -> HashMap<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn preview(query: &str, max_chars: usize) -> String {
    let compact = query.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() > max_chars {
        let cut: String = compact.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        compact
    }
}

pub static LOGGER: StructuredLogger = StructuredLogger;
