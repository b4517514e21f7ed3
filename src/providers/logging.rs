// src/providers/logging.rs
// Shared provider logging helpers

use crate::types::ProviderUsage;
use tracing::info;

/// Log usage statistics for a provider call.
pub fn log_usage(request_id: &str, provider: &str, usage: &ProviderUsage) {
    info!(
        request_id = %request_id,
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        total_tokens = usage.total_tokens(),
        latency_ms = usage.latency_ms,
        "{} usage stats", provider
    );
}

/// Log completion summary for a provider call.
pub fn log_completion(request_id: &str, provider: &str, duration_ms: u64, artifact_count: usize, content_len: usize) {
    info!(
        request_id = %request_id,
        duration_ms = duration_ms,
        artifacts = artifact_count,
        content_len = content_len,
        "{} call complete", provider
    );
}
