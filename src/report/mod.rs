//! Report generation for DTVCC decoding sessions

use serde::Serialize;

use crate::context::DtvccContext;
use crate::stats::DtvccReport;

/// Per-service part of the summary
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSummary {
    pub service: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    pub output: String,
    pub output_started: bool,
    pub cues_written: u64,
    pub blocks: u64,
}

/// Complete session summary
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub ts_time: String,
    pub active_services_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sequence: Option<u8>,
    pub services: Vec<ServiceSummary>,
    pub counters: DtvccReport,
}

/// Report generator for decoding sessions
pub struct Reporter;

impl Reporter {
    /// Snapshot the context; call before the context is freed
    pub fn create_report(ctx: &DtvccContext) -> SessionReport {
        let counters = ctx.report().borrow().clone();
        let services = ctx
            .services_active()
            .indices()
            .filter_map(|index| ctx.services().get(index))
            .map(|state| ServiceSummary {
                service: state.service_number(),
                charset: state.charset().map(str::to_string),
                output: state
                    .filename()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "stdout".to_string()),
                output_started: state.output_started(),
                cues_written: state.cues_written(),
                blocks: counters.blocks_for(state.service_number()),
            })
            .collect();

        SessionReport {
            ts_time: chrono::Utc::now().to_rfc3339(),
            active_services_count: ctx.active_services_count(),
            last_sequence: ctx.last_sequence(),
            services,
            counters,
        }
    }

    pub fn to_json(report: &SessionReport) -> serde_json::Result<String> {
        serde_json::to_string_pretty(report)
    }
}
