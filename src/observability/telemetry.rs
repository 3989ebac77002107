/// Counters maintained by a single window instance.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WindowMetrics {
    pub events_ingested_total: u64,
    pub events_filtered_total: u64,
    pub arrival_snapshots_total: u64,
    pub decay_snapshots_total: u64,
    pub decay_tasks_armed_total: u64,
    pub decay_tasks_completed_total: u64,
    pub decay_tasks_cancelled_total: u64,
    pub active_decay_tasks: u64,
    pub tracked_keys: u64,
}

impl WindowMetrics {
    /// Total snapshots handed to the emitter.
    pub fn snapshots_emitted_total(&self) -> u64 {
        self.arrival_snapshots_total + self.decay_snapshots_total
    }

    /// Renders the counters in Prometheus text format, labelled by window id.
    pub fn render_metrics(&self, window_id: &str) -> String {
        let rows = [
            ("priority_window_events_ingested_total", self.events_ingested_total),
            ("priority_window_events_filtered_total", self.events_filtered_total),
            (
                "priority_window_arrival_snapshots_total",
                self.arrival_snapshots_total,
            ),
            (
                "priority_window_decay_snapshots_total",
                self.decay_snapshots_total,
            ),
            (
                "priority_window_decay_tasks_armed_total",
                self.decay_tasks_armed_total,
            ),
            (
                "priority_window_decay_tasks_completed_total",
                self.decay_tasks_completed_total,
            ),
            (
                "priority_window_decay_tasks_cancelled_total",
                self.decay_tasks_cancelled_total,
            ),
            ("priority_window_active_decay_tasks", self.active_decay_tasks),
            ("priority_window_tracked_keys", self.tracked_keys),
        ];
        let mut out = String::new();
        for (name, value) in rows {
            out.push_str(&format!("{name}{{window=\"{window_id}\"}} {value}\n"));
        }
        out
    }
}
