//! Pipeline counters.

pub mod names {
    pub const RUNS_STARTED: &str = "vstream_pipeline_runs_started_total";
    pub const RUNS_FINISHED: &str = "vstream_pipeline_runs_finished_total";
    pub const TRANSITIONS: &str = "vstream_pipeline_transitions_total";
    pub const ACTIVE_RUNS: &str = "vstream_pipeline_active_runs";
}

pub fn record_run_started() {
    metrics::counter!(names::RUNS_STARTED).increment(1);
    metrics::gauge!(names::ACTIVE_RUNS).increment(1.0);
}

pub fn record_run_finished(outcome: &'static str) {
    metrics::counter!(names::RUNS_FINISHED, "outcome" => outcome).increment(1);
    metrics::gauge!(names::ACTIVE_RUNS).decrement(1.0);
}

pub fn record_transition(status: &'static str) {
    metrics::counter!(names::TRANSITIONS, "status" => status).increment(1);
}
