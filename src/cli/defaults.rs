pub const SEED: u64 = 1;
pub const CLUSTER_MAX_SIZE: usize = 500;
pub const CLUSTER_SIZE_SAMPLE_TO: usize = 100;
pub const MIN_RECIPROCAL_OVERLAP: f64 = 0.85;
pub const BND_SLACK: i64 = 50;

/// Source records between progress log entries on each chromosome
pub const PROGRESS_INTERVAL: usize = 100_000;

/// Age after which stalled or inactive background SV sets are deleted
pub const CLEANUP_TIMEOUT_HOURS: i64 = 48;
