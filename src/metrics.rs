//! Prometheus metrics for monitoring worker throughput and errors.
//!
//! All metrics use the default Prometheus registry and follow naming conventions:
//! - Histograms: *_seconds (for latency)
//! - Counters: *_total (for counts)

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};

lazy_static! {
    // ==================== THROUGHPUT METRICS ====================
    pub static ref OBJECTS_FETCHED_TOTAL: IntCounter = register_int_counter!(
        "obj_worker_objects_fetched_total",
        "Objects fetched from the generator endpoint"
    )
    .unwrap();
    pub static ref RECORDS_WRITTEN_TOTAL: IntCounter = register_int_counter!(
        "obj_worker_records_written_total",
        "Records written to sorted output files"
    )
    .unwrap();
    pub static ref ROTATIONS_TOTAL: IntCounter = register_int_counter!(
        "obj_worker_rotations_total",
        "Completed sort-and-rotate cycles"
    )
    .unwrap();

    // ==================== ERROR COUNTERS ====================
    pub static ref FETCH_ERRORS_TOTAL: IntCounter = register_int_counter!(
        "obj_worker_fetch_errors_total",
        "Failed fetches from the generator endpoint"
    )
    .unwrap();
    pub static ref WRITE_ERRORS_TOTAL: IntCounter = register_int_counter!(
        "obj_worker_write_errors_total",
        "Failed appends to the accumulation buffer"
    )
    .unwrap();
    pub static ref SORT_ERRORS_TOTAL: IntCounter = register_int_counter!(
        "obj_worker_sort_errors_total",
        "Failed sort-and-rotate attempts"
    )
    .unwrap();

    // ==================== LATENCY / GAUGE METRICS ====================
    pub static ref ROTATION_DURATION: Histogram = register_histogram!(
        "obj_worker_rotation_duration_seconds",
        "Time spent sorting the buffer and publishing the output file",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]
    )
    .unwrap();
    pub static ref BUFFER_SIZE_BYTES: IntGauge = register_int_gauge!(
        "obj_worker_buffer_size_bytes",
        "Current accumulation buffer size in bytes"
    )
    .unwrap();
}
