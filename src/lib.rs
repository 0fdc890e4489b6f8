//! Background worker that accumulates generated text objects into an on-disk
//! buffer and periodically rotates the buffer into sorted output files.
//!
//! The cycle is: fetch a batch from the generator endpoint, append it to the
//! accumulation buffer, check the buffer size against the configured gigabyte
//! threshold, and once the threshold is reached sort the whole buffer into a
//! new timestamped output file and start over with an empty buffer.

pub mod buffer_writer;
pub mod config;
pub mod errors;
pub mod generator_client;
pub mod metrics;
pub mod rotator;
pub mod units;
pub mod worker;
