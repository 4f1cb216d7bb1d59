//! Sends validated records to the remote load-submission API.
//!
//! Records are shaped into the API's nested JSON body, grouped into
//! batches, and dispatched with bounded concurrency. Transient failures
//! (timeouts, 5xx, connection resets) retry with exponential backoff up
//! to a fixed attempt ceiling; permanent rejections (other 4xx) are
//! recorded immediately. The final [`freight_model::BatchReport`]
//! accounts for every input record exactly once, whether it completed,
//! exhausted its retries, or was skipped by cancellation or budget expiry.

mod client;
mod error;
mod payload;
mod pipeline;

pub use client::{ApiClient, LoadSubmitter, SubmitResponse, TransportError};
pub use error::ClientError;
pub use payload::build_payload;
pub use pipeline::{
    CancelToken, SubmitOptions, SubmitProgress, retry_failed, submit_records,
};
