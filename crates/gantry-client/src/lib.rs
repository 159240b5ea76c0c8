//! HTTP implementation of [`gantry_core::api::ResourceApi`] for the RunPod control plane
//! and serverless job API.
mod classify;

mod client;
pub use client::RestClient;

mod config;
pub use config::{ClientConfig, DEFAULT_JOBS_URL, DEFAULT_REST_URL};

mod error;
pub use error::{ClientError, ClientResult};

mod retry;
pub use retry::RetryPolicy;
