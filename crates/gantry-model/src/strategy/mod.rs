mod admission;
pub use admission::AdmissionStrategy;

mod backoff;
pub use backoff::BackoffStrategy;

mod jitter;
pub use jitter::JitterStrategy;
