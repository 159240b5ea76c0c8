mod logger;
pub use logger::*;

pub mod capture;
