pub mod analytics;
pub mod config;
pub mod error;
pub mod logging;
pub mod sink;
pub mod testdata;
pub mod transform;
pub mod validate;

// Domain data shapes shared across layers
pub mod domain;
