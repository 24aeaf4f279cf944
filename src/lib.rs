pub mod boundaries;
pub mod config;
pub mod density;
pub mod error;
pub mod geocode;
pub mod input;
pub mod joiner;
pub mod logging;
pub mod pipeline;
pub mod population;
pub mod snapshot;
pub mod types;
pub mod zipcode;
