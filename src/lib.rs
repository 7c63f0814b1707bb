pub mod comps;
pub mod config;
pub mod fetch;
pub mod geo;
pub mod output;
pub mod subject;
pub mod valuation;
pub mod vision;
