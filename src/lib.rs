// tierstat library: tiers, roll-ups, persistence and queries per engine; the binary adds
// collectors, workers and routes on top.

pub mod collector;
pub mod config;
pub mod engine;
pub mod models;
pub mod persistence;
pub mod query;
pub mod routes;
pub mod score;
pub mod thresholds;
pub mod tiers;
pub mod worker;
