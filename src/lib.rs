// EMSys Library
// Engine telemetry ingestion, storage and analytics behind an HTTP API

pub mod analytics;
pub mod error;
pub mod export;
pub mod local_server;
pub mod logging;
pub mod models;
pub mod seed;
pub mod storage;
