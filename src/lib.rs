//! paperless-metrics - Prometheus exporter for Paperless-ngx.
//!
//! Polls the Paperless statistics and tasks endpoints on a fixed interval and
//! republishes the results as gauges for a Prometheus scraper.

pub mod config;
pub mod http_client;
pub mod metrics;
pub mod paperless;
pub mod poller;
pub mod server;
