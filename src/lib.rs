//! Request-level Prometheus metrics for axum and tower services.
//!
//! Every request is counted, then counted again per outcome (host, method,
//! route template, status code) with its latency observed in a histogram.
//! The scrape endpoint is served by the middleware itself and can be
//! restricted to an IP allow list.

pub mod allow_list;
pub mod api;
pub mod client_ip;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod middleware;

pub use allow_list::AllowList;
pub use config::{allow_ips, enable_allow_list, scrape_path, MetricsOption, MetricsOptions};
pub use errors::MetricsError;
pub use metrics::{HttpMetrics, MetricsSchema};
pub use middleware::{MetricsLayer, MetricsMiddleware, MetricsRouterExt};
