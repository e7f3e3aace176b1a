//! # Umbrella Gateway
//!
//! The request-gating core of a tiered weather API: authentication,
//! per-tier rate limiting, response caching with request coalescing, and
//! usage metering, assembled into one request pipeline.
//!
//! ## Features
//!
//! - API-key resolution against a pluggable credential directory
//! - Fixed-window rate limiting with per-tier budgets and fail-open or
//!   fail-closed store outage handling
//! - Response caching with single-flight coalescing of concurrent misses
//! - Capability gating of endpoints by subscription tier
//! - Non-blocking usage metering with per-identity summaries
//!
//! ## Architecture
//!
//! Each concern lives in its own module behind a trait seam
//! ([`identity::Directory`], [`ratelimit::CounterStore`],
//! [`upstream::WeatherProvider`], [`clock::Clock`]); the
//! [`pipeline::Gateway`] wires them together and drives every request
//! through the same stage sequence. The crate does not open sockets or
//! speak HTTP; the embedding server maps transport requests onto
//! [`pipeline::GatewayRequest`] and serializes the returned envelope.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use umbrella_gateway::config::GatewayConfig;
//! use umbrella_gateway::identity::StaticDirectory;
//! use umbrella_gateway::pipeline::{Gateway, GatewayRequest};
//! use umbrella_gateway::tier::{Endpoint, Tier};
//! use umbrella_gateway::upstream::{StaticProvider, WeatherSnapshot};
//!
//! # async fn run() {
//! let directory = Arc::new(StaticDirectory::new());
//! directory.insert("demo-key", "demo user", Tier::Premium);
//!
//! let provider = Arc::new(StaticProvider::new());
//! provider.insert(WeatherSnapshot::new("Oslo", 4.5, "sleet"));
//!
//! let gateway = Gateway::builder(GatewayConfig::default())
//!     .with_directory(directory)
//!     .with_provider(provider)
//!     .build();
//! gateway.spawn_maintenance();
//!
//! let response = gateway
//!     .handle(GatewayRequest::new(Endpoint::Forecast, "Oslo").with_credential("demo-key"))
//!     .await;
//! assert!(response.envelope.is_success());
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod identity;
pub mod pipeline;
pub mod ratelimit;
pub mod tier;
pub mod upstream;
pub mod usage;

pub use config::GatewayConfig;
pub use pipeline::{Gateway, GatewayRequest, GatewayResponse};
