/// Basic application code
pub mod app;
/// REST clients for outside services
pub mod client;
/// Controllers for REST endpoints
pub mod controller;
/// Subscription token generation
pub mod crypto;
/// Domain objects
pub mod domain;
/// REST error responses
pub mod error;
/// Persisted records
pub mod model;
/// Repositories
pub mod repo;
/// Subscription lifecycle and scheduled delivery
pub mod service;
/// Application settings
pub mod settings;
/// Application telemetry for tracing and logging
pub mod telemetry;
