//! Lead Insights API Library
//!
//! This library provides the core functionality for the Lead Insights API:
//! Norwegian company lookup via the Brønnøysund registry, candidate-lead
//! discovery, website validation, email/news enrichment, lead scoring and
//! CRM webhook forwarding.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `cache_validator`: Cache integrity utilities.
//! - `circuit_breaker`: Circuit breaker guarding the registry client.
//! - `config`: Configuration management.
//! - `crm_client`: Outbound CRM webhook client.
//! - `enrichment`: Lead analysis workflow.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `scoring`: Lead scoring engine.
//! - `services`: External service clients (registry, email finder, news search, pitch).
//! - `website`: Website probing and the session validation cache.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod cache_validator;
pub mod circuit_breaker;
pub mod config;
pub mod crm_client;
pub mod enrichment;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod scoring;
pub mod services;
pub mod website;
