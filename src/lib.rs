//! Grok-powered SDR System API Library
//!
//! This library provides the core functionality for the SDR (Sales Development
//! Representative) backend: lead CRUD, AI-assisted qualification/scoring and
//! message generation via the Grok API, and an evaluation harness for tracking
//! AI output quality.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `db`: Database connection pool and schema bootstrap.
//! - `errors`: Error handling types.
//! - `models`: Core data models and request/response DTOs.
//! - `grok_client`: Grok completions API client and response parsing.
//! - `scoring`: Weighted-average scoring helpers and default criteria.
//! - `lead_service`: Lead management operations.
//! - `evaluation_service`: AI evaluation runs and summaries.
//! - `handlers`: HTTP request handlers for leads.
//! - `scoring_handler`: HTTP handlers for scoring criteria.
//! - `evaluation_handler`: HTTP handlers for evaluations.
//! - `search_handler`: HTTP handlers for cross-entity search.

pub mod config;
pub mod db;
pub mod errors;
pub mod evaluation_handler;
pub mod evaluation_service;
pub mod grok_client;
pub mod handlers;
pub mod lead_service;
pub mod models;
pub mod scoring;
pub mod scoring_handler;
pub mod search_handler;
