//! AWS-oriented adapters and handlers for the empty-bucket custom resource.
//!
//! This crate owns runtime integration details: the storage and response
//! transport ports, the CloudFormation response channel, the bulk-delete sweep,
//! request dispatch, environment configuration and tracing setup. Contract types
//! and batch planning come from `empty_bucket_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod telemetry;
