//! Shared domain primitives for the empty-bucket custom resource.
//!
//! This crate owns the CloudFormation request/response contract, delete batch
//! planning, and deletion outcome aggregation. It intentionally excludes AWS SDK,
//! HTTP, and Lambda runtime concerns; those live in `empty_bucket_lambda`.

pub mod batching;
pub mod contract;
pub mod deletion;
