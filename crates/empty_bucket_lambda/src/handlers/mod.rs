pub mod dispatch;
pub mod empty_bucket;
pub mod fault;
pub mod response;
