#![allow(dead_code)]

use empty_bucket_core::contract::{InvocationContext, LifecycleEvent, DRY_RUN_RESPONSE_URL};
use serde_json::{json, Value};

pub const RESPONSE_URL: &str =
    "https://cloudformation-custom-resource-response-euwest1.s3.amazonaws.com/signed";
pub const LOG_STREAM: &str = "2026/10/16/[$LATEST]0123456789abcdef";

/// Builder for CloudFormation lifecycle events as delivered to the function.
#[derive(Clone, Debug)]
pub struct EventBuilder {
    request_type: Option<String>,
    response_url: String,
    bucket_name: Option<Value>,
}

impl EventBuilder {
    pub fn new(request_type: &str) -> Self {
        Self {
            request_type: Some(request_type.to_string()),
            response_url: RESPONSE_URL.to_string(),
            bucket_name: Some(json!("logs-bucket")),
        }
    }

    pub fn without_bucket(mut self) -> Self {
        self.bucket_name = None;
        self
    }

    pub fn with_bucket_value(mut self, value: Value) -> Self {
        self.bucket_name = Some(value);
        self
    }

    pub fn without_request_type(mut self) -> Self {
        self.request_type = None;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.response_url = DRY_RUN_RESPONSE_URL.to_string();
        self
    }

    pub fn to_json(&self) -> Value {
        let mut properties = json!({
            "ServiceToken": "arn:aws:lambda:eu-west-1:123456789012:function:empty-bucket"
        });
        if let Some(bucket_name) = &self.bucket_name {
            properties["BucketName"] = bucket_name.clone();
        }
        let mut event = json!({
            "ServiceToken": "arn:aws:lambda:eu-west-1:123456789012:function:empty-bucket",
            "ResponseURL": self.response_url,
            "StackId": "arn:aws:cloudformation:eu-west-1:123456789012:stack/logs/5b3e",
            "RequestId": "d8c1f0a2-7f0e-4f44-9f0b-3a1b2c3d4e5f",
            "LogicalResourceId": "EmptyLogsBucket",
            "ResourceType": "Custom::EmptyBucketOnDelete",
            "ResourceProperties": properties
        });
        if let Some(request_type) = &self.request_type {
            event["RequestType"] = json!(request_type);
        }
        event
    }

    pub fn build(&self) -> LifecycleEvent {
        serde_json::from_value(self.to_json()).expect("fixture event should parse")
    }
}

pub fn invocation_context() -> InvocationContext {
    InvocationContext {
        aws_request_id: "aws-req-1".to_string(),
        log_stream_name: LOG_STREAM.to_string(),
    }
}
