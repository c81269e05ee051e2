use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Response URL used by console test events; responses addressed to it are
/// logged but never transmitted.
pub const DRY_RUN_RESPONSE_URL: &str = "http://pre-signed-S3-url-for-response";
/// Hard limit of the S3 `DeleteObjects` API.
pub const MAX_DELETE_BATCH_SIZE: usize = 1_000;
pub const DEFAULT_DELETE_BATCH_SIZE: usize = MAX_DELETE_BATCH_SIZE;
pub const BUCKET_NAME_PROPERTY: &str = "BucketName";

pub type PropertyMap = Map<String, Value>;
pub type ResponseData = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestType {
    Create,
    Update,
    Delete,
    /// Any request type this handler does not model; passed through verbatim.
    Other(String),
}

impl RequestType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Other(value) => value,
        }
    }
}

/// An event without `RequestType` is kept as an empty pass-through type.
impl Default for RequestType {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for RequestType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Create" => Self::Create,
            "Update" => Self::Update,
            "Delete" => Self::Delete,
            _ => Self::Other(value),
        }
    }
}

impl From<RequestType> for String {
    fn from(value: RequestType) -> Self {
        match value {
            RequestType::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `ResourceProperties` of a lifecycle event. `BucketName` is the only key the
/// handler interprets; everything else (including `ServiceToken`) is kept in
/// `extra`. `BucketName` is held raw so a mistyped value is reported through
/// the response channel instead of failing the parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceProperties {
    #[serde(rename = "BucketName", default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<Value>,
    #[serde(flatten)]
    pub extra: PropertyMap,
}

impl ResourceProperties {
    /// Bucket name when present and non-blank. A non-string value is an error.
    pub fn bucket_name(&self) -> Result<Option<&str>, ContractError> {
        match &self.bucket_name {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(name)) => Ok(Some(name.trim()).filter(|name| !name.is_empty())),
            Some(other) => Err(ContractError::InvalidPropertyType {
                key: BUCKET_NAME_PROPERTY.to_string(),
                expected: "string",
                found: json_type_name(other),
            }),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    #[serde(default)]
    pub request_type: RequestType,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    #[serde(default)]
    pub resource_properties: ResourceProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<ResourceProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_token: Option<String>,
}

impl LifecycleEvent {
    pub fn is_dry_run(&self) -> bool {
        self.response_url == DRY_RUN_RESPONSE_URL
    }

    /// Rebuilds just enough of an event that failed typed parsing to answer
    /// it: the response URL and the identity fields echoed in the envelope.
    /// `None` when any of them is missing or not a string.
    pub fn envelope_only(raw: &Value) -> Option<Self> {
        let field = |name: &str| raw.get(name)?.as_str().map(str::to_string);
        Some(Self {
            request_type: field("RequestType")
                .map(RequestType::from)
                .unwrap_or_default(),
            stack_id: field("StackId")?,
            request_id: field("RequestId")?,
            logical_resource_id: field("LogicalResourceId")?,
            response_url: field("ResponseURL")?,
            resource_properties: ResourceProperties::default(),
            old_resource_properties: None,
            physical_resource_id: field("PhysicalResourceId"),
            resource_type: field("ResourceType"),
            service_token: field("ServiceToken"),
        })
    }
}

/// The slice of the Lambda invocation context the handler needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    pub aws_request_id: String,
    pub log_stream_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

impl ResponseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseEnvelope {
    pub status: ResponseStatus,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    #[serde(default)]
    pub data: ResponseData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ResponseEnvelope {
    /// JSON body for the callback PUT. `extra_fields` are written first so the
    /// envelope's own fields always win on a key collision.
    pub fn to_body(&self, extra_fields: &ResponseData) -> Result<Vec<u8>, ContractError> {
        let mut body = extra_fields.clone();
        if let Value::Object(fields) = serde_json::to_value(self)? {
            body.extend(fields);
        }
        Ok(serde_json::to_vec(&body)?)
    }
}

pub fn log_stream_reason(log_stream_name: &str) -> String {
    format!("See the details in the diagnostic log stream: {log_stream_name}")
}

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("delete batch size must be between 1 and 1000, got {0}")]
    InvalidBatchSize(usize),
    #[error("batch plan is inconsistent: {0}")]
    InvalidPlan(String),
    #[error("{key} must be a {expected}, got {found}")]
    InvalidPropertyType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("malformed lifecycle event: {0}")]
    MalformedEvent(String),
    #[error("failed to serialize response envelope: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn delete_event_json() -> Value {
        json!({
            "RequestType": "Delete",
            "ServiceToken": "arn:aws:lambda:eu-west-1:123456789012:function:empty-bucket",
            "ResponseURL": "https://cloudformation-custom-resource-response.s3.amazonaws.com/abc",
            "StackId": "arn:aws:cloudformation:eu-west-1:123456789012:stack/logs/1",
            "RequestId": "req-1",
            "LogicalResourceId": "EmptyLogsBucket",
            "PhysicalResourceId": "EmptyLogsBucket",
            "ResourceType": "Custom::EmptyBucketOnDelete",
            "ResourceProperties": {
                "ServiceToken": "arn:aws:lambda:eu-west-1:123456789012:function:empty-bucket",
                "BucketName": "logs-bucket"
            }
        })
    }

    #[test]
    fn parses_cloudformation_delete_event() {
        let event: LifecycleEvent =
            serde_json::from_value(delete_event_json()).expect("event should parse");

        assert_eq!(event.request_type, RequestType::Delete);
        assert_eq!(event.logical_resource_id, "EmptyLogsBucket");
        assert_eq!(
            event
                .resource_properties
                .bucket_name()
                .expect("bucket name is a string"),
            Some("logs-bucket")
        );
        assert!(event.resource_properties.extra.contains_key("ServiceToken"));
        assert_eq!(
            event.resource_type.as_deref(),
            Some("Custom::EmptyBucketOnDelete")
        );
        assert!(!event.is_dry_run());
    }

    #[test]
    fn unknown_request_type_is_passed_through() {
        let mut raw = delete_event_json();
        raw["RequestType"] = json!("Rollback");

        let event: LifecycleEvent = serde_json::from_value(raw).expect("event should parse");
        assert_eq!(event.request_type, RequestType::Other("Rollback".to_string()));
        assert_eq!(
            serde_json::to_value(&event.request_type).expect("serialize request type"),
            json!("Rollback")
        );
    }

    #[test]
    fn blank_bucket_name_counts_as_absent() {
        let properties = ResourceProperties {
            bucket_name: Some(json!("  ")),
            extra: PropertyMap::new(),
        };
        assert_eq!(properties.bucket_name().expect("blank is a string"), None);
    }

    #[test]
    fn non_string_bucket_name_parses_but_is_rejected_on_read() {
        let mut raw = delete_event_json();
        raw["ResourceProperties"]["BucketName"] = json!(["logs-bucket"]);

        let event: LifecycleEvent = serde_json::from_value(raw).expect("event should parse");
        let error = event
            .resource_properties
            .bucket_name()
            .expect_err("a list is not a bucket name");
        assert_eq!(error.to_string(), "BucketName must be a string, got array");
    }

    #[test]
    fn missing_request_type_parses_as_empty_pass_through() {
        let mut raw = delete_event_json();
        raw.as_object_mut()
            .expect("fixture is an object")
            .remove("RequestType");

        let event: LifecycleEvent = serde_json::from_value(raw).expect("event should parse");
        assert_eq!(event.request_type, RequestType::Other(String::new()));
    }

    #[test]
    fn envelope_only_keeps_identity_of_unparsable_event() {
        let mut raw = delete_event_json();
        raw["ResourceProperties"] = json!("not-an-object");

        let event = LifecycleEvent::envelope_only(&raw).expect("identity fields are present");
        assert_eq!(event.request_type, RequestType::Delete);
        assert_eq!(event.logical_resource_id, "EmptyLogsBucket");
        assert_eq!(event.request_id, "req-1");
        assert_eq!(event.resource_properties, ResourceProperties::default());

        raw.as_object_mut()
            .expect("fixture is an object")
            .remove("ResponseURL");
        assert_eq!(LifecycleEvent::envelope_only(&raw), None);
    }

    #[test]
    fn missing_resource_properties_default_to_empty() {
        let mut raw = delete_event_json();
        raw.as_object_mut()
            .expect("fixture is an object")
            .remove("ResourceProperties");

        let event: LifecycleEvent = serde_json::from_value(raw).expect("event should parse");
        assert_eq!(event.resource_properties, ResourceProperties::default());
    }

    #[test]
    fn success_body_omits_reason() {
        let envelope = ResponseEnvelope {
            status: ResponseStatus::Success,
            physical_resource_id: "EmptyLogsBucket".to_string(),
            stack_id: "stack".to_string(),
            request_id: "req-1".to_string(),
            logical_resource_id: "EmptyLogsBucket".to_string(),
            no_echo: false,
            data: ResponseData::new(),
            reason: None,
        };

        let body: Value = serde_json::from_slice(
            &envelope
                .to_body(&ResponseData::new())
                .expect("body should serialize"),
        )
        .expect("body should be json");

        assert_eq!(
            body,
            json!({
                "Status": "SUCCESS",
                "PhysicalResourceId": "EmptyLogsBucket",
                "StackId": "stack",
                "RequestId": "req-1",
                "LogicalResourceId": "EmptyLogsBucket",
                "NoEcho": false,
                "Data": {}
            })
        );
    }

    #[test]
    fn envelope_fields_override_extra_fields() {
        let envelope = ResponseEnvelope {
            status: ResponseStatus::Failed,
            physical_resource_id: "id".to_string(),
            stack_id: "stack".to_string(),
            request_id: "req-1".to_string(),
            logical_resource_id: "id".to_string(),
            no_echo: true,
            data: ResponseData::new(),
            reason: Some("boom".to_string()),
        };
        let extra = json!({"Status": "SUCCESS", "Hint": "kept"})
            .as_object()
            .cloned()
            .expect("fixture is an object");

        let body: Value =
            serde_json::from_slice(&envelope.to_body(&extra).expect("body should serialize"))
                .expect("body should be json");

        assert_eq!(body["Status"], json!("FAILED"));
        assert_eq!(body["Reason"], json!("boom"));
        assert_eq!(body["Hint"], json!("kept"));
        assert_eq!(body["NoEcho"], json!(true));
    }

    #[test]
    fn placeholder_url_marks_dry_run() {
        let mut raw = delete_event_json();
        raw["ResponseURL"] = json!(DRY_RUN_RESPONSE_URL);

        let event: LifecycleEvent = serde_json::from_value(raw).expect("event should parse");
        assert!(event.is_dry_run());
    }
}
