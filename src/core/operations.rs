//! Typed documents for every admin GraphQL call the intake makes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

pub trait AdminOperation {
    const NAME: &'static str;
    const QUERY: &'static str;
    type Variables: Serialize + Send + Sync;
    type Data: DeserializeOwned;
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UserError {
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl UserError {
    pub fn field_path(&self) -> String {
        match &self.field {
            Some(path) if !path.is_empty() => path.join("."),
            _ => "unknown".to_string(),
        }
    }
}

/// Coarse resource kind shared by staged uploads and file records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    Image,
    Video,
    File,
}

impl ResourceKind {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            ResourceKind::Image
        } else if mime.starts_with("video/") {
            ResourceKind::Video
        } else {
            ResourceKind::File
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum StagedHttpMethod {
    Post,
    Put,
}

// stagedUploadsCreate

pub struct StagedUploadsCreate;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedUploadInput {
    pub filename: String,
    pub mime_type: String,
    pub http_method: StagedHttpMethod,
    pub resource: ResourceKind,
    pub file_size: String,
}

#[derive(Debug, Serialize)]
pub struct StagedUploadsCreateVariables {
    pub input: Vec<StagedUploadInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedUploadsCreateData {
    pub staged_uploads_create: Option<StagedUploadsCreatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedUploadsCreatePayload {
    #[serde(default)]
    pub staged_targets: Option<Vec<StagedTarget>>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StagedParameter {
    pub name: String,
    pub value: String,
}

/// Single-use, time-limited upload slot.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StagedTarget {
    pub url: Option<String>,
    pub resource_url: Option<String>,
    #[serde(default)]
    pub parameters: Vec<StagedParameter>,
}

impl AdminOperation for StagedUploadsCreate {
    const NAME: &'static str = "stagedUploadsCreate";
    const QUERY: &'static str = r#"
mutation stagedUploadsCreate($input: [StagedUploadInput!]!) {
  stagedUploadsCreate(input: $input) {
    stagedTargets {
      url
      resourceUrl
      parameters { name value }
    }
    userErrors { field message }
  }
}"#;
    type Variables = StagedUploadsCreateVariables;
    type Data = StagedUploadsCreateData;
}

// fileCreate

pub struct FileCreate;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCreateInput {
    pub original_source: String,
    pub content_type: ResourceKind,
    pub alt: String,
}

#[derive(Debug, Serialize)]
pub struct FileCreateVariables {
    pub files: Vec<FileCreateInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCreateData {
    pub file_create: Option<FileCreatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCreatePayload {
    #[serde(default)]
    pub files: Option<Vec<FileRecord>>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    Uploaded,
    Processing,
    Ready,
    Failed,
    #[serde(other)]
    Unknown,
}

impl FileStatus {
    pub fn is_accepted(self) -> bool {
        matches!(self, FileStatus::Uploaded | FileStatus::Ready)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Uploaded => "UPLOADED",
            FileStatus::Processing => "PROCESSING",
            FileStatus::Ready => "READY",
            FileStatus::Failed => "FAILED",
            FileStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct UrlHolder {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub file_status: FileStatus,
    /// Present on generic files.
    #[serde(default)]
    pub url: Option<String>,
    /// Present on media images.
    #[serde(default)]
    pub image: Option<UrlHolder>,
    #[serde(default)]
    pub original_source: Option<UrlHolder>,
}

impl AdminOperation for FileCreate {
    const NAME: &'static str = "fileCreate";
    const QUERY: &'static str = r#"
mutation fileCreate($files: [FileCreateInput!]!) {
  fileCreate(files: $files) {
    files {
      id
      fileStatus
      ... on GenericFile { url }
      ... on MediaImage { image { url } originalSource { url } }
      ... on Video { originalSource { url } }
    }
    userErrors { field message }
  }
}"#;
    type Variables = FileCreateVariables;
    type Data = FileCreateData;
}

// orders (search)

pub struct OrderLookup;

#[derive(Debug, Serialize)]
pub struct OrderLookupVariables {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderLookupData {
    pub orders: OrderConnection,
}

#[derive(Debug, Deserialize)]
pub struct OrderConnection {
    #[serde(default)]
    pub edges: Vec<OrderEdge>,
}

#[derive(Debug, Deserialize)]
pub struct OrderEdge {
    pub node: OrderNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderNode {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl AdminOperation for OrderLookup {
    const NAME: &'static str = "orders";
    const QUERY: &'static str = r#"
query orders($query: String!) {
  orders(first: 1, query: $query) {
    edges { node { id name note } }
  }
}"#;
    type Variables = OrderLookupVariables;
    type Data = OrderLookupData;
}

// orderUpdate

pub struct OrderUpdate;

#[derive(Debug, Clone, Serialize)]
pub struct OrderInput {
    pub id: String,
    pub tags: Vec<String>,
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct OrderUpdateVariables {
    pub input: OrderInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdateData {
    pub order_update: Option<OrderUpdatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdatePayload {
    #[serde(default)]
    pub order: Option<UpdatedOrder>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatedOrder {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AdminOperation for OrderUpdate {
    const NAME: &'static str = "orderUpdate";
    const QUERY: &'static str = r#"
mutation orderUpdate($input: OrderInput!) {
  orderUpdate(input: $input) {
    order { id tags }
    userErrors { field message }
  }
}"#;
    type Variables = OrderUpdateVariables;
    type Data = OrderUpdateData;
}
