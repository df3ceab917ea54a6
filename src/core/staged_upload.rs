use crate::core::admin_client::AdminClient;
use crate::core::error::IntakeError;
use crate::core::multipart::{self, FilePart};
use crate::core::operations::{
    FileCreate, FileCreateInput, FileCreateVariables, FileRecord, FileStatus, ResourceKind,
    StagedHttpMethod, StagedTarget, StagedUploadInput, StagedUploadsCreate,
    StagedUploadsCreateVariables,
};
use crate::core::raw_http::RawHttpClient;
use reqwest::Method;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Init,
    SlotRequested,
    SlotGranted,
    BytesUploaded,
    FileRegistered,
    Ready,
    Failed,
}

/// A staged target that passed validation: both URLs are present.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantedSlot {
    pub upload_url: String,
    pub resource_url: String,
    pub parameters: Vec<(String, String)>,
}

impl TryFrom<StagedTarget> for GrantedSlot {
    type Error = IntakeError;

    fn try_from(target: StagedTarget) -> Result<Self, Self::Error> {
        let upload_url = non_empty(target.url)
            .ok_or_else(|| IntakeError::remote_validation("stagedTargets.url", "missing"))?;
        let resource_url = non_empty(target.resource_url).ok_or_else(|| {
            IntakeError::remote_validation("stagedTargets.resourceUrl", "missing")
        })?;
        Ok(Self {
            upload_url,
            resource_url,
            parameters: target
                .parameters
                .into_iter()
                .map(|p| (p.name, p.value))
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub id: String,
    pub status: FileStatus,
    pub url: String,
}

type UrlRule = fn(&FileRecord, &GrantedSlot) -> Option<String>;

fn direct_url(record: &FileRecord, _: &GrantedSlot) -> Option<String> {
    non_empty(record.url.clone())
}

fn image_url(record: &FileRecord, _: &GrantedSlot) -> Option<String> {
    non_empty(record.image.as_ref().and_then(|i| i.url.clone()))
}

fn original_source_url(record: &FileRecord, _: &GrantedSlot) -> Option<String> {
    non_empty(record.original_source.as_ref().and_then(|o| o.url.clone()))
}

fn staged_resource_url(_: &FileRecord, slot: &GrantedSlot) -> Option<String> {
    non_empty(Some(slot.resource_url.clone()))
}

/// Display URL candidates, highest priority first.
const URL_RULES: [(&str, UrlRule); 4] = [
    ("url", direct_url),
    ("image.url", image_url),
    ("originalSource.url", original_source_url),
    ("resourceUrl", staged_resource_url),
];

pub fn resolve_display_url(record: &FileRecord, slot: &GrantedSlot) -> String {
    for (source, rule) in URL_RULES {
        if let Some(url) = rule(record, slot) {
            tracing::debug!(file_id = %record.id, source, "resolved display url");
            return url;
        }
    }
    format!("shopify-file:{}", record.id)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Drives slot request -> byte upload -> file registration for one file.
pub struct StagedUploader<'a> {
    admin: &'a AdminClient,
    raw: &'a RawHttpClient,
}

impl<'a> StagedUploader<'a> {
    pub fn new(admin: &'a AdminClient, raw: &'a RawHttpClient) -> Self {
        Self { admin, raw }
    }

    pub async fn upload(&self, file: &FilePart, alt: &str) -> Result<StoredFile, IntakeError> {
        let start = Instant::now();
        let mut stage = UploadStage::Init;
        match self.run(file, alt, &mut stage).await {
            Ok(stored) => {
                tracing::info!(
                    stage = ?UploadStage::Ready,
                    file_id = %stored.id,
                    status = %stored.status,
                    "file stored in {:?}",
                    start.elapsed()
                );
                Ok(stored)
            }
            Err(e) => {
                tracing::error!(
                    stage = ?UploadStage::Failed,
                    last_stage = ?stage,
                    "staged upload aborted after {:?}: {}",
                    start.elapsed(),
                    e
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        file: &FilePart,
        alt: &str,
        stage: &mut UploadStage,
    ) -> Result<StoredFile, IntakeError> {
        let kind = ResourceKind::from_mime(&file.content_type);

        *stage = UploadStage::SlotRequested;
        let slot = self.request_slot(file, kind).await?;
        *stage = UploadStage::SlotGranted;
        tracing::info!(stage = ?stage, resource = ?kind, "upload slot granted");

        self.push_bytes(&slot, file).await?;
        *stage = UploadStage::BytesUploaded;
        tracing::info!(stage = ?stage, bytes = file.len(), "file bytes uploaded");

        let record = self.register_file(&slot, kind, alt).await?;
        *stage = UploadStage::FileRegistered;
        tracing::info!(stage = ?stage, file_id = %record.id, status = %record.file_status, "file registered");

        if !record.file_status.is_accepted() {
            return Err(IntakeError::RemoteFileRejected {
                status: record.file_status.to_string(),
            });
        }

        let url = resolve_display_url(&record, &slot);
        Ok(StoredFile {
            id: record.id,
            status: record.file_status,
            url,
        })
    }

    pub async fn request_slot(
        &self,
        file: &FilePart,
        kind: ResourceKind,
    ) -> Result<GrantedSlot, IntakeError> {
        let variables = StagedUploadsCreateVariables {
            input: vec![StagedUploadInput {
                filename: file.file_name.clone(),
                mime_type: file.content_type.clone(),
                http_method: StagedHttpMethod::Post,
                resource: kind,
                file_size: file.len().to_string(),
            }],
        };
        let payload = self
            .admin
            .execute::<StagedUploadsCreate>(&variables)
            .await?
            .staged_uploads_create
            .ok_or_else(|| IntakeError::remote_validation("stagedUploadsCreate", "empty payload"))?;

        if let Some(err) = payload.user_errors.first() {
            return Err(IntakeError::remote_validation(err.field_path(), &err.message));
        }

        payload
            .staged_targets
            .and_then(|targets| targets.into_iter().next())
            .ok_or_else(|| IntakeError::remote_validation("stagedTargets", "no target returned"))?
            .try_into()
    }

    pub async fn push_bytes(&self, slot: &GrantedSlot, file: &FilePart) -> Result<(), IntakeError> {
        let encoded = multipart::build(&slot.parameters, file)?;
        let response = self
            .raw
            .send(
                &slot.upload_url,
                Method::POST,
                &[("Content-Type".to_string(), encoded.content_type)],
                Some(encoded.body),
            )
            .await?;

        if !response.is_success() {
            tracing::error!(
                status = response.status,
                body = %response.body,
                "upload target rejected the file"
            );
            return Err(IntakeError::UploadTransport {
                status: response.status,
                body: response.body,
            });
        }
        Ok(())
    }

    pub async fn register_file(
        &self,
        slot: &GrantedSlot,
        kind: ResourceKind,
        alt: &str,
    ) -> Result<FileRecord, IntakeError> {
        let variables = FileCreateVariables {
            files: vec![FileCreateInput {
                original_source: slot.resource_url.clone(),
                content_type: kind,
                alt: alt.to_string(),
            }],
        };
        let payload = self
            .admin
            .execute::<FileCreate>(&variables)
            .await?
            .file_create
            .ok_or_else(|| IntakeError::remote_validation("fileCreate", "empty payload"))?;

        if let Some(err) = payload.user_errors.first() {
            return Err(IntakeError::remote_validation(err.field_path(), &err.message));
        }

        payload
            .files
            .and_then(|files| files.into_iter().next())
            .ok_or_else(|| IntakeError::remote_validation("files", "no file record returned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::admin_client::test_support::{GRAPHQL_PATH, admin_for};
    use crate::core::operations::UrlHolder;
    use mockito::{Matcher, Mock, ServerGuard};
    use serde_json::{Value, json};

    const RESOURCE_URL: &str = "https://shopify-staged-uploads.storage.googleapis.com/tmp/1/rx.png";

    fn slot() -> GrantedSlot {
        GrantedSlot {
            upload_url: "https://upload.example/slot".into(),
            resource_url: RESOURCE_URL.into(),
            parameters: vec![],
        }
    }

    fn record() -> FileRecord {
        FileRecord {
            id: "gid://shopify/MediaImage/7".into(),
            file_status: FileStatus::Uploaded,
            url: None,
            image: None,
            original_source: None,
        }
    }

    fn png() -> FilePart {
        FilePart::new("rx.png", "image/png", b"not-really-a-png".to_vec())
    }

    async fn graphql_mock(server: &mut ServerGuard, operation: &str, body: Value) -> Mock {
        server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex(format!("mutation {}", operation)))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    fn staged_ok(server: &ServerGuard) -> Value {
        json!({"data": {"stagedUploadsCreate": {
            "stagedTargets": [{
                "url": format!("{}/staged-upload", server.url()),
                "resourceUrl": RESOURCE_URL,
                "parameters": [
                    {"name": "key", "value": "tmp/1/rx.png"},
                    {"name": "policy", "value": "signed-policy"}
                ]
            }],
            "userErrors": []
        }}})
    }

    #[test]
    fn nested_image_url_beats_resource_url() {
        let mut rec = record();
        rec.image = Some(UrlHolder {
            url: Some("https://cdn.shopify.com/rx.png".into()),
        });
        assert_eq!(resolve_display_url(&rec, &slot()), "https://cdn.shopify.com/rx.png");
    }

    #[test]
    fn url_rules_apply_in_priority_order() {
        let mut rec = record();
        rec.original_source = Some(UrlHolder {
            url: Some("https://cdn.shopify.com/original.png".into()),
        });
        assert_eq!(
            resolve_display_url(&rec, &slot()),
            "https://cdn.shopify.com/original.png"
        );

        rec.url = Some("https://cdn.shopify.com/direct.pdf".into());
        assert_eq!(resolve_display_url(&rec, &slot()), "https://cdn.shopify.com/direct.pdf");

        assert_eq!(resolve_display_url(&record(), &slot()), RESOURCE_URL);
    }

    #[test]
    fn placeholder_embeds_file_id_as_last_resort() {
        let mut bare = slot();
        bare.resource_url = String::new();
        let mut rec = record();
        rec.image = Some(UrlHolder { url: Some("  ".into()) });
        assert_eq!(
            resolve_display_url(&rec, &bare),
            "shopify-file:gid://shopify/MediaImage/7"
        );
    }

    #[test]
    fn target_without_resource_url_is_rejected() {
        let target = StagedTarget {
            url: Some("https://upload.example/slot".into()),
            resource_url: None,
            parameters: vec![],
        };
        assert!(matches!(
            GrantedSlot::try_from(target),
            Err(IntakeError::RemoteValidation { .. })
        ));
    }

    #[tokio::test]
    async fn uploads_and_registers_a_file() {
        let mut server = mockito::Server::new_async().await;
        let staged_body = staged_ok(&server);
        let staged = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("mutation stagedUploadsCreate".into()),
                Matcher::PartialJson(json!({"variables": {"input": [{
                    "filename": "rx.png",
                    "mimeType": "image/png",
                    "httpMethod": "POST",
                    "resource": "IMAGE",
                    "fileSize": "16"
                }]}})),
            ]))
            .with_status(200)
            .with_body(staged_body.to_string())
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/staged-upload")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".into()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("signed-policy".into()),
                Matcher::Regex("not-really-a-png".into()),
            ]))
            .with_status(204)
            .create_async()
            .await;
        let file_create = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("mutation fileCreate".into()),
                Matcher::PartialJson(json!({"variables": {"files": [{
                    "originalSource": RESOURCE_URL,
                    "contentType": "IMAGE",
                    "alt": "Prescription for order #1001"
                }]}})),
            ]))
            .with_status(200)
            .with_body(
                json!({"data": {"fileCreate": {
                    "files": [{
                        "id": "gid://shopify/MediaImage/7",
                        "fileStatus": "UPLOADED",
                        "image": {"url": "https://cdn.shopify.com/rx.png"}
                    }],
                    "userErrors": []
                }}})
                .to_string(),
            )
            .create_async()
            .await;

        let admin = admin_for(&server);
        let raw = RawHttpClient::new(None).unwrap();
        let stored = StagedUploader::new(&admin, &raw)
            .upload(&png(), "Prescription for order #1001")
            .await
            .unwrap();

        staged.assert_async().await;
        upload.assert_async().await;
        file_create.assert_async().await;
        assert_eq!(stored.id, "gid://shopify/MediaImage/7");
        assert_eq!(stored.status, FileStatus::Uploaded);
        assert_eq!(stored.url, "https://cdn.shopify.com/rx.png");
    }

    #[tokio::test]
    async fn slot_field_error_aborts_before_any_bytes_are_sent() {
        let mut server = mockito::Server::new_async().await;
        let _staged = graphql_mock(
            &mut server,
            "stagedUploadsCreate",
            json!({"data": {"stagedUploadsCreate": {
                "stagedTargets": [],
                "userErrors": [{"field": ["input", "0", "fileSize"], "message": "is too large"}]
            }}}),
        )
        .await;
        let upload = server
            .mock("POST", "/staged-upload")
            .expect(0)
            .create_async()
            .await;
        let file_create = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("mutation fileCreate".into()))
            .expect(0)
            .create_async()
            .await;

        let admin = admin_for(&server);
        let raw = RawHttpClient::new(None).unwrap();
        let err = StagedUploader::new(&admin, &raw)
            .upload(&png(), "alt")
            .await
            .unwrap_err();

        upload.assert_async().await;
        file_create.assert_async().await;
        assert!(matches!(err, IntakeError::RemoteValidation { ref field, .. } if field == "input.0.fileSize"));
    }

    #[tokio::test]
    async fn rejected_upload_captures_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let staged_body = staged_ok(&server);
        let _staged = graphql_mock(&mut server, "stagedUploadsCreate", staged_body).await;
        let _upload = server
            .mock("POST", "/staged-upload")
            .with_status(403)
            .with_body("<Error><Code>AccessDenied</Code></Error>")
            .create_async()
            .await;
        let file_create = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("mutation fileCreate".into()))
            .expect(0)
            .create_async()
            .await;

        let admin = admin_for(&server);
        let raw = RawHttpClient::new(None).unwrap();
        let err = StagedUploader::new(&admin, &raw)
            .upload(&png(), "alt")
            .await
            .unwrap_err();

        file_create.assert_async().await;
        match err {
            IntakeError::UploadTransport { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("AccessDenied"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_file_status_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let staged_body = staged_ok(&server);
        let _staged = graphql_mock(&mut server, "stagedUploadsCreate", staged_body).await;
        let _upload = server
            .mock("POST", "/staged-upload")
            .with_status(201)
            .create_async()
            .await;
        let _file_create = graphql_mock(
            &mut server,
            "fileCreate",
            json!({"data": {"fileCreate": {
                "files": [{"id": "gid://shopify/GenericFile/9", "fileStatus": "FAILED"}],
                "userErrors": []
            }}}),
        )
        .await;

        let admin = admin_for(&server);
        let raw = RawHttpClient::new(None).unwrap();
        let err = StagedUploader::new(&admin, &raw)
            .upload(&png(), "alt")
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::RemoteFileRejected { ref status } if status == "FAILED"));
    }

    #[tokio::test]
    async fn missing_file_record_is_a_validation_error() {
        let mut server = mockito::Server::new_async().await;
        let staged_body = staged_ok(&server);
        let _staged = graphql_mock(&mut server, "stagedUploadsCreate", staged_body).await;
        let _upload = server
            .mock("POST", "/staged-upload")
            .with_status(204)
            .create_async()
            .await;
        let _file_create = graphql_mock(
            &mut server,
            "fileCreate",
            json!({"data": {"fileCreate": {"files": [], "userErrors": []}}}),
        )
        .await;

        let admin = admin_for(&server);
        let raw = RawHttpClient::new(None).unwrap();
        let err = StagedUploader::new(&admin, &raw)
            .upload(&png(), "alt")
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::RemoteValidation { ref field, .. } if field == "files"));
    }

    #[tokio::test]
    async fn empty_target_list_is_a_validation_error() {
        let mut server = mockito::Server::new_async().await;
        let _staged = graphql_mock(
            &mut server,
            "stagedUploadsCreate",
            json!({"data": {"stagedUploadsCreate": {"stagedTargets": [], "userErrors": []}}}),
        )
        .await;
        let upload = server
            .mock("POST", "/staged-upload")
            .expect(0)
            .create_async()
            .await;
        let file_create = server
            .mock("POST", GRAPHQL_PATH)
            .match_body(Matcher::Regex("mutation fileCreate".into()))
            .expect(0)
            .create_async()
            .await;

        let admin = admin_for(&server);
        let raw = RawHttpClient::new(None).unwrap();
        let err = StagedUploader::new(&admin, &raw)
            .upload(&png(), "alt")
            .await
            .unwrap_err();

        upload.assert_async().await;
        file_create.assert_async().await;
        assert!(matches!(err, IntakeError::RemoteValidation { ref field, .. } if field == "stagedTargets"));
    }

    #[tokio::test]
    async fn file_create_field_error_carries_its_path() {
        let mut server = mockito::Server::new_async().await;
        let staged_body = staged_ok(&server);
        let _staged = graphql_mock(&mut server, "stagedUploadsCreate", staged_body).await;
        let upload = server
            .mock("POST", "/staged-upload")
            .with_status(204)
            .create_async()
            .await;
        let file_create = graphql_mock(
            &mut server,
            "fileCreate",
            json!({"data": {"fileCreate": {
                "files": null,
                "userErrors": [{"field": ["files", "0", "originalSource"], "message": "Image URL is invalid"}]
            }}}),
        )
        .await;

        let admin = admin_for(&server);
        let raw = RawHttpClient::new(None).unwrap();
        let err = StagedUploader::new(&admin, &raw)
            .upload(&png(), "alt")
            .await
            .unwrap_err();

        upload.assert_async().await;
        file_create.assert_async().await;
        match err {
            IntakeError::RemoteValidation { field, message } => {
                assert_eq!(field, "files.0.originalSource");
                assert_eq!(message, "Image URL is invalid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
