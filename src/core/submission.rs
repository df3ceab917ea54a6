use crate::core::admin_client::AdminClient;
use crate::core::error::IntakeError;
use crate::core::multipart::FilePart;
use crate::core::order_annotation::{NoteMode, OrderAnnotator};
use crate::core::raw_http::RawHttpClient;
use crate::core::staged_upload::{StagedUploader, StoredFile};
use crate::utils::constants::{CONSULTATION_TAG, PRESCRIPTION_TAG};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceType {
    #[default]
    UploadPrescription,
    FreeConsultation,
}

impl ServiceType {
    pub fn tag(self) -> &'static str {
        match self {
            ServiceType::UploadPrescription => PRESCRIPTION_TAG,
            ServiceType::FreeConsultation => CONSULTATION_TAG,
        }
    }
}

impl FromStr for ServiceType {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "upload_prescription" => Ok(ServiceType::UploadPrescription),
            "free_consultation" => Ok(ServiceType::FreeConsultation),
            other => Err(IntakeError::FormParse(format!(
                "unknown service_type `{}`",
                other
            ))),
        }
    }
}

/// One storefront submission, built from the inbound form.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub order_number: String,
    pub customer_email: String,
    pub phone_number: String,
    pub additional_notes: String,
    pub service_type: ServiceType,
    pub file: Option<FilePart>,
}

impl UploadRequest {
    pub fn from_form(
        mut fields: HashMap<String, String>,
        file: Option<FilePart>,
    ) -> Result<Self, IntakeError> {
        let mut take = |key: &str| fields.remove(key).unwrap_or_default().trim().to_string();

        let order_number = normalize_order_number(&take("order_number"))?;
        let customer_email = take("customer_email");
        let phone_number = take("phone_number");
        let additional_notes = take("additional_notes");
        let service_type = take("service_type").parse()?;

        Ok(Self {
            order_number,
            customer_email,
            phone_number,
            additional_notes,
            service_type,
            file: file.filter(|f| !f.is_empty()),
        })
    }
}

/// Trims, drops a leading `#`, and allows only ASCII alphanumerics and `-`
/// so the value cannot widen the order search.
pub fn normalize_order_number(raw: &str) -> Result<String, IntakeError> {
    let number = raw.trim().trim_start_matches('#').trim();
    if number.is_empty() {
        return Err(IntakeError::FormParse("order_number is required".to_string()));
    }
    if !number.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(IntakeError::FormParse(format!(
            "order_number `{}` contains unsupported characters",
            number
        )));
    }
    Ok(number.to_string())
}

pub fn compose_note(request: &UploadRequest, file_url: Option<&str>) -> String {
    let mut lines = Vec::with_capacity(5);
    match request.service_type {
        ServiceType::UploadPrescription => lines.push("Prescription uploaded.".to_string()),
        ServiceType::FreeConsultation => lines.push("Free consultation requested.".to_string()),
    }
    if let Some(url) = file_url {
        lines.push(format!("File Link: {}", url));
    }
    lines.push(format!("Customer Email: {}", request.customer_email));
    lines.push(format!("Phone Number: {}", request.phone_number));
    lines.push(format!("Additional Notes: {}", request.additional_notes));
    lines.join("\n")
}

pub fn file_alt_text(order_number: &str) -> String {
    format!("Prescription for order #{}", order_number)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub message: String,
    pub order_id: String,
    pub file: Option<StoredFile>,
}

/// A failed submission. `stored_file` is set when the file reached the
/// platform before a later step failed.
#[derive(Debug)]
pub struct SubmissionFailure {
    pub error: IntakeError,
    pub stored_file: Option<StoredFile>,
}

impl From<IntakeError> for SubmissionFailure {
    fn from(error: IntakeError) -> Self {
        Self {
            error,
            stored_file: None,
        }
    }
}

/// Request-independent collaborators for the submission pipeline.
#[derive(Debug, Clone)]
pub struct Intake {
    pub admin: AdminClient,
    pub raw: RawHttpClient,
    pub note_mode: NoteMode,
    upload_permits: Arc<Semaphore>,
    permit_wait: Duration,
}

impl Intake {
    pub fn new(
        admin: AdminClient,
        raw: RawHttpClient,
        note_mode: NoteMode,
        max_concurrent_uploads: usize,
        permit_wait: Duration,
    ) -> Self {
        Self {
            admin,
            raw,
            note_mode,
            upload_permits: Arc::new(Semaphore::new(max_concurrent_uploads)),
            permit_wait,
        }
    }

    /// Bounds how many submissions buffer a file in memory at once.
    pub async fn upload_permit(&self) -> Result<OwnedSemaphorePermit, IntakeError> {
        match tokio::time::timeout(self.permit_wait, self.upload_permits.clone().acquire_owned())
            .await
        {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) | Err(_) => {
                tracing::warn!("timed out waiting for an upload permit");
                Err(IntakeError::Busy)
            }
        }
    }

    pub async fn submit(
        &self,
        request: UploadRequest,
    ) -> Result<SubmissionOutcome, SubmissionFailure> {
        let start = std::time::Instant::now();
        tracing::info!(
            order_number = %request.order_number,
            service_type = ?request.service_type,
            "submission received"
        );

        let stored_file = match request.service_type {
            ServiceType::UploadPrescription => {
                let file = request.file.as_ref().ok_or(IntakeError::MissingFile)?;
                let uploader = StagedUploader::new(&self.admin, &self.raw);
                Some(
                    uploader
                        .upload(file, &file_alt_text(&request.order_number))
                        .await?,
                )
            }
            ServiceType::FreeConsultation => None,
        };

        let note = compose_note(&request, stored_file.as_ref().map(|f| f.url.as_str()));
        let annotator = OrderAnnotator::new(&self.admin, self.note_mode);
        let annotated = match annotator
            .annotate(&request.order_number, request.service_type.tag(), &note)
            .await
        {
            Ok(annotated) => annotated,
            Err(error) => {
                if stored_file.is_some() {
                    tracing::error!(
                        order_number = %request.order_number,
                        "file stored but order annotation failed: {}",
                        error
                    );
                }
                return Err(SubmissionFailure { error, stored_file });
            }
        };

        tracing::info!(
            order_number = %request.order_number,
            order_id = %annotated.order_id,
            "submission completed in {:?}",
            start.elapsed()
        );

        let message = match request.service_type {
            ServiceType::UploadPrescription => "Prescription uploaded successfully!",
            ServiceType::FreeConsultation => "Consultation request received successfully!",
        };
        Ok(SubmissionOutcome {
            message: message.to_string(),
            order_id: annotated.order_id,
            file: stored_file,
        })
    }
}
