pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_API_VERSION: &str = "2024-07";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 4;
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 30;
pub const DEFAULT_TRUSTED_PROXY_COUNT: usize = 0;

// headroom for the text fields and multipart framing around the file
pub const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub const UPLOAD_PERMIT_WAIT_SECS: u64 = 5;

pub const SHOPIFY_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

pub const PRESCRIPTION_TAG: &str = "Prescription-Uploaded";
pub const CONSULTATION_TAG: &str = "Free-Consultation-Requested";

pub const PRESCRIPTION_FILE_FIELD: &str = "prescription_file";
