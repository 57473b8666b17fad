//! Shared constants for attachment controls.

/// MIME types accepted by the `image` upload category.
pub const IMAGE_MIME_TYPES: &[&str] = &["image/gif", "image/jpeg", "image/pjpeg", "image/png"];

/// MIME type added on top of images by the `pdf-and-image` category.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Data attribute on the trigger element naming the upload category.
pub const UPLOAD_TYPE_ATTRIBUTE: &str = "upload-type";

/// Data attribute carrying the comma separated extension whitelist for `custom`.
pub const WHITELIST_ATTRIBUTE: &str = "white-listed-file-types";

pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 256 * 1024 * 1024;
pub const DEFAULT_MIN_FILE_COUNT: usize = 1;
pub const DEFAULT_MAX_FILE_COUNT: usize = 30;

/// Form step that hosts the attachment control.
pub const RESPONSE_STEP: &str = "submission";

/// Step name reported to the host when the fragment fails to load.
pub const RESPONSE_LOAD_ERROR_STEP: &str = "response";

/// Analytics event emitted once per successfully uploaded file.
pub const UPLOAD_FILE_EVENT: &str = "attachment.upload_file";
