use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use attach_core::models::CandidateFile;
use attach_core::{AttachError, ErrorMetadata, LogLevel};

/// `PATH=DESCRIPTION` argument of `attach upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArg {
    pub path: PathBuf,
    pub description: String,
}

impl FromStr for FileArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, description) = s
            .split_once('=')
            .ok_or_else(|| format!("expected PATH=DESCRIPTION, got '{}'", s))?;
        if path.trim().is_empty() {
            return Err(format!("missing path in '{}'", s));
        }
        Ok(Self {
            path: PathBuf::from(path.trim()),
            description: description.to_string(),
        })
    }
}

/// `KEY=VALUE` argument of `attach sign --field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: String,
    pub value: String,
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Self {
                key: key.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
        }
    }
}

/// MIME type from the file extension; unknown extensions are sent as binary.
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Build the candidate for a local file. Size comes from the file's metadata.
pub async fn candidate_for(arg: &FileArg) -> anyhow::Result<CandidateFile> {
    let metadata = tokio::fs::metadata(&arg.path)
        .await
        .with_context(|| format!("Failed to read file: {}", arg.path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("Not a file: {}", arg.path.display());
    }

    let name = arg
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .context("File name is not valid UTF-8")?;

    Ok(
        CandidateFile::new(name, metadata.len(), mime_type_for(&arg.path))
            .with_description(arg.description.clone()),
    )
}

fn session_error(err: &anyhow::Error) -> Option<&AttachError> {
    err.chain().find_map(|e| e.downcast_ref::<AttachError>())
}

/// Terminal message for a failed command. Session errors show their code and
/// the suggested action.
pub fn describe_error(err: &anyhow::Error) -> String {
    let Some(attach) = session_error(err) else {
        return format!("Error: {:#}", err);
    };

    let mut message = format!("Error [{}]: {}", attach.error_code(), attach.client_message());
    if let Some(action) = attach.suggested_action() {
        message.push_str("\nHint: ");
        message.push_str(action);
    }
    message
}

/// Log a failed command at the level its error kind calls for.
pub fn log_error(err: &anyhow::Error) {
    let Some(attach) = session_error(err) else {
        tracing::error!(error = %format!("{:#}", err), "Command failed");
        return;
    };

    let code = attach.error_code();
    let recoverable = attach.is_recoverable();
    match attach.log_level() {
        LogLevel::Debug => {
            tracing::debug!(code, recoverable, error = %attach, "Command failed")
        }
        LogLevel::Warn => tracing::warn!(code, recoverable, error = %attach, "Command failed"),
        LogLevel::Error => {
            tracing::error!(code, recoverable, error = %attach, "Command failed")
        }
    }
}

/// Initialize tracing for the CLI binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("attach=debug,info")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_argument() {
        let arg: FileArg = "scans/page1.png=First page".parse().unwrap();
        assert_eq!(arg.path, PathBuf::from("scans/page1.png"));
        assert_eq!(arg.description, "First page");

        // description may contain '='
        let arg: FileArg = "a.pdf=x=y".parse().unwrap();
        assert_eq!(arg.description, "x=y");

        assert!("no-description".parse::<FileArg>().is_err());
        assert!("=desc".parse::<FileArg>().is_err());
    }

    #[test]
    fn parses_field_argument() {
        let field: Field = "course_id=course-v1:Demo".parse().unwrap();
        assert_eq!(field.key, "course_id");
        assert_eq!(field.value, "course-v1:Demo");
        assert!("=x".parse::<Field>().is_err());
    }

    #[test]
    fn mime_type_from_extension() {
        assert_eq!(mime_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("b.pdf")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("c")), "application/octet-stream");
    }

    #[test]
    fn session_errors_show_code_and_hint() {
        let err = anyhow::Error::from(AttachError::PurgeFailed("locked".to_string()));
        let message = describe_error(&err);
        assert!(message.starts_with("Error [PURGE_FAILED]: "));
        assert!(message.ends_with("\nHint: Try the upload again"));

        // context on top keeps the session error reachable
        let err = anyhow::Error::from(AttachError::SessionLocked).context("Upload failed");
        assert!(describe_error(&err).contains("[SESSION_LOCKED]"));

        let err = anyhow::Error::from(AttachError::UnknownFile("x".to_string()));
        assert!(!describe_error(&err).contains("Hint"));
    }

    #[test]
    fn other_errors_show_full_chain() {
        let err = anyhow::anyhow!("disk offline").context("Failed to open local storage");
        assert_eq!(
            describe_error(&err),
            "Error: Failed to open local storage: disk offline"
        );
    }

    #[tokio::test]
    async fn candidate_uses_file_size_and_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        tokio::fs::write(&path, b"12345").await.unwrap();

        let candidate = candidate_for(&FileArg {
            path,
            description: "Photo".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(candidate.name, "photo.png");
        assert_eq!(candidate.size_bytes, 5);
        assert_eq!(candidate.mime_type, "image/png");
        assert!(candidate.has_description());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let err = candidate_for(&FileArg {
            path: PathBuf::from("/nonexistent/file.png"),
            description: "x".to_string(),
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
