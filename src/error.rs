use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

// Errors that can be sent back to the frontend. Commands return them in their
// `Err` variant, where they are serialized as their display message.
#[derive(Debug, Error)]
pub enum Error {
    /// The user dismissed the share sheet without picking a target.
    #[error("cancelled")]
    Cancelled,
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("Failed to interact with native sharing API: {0}")]
    NativeApi(String),
    #[error("Shared storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Malformed pending share record: {0}")]
    MalformedRecord(String),
    #[error("Sharing is not supported on this platform")]
    UnsupportedPlatform,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("Tauri API error: {0}")]
    Tauri(#[from] tauri::Error),
    #[cfg(mobile)]
    #[error("Plugin invoke error: {0}")]
    PluginInvoke(String),
}

#[cfg(mobile)]
impl From<tauri::plugin::mobile::PluginInvokeError> for Error {
    fn from(err: tauri::plugin::mobile::PluginInvokeError) -> Self {
        use tauri::plugin::mobile::PluginInvokeError;

        // The native plugins reject with "Share cancelled" when the chooser is dismissed.
        if let PluginInvokeError::InvokeRejected(response) = &err {
            let cancelled = response
                .message
                .as_deref()
                .is_some_and(|message| message.to_ascii_lowercase().contains("cancel"));
            if cancelled {
                return Error::Cancelled;
            }
        }
        Error::PluginInvoke(err.to_string())
    }
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn cancelled_serializes_to_distinguished_message() {
        let json = serde_json::to_string(&Error::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }

    #[test]
    fn io_errors_keep_their_message() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.to_string(), "I/O error: denied");
    }
}
