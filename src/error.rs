use thiserror::Error;

/// Errors raised while resolving a request path against the web root
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The canonical path is not a descendant of the web root
    #[error("path must be within root path")]
    OutsideRoot { path: String },

    /// The path (or its default document) does not exist
    #[error("not found: {reason}")]
    NotFound { path: String, reason: String },

    /// The path exists but cannot be opened for reading
    #[error("could not read file: {reason}")]
    NotReadable { path: String, reason: String },
}

impl PathError {
    /// The request path this error refers to, as the client sent it.
    pub fn path(&self) -> &str {
        match self {
            PathError::OutsideRoot { path }
            | PathError::NotFound { path, .. }
            | PathError::NotReadable { path, .. } => path,
        }
    }
}

/// Errors that end a chunked file stream early
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The peer stopped accepting chunks (usually a disconnect)
    #[error("Connection interrupted")]
    WriteFailed,

    /// Reading the next chunk from disk failed
    #[error("Read failed: {0}")]
    ReadFailed(String),
}

/// Errors from the imaging device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The device could not be opened
    #[error("Cannot open camera {device}: {reason}")]
    NotOpen { device: u32, reason: String },

    /// The device opened but did not yield a frame
    #[error("Cannot read image from camera {device}: {reason}")]
    ReadFailed { device: u32, reason: String },

    /// Another request holds the device
    #[error("Camera is busy")]
    Busy,

    /// Capture and detection did not finish in time
    #[error("Camera did not respond within {seconds}s")]
    Timeout { seconds: u64 },
}

/// Malformed `/getResult` query strings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No `type` parameter was supplied
    #[error("Wrong parameter")]
    MissingParam,

    /// More than one query parameter was supplied
    #[error("Wrong parameter: expected exactly one, got {count}")]
    TooManyParams { count: usize },

    /// `type` was neither `json` nor `image`
    #[error("Wrong value: {value}")]
    UnknownValue { value: String },
}

/// Errors writing the annotated image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    /// Encoding or writing the file failed
    #[error("Cannot save image {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

/// Errors loading the detection model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorError {
    /// The model asset does not exist or cannot be read
    #[error("model asset {path} is missing: {reason}")]
    ModelMissing { path: String, reason: String },

    /// The model asset exists but does not describe a usable model
    #[error("model asset {path} is invalid: {reason}")]
    ModelInvalid { path: String, reason: String },
}

/// Errors caught at the `/getResult` dispatch boundary.
///
/// None of these change the HTTP status; they are rendered into the body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("Error loading face detector: {0}")]
    Detector(#[from] DetectorError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    /// The blocking detection task panicked or was cancelled
    #[error("Detection task failed: {0}")]
    Internal(String),
}
