//! Error types for the dependency manager
//!
//! Every component raises [`Error`]. Variants that come from a child process
//! carry its captured stdout and stderr, which [`Error::report`] renders
//! beneath labelled headings.

use thiserror::Error;

/// Result type alias using cpo-deps' Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Dependency manager errors
#[derive(Error, Debug)]
pub enum Error {
    /// Non-2xx HTTP response during version discovery or download
    #[error("Request to {url} failed with HTTP status {status}")]
    RemoteApi { url: String, status: u16 },

    /// Host operating system or architecture has no matching platform
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// Requested plugin type was never registered
    #[error("Plugin not registered: {plugin}")]
    PluginNotRegistered { plugin: String },

    /// Registered plugin is not an instance of the requested type
    #[error("Plugin type mismatch: expected {expected}, found {actual}")]
    PluginTypeMismatch { expected: String, actual: String },

    /// Plugin does not provide an executable binary
    #[error("Plugin {alias} does not provide a binary")]
    NotABinaryPlugin { alias: String },

    /// Version string or versions-file content did not match the expected pattern
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Child process exited with a non-zero return code
    #[error("Command `{command}` failed with return code {return_code}")]
    ProcessFailed {
        command: String,
        return_code: i32,
        stdout: String,
        stderr: String,
    },

    /// Archive is malformed or a member tries to escape the target directory
    #[error("Corrupt archive {archive}: {reason}")]
    CorruptArchive { archive: String, reason: String },

    /// Version manifest could not be persisted
    #[error("Failed to write version manifest {path}: {source}")]
    ManifestWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] cpo_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a remote API error
    pub fn remote_api(url: impl Into<String>, status: u16) -> Self {
        Self::RemoteApi {
            url: url.into(),
            status,
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a corrupt archive error
    pub fn corrupt_archive(archive: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptArchive {
            archive: archive.into(),
            reason: reason.into(),
        }
    }

    /// Create a plugin not registered error
    pub fn plugin_not_registered(plugin: impl Into<String>) -> Self {
        Self::PluginNotRegistered {
            plugin: plugin.into(),
        }
    }

    /// HTTP status carried by a remote API error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteApi { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Captured stderr attached to this error, if any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::ProcessFailed { stderr, .. } if !stderr.is_empty() => Some(stderr),
            _ => None,
        }
    }

    /// Captured stdout attached to this error, if any
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::ProcessFailed { stdout, .. } if !stdout.is_empty() => Some(stdout),
            _ => None,
        }
    }

    /// Render the error for display
    ///
    /// The message is the primary line; attached stderr and stdout follow
    /// under `stderr:` and `stdout:` headings.
    pub fn report(&self) -> String {
        let mut report = self.to_string();

        if let Some(stderr) = self.stderr() {
            report.push_str("\n\nstderr:\n");
            report.push_str(stderr);
        }

        if let Some(stdout) = self.stdout() {
            report.push_str("\n\nstdout:\n");
            report.push_str(stdout);
        }

        report
    }
}
