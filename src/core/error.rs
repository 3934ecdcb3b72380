//! CF-008: Error taxonomy for template parsing.

use std::path::PathBuf;
use thiserror::Error;

/// A failed parse. No partial template is ever returned alongside one.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{source_name}: failed to parse template as YAML ({yaml}) or JSON ({json})")]
    Decode {
        source_name: String,
        yaml: String,
        json: String,
    },

    #[error("{source_name}: template root must be a mapping")]
    Structure { source_name: String },

    #[error("{source_name}: {reason}")]
    RejectedFormat {
        source_name: String,
        reason: RejectedFormat,
    },

    #[error("{source_name}: {message}")]
    Build {
        source_name: String,
        message: String,
    },
}

/// Why the format guard turned a document away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectedFormat {
    #[error("template uses Rain-specific tags (!Rain::S3, etc.) which are not standard CloudFormation")]
    RainTags,

    #[error("file appears to be a Kubernetes manifest, not a CloudFormation template")]
    KubernetesManifest,
}
