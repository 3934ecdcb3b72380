//! CF-002: Format guard, rejecting foreign dialects before decoding.
//!
//! Cheap substring checks over the raw text. They are not parses and can
//! misfire on contrived input.

use super::error::RejectedFormat;

/// Tag prefix of the Rain template dialect.
const RAIN_TAG_MARKER: &str = "!Rain::";

const KUBERNETES_API_VERSION: &str = "apiVersion:";
const KUBERNETES_KIND: &str = "kind:";

/// Check raw template bytes for dialects this crate does not parse.
pub fn check_format(content: &[u8]) -> Result<(), RejectedFormat> {
    let text = String::from_utf8_lossy(content);

    if text.contains(RAIN_TAG_MARKER) {
        return Err(RejectedFormat::RainTags);
    }

    if text.contains(KUBERNETES_API_VERSION) && text.contains(KUBERNETES_KIND) {
        return Err(RejectedFormat::KubernetesManifest);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cf002_accepts_plain_template() {
        let yaml = b"Resources:\n  B:\n    Type: AWS::S3::Bucket\n";
        assert!(check_format(yaml).is_ok());
    }

    #[test]
    fn test_cf002_rejects_rain_tags() {
        let yaml = b"Resources:\n  Bucket:\n    Type: !Rain::S3 my-bucket\n";
        assert_eq!(check_format(yaml), Err(RejectedFormat::RainTags));
    }

    #[test]
    fn test_cf002_rejects_kubernetes() {
        let yaml = b"apiVersion: v1\nkind: Pod\nmetadata:\n  name: test\n";
        assert_eq!(check_format(yaml), Err(RejectedFormat::KubernetesManifest));
    }

    #[test]
    fn test_cf002_kubernetes_order_independent() {
        let yaml = b"kind: Deployment\nspec: {}\napiVersion: apps/v1\n";
        assert_eq!(check_format(yaml), Err(RejectedFormat::KubernetesManifest));
    }

    #[test]
    fn test_cf002_single_indicator_allowed() {
        assert!(check_format(b"Metadata:\n  kind: note\n").is_ok());
        assert!(check_format(b"Metadata:\n  apiVersion: 2\n").is_ok());
    }
}
