//! cfn-ir: CloudFormation templates as a typed intermediate representation.
//!
//! Decodes YAML (with short-form `!Ref`-style tags) or JSON templates,
//! resolves intrinsic functions into typed values, and records which logical
//! names each resource and output references.

pub mod cli;
pub mod core;

pub use crate::core::error::{RejectedFormat, TemplateError};
pub use crate::core::parser::{parse_template, parse_template_file};
pub use crate::core::types::{Intrinsic, IntrinsicKind, ParseWarning, Template, Value};
