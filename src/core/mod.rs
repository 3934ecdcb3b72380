//! Core parsing logic: IR types, decoding, intrinsic resolution, template building, reference graph.

pub mod builder;
pub mod error;
pub mod graph;
pub mod guard;
pub mod loader;
pub mod long_form;
pub mod naming;
pub mod parser;
pub mod short_form;
pub mod types;
