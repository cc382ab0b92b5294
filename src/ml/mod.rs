//! ONNX classifier adapter
//!
//! Production implementation of [`crate::classifier::EcgClassifier`] backed
//! by ONNX Runtime. The engine itself stays model-agnostic; this module is
//! the one place that knows how the trained ViT checkpoint is served.

pub mod onnx_classifier;

pub use onnx_classifier::OnnxEcgClassifier;
