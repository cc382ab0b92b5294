//! Input preprocessing
//!
//! Decodes uploaded scan bytes into the normalized tensor the classifier
//! consumes, and derives the masked/interpolated variants the saliency
//! estimators need.

pub mod image;

pub use self::image::EcgImage;
