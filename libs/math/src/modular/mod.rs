//! The BN254 scalar field element and its operations.

mod element;
mod ops;

pub use element::FieldElement;
