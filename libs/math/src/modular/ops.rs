//! Field element operations.

use super::element::{FieldElement, MODULUS};
use crate::errors::FieldError;
use std::ops::{Add, Mul, Neg, Sub};

impl Add for &FieldElement {
    type Output = FieldElement;

    fn add(self, other: &FieldElement) -> FieldElement {
        let value = self.value.add_mod(&other.value, &MODULUS);
        // Note: already guaranteed to be mod p, `FieldElement::new` would
        // attempt another reduction.
        FieldElement { value }
    }
}

impl Add<&FieldElement> for FieldElement {
    type Output = FieldElement;

    fn add(self, other: &FieldElement) -> FieldElement {
        (&self).add(other)
    }
}

impl Sub for &FieldElement {
    type Output = FieldElement;

    fn sub(self, other: &FieldElement) -> FieldElement {
        let value = self.value.sub_mod(&other.value, &MODULUS);
        FieldElement { value }
    }
}

impl Sub<&FieldElement> for FieldElement {
    type Output = FieldElement;

    fn sub(self, other: &FieldElement) -> FieldElement {
        (&self).sub(other)
    }
}

impl Mul for &FieldElement {
    type Output = FieldElement;

    fn mul(self, other: &FieldElement) -> FieldElement {
        let value = (self.as_residue() * other.as_residue()).retrieve();
        FieldElement { value }
    }
}

impl Mul<&FieldElement> for FieldElement {
    type Output = FieldElement;

    fn mul(self, other: &FieldElement) -> FieldElement {
        (&self).mul(other)
    }
}

impl Neg for &FieldElement {
    type Output = FieldElement;

    fn neg(self) -> FieldElement {
        let value = self.value.neg_mod(&MODULUS);
        FieldElement { value }
    }
}

impl Neg for FieldElement {
    type Output = FieldElement;

    fn neg(self) -> FieldElement {
        (&self).neg()
    }
}

/// Division as multiplication by the inverse.
pub trait Div<Rhs = Self> {
    /// The division output.
    type Output;

    /// Divide this element by the given one.
    fn div(self, rhs: Rhs) -> Self::Output;
}

impl Div<&FieldElement> for &FieldElement {
    type Output = Result<FieldElement, FieldError>;

    fn div(self, other: &FieldElement) -> Result<FieldElement, FieldError> {
        let inverse = other.inv()?;
        Ok(self * &inverse)
    }
}
