//! Lagrange interpolation at zero over the field.

use crate::{errors::InterpolationError, modular::FieldElement};
use std::collections::HashMap;

/// Precomputed Lagrange basis coefficients at zero for a fixed abscissa set.
#[derive(Debug, Clone)]
pub struct Lagrange {
    abscissas: Vec<u32>,

    /// Lagrange coefficients for evaluation at zero, keyed by abscissa.
    coefficients: HashMap<u32, FieldElement>,
}

impl Lagrange {
    /// Creates the basis for the given abscissas, O(n^2).
    pub fn new(abscissas: &[u32]) -> Result<Self, InterpolationError> {
        let mut coefficients = HashMap::with_capacity(abscissas.len());
        for (i, xi) in abscissas.iter().enumerate() {
            let mut numerator = FieldElement::ONE;
            let mut denominator = FieldElement::ONE;
            for (j, xj) in abscissas.iter().enumerate() {
                if i == j {
                    if abscissas.iter().skip(i.saturating_add(1)).any(|x| x == xi) {
                        return Err(InterpolationError::DuplicateAbscissa(*xi));
                    }
                    continue;
                }
                numerator = numerator * &-FieldElement::from_u32(*xj);
                denominator = denominator * &(FieldElement::from_u32(*xi) - &FieldElement::from_u32(*xj));
            }
            let denominator = denominator.inv().map_err(|_| InterpolationError::DuplicateAbscissa(*xi))?;
            coefficients.insert(*xi, numerator * &denominator);
        }
        Ok(Self { abscissas: abscissas.to_vec(), coefficients })
    }

    /// The abscissas this basis was built over.
    pub fn abscissas(&self) -> &[u32] {
        &self.abscissas
    }

    /// The basis coefficient at zero for the given abscissa.
    pub fn coefficient(&self, x: u32) -> Option<&FieldElement> {
        self.coefficients.get(&x)
    }

    /// Lagrange interpolation at zero, O(n).
    pub fn interpolate(&self, points: &[(u32, FieldElement)]) -> Result<FieldElement, InterpolationError> {
        if points.len() != self.abscissas.len() {
            return Err(InterpolationError::MismatchedAbscissas);
        }
        let mut result = FieldElement::ZERO;
        for (x, y) in points {
            let coefficient = self.coefficients.get(x).ok_or(InterpolationError::MismatchedAbscissas)?;
            result = result + &(*coefficient * y);
        }
        Ok(result)
    }

    /// Partial interpolation at zero, producing a single factor of the sum.
    pub fn partial(&self, x: u32, y: &FieldElement) -> Result<FieldElement, InterpolationError> {
        let coefficient = self.coefficients.get(&x).ok_or(InterpolationError::MismatchedAbscissas)?;
        Ok(*coefficient * y)
    }
}

/// Interpolates `f(0)` from an ad-hoc point set, O(n^2).
pub fn interpolate_at_zero(points: &[(u32, FieldElement)]) -> Result<FieldElement, InterpolationError> {
    let abscissas: Vec<u32> = points.iter().map(|(x, _)| *x).collect();
    let lagrange = Lagrange::new(&abscissas)?;
    lagrange.interpolate(points)
}
