//! Polynomials over the field.

use crate::modular::FieldElement;

/// A polynomial with field element coefficients, lowest degree first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Polynomial {
    coefficients: Vec<FieldElement>,
}

impl Polynomial {
    /// Creates a polynomial from its coefficients, lowest degree first.
    pub fn new(coefficients: Vec<FieldElement>) -> Self {
        Self { coefficients }
    }

    /// Appends the next highest degree coefficient.
    pub fn add_coefficient(&mut self, coefficient: FieldElement) {
        self.coefficients.push(coefficient);
    }

    /// The coefficients of this polynomial, lowest degree first.
    pub fn coefficients(&self) -> &[FieldElement] {
        &self.coefficients
    }

    /// Evaluates the polynomial at the given point using Horner's rule.
    pub fn eval_at(&self, x: &FieldElement) -> FieldElement {
        let mut result = FieldElement::ZERO;
        for coefficient in self.coefficients.iter().rev() {
            result = result * x + coefficient;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 42)]
    #[case(1, 52)]
    #[case(2, 74)]
    #[case(10, 742)]
    fn evaluation(#[case] x: u32, #[case] expected: u64) {
        // f(z) = 42 + 7z + 3z^2
        let polynomial = Polynomial::new(vec![
            FieldElement::from_u64(42),
            FieldElement::from_u64(7),
            FieldElement::from_u64(3),
        ]);
        assert_eq!(polynomial.eval_at(&FieldElement::from_u32(x)), FieldElement::from_u64(expected));
    }

    #[test]
    fn empty_polynomial_is_zero() {
        assert_eq!(Polynomial::default().eval_at(&FieldElement::from_u32(5)), FieldElement::ZERO);
    }

    #[test]
    fn constant_term_is_eval_at_zero() {
        let mut polynomial = Polynomial::default();
        polynomial.add_coefficient(FieldElement::from_u64(1234));
        polynomial.add_coefficient(FieldElement::gen_random());
        assert_eq!(polynomial.eval_at(&FieldElement::ZERO), FieldElement::from_u64(1234));
    }
}
