//! Mapping validators to evaluation points.

use basic_types::ValidatorId;
use bimap::BiBTreeMap;

/// A type that deterministically maps a validator id to a share abscissa and
/// vice-versa, given all of the participants are known at construction time.
#[derive(Debug, Clone)]
pub struct ValidatorMapper {
    validator_abscissa: BiBTreeMap<ValidatorId, u32>,
}

impl ValidatorMapper {
    /// Constructs a mapper for the given validators.
    ///
    /// Validators are sorted before assignment so every node derives the
    /// same mapping from the same membership set.
    pub fn new(validators: Vec<ValidatorId>) -> Result<Self, TooManyValidators> {
        let mut validators = validators;
        validators.sort();
        validators.dedup();
        if validators.len() > crate::shamir::SHARE_COUNT as usize {
            return Err(TooManyValidators);
        }

        let mut validator_abscissa = BiBTreeMap::new();
        for (index, validator) in validators.into_iter().enumerate() {
            // Abscissa 0 would hold the secret itself, skip it.
            let abscissa = (index as u32).saturating_add(1);
            validator_abscissa.insert(validator, abscissa);
        }
        Ok(Self { validator_abscissa })
    }

    /// Gets the abscissa for a validator.
    pub fn abscissa(&self, validator: &ValidatorId) -> Option<u32> {
        self.validator_abscissa.get_by_left(validator).copied()
    }

    /// Gets the validator for an abscissa.
    pub fn validator(&self, abscissa: u32) -> Option<&ValidatorId> {
        self.validator_abscissa.get_by_right(&abscissa)
    }

    /// Gets all the validator ids, sorted in ascending order.
    pub fn validators(&self) -> impl Iterator<Item = &ValidatorId> {
        self.validator_abscissa.left_values()
    }

    /// Gets all the abscissas, sorted in ascending order.
    pub fn abscissas(&self) -> impl Iterator<Item = u32> + '_ {
        self.validator_abscissa.right_values().copied()
    }

    /// The total number of validators.
    pub fn validator_count(&self) -> usize {
        self.validator_abscissa.len()
    }
}

/// More validators were provided than there are share positions.
#[derive(Debug, thiserror::Error)]
#[error("too many validators")]
pub struct TooManyValidators;
