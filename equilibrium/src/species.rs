//! Chemical species taking part in an equilibrium

use crate::EquilibriumError;
use equation::{Precision, SNAP_EPSILON};
use std::{fmt::Debug, hash::Hash, marker::PhantomData, ops::Index};

/// Side of the reaction equation on which a species appears
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Side {
    /// Consumed by the forward reaction
    Reactant,

    /// Produced by the forward reaction
    Product,
}

/// Closed set of species roles taking part in a reaction
///
/// Implementations are small enums whose variants are listed in `ALL`, in
/// the order given by `index()`.
pub trait Species: Copy + Debug + Eq + Hash + 'static {
    /// Every role, in index order
    const ALL: &'static [Self];

    /// Position of this role within `ALL`
    fn index(self) -> usize;

    /// Side of the reaction equation where this role appears
    fn side(self) -> Side;

    /// Short human-readable name
    fn name(self) -> &'static str;
}

/// Species of an `aA + bB <=> cC + dD` reaction in solution
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum AqueousSpecies {
    A,
    B,
    C,
    D,
}
//
impl Species for AqueousSpecies {
    const ALL: &'static [Self] = &[Self::A, Self::B, Self::C, Self::D];

    fn index(self) -> usize {
        self as usize
    }

    fn side(self) -> Side {
        match self {
            Self::A | Self::B => Side::Reactant,
            Self::C | Self::D => Side::Product,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

/// Ions released by a dissolving solid, `AB(s) <=> aA + bB`
///
/// The solid itself does not appear in the reaction quotient, so both roles
/// are products and the quotient is the solubility product.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum DissolvedSpecies {
    Primary,
    Secondary,
}
//
impl Species for DissolvedSpecies {
    const ALL: &'static [Self] = &[Self::Primary, Self::Secondary];

    fn index(self) -> usize {
        self as usize
    }

    fn side(self) -> Side {
        Side::Product
    }

    fn name(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// One value for every role of a species set
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesMap<S: Species, T> {
    values: Vec<T>,
    species: PhantomData<S>,
}
//
impl<S: Species, T> SpeciesMap<S, T> {
    /// Compute the value associated with each role
    pub fn from_fn(f: impl FnMut(S) -> T) -> Self {
        Self {
            values: S::ALL.iter().copied().map(f).collect(),
            species: PhantomData,
        }
    }

    /// Fallible version of `from_fn`
    pub fn try_from_fn<E>(f: impl FnMut(S) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            values: S::ALL.iter().copied().map(f).collect::<Result<_, E>>()?,
            species: PhantomData,
        })
    }

    /// Iterate over (role, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (S, &T)> + '_ {
        S::ALL.iter().copied().zip(&self.values)
    }

    /// Iterate over values, in role order
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.values.iter()
    }

    /// Transform every value
    pub fn map<U>(&self, mut f: impl FnMut(S, &T) -> U) -> SpeciesMap<S, U> {
        SpeciesMap::from_fn(|species| f(species, &self[species]))
    }
}
//
impl<S: Species, T> TryFrom<Vec<T>> for SpeciesMap<S, T> {
    type Error = EquilibriumError;

    fn try_from(values: Vec<T>) -> Result<Self, EquilibriumError> {
        if values.len() != S::ALL.len() {
            return Err(EquilibriumError::WrongSpeciesCount {
                expected: S::ALL.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            values,
            species: PhantomData,
        })
    }
}
//
impl<S: Species, T: Clone> SpeciesMap<S, T> {
    /// Build from a slice listing one value per role, in role order
    pub fn from_slice(values: &[T]) -> Result<Self, EquilibriumError> {
        Self::try_from(values.to_vec())
    }
}
//
impl<S: Species, T> Index<S> for SpeciesMap<S, T> {
    type Output = T;

    fn index(&self, species: S) -> &T {
        &self.values[species.index()]
    }
}

/// Stoichiometric coefficient of every species of a reaction
#[derive(Clone, Debug, PartialEq)]
pub struct StoichiometricCoefficients<S: Species>(SpeciesMap<S, u32>);
//
impl<S: Species> StoichiometricCoefficients<S> {
    /// Validate a set of coefficients, which must all be at least 1
    pub fn new(coefficients: SpeciesMap<S, u32>) -> Result<Self, EquilibriumError> {
        for (species, &coefficient) in coefficients.iter() {
            if coefficient == 0 {
                return Err(EquilibriumError::InvalidCoefficient {
                    species: species.name(),
                    coefficient,
                });
            }
        }
        Ok(Self(coefficients))
    }

    /// Coefficients listed in role order
    pub fn from_slice(coefficients: &[u32]) -> Result<Self, EquilibriumError> {
        Self::new(SpeciesMap::from_slice(coefficients)?)
    }

    /// Every coefficient set to 1
    pub fn unit() -> Self {
        Self(SpeciesMap::from_fn(|_| 1))
    }

    /// Coefficient of a species
    pub fn get(&self, species: S) -> u32 {
        self.0[species]
    }

    /// Iterate over (species, coefficient) pairs
    pub fn iter(&self) -> impl Iterator<Item = (S, u32)> + '_ {
        self.0.iter().map(|(species, &coefficient)| (species, coefficient))
    }

    /// Truth that every coefficient is 1
    pub fn all_unit(&self) -> bool {
        self.0.values().all(|&coefficient| coefficient == 1)
    }
}

/// Concentration of every species of a reaction
///
/// Concentrations are never negative. Values that only went negative due to
/// rounding are snapped back to zero on construction.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesConcentrations<S: Species>(SpeciesMap<S, Precision>);
//
impl<S: Species> SpeciesConcentrations<S> {
    /// Validate a set of concentrations
    pub fn new(concentrations: SpeciesMap<S, Precision>) -> Result<Self, EquilibriumError> {
        let concentrations = concentrations.map(|_, &value| {
            // Rounding residue around concentrations of order one
            if value < 0.0 && value > -SNAP_EPSILON {
                0.0
            } else {
                value
            }
        });
        for (species, &value) in concentrations.iter() {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(EquilibriumError::InvalidConcentration {
                    species: species.name(),
                    value,
                });
            }
        }
        Ok(Self(concentrations))
    }

    /// Concentrations listed in role order
    pub fn from_slice(concentrations: &[Precision]) -> Result<Self, EquilibriumError> {
        Self::new(SpeciesMap::from_slice(concentrations)?)
    }

    /// Concentration of a species
    pub fn get(&self, species: S) -> Precision {
        self.0[species]
    }

    /// Underlying map
    pub fn as_map(&self) -> &SpeciesMap<S, Precision> {
        &self.0
    }
}
//
impl<S: Species> Index<S> for SpeciesConcentrations<S> {
    type Output = Precision;

    fn index(&self, species: S) -> &Precision {
        &self.0[species]
    }
}
