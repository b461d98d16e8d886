//! Discrete "molecule" grid
//!
//! Visualizations represent concentrations as a number of molecules drawn on
//! a grid of bounded capacity. This crate tracks which grid positions belong
//! to which chemical species, and moves positions between species so that
//! molecule counts follow the continuous model without two species ever
//! being drawn at the same place.

pub mod balancer;

pub use balancer::{BalancedGridElement, GridBalance, GridBalancer, GridElementToBalance};

use equation::{EquationError, Precision};
use rand::{seq::SliceRandom, Rng};
use std::collections::HashSet;
use thiserror::Error;

/// Position of a molecule on the grid
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct GridCoordinate {
    /// Column index
    pub col: usize,

    /// Row index
    pub row: usize,
}
//
impl GridCoordinate {
    /// Build a coordinate
    pub const fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }
}

/// Errors that can occur while manipulating grid positions
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GridError {
    /// A coordinate was listed twice where a set was expected
    #[error("coordinate {0:?} appears more than once")]
    DuplicateCoordinate(GridCoordinate),

    /// A coordinate is not part of the position pool
    #[error("coordinate {0:?} is not part of the grid")]
    UnknownCoordinate(GridCoordinate),

    /// Two species claim the same coordinate
    #[error("coordinate {0:?} is held by more than one species")]
    OverlappingCoordinate(GridCoordinate),

    /// A fraction is negative or not finite
    #[error("fraction {0} is not a valid fraction of the grid")]
    InvalidFraction(Precision),

    /// A fraction-to-draw curve could not be built
    #[error(transparent)]
    Curve(#[from] EquationError),

    /// The transition window is empty or reversed
    #[error("transition must end after it starts (start {start}, end {end})")]
    InvalidTimeWindow { start: Precision, end: Precision },
}

/// Shared pool of grid positions, in a caller-chosen (usually shuffled) order
///
/// When a species needs new positions and none can be taken over from
/// another species, they are picked from this ordering, first unused
/// position first. Using a fixed ordering makes the visual assignment
/// reproducible.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GridPool {
    /// All positions, in selection order
    ordering: Vec<GridCoordinate>,

    /// Same positions, for membership queries
    members: HashSet<GridCoordinate>,
}
//
impl GridPool {
    /// Build a pool from an ordering of distinct positions
    pub fn from_shuffled(ordering: Vec<GridCoordinate>) -> Result<Self, GridError> {
        let mut members = HashSet::with_capacity(ordering.len());
        for &coord in &ordering {
            if !members.insert(coord) {
                return Err(GridError::DuplicateCoordinate(coord));
            }
        }
        Ok(Self { ordering, members })
    }

    /// Shuffle every position of a `cols` x `rows` grid
    pub fn shuffled(cols: usize, rows: usize, rng: &mut impl Rng) -> Self {
        let mut ordering = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| GridCoordinate::new(col, row)))
            .collect::<Vec<_>>();
        ordering.shuffle(rng);
        let members = ordering.iter().copied().collect();
        Self { ordering, members }
    }

    /// Maximal number of molecules that can be drawn simultaneously
    pub fn capacity(&self) -> usize {
        self.ordering.len()
    }

    /// Positions in selection order
    pub fn ordering(&self) -> &[GridCoordinate] {
        &self.ordering
    }

    /// Truth that a position belongs to the pool
    pub fn contains(&self, coord: GridCoordinate) -> bool {
        self.members.contains(&coord)
    }

    /// Number of molecules that represent a fraction of the grid
    pub fn count_for_fraction(&self, fraction: Precision) -> Result<usize, GridError> {
        if !(fraction >= 0.0 && fraction.is_finite()) {
            return Err(GridError::InvalidFraction(fraction));
        }
        Ok((fraction * self.capacity() as Precision).round() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn shuffled_pool_covers_the_grid() {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = GridPool::shuffled(5, 6, &mut rng);
        assert_eq!(pool.capacity(), 30);
        let distinct = pool.ordering().iter().collect::<HashSet<_>>();
        assert_eq!(distinct.len(), 30);
        assert!(pool.contains(GridCoordinate::new(4, 5)));
        assert!(!pool.contains(GridCoordinate::new(5, 0)));
    }

    #[test]
    fn same_seed_same_ordering() {
        let a = GridPool::shuffled(10, 10, &mut StdRng::seed_from_u64(7));
        let b = GridPool::shuffled(10, 10, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn duplicates_are_rejected() {
        let coord = GridCoordinate::new(1, 1);
        assert_eq!(
            GridPool::from_shuffled(vec![coord, GridCoordinate::new(0, 0), coord]),
            Err(GridError::DuplicateCoordinate(coord))
        );
    }

    #[test]
    fn fraction_counts() {
        let pool = GridPool::shuffled(10, 3, &mut StdRng::seed_from_u64(0));
        assert_eq!(pool.count_for_fraction(0.5), Ok(15));
        assert_eq!(pool.count_for_fraction(0.0), Ok(0));
        assert_eq!(pool.count_for_fraction(0.81), Ok(24));
        assert_eq!(
            pool.count_for_fraction(-0.1),
            Err(GridError::InvalidFraction(-0.1))
        );
    }
}
