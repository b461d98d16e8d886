//! Reconciliation of continuous concentrations with discrete molecule counts
//!
//! Each species owns an ordered list of grid positions, of which it draws a
//! time-dependent prefix. During a transition, a species that loses
//! molecules stops drawing the tail of its list, while a species that gains
//! molecules draws more of a longer list. Positions that one species gives
//! up may be handed over to another species, and the handover is scheduled
//! so that the receiving species only draws a position once the giving
//! species has stopped drawing it.
//!
//! All species follow the same convergence-shaped progress curve, which
//! goes from 0 at the start of the transition to 1 at its end with a zero
//! slope there. If `p(t)` is this progress, a species that goes from `a` to
//! `b` molecules draws `floor(a + (b - a) p(t))` of them.

use crate::{GridCoordinate, GridError, GridPool};
use equation::{Equation, Evaluate, Point, Precision};
use log::{debug, trace, warn};
use std::{cmp::Ordering, collections::HashSet};

/// Tolerance applied before truncating a fraction to a molecule count
///
/// Fractions that should land exactly on an integer count can come out one
/// ulp short, which truncation would turn into a missing molecule.
const COUNT_TOLERANCE: Precision = 1e-9;

/// Positions currently held by a species, and how many it should end up with
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GridElementToBalance {
    /// Currently held positions, in drawing order
    coords: Vec<GridCoordinate>,

    /// Desired final number of positions
    target_count: usize,
}
//
impl GridElementToBalance {
    /// Set up from currently held positions and a target count
    pub fn new(coords: Vec<GridCoordinate>, target_count: usize) -> Result<Self, GridError> {
        let mut seen = HashSet::with_capacity(coords.len());
        for &coord in &coords {
            if !seen.insert(coord) {
                return Err(GridError::DuplicateCoordinate(coord));
            }
        }
        Ok(Self {
            coords,
            target_count,
        })
    }

    /// Set up from currently held positions and a final fraction of the grid
    pub fn from_fraction(
        coords: Vec<GridCoordinate>,
        final_fraction: Precision,
        pool: &GridPool,
    ) -> Result<Self, GridError> {
        Self::new(coords, pool.count_for_fraction(final_fraction)?)
    }

    /// Currently held positions
    pub fn coords(&self) -> &[GridCoordinate] {
        &self.coords
    }

    /// Desired final number of positions
    pub fn target_count(&self) -> usize {
        self.target_count
    }
}

/// Result of balancing one species
#[derive(Clone, Debug, PartialEq)]
pub struct BalancedGridElement {
    /// Every position the species draws during the transition, in order
    coords: Vec<GridCoordinate>,

    /// Number of positions drawn before the transition
    initial_count: usize,

    /// Number of positions drawn after the transition
    final_count: usize,

    /// Fraction of `coords` to draw as a function of time
    fraction: Equation,
}
//
impl BalancedGridElement {
    /// Every position the species draws during the transition, in order
    ///
    /// The species draws a prefix of this list, see [`Self::visible_count`].
    pub fn coords(&self) -> &[GridCoordinate] {
        &self.coords
    }

    /// Positions drawn once the transition is over
    ///
    /// Feed these back into a [`GridElementToBalance`] to chain transitions.
    pub fn final_coords(&self) -> &[GridCoordinate] {
        &self.coords[..self.final_count]
    }

    /// Positions drawn before the transition starts
    pub fn initial_coords(&self) -> &[GridCoordinate] {
        &self.coords[..self.initial_count]
    }

    /// Fraction of `coords` that is drawn before the transition
    pub fn initial_fraction(&self) -> Precision {
        fraction(self.initial_count, self.coords.len())
    }

    /// Fraction of `coords` that is drawn after the transition
    pub fn final_fraction(&self) -> Precision {
        fraction(self.final_count, self.coords.len())
    }

    /// Fraction of `coords` to draw at any point in time
    pub fn fraction_to_draw(&self) -> &Equation {
        &self.fraction
    }

    /// Number of positions to draw at time `t`
    pub fn visible_count(&self, time: Precision) -> usize {
        let len = self.coords.len();
        let scaled = self.fraction.evaluate(time) * len as Precision + COUNT_TOLERANCE;
        (scaled.floor().max(0.0) as usize).min(len)
    }

    /// Positions to draw at time `t`
    pub fn visible_coords(&self, time: Precision) -> &[GridCoordinate] {
        &self.coords[..self.visible_count(time)]
    }
}

/// Result of balancing all species of a grid
#[derive(Clone, Debug, PartialEq)]
pub struct GridBalance {
    /// One balanced element per input element, in input order
    elements: Vec<BalancedGridElement>,

    /// Truth that some target counts had to be reduced to fit the grid
    count_clamped: bool,
}
//
impl GridBalance {
    /// Balanced elements, in the order of the input elements
    pub fn elements(&self) -> &[BalancedGridElement] {
        &self.elements
    }

    /// Extract the balanced elements
    pub fn into_elements(self) -> Vec<BalancedGridElement> {
        self.elements
    }

    /// Truth that some target counts were reduced because the grid is full
    pub fn count_clamped(&self) -> bool {
        self.count_clamped
    }
}

/// Balancer for one transition of the grid, over a certain time window
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridBalancer {
    /// Time at which molecules start to move
    start_time: Precision,

    /// Time at which molecule counts reach their targets
    end_time: Precision,
}
//
impl GridBalancer {
    /// Set up a balancer for a transition over `[start_time, end_time]`
    pub fn new(start_time: Precision, end_time: Precision) -> Result<Self, GridError> {
        if !(start_time < end_time) {
            return Err(GridError::InvalidTimeWindow {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }

    /// Balance the positions of several species sharing a pool
    ///
    /// Species whose target exceeds their current count take positions
    /// from the unused part of the pool first, in pool order, then from
    /// the species whose count decreases. If the targets do not fit in the
    /// pool, the targets of growing species are reduced, last species
    /// first, and the result reports that counts were clamped.
    pub fn balance(
        &self,
        pool: &GridPool,
        elements: &[GridElementToBalance],
    ) -> Result<GridBalance, GridError> {
        // Check that the current assignment is consistent with the pool
        let mut used = HashSet::new();
        for element in elements {
            for &coord in &element.coords {
                if !pool.contains(coord) {
                    return Err(GridError::UnknownCoordinate(coord));
                }
                if !used.insert(coord) {
                    return Err(GridError::OverlappingCoordinate(coord));
                }
            }
        }

        // Make the targets fit into the pool
        let (targets, count_clamped) = clamp_targets(pool.capacity(), elements);
        if count_clamped {
            warn!(
                "Molecule targets {:?} exceed grid capacity {}, clamped to {targets:?}",
                elements.iter().map(|e| e.target_count).collect::<Vec<_>>(),
                pool.capacity()
            );
        }

        // Positions that growing species may take over, in the order where
        // they become available: unused positions first, then positions
        // given up by shrinking species.
        let mut candidates = pool
            .ordering()
            .iter()
            .filter(|coord| !used.contains(*coord))
            .map(|&coord| Candidate {
                coord,
                release: Ratio::ZERO,
            })
            .collect::<Vec<_>>();
        for (element, &target) in elements.iter().zip(&targets) {
            let held = element.coords.len();
            if target < held {
                let loss = held - target;
                // The k-th position to disappear is the k-th from the end,
                // and it is gone as soon as progress exceeds (k - 1) / loss
                candidates.extend((1..=loss).map(|k| Candidate {
                    coord: element.coords[held - k],
                    release: Ratio::new(k - 1, loss),
                }));
            }
        }
        candidates.sort_by(|a, b| a.release.cmp(&b.release));

        // New positions of growing species, in the order where they appear.
        // The j-th new position of a species gaining `gain` molecules is
        // drawn once progress reaches j / gain.
        let mut slots = elements
            .iter()
            .zip(&targets)
            .enumerate()
            .filter(|(_, (element, target))| **target > element.coords.len())
            .flat_map(|(idx, (element, &target))| {
                let gain = target - element.coords.len();
                (1..=gain).map(move |j| Slot {
                    element: idx,
                    appear: Ratio::new(j, gain),
                })
            })
            .collect::<Vec<_>>();
        slots.sort_by(|a, b| a.appear.cmp(&b.appear));
        debug_assert!(slots.len() <= candidates.len());

        // Match positions to slots in order. Clamping guarantees that the
        // k-th earliest slot always finds a position which was released
        // strictly before it appears.
        let mut new_coords = vec![Vec::new(); elements.len()];
        for (slot, candidate) in slots.iter().zip(&candidates) {
            debug_assert!(candidate.release < slot.appear);
            trace!(
                "Species #{} takes over {:?} at progress {:?}",
                slot.element,
                candidate.coord,
                slot.appear
            );
            new_coords[slot.element].push(candidate.coord);
        }

        // Assemble the balanced elements
        let elements = elements
            .iter()
            .zip(targets)
            .zip(new_coords)
            .map(|((element, target), new_coords)| {
                let mut coords = element.coords.clone();
                coords.extend(new_coords);
                self.make_element(coords, element.coords.len(), target)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "Balanced grid molecule counts: {:?}",
            elements
                .iter()
                .map(|e| (e.initial_count, e.final_count))
                .collect::<Vec<_>>()
        );
        Ok(GridBalance {
            elements,
            count_clamped,
        })
    }

    /// Build a balanced element and its fraction-to-draw curve
    fn make_element(
        &self,
        coords: Vec<GridCoordinate>,
        initial_count: usize,
        final_count: usize,
    ) -> Result<BalancedGridElement, GridError> {
        let len = coords.len();
        let initial = fraction(initial_count, len);
        let end = fraction(final_count, len);
        let fraction = if initial == end {
            Equation::Constant(end)
        } else {
            Equation::switching(
                self.start_time,
                Equation::Constant(initial),
                Equation::convergence(
                    Point::new(self.start_time, initial),
                    Point::new(self.end_time, end),
                )?,
            )
        };
        Ok(BalancedGridElement {
            coords,
            initial_count,
            final_count,
            fraction,
        })
    }
}

/// Clamp target counts so that they all fit in the grid together
fn clamp_targets(capacity: usize, elements: &[GridElementToBalance]) -> (Vec<usize>, bool) {
    let mut clamped = false;
    let mut targets = elements
        .iter()
        .map(|element| {
            clamped |= element.target_count > capacity;
            element.target_count.min(capacity)
        })
        .collect::<Vec<_>>();

    // Current counts fit, so giving back growth always suffices
    let total = targets.iter().sum::<usize>();
    if total > capacity {
        clamped = true;
        let mut excess = total - capacity;
        for (target, element) in targets.iter_mut().zip(elements).rev() {
            let held = element.coords.len();
            if *target > held {
                let reduction = excess.min(*target - held);
                *target -= reduction;
                excess -= reduction;
            }
            if excess == 0 {
                break;
            }
        }
    }
    (targets, clamped)
}

/// Fraction of a list of positions, with empty lists drawing nothing
fn fraction(count: usize, len: usize) -> Precision {
    if len == 0 {
        0.0
    } else {
        count as Precision / len as Precision
    }
}

/// Position which a growing species may take over
#[derive(Copy, Clone, Debug)]
struct Candidate {
    /// Position
    coord: GridCoordinate,

    /// Progress after which the position is no longer drawn by its owner
    release: Ratio,
}

/// New position of a growing species
#[derive(Copy, Clone, Debug)]
struct Slot {
    /// Index of the growing species
    element: usize,

    /// Progress at which the position starts being drawn
    appear: Ratio,
}

/// Exact progress value `num / den`, compared without rounding
#[derive(Copy, Clone, Debug)]
struct Ratio {
    num: usize,
    den: usize,
}
//
impl Ratio {
    const ZERO: Self = Self { num: 0, den: 1 };

    fn new(num: usize, den: usize) -> Self {
        debug_assert!(den > 0);
        Self { num, den }
    }
}
//
impl PartialEq for Ratio {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
//
impl Eq for Ratio {}
//
impl PartialOrd for Ratio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
//
impl Ord for Ratio {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.num as u128 * other.den as u128;
        let rhs = other.num as u128 * self.den as u128;
        lhs.cmp(&rhs)
    }
}
