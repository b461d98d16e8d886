//! Reaction quotient

use crate::species::{Side, Species, SpeciesMap, StoichiometricCoefficients};
use equation::{Equation, Operation, Precision};

/// Numerator and denominator of the mass-action ratio
///
/// The numerator is the product of product concentrations and the
/// denominator that of reactant concentrations, each raised to its
/// stoichiometric coefficient. A side without any species contributes 1.
pub(crate) fn mass_action_terms<S: Species>(
    concentrations: &SpeciesMap<S, Precision>,
    coefficients: &StoichiometricCoefficients<S>,
) -> (Precision, Precision) {
    coefficients
        .iter()
        .fold((1.0, 1.0), |(products, reactants), (species, coefficient)| {
            let term = concentrations[species].powi(coefficient as i32);
            match species.side() {
                Side::Product => (products * term, reactants),
                Side::Reactant => (products, reactants * term),
            }
        })
}

/// Reaction quotient Q of a set of concentrations
///
/// Q is defined as zero when the reactant term is zero, so that curves
/// derived from it stay finite.
pub fn reaction_quotient<S: Species>(
    concentrations: &SpeciesMap<S, Precision>,
    coefficients: &StoichiometricCoefficients<S>,
) -> Precision {
    let (products, reactants) = mass_action_terms(concentrations, coefficients);
    if reactants == 0.0 {
        0.0
    } else {
        products / reactants
    }
}

/// Reaction quotient Q(x) of concentrations which are functions of x
pub fn quotient_equation<S: Species>(
    concentrations: &SpeciesMap<S, Equation>,
    coefficients: &StoichiometricCoefficients<S>,
) -> Equation {
    let side_term = |side: Side| {
        coefficients
            .iter()
            .filter(|(species, _)| species.side() == side)
            .map(|(species, coefficient)| {
                Equation::power(concentrations[species].clone(), coefficient)
            })
            .reduce(|acc, term| Equation::combine(acc, Operation::Product, term))
            .unwrap_or(Equation::Constant(1.0))
    };
    let products = side_term(Side::Product);
    let reactants = side_term(Side::Reactant);
    if reactants == Equation::Constant(1.0) {
        return products;
    }
    Equation::combine(products, Operation::Quotient, reactants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::{AqueousSpecies, DissolvedSpecies};
    use approx::assert_relative_eq;
    use equation::{Evaluate, Linear, Point};

    type AqueousMap<T> = SpeciesMap<AqueousSpecies, T>;

    #[test]
    fn aqueous_quotient() {
        let coefficients = StoichiometricCoefficients::from_slice(&[2, 1, 1, 3]).unwrap();
        let concentrations = AqueousMap::from_slice(&[0.5, 0.2, 0.3, 0.4]).unwrap();
        let expected = 0.3 * 0.4f64.powi(3) / (0.5f64.powi(2) * 0.2);
        assert_relative_eq!(reaction_quotient(&concentrations, &coefficients), expected);
    }

    #[test]
    fn zero_denominator_means_zero() {
        let coefficients = StoichiometricCoefficients::unit();
        let concentrations = AqueousMap::from_slice(&[0.0, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(reaction_quotient(&concentrations, &coefficients), 0.0);
    }

    #[test]
    fn solubility_product() {
        // CaF2 <=> Ca2+ + 2 F-
        let coefficients = StoichiometricCoefficients::from_slice(&[1, 2]).unwrap();
        let concentrations = SpeciesMap::<DissolvedSpecies, _>::from_slice(&[0.1, 0.2]).unwrap();
        assert_relative_eq!(reaction_quotient(&concentrations, &coefficients), 0.004);
    }

    #[test]
    fn quotient_curve() {
        let coefficients = StoichiometricCoefficients::unit();
        let rising = Equation::from(Linear::new(1.0, Point::new(0.0, 0.0)));
        let falling = Equation::from(Linear::new(-1.0, Point::new(0.0, 1.0)));
        let concentrations = AqueousMap::from_fn(|species| {
            match species.side() {
                Side::Reactant => falling.clone(),
                Side::Product => rising.clone(),
            }
        });
        let q = quotient_equation(&concentrations, &coefficients);
        for x in [0.1, 0.25, 0.5, 0.75] {
            let sampled = concentrations.map(|_, eq| eq.evaluate(x));
            assert_relative_eq!(
                q.evaluate(x),
                reaction_quotient(&sampled, &coefficients),
                max_relative = 1e-12
            );
        }
        assert_eq!(q.evaluate(1.0), 0.0);
    }

    #[test]
    fn tiny_concentrations_keep_their_quotient() {
        let coefficients = StoichiometricCoefficients::from_slice(&[1, 2, 2, 1]).unwrap();
        let rising = Equation::from(Linear::new(1e-6, Point::new(0.0, 0.0)));
        let falling = Equation::from(Linear::new(-1e-6, Point::new(0.0, 1e-6)));
        let concentrations = AqueousMap::from_fn(|species| match species.side() {
            Side::Reactant => falling.clone(),
            Side::Product => rising.clone(),
        });
        let q = quotient_equation(&concentrations, &coefficients);
        for x in [0.1, 0.25, 0.5, 0.75] {
            let sampled = concentrations.map(|_, eq| eq.evaluate(x));
            let expected = reaction_quotient(&sampled, &coefficients);
            assert!(expected > 0.0);
            assert_relative_eq!(q.evaluate(x), expected, max_relative = 1e-12);
        }

        // Silver chloride at equilibrium
        let coefficients = StoichiometricCoefficients::unit();
        let ions =
            SpeciesMap::<DissolvedSpecies, _>::from_fn(|_| Equation::from(1.8e-10f64.sqrt()));
        let q = quotient_equation(&ions, &coefficients);
        assert_relative_eq!(q.evaluate(0.0), 1.8e-10, max_relative = 1e-12);
    }

    #[test]
    fn quotient_curve_without_reactants() {
        let coefficients = StoichiometricCoefficients::from_slice(&[1, 2]).unwrap();
        let concentrations = SpeciesMap::<DissolvedSpecies, _>::from_fn(|_| {
            Equation::from(Linear::new(0.5, Point::new(0.0, 0.0)))
        });
        let q = quotient_equation(&concentrations, &coefficients);
        assert!(!matches!(
            q,
            Equation::Combine {
                operation: Operation::Quotient,
                ..
            }
        ));
        assert_relative_eq!(q.evaluate(2.0), 1.0);
        assert_eq!(
            quotient_equation(
                &SpeciesMap::<DissolvedSpecies, _>::from_fn(|_| Equation::Constant(0.5)),
                &coefficients
            ),
            Equation::Constant(0.125)
        );
    }
}
