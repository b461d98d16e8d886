//! Data formats used to store sampled reaction curves

pub mod csv;

use equation::Precision;
use serde::{Deserialize, Serialize};

/// One sample of a kinetics curve
#[derive(Copy, Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct KineticsSample {
    /// Time since the reaction started
    pub time: Precision,

    /// Reactant concentration
    pub concentration: Precision,

    /// Reaction rate
    pub rate: Precision,
}
//
impl KineticsSample {
    /// Column names, in serialization order
    pub const HEADER: [&'static str; 3] = ["time", "concentration", "rate"];
}

/// Cell of a table whose columns are only known at run time
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Time, concentration or quotient
    Real(Precision),

    /// Number of molecules
    Count(usize),
}

/// Column names of an equilibrium table
///
/// Rows hold the time, the concentration of each species, the reaction
/// quotient and, if a grid is simulated, the visible molecule count of each
/// species.
pub fn equilibrium_header(species: &[&str], molecules: bool) -> Vec<String> {
    let mut header = vec!["time".to_owned()];
    header.extend(species.iter().map(|name| format!("[{name}]")));
    header.push("quotient".to_owned());
    if molecules {
        header.extend(species.iter().map(|name| format!("{name} molecules")));
    }
    header
}
