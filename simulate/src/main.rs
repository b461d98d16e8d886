use clap::{Parser, Subcommand, ValueEnum};
use data::{
    csv::{self, Reader, Writer},
    equilibrium_header, KineticsSample, Value,
};
use equation::{ConcentrationEquation, Evaluate, Point, Precision, ReactionOrder};
use equilibrium::{
    balance_leg, initial_molecules, AqueousSpecies, DissolvedSpecies, EquilibriumLeg,
    MoleculeGrid, Species, SpeciesConcentrations, StoichiometricCoefficients, TimeWindow,
};
use eyre::{bail, Result, WrapErr};
use grid::GridPool;
use indicatif::ProgressIterator;
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use ui::SamplingArgs;

/// Sample chemical reaction curves into CSV files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Concentration and rate of a reaction of order 0, 1 or 2
    Kinetics(KineticsArgs),

    /// Concentrations, reaction quotient and molecule counts of a reaction
    /// converging to equilibrium
    Equilibrium(EquilibriumArgs),

    /// Rate law fitted to the first and last samples of a kinetics file
    Fit(FitArgs),
}

#[derive(clap::Args, Debug)]
struct KineticsArgs {
    /// Reaction order
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=2))]
    order: u8,

    /// Initial reactant concentration
    #[arg(short, long, default_value_t = 1.0)]
    initial: Precision,

    /// Rate constant
    #[arg(short, long, default_value_t = 0.1)]
    rate: Precision,

    /// Time at which sampling stops
    #[arg(short, long, default_value_t = 20.0)]
    end: Precision,

    /// Sampling and output configuration
    #[command(flatten)]
    sampling: SamplingArgs,
}

#[derive(clap::Args, Debug)]
struct FitArgs {
    /// Kinetics file, as written by the kinetics subcommand
    input: PathBuf,

    /// Reaction order
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=2))]
    order: u8,
}

/// Kind of equilibrium to be simulated
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Reaction {
    /// aA + bB <=> cC + dD in solution
    Aqueous,

    /// Solid dissolving into two ions
    Dissolution,
}

#[derive(clap::Args, Debug)]
struct EquilibriumArgs {
    /// Kind of reaction
    #[arg(long, value_enum, default_value_t = Reaction::Aqueous)]
    reaction: Reaction,

    /// Stoichiometric coefficients, one per species (defaults to all 1)
    #[arg(short, long, value_delimiter = ',')]
    coefficients: Option<Vec<u32>>,

    /// Equilibrium constant
    #[arg(short = 'k', long, default_value_t = 1.0)]
    constant: Precision,

    /// Initial concentrations, one per species
    #[arg(short, long, value_delimiter = ',', required = true)]
    initial: Vec<Precision>,

    /// Time at which the reaction starts
    #[arg(short, long, default_value_t = 0.0)]
    start: Precision,

    /// Time at which equilibrium is reached
    #[arg(short, long, default_value_t = 20.0)]
    end: Precision,

    /// Equilibrium constant of a second leg, starting at the end of the first
    #[arg(long)]
    next_constant: Option<Precision>,

    /// Time at which the second leg reaches equilibrium (defaults to a leg
    /// as long as the first one)
    #[arg(long, requires = "next_constant")]
    next_end: Option<Precision>,

    /// Number of columns of the molecule grid
    #[arg(long, requires = "grid_rows")]
    grid_cols: Option<usize>,

    /// Number of rows of the molecule grid
    #[arg(long, requires = "grid_cols")]
    grid_rows: Option<usize>,

    /// Seed of the molecule placement on the grid
    #[arg(long, env = "SIMULATE_SEED", default_value_t = 42)]
    seed: u64,

    /// Sampling and output configuration
    #[command(flatten)]
    sampling: SamplingArgs,
}

fn main() -> Result<()> {
    // Enable logging to stderr
    ui::init_logging();

    // Parse CLI arguments and run the requested simulation
    match Args::parse().command {
        Command::Kinetics(args) => run_kinetics(args),
        Command::Fit(args) => run_fit(args),
        Command::Equilibrium(args) => match args.reaction {
            Reaction::Aqueous => run_equilibrium::<AqueousSpecies>(args),
            Reaction::Dissolution => run_equilibrium::<DissolvedSpecies>(args),
        },
    }
}

/// Sample a kinetics curve
fn run_kinetics(args: KineticsArgs) -> Result<()> {
    // Set up the concentration law
    let order = ReactionOrder::try_from(args.order)?;
    let kinetics = ConcentrationEquation::new(order, args.initial, args.rate)?;
    info!(
        "Reaction of order {} has a half-life of {}",
        args.order,
        kinetics.half_life()
    );

    // Set up the output file
    let file_name = args.sampling.output_path("kinetics");
    let mut writer = Writer::create(
        csv::Config {
            file_name: file_name.clone(),
            ..Default::default()
        },
        KineticsSample::HEADER,
    )
    .wrap_err_with(|| format!("Failed to create {}", file_name.display()))?;

    // Sample the curve
    let times = args.sampling.times(0.0, args.end);
    let progress = ui::init_progress_reporting("Sampling kinetics", times.len());
    for time in times.into_iter().progress_with(progress) {
        writer.write(KineticsSample {
            time,
            concentration: kinetics.concentration(time),
            rate: kinetics.rate(time),
        })?;
    }

    // Make sure output data is written correctly
    info!("Wrote {} samples to {}", writer.num_rows(), file_name.display());
    writer.close()?;
    Ok(())
}

/// Recover the rate law behind a kinetics file
fn run_fit(args: FitArgs) -> Result<()> {
    let order = ReactionOrder::try_from(args.order)?;
    let reader = Reader::<KineticsSample>::open(csv::Config {
        file_name: args.input.clone(),
        ..Default::default()
    })
    .wrap_err_with(|| format!("Failed to open {}", args.input.display()))?;
    let header = reader.header().collect::<Vec<_>>();
    if header != KineticsSample::HEADER {
        bail!(
            "{} has columns {header:?}, expected {:?}",
            args.input.display(),
            KineticsSample::HEADER
        );
    }
    let samples = reader.collect::<csv::Result<Vec<_>>>()?;

    // Logarithm and reciprocal based laws need positive concentrations
    let usable = samples
        .iter()
        .filter(|sample| order == ReactionOrder::Zero || sample.concentration > 0.0)
        .map(|sample| Point::new(sample.time, sample.concentration))
        .collect::<Vec<_>>();
    let (Some(&first), Some(&last)) = (usable.first(), usable.last()) else {
        bail!("{} has no usable sample", args.input.display());
    };
    let kinetics = ConcentrationEquation::from_samples(order, first, last)
        .wrap_err("Failed to fit a rate law")?;

    // Report how well the other samples follow the fitted law
    let max_deviation = usable
        .iter()
        .map(|point| (kinetics.concentration(point.x) - point.y).abs())
        .fold(0.0, Precision::max);
    info!(
        "Fitted {} samples, largest concentration deviation is {max_deviation}",
        usable.len()
    );
    println!(
        "initial concentration {}, rate constant {}, half-life {}",
        kinetics.initial_value(),
        kinetics.rate_constant(),
        kinetics.half_life()
    );
    Ok(())
}

/// Sample one or two equilibrium legs, and the matching molecule grids
fn run_equilibrium<S: Species>(args: EquilibriumArgs) -> Result<()> {
    // Solve the first leg
    let coefficients = match &args.coefficients {
        Some(coefficients) => StoichiometricCoefficients::<S>::from_slice(coefficients)?,
        None => StoichiometricCoefficients::unit(),
    };
    let initial = SpeciesConcentrations::<S>::from_slice(&args.initial)?;
    let first = EquilibriumLeg::new(
        coefficients,
        args.constant,
        initial,
        TimeWindow::new(args.start, args.end)?,
    )
    .wrap_err("Failed to solve the equilibrium")?;
    log_leg(&first);

    // Solve the second leg, if any
    let second = match args.next_constant {
        Some(next_constant) => {
            let next_end = args.next_end.unwrap_or(2.0 * args.end - args.start);
            let next = EquilibriumLeg::chained(
                &first,
                next_constant,
                SpeciesConcentrations::new(first.concentrations_at(args.end))?,
                TimeWindow::new(args.end, next_end)?,
            )
            .wrap_err("Failed to solve the second equilibrium")?;
            log_leg(&next);
            Some(next)
        }
        None => None,
    };
    let legs = std::iter::once(&first)
        .chain(second.as_ref())
        .collect::<Vec<_>>();

    // The last leg carries the whole concentration history
    let history = second.as_ref().unwrap_or(&first);

    // Place molecules on the grid, if requested
    let mut grids = Vec::new();
    if let (Some(cols), Some(rows)) = (args.grid_cols, args.grid_rows) {
        let pool = GridPool::shuffled(cols, rows, &mut StdRng::seed_from_u64(args.seed));
        let mut held = initial_molecules(&first.concentrations_at(args.start), &pool)?;
        for &leg in &legs {
            let grid = balance_leg(leg, &pool, &held)?;
            if grid.count_clamped() {
                warn!("Some molecule counts were clamped to fit the {cols}x{rows} grid");
            }
            held = grid.final_coords();
            grids.push(grid);
        }
    }

    // Set up the output file
    let names = S::ALL.iter().map(|species| species.name()).collect::<Vec<_>>();
    let file_name = args.sampling.output_path("equilibrium");
    let mut writer = Writer::create(
        csv::Config {
            file_name: file_name.clone(),
            ..Default::default()
        },
        equilibrium_header(&names, !grids.is_empty()),
    )
    .wrap_err_with(|| format!("Failed to create {}", file_name.display()))?;

    let quotient = history.quotient_equation();
    let end = history.window().equilibrium();

    // Sample the curves
    let times = args.sampling.times(args.start, end);
    let progress = ui::init_progress_reporting("Sampling equilibrium", times.len());
    for time in times.into_iter().progress_with(progress) {
        let mut row = vec![Value::Real(time)];
        row.extend(history.concentrations_at(time).values().map(|&c| Value::Real(c)));
        row.push(Value::Real(quotient.evaluate(time)));
        if let Some(grid) = grid_at(&legs, &grids, time) {
            row.extend(grid.visible_counts(time).values().map(|&n| Value::Count(n)));
        }
        writer.write(row)?;
    }

    // Make sure output data is written correctly
    info!("Wrote {} samples to {}", writer.num_rows(), file_name.display());
    writer.close()?;
    Ok(())
}

/// Report the outcome of an equilibrium leg
fn log_leg<S: Species>(leg: &EquilibriumLeg<S>) {
    let window = leg.window();
    info!(
        "Reaction goes {:?} over [{}, {}], extent {} ({:?})",
        leg.direction(),
        window.start(),
        window.equilibrium(),
        leg.extent().value,
        leg.extent().method
    );
}

/// Molecule grid of the leg that is running at a certain time
fn grid_at<'grids, S: Species>(
    legs: &[&EquilibriumLeg<S>],
    grids: &'grids [MoleculeGrid<S>],
    time: Precision,
) -> Option<&'grids MoleculeGrid<S>> {
    legs.iter()
        .zip(grids)
        .take_while(|(leg, _)| leg.window().start() <= time)
        .last()
        .or_else(|| legs.iter().zip(grids).next())
        .map(|(_, grid)| grid)
}
