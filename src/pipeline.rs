#![warn(missing_docs)]
//! Parallel execution of a simulation document
//!
//! The [`Pipeline`] builds the optical chain of a [`SimulationConfig`] once and runs one [`run`] per wavelength (or
//! per wavefront error realization) on a dedicated [`rayon`] thread pool. Every execution owns its own wavefront, so
//! a failing execution does not affect the others.
use std::{collections::BTreeMap, path::Path, time::Instant};

use log::{debug, info};
use rayon::prelude::*;

use crate::{
    config::SimulationConfig,
    error::{PopError, PopResult},
    run::{run, RunParameters, SurfaceResult},
    surface::{SurfaceDescriptor, SurfaceKind},
    wavefront::AngleOrigin,
    zernike::ZernikeOrdering,
};

/// Results of one execution, keyed by surface number.
pub type RunResult = PopResult<BTreeMap<usize, SurfaceResult>>;

/// Number of leading (piston and tilt) terms not contained in a realization file.
const SKIPPED_TERMS: usize = 3;
/// First column of a realization file holding coefficients.
const FIRST_COEFFICIENT_COLUMN: usize = 4;

/// Parallel runner for simulation documents.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    n_jobs: usize,
    field: usize,
}
impl Default for Pipeline {
    fn default() -> Self {
        Self { n_jobs: 1, field: 0 }
    }
}
impl Pipeline {
    /// Create a new [`Pipeline`] with the given number of worker threads for the first field of a document.
    ///
    /// # Errors
    ///
    /// This function will return an error if `n_jobs` is zero.
    pub fn new(n_jobs: usize) -> PopResult<Self> {
        if n_jobs == 0 {
            return Err(PopError::InvalidParameter(
                "number of jobs must be positive".into(),
            ));
        }
        Ok(Self { n_jobs, field: 0 })
    }
    /// Return a copy using the field with the given index.
    #[must_use]
    pub const fn with_field(mut self, field: usize) -> Self {
        self.field = field;
        self
    }
    /// Number of worker threads.
    #[must_use]
    pub const fn n_jobs(&self) -> usize {
        self.n_jobs
    }
    fn pool(&self) -> PopResult<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.n_jobs)
            .build()
            .map_err(|e| PopError::Other(format!("could not create thread pool: {e}")))
    }
    fn execute(&self, jobs: Vec<(RunParameters, BTreeMap<usize, SurfaceDescriptor>)>) -> PopResult<Vec<RunResult>> {
        if self.n_jobs > 1 {
            info!("Start POP in parallel using {} threads...", self.n_jobs);
        } else {
            info!("Start POP using a single thread...");
        }
        let start = Instant::now();
        let results = self
            .pool()?
            .install(|| jobs.par_iter().map(|(params, chain)| run(params, chain)).collect::<Vec<_>>());
        info!("POP completed in {:6.1}s", start.elapsed().as_secs_f64());
        Ok(results)
    }
    /// Run the document for all of its wavelengths.
    ///
    /// The results are returned in the order of the wavelengths of the document.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the optical chain cannot be built.
    ///   - the field index of this pipeline is out of range.
    ///   - the thread pool cannot be created.
    pub fn run(&self, config: &SimulationConfig) -> PopResult<Vec<RunResult>> {
        let chain = config.chain()?;
        debug!("using field {} of the document", self.field);
        let jobs = (0..config.wavelengths.len())
            .map(|w| Ok((config.run_parameters(w, self.field)?, chain.clone())))
            .collect::<PopResult<Vec<_>>>()?;
        self.execute(jobs)
    }
    /// Run the document once for each set of Zernike coefficients (in meters) of the given surface.
    ///
    /// Each realization replaces the coefficients of the Zernike surface with the given `name`. All runs use the
    /// wavelength with index `wavelength`.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the optical chain cannot be built.
    ///   - there is no Zernike surface with the given name.
    ///   - the wavelength or field index is out of range.
    ///   - the thread pool cannot be created.
    pub fn run_realizations(
        &self,
        config: &SimulationConfig,
        name: &str,
        wavelength: usize,
        realizations: &[Vec<f64>],
    ) -> PopResult<Vec<RunResult>> {
        let chain = config.chain()?;
        let Some(number) = chain
            .iter()
            .find(|(_, s)| s.name == name && matches!(s.kind, SurfaceKind::Zernike(_)))
            .map(|(n, _)| *n)
        else {
            return Err(PopError::InvalidParameter(format!(
                "no Zernike surface named '{name}'"
            )));
        };
        let params = config.run_parameters(wavelength, self.field)?;
        let jobs = realizations
            .iter()
            .map(|coefficients| {
                let mut chain = chain.clone();
                if let Some(SurfaceKind::Zernike(spec)) = chain.get_mut(&number).map(|s| &mut s.kind) {
                    spec.coefficients.clone_from(coefficients);
                    spec.index = (0..coefficients.len()).collect();
                    spec.ordering = ZernikeOrdering::Standard;
                    spec.normalize = true;
                    spec.origin = AngleOrigin::X;
                }
                (params.clone(), chain)
            })
            .collect();
        debug!("running {} realizations of surface {number}", realizations.len());
        self.execute(jobs)
    }
}
/// Read one wavefront error realization from a CSV file without header.
///
/// Column `column + 4` holds the coefficients in nanometers starting with the fourth term of the standard
/// ordering. The three leading terms are set to zero. The returned coefficients are in meters.
///
/// # Errors
///
/// This function will return an error if the file cannot be read or the column does not exist or holds no number.
pub fn read_realization(path: &Path, column: usize) -> PopResult<Vec<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| PopError::Config(format!("cannot read file {} : {}", path.display(), e)))?;
    let index = column + FIRST_COEFFICIENT_COLUMN;
    let mut coefficients = vec![0.0; SKIPPED_TERMS];
    for record in reader.records() {
        let record = record.map_err(|e| PopError::Config(format!("reading record failed: {e}")))?;
        let Some(value) = record.get(index) else {
            return Err(PopError::Config(format!("column {index} not found")));
        };
        let value: f64 = value
            .parse()
            .map_err(|e| PopError::Config(format!("cannot parse '{value}': {e}")))?;
        coefficients.push(value * 1.0e-9);
    }
    Ok(coefficients)
}
