use crate::error::SamplerError;
use crate::likelihood::LikelihoodTrait;
use crate::params::Params;
use crate::posterior::TransformedPosterior;

use emcee::{EnsembleSampler, Guess, Prob};
use macro_const::macro_const;
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand::rngs::StdRng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

macro_const! {
    const DOC: &str = r#"
Affine-invariant ensemble MCMC over the working space of a transformed posterior

Walkers start from independent prior draws mapped into the working space, redrawn until the
posterior density is finite. Every step of every walker after the burn-in is kept. The
ensemble size must be even and at least twice the working-space dimension.

emcee evaluates densities in single precision, so the chain carries `f32` resolution. The seed
controls the starting positions only, the stretch moves use emcee's own generator.
"#;
}

#[doc = DOC!()]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename = "Emcee")]
pub struct EmceeSettings {
    #[serde(default = "EmceeSettings::default_num_walkers")]
    pub num_walkers: usize,
    #[serde(default = "EmceeSettings::default_num_steps")]
    pub num_steps: usize,
    #[serde(default = "EmceeSettings::default_num_burn")]
    pub num_burn: usize,
    #[serde(default = "EmceeSettings::default_seed")]
    pub seed: u64,
}

impl EmceeSettings {
    pub fn new(num_walkers: usize, num_steps: usize, num_burn: usize, seed: u64) -> Self {
        Self {
            num_walkers,
            num_steps,
            num_burn,
            seed,
        }
    }

    #[inline]
    pub fn default_num_walkers() -> usize {
        32
    }

    #[inline]
    pub fn default_num_steps() -> usize {
        1000
    }

    #[inline]
    pub fn default_num_burn() -> usize {
        200
    }

    #[inline]
    pub fn default_seed() -> u64 {
        0
    }

    pub const fn doc() -> &'static str {
        DOC
    }
}

impl Default for EmceeSettings {
    fn default() -> Self {
        Self::new(
            Self::default_num_walkers(),
            Self::default_num_steps(),
            Self::default_num_burn(),
            Self::default_seed(),
        )
    }
}

/// [TransformedPosterior] seen through [emcee::Prob]
pub struct EmceeProb<'a, L> {
    posterior: &'a TransformedPosterior<L>,
}

impl<'a, L> EmceeProb<'a, L> {
    pub fn new(posterior: &'a TransformedPosterior<L>) -> Self {
        Self { posterior }
    }
}

fn guess_to_vec(guess: &Guess) -> Vec<f64> {
    guess.values.iter().map(|&x| x as f64).collect()
}

impl<L> Prob for EmceeProb<'_, L>
where
    L: LikelihoodTrait,
{
    fn lnlike(&self, params: &Guess) -> f32 {
        self.posterior.ln_likelihood(&guess_to_vec(params)) as f32
    }

    fn lnprior(&self, params: &Guess) -> f32 {
        self.posterior.ln_prior(&guess_to_vec(params)) as f32
    }

    fn lnprob(&self, params: &Guess) -> f32 {
        self.posterior.ln_density(&guess_to_vec(params)) as f32
    }
}

/// Flattened output of [run_emcee]
#[derive(Clone, Debug, PartialEq)]
pub struct McmcChain {
    /// Working-space positions, one row per kept walker step, step-major
    samples: Array2<f64>,
    ln_density: Array1<f64>,
    num_walkers: usize,
}

impl McmcChain {
    pub fn samples(&self) -> &Array2<f64> {
        &self.samples
    }

    pub fn ln_density(&self) -> &Array1<f64> {
        &self.ln_density
    }

    pub fn num_walkers(&self) -> usize {
        self.num_walkers
    }

    pub fn len(&self) -> usize {
        self.samples.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample of the highest log density
    pub fn best(&self) -> Option<(ArrayView1<f64>, f64)> {
        self.ln_density
            .iter()
            .enumerate()
            .filter(|(_, x)| !x.is_nan())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, &lnp)| (self.samples.row(i), lnp))
    }

    /// Chain mapped to the natural parameter space
    pub fn to_params<L>(
        &self,
        posterior: &TransformedPosterior<L>,
    ) -> Result<Vec<Params>, SamplerError>
    where
        L: LikelihoodTrait,
    {
        self.samples
            .rows()
            .into_iter()
            .map(|row| Ok(posterior.transform(&row.to_vec())?))
            .collect()
    }
}

const MAX_INITIAL_ATTEMPTS: usize = 1000;

fn initial_guesses<L>(
    posterior: &TransformedPosterior<L>,
    settings: &EmceeSettings,
) -> Result<Vec<Guess>, SamplerError>
where
    L: LikelihoodTrait,
{
    let mut rng = StdRng::seed_from_u64(settings.seed);
    (0..settings.num_walkers)
        .map(|walker| {
            for _ in 0..MAX_INITIAL_ATTEMPTS {
                let x = posterior.sample_prior(&mut rng)?;
                let values: Vec<f32> = x.iter().map(|&x| x as f32).collect();
                // Single-precision rounding may push a point onto the domain boundary
                let rounded: Vec<f64> = values.iter().map(|&x| x as f64).collect();
                if posterior.ln_density(&rounded).is_finite() {
                    return Ok(Guess::new(&values));
                }
            }
            Err(SamplerError::InitialPosition {
                walker,
                attempts: MAX_INITIAL_ATTEMPTS,
            })
        })
        .collect()
}

/// Run an ensemble sampler over `posterior`, see [EmceeSettings] for details
pub fn run_emcee<L>(
    posterior: &TransformedPosterior<L>,
    settings: &EmceeSettings,
) -> Result<McmcChain, SamplerError>
where
    L: LikelihoodTrait,
{
    let dimension = posterior.dimension();
    let num_walkers = settings.num_walkers;
    if num_walkers % 2 != 0 || num_walkers < 2 * dimension || num_walkers == 0 {
        return Err(SamplerError::InvalidWalkers {
            nwalkers: num_walkers,
            dimension,
        });
    }
    if settings.num_steps == 0 {
        return Err(SamplerError::NoSteps);
    }
    if settings.num_burn >= settings.num_steps {
        return Err(SamplerError::BurnTooLong {
            burn: settings.num_burn,
            steps: settings.num_steps,
        });
    }

    let guesses = initial_guesses(posterior, settings)?;
    let prob = EmceeProb::new(posterior);
    let mut sampler = EnsembleSampler::new(num_walkers, dimension, &prob)
        .map_err(|err| SamplerError::Emcee(err.to_string()))?;

    let kept = settings.num_steps - settings.num_burn;
    let mut samples = Array2::<f64>::zeros((kept * num_walkers, dimension));
    let mut ln_density = Array1::<f64>::zeros(kept * num_walkers);
    let mut row = 0;
    let mut iteration = 0;
    sampler
        .sample(&guesses, settings.num_steps, |step| {
            iteration += 1;
            if iteration <= settings.num_burn {
                return;
            }
            for (position, &lnp) in step.pos.iter().zip(step.lnprob.iter()) {
                if row == ln_density.len() {
                    return;
                }
                for (dst, &src) in samples.row_mut(row).iter_mut().zip(position.values.iter()) {
                    *dst = src as f64;
                }
                ln_density[row] = lnp as f64;
                row += 1;
            }
        })
        .map_err(|err| SamplerError::Emcee(err.to_string()))?;
    log::debug!(
        "emcee finished: {num_walkers} walkers, {} steps, {row} samples kept",
        settings.num_steps
    );

    Ok(McmcChain {
        samples: samples.slice_move(ndarray::s![..row, ..]),
        ln_density: ln_density.slice_move(ndarray::s![..row]),
        num_walkers,
    })
}
