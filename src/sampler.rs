//! Inverse-CDF sampling of galaxy population parameters
//!
//! Scalelengths and ellipticity moduli are drawn from caller-supplied
//! distributions by tabulating the cumulative distribution function
//! at equally spaced points and inverting it with a binary search and
//! linear interpolation. The table is rebuilt on every generation
//! call and dropped afterwards.

use std::f64::consts;
use std::fmt;
use std::error::Error;

use rand::prelude::*;
use rand_distr::Open01;

#[cfg(feature = "parallel-tables")]
use rayon::prelude::*;

use crate::quadrature::{self, ConvergenceError};

/// Number of sub-intervals in a tabulated CDF.
const TABLE_SIZE: usize = 1000;

/// Largest intrinsic ellipticity modulus of the galaxy population.
pub const E_MAX: f64 = 0.804;

/// Why did sampling fail?
pub enum SamplingError {
    /// Tabulating the cumulative distribution did not converge.
    Convergence(ConvergenceError),
    /// The inversion landed in an interval of zero probability,
    /// which cannot be interpolated across.
    DegenerateInterval { u: f64, index: usize },
}

impl fmt::Display for SamplingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SamplingError::Convergence(e) => {
                write!(f, "unable to tabulate the cumulative distribution: {}", e)
            },
            SamplingError::DegenerateInterval { u, index } => {
                write!(f, "cumulative distribution is flat at table index {}, cannot invert u = {:e}", index, u)
            },
        }
    }
}

impl fmt::Debug for SamplingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Error for SamplingError {}

impl From<ConvergenceError> for SamplingError {
    fn from(e: ConvergenceError) -> Self {
        SamplingError::Convergence(e)
    }
}

/// A cumulative distribution function, tabulated at equally spaced
/// points across a fixed range and inverted by linear interpolation.
///
/// The table holds `F[i] = CDF(min + i h) - CDF(min)` for
/// `i = 0..=N`, so `F[0] = 0`, the entries are non-decreasing and
/// `F[N]` is the (unnormalized) probability mass across the range.
pub struct CdfTable {
    min: f64,
    step: f64,
    f: Vec<f64>,
}

impl CdfTable {
    /// Tabulates a cumulative distribution function `cdf(param, x)`,
    /// known in closed form, across `[min, max]`.
    pub fn from_cdf<C>(cdf: C, param: f64, min: f64, max: f64) -> Self
    where C: Fn(f64, f64) -> f64 + Sync {
        let step = (max - min) / (TABLE_SIZE as f64);
        let offset = cdf(param, min);

        let entry = |i: usize| -> f64 {
            if i == 0 {
                0.0
            } else {
                cdf(param, min + (i as f64) * step) - offset
            }
        };

        #[cfg(feature = "parallel-tables")]
        let f: Vec<f64> = (0..=TABLE_SIZE).into_par_iter().map(entry).collect();
        #[cfg(not(feature = "parallel-tables"))]
        let f: Vec<f64> = (0..=TABLE_SIZE).map(entry).collect();

        CdfTable { min, step, f }
    }

    /// Tabulates the cumulative distribution of a raw density over
    /// `[0, max]`, integrating from the origin to each abscissa with
    /// the extended trapezoidal rule. The density must vanish at 0.
    pub fn from_density<F>(pdf: F, max: f64) -> Result<Self, SamplingError>
    where F: Fn(f64) -> f64 + Sync {
        let step = max / (TABLE_SIZE as f64);

        let entry = |i: usize| -> Result<f64, ConvergenceError> {
            if i == 0 {
                Ok(0.0)
            } else {
                quadrature::integrate(&pdf, (i as f64) * step)
            }
        };

        #[cfg(feature = "parallel-tables")]
        let f: Result<Vec<f64>, _> = (0..=TABLE_SIZE).into_par_iter().map(entry).collect();
        #[cfg(not(feature = "parallel-tables"))]
        let f: Result<Vec<f64>, _> = (0..=TABLE_SIZE).map(entry).collect();

        Ok(CdfTable { min: 0.0, step, f: f? })
    }

    /// The total probability mass across the table range.
    pub fn range(&self) -> f64 {
        self.f[TABLE_SIZE]
    }

    /// Maps a cumulative value `u` in `[0, range)` back to the sample
    /// domain, i.e. solves `F(x) = u`. The bracketing interval is
    /// located by binary search over the monotone table and `x` is
    /// obtained by linear interpolation within it.
    pub fn invert(&self, u: f64) -> Result<f64, SamplingError> {
        // smallest k with F[k] >= u, clamped so that [k-1, k] is a
        // valid interval even for u <= 0 or u > F[N]
        let k = self.f.partition_point(|&v| v < u).clamp(1, TABLE_SIZE);
        let df = self.f[k] - self.f[k - 1];
        if df <= 0.0 {
            return Err(SamplingError::DegenerateInterval { u, index: k });
        }
        Ok(self.min + self.step * ((k - 1) as f64) + self.step * (u - self.f[k - 1]) / df)
    }

    /// Draws a single random variate distributed according to the
    /// tabulated distribution.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<f64, SamplingError> {
        let u = rng.gen::<f64>() * self.range();
        self.invert(u)
    }
}

/// Generates `nr` random values in `[min, max]`, distributed according
/// to the density implied by the cumulative distribution function
/// `cdf(param, x)`. The CDF need not be normalized: draws are scaled
/// by the probability mass across the range.
///
/// Used to assign scalelengths to a synthetic galaxy population, with
/// `cdf` the closed-form scalelength CDF and `param` its median.
pub fn generate_random_data<R, C>(
    rng: &mut R,
    nr: usize,
    min: f64,
    max: f64,
    cdf: C,
    param: f64,
) -> Result<Vec<f64>, SamplingError>
where
    R: Rng,
    C: Fn(f64, f64) -> f64 + Sync,
{
    let table = CdfTable::from_cdf(cdf, param, min, max);
    let mut data = Vec::with_capacity(nr);
    for _ in 0..nr {
        data.push(table.sample(rng)?);
    }
    Ok(data)
}

/// Generates ellipticity components for `ne` galaxies, `np` ring
/// points per galaxy, returning `(e1, e2)` arrays of `2 * ne * np`
/// entries each.
///
/// For every galaxy the modulus `|e|` is drawn from `pdf` over
/// `[0, E_MAX]`; `np` points are then placed evenly around a circle of
/// that radius, starting from a uniform random phase, each point
/// immediately followed by its antipode. Averaging an antipodal pair
/// cancels shape noise to first order, which is what the downstream
/// shear estimator relies on.
pub fn generate_ellipticity<R, F>(
    rng: &mut R,
    pdf: F,
    ne: usize,
    np: usize,
) -> Result<(Vec<f64>, Vec<f64>), SamplingError>
where
    R: Rng,
    F: Fn(f64) -> f64 + Sync,
{
    let table = CdfTable::from_density(pdf, E_MAX)?;

    let inc = consts::PI / (np as f64);
    let mut e1 = Vec::with_capacity(2 * ne * np);
    let mut e2 = Vec::with_capacity(2 * ne * np);

    for _ in 0..ne {
        let module = table.sample(rng)?;

        // phase strictly inside (0, 2 pi)
        let phi_0 = 2.0 * consts::PI * rng.sample::<f64, _>(Open01);

        for k in 0..np {
            let phi = phi_0 + (k as f64) * inc;
            let x = module * phi.cos();
            let y = module * phi.sin();
            e1.push(x);
            e2.push(y);
            // the same point rotated by pi
            e1.push(-x);
            e2.push(-y);
        }
    }

    Ok((e1, e2))
}

#[cfg(test)]
mod tests {
    use rand_xoshiro::Xoshiro256StarStar;
    use super::*;

    #[test]
    fn table_is_monotone() {
        let table = CdfTable::from_cdf(|_, x| x * x, 0.0, 0.0, 1.0);
        assert_eq!(table.f[0], 0.0);
        for w in table.f.windows(2) {
            assert!(w[1] >= w[0]);
        }
        assert!((table.range() - 1.0).abs() < 1.0e-12);
    }

    #[test]
    fn linear_cdf_inverts_exactly() {
        let table = CdfTable::from_cdf(|_, x| x, 0.0, 0.0, 10.0);
        let x = table.invert(2.5).unwrap();
        println!("got {:e}, expected 2.5", x);
        assert!((x - 2.5).abs() < 1.0e-12);
    }

    #[test]
    fn uniform_sample_mean() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(0);
        let data = generate_random_data(&mut rng, 100_000, 0.0, 10.0, |_, x| x, 0.0).unwrap();

        assert!(data.iter().all(|&x| (0.0..=10.0).contains(&x)));

        let mean = data.iter().sum::<f64>() / (data.len() as f64);
        println!("mean = {:.4}, expected 5.0", mean);
        assert!((mean - 5.0).abs() < 0.05);
    }

    #[test]
    fn power_law_samples_match_analytic_density() {
        // CDF = x^2 on [0, 1], density 2x, mean 2/3
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        let data = generate_random_data(&mut rng, 100_000, 0.0, 1.0, |_, x| x * x, 0.0).unwrap();

        let mean = data.iter().sum::<f64>() / (data.len() as f64);
        println!("mean = {:.4}, expected {:.4}", mean, 2.0 / 3.0);
        assert!((mean - 2.0 / 3.0).abs() < 0.01);

        // binned frequencies against the analytic density
        let mut counts = [0_usize; 10];
        for &x in &data {
            let bin = ((10.0 * x) as usize).min(9);
            counts[bin] += 1;
        }
        for (i, &n) in counts.iter().enumerate() {
            let lo = (i as f64) / 10.0;
            let hi = lo + 0.1;
            let expected = (hi * hi - lo * lo) * (data.len() as f64);
            let sigma = (expected * (1.0 - (hi * hi - lo * lo))).sqrt();
            println!("bin {}: {} counted, {:.1} expected", i, n, expected);
            assert!(((n as f64) - expected).abs() < 5.0 * sigma.max(1.0));
        }
    }

    #[test]
    fn scalelength_draws_from_density_table() {
        // density x exp(-x), CDF 1 - (1 + x) exp(-x)
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);
        let table = CdfTable::from_density(|x: f64| x * (-x).exp(), 6.0).unwrap();

        for w in table.f.windows(2) {
            assert!(w[1] >= w[0]);
        }

        let analytic = |x: f64| 1.0 - (1.0 + x) * (-x).exp();
        assert!((table.range() - analytic(6.0)).abs() < 1.0e-4);

        let mut sum = 0.0;
        let n = 50_000;
        for _ in 0..n {
            sum += table.sample(&mut rng).unwrap();
        }
        let mean = sum / (n as f64);
        // mean of the truncated distribution, somewhat below the
        // untruncated value of 2
        println!("mean = {:.4}, expected 1.909", mean);
        assert!((mean - 1.909).abs() < 0.05);
    }

    #[test]
    fn ellipticity_pairs_are_antipodal() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(3);
        let (ne, np) = (100, 8);
        let (e1, e2) = generate_ellipticity(&mut rng, |x: f64| x * (-8.0 * x).exp(), ne, np).unwrap();

        assert_eq!(e1.len(), 2 * ne * np);
        assert_eq!(e2.len(), 2 * ne * np);

        for j in 0..(ne * np) {
            assert_eq!(e1[2 * j + 1], -e1[2 * j]);
            assert_eq!(e2[2 * j + 1], -e2[2 * j]);
        }
    }

    #[test]
    fn ellipticity_moduli_are_bounded() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(4);
        let (e1, e2) = generate_ellipticity(&mut rng, |x: f64| x * (-8.0 * x).exp(), 500, 4).unwrap();

        for (x, y) in e1.iter().zip(e2.iter()) {
            let module = x.hypot(*y);
            assert!(module <= E_MAX + 1.0e-12);
        }
    }

    #[test]
    fn leading_flat_region_samples_into_support() {
        // zero density below 0.5, uniform above: every draw must land
        // in the supported half of the range
        let cdf = |_: f64, x: f64| if x < 0.5 { 0.0 } else { x - 0.5 };
        let table = CdfTable::from_cdf(cdf, 0.0, 0.0, 1.0);

        let mut rng = Xoshiro256StarStar::seed_from_u64(5);
        for _ in 0..1000 {
            let x = table.sample(&mut rng).unwrap();
            assert!((0.5..=1.0).contains(&x));
        }
    }

    #[test]
    fn invert_at_zero_in_flat_region_is_degenerate() {
        let cdf = |_: f64, x: f64| if x < 0.5 { 0.0 } else { x - 0.5 };
        let table = CdfTable::from_cdf(cdf, 0.0, 0.0, 1.0);

        // u = 0 lands in the zero-width first interval, which cannot
        // be interpolated across
        let result = table.invert(0.0);
        assert!(matches!(result, Err(SamplingError::DegenerateInterval { .. })));
    }

    #[test]
    fn flat_distribution_cannot_be_inverted() {
        let table = CdfTable::from_cdf(|_, _| 1.0, 0.0, 0.0, 1.0);
        assert_eq!(table.range(), 0.0);
        let result = table.invert(0.0);
        assert!(result.is_err());
        println!("{}", result.unwrap_err());
    }
}
