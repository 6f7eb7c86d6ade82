//! Reading and filtering interferometer baseline coordinates
//!
//! Two file layouts are supported: the single-epoch OSKAR layout,
//! one `index u v` triple per line, and the SKA layout, which splits
//! the u and v components of a multi-epoch observation across two
//! parallel files with one value per line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use colored::Colorize;

use crate::input::{Config, InputError};

mod error;

pub use error::*;

/// uv coverage read from a single-epoch OSKAR coordinate file,
/// in file order.
#[derive(Debug)]
pub struct OskarCoords {
    pub u: Vec<f64>,
    pub v: Vec<f64>,
    /// Maximum |u| across all rows.
    pub lenu: f64,
    /// Maximum |v| across all rows.
    pub lenv: f64,
}

impl OskarCoords {
    /// Number of coordinate pairs actually read.
    pub fn len(&self) -> usize {
        self.u.len()
    }

    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }
}

/// Reads at most `ncoords` rows of whitespace- or comma-delimited
/// `index u v` triples from the file at `path`. Rows whose first
/// token begins with `#`, and rows with fewer than three tokens, are
/// skipped; a token that fails to parse as a number is an error.
pub fn read_oskar<P: AsRef<Path>>(path: P, ncoords: usize) -> Result<OskarCoords, CoordError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CoordError::open(path, e))?;
    let reader = BufReader::new(file);

    let mut u: Vec<f64> = Vec::new();
    let mut v: Vec<f64> = Vec::new();
    let mut lenu = 0.0_f64;
    let mut lenv = 0.0_f64;

    for (number, line) in reader.lines().enumerate() {
        if u.len() >= ncoords {
            break;
        }
        let line = line.map_err(|e| CoordError::open(path, e))?;

        let mut tokens = line
            .split(|c: char| c == ' ' || c == ',' || c == '\t')
            .filter(|t| !t.is_empty());

        let index = match tokens.next() {
            Some(t) if !t.starts_with('#') => t,
            _ => continue,
        };

        let (xt, yt) = match (tokens.next(), tokens.next()) {
            (Some(x), Some(y)) => (x, y),
            _ => continue,
        };

        index.parse::<u64>().map_err(|_| CoordError::parse(path, number + 1))?;
        let x: f64 = xt.parse().map_err(|_| CoordError::parse(path, number + 1))?;
        let y: f64 = yt.parse().map_err(|_| CoordError::parse(path, number + 1))?;

        lenu = lenu.max(x.abs());
        lenv = lenv.max(y.abs());
        u.push(x);
        v.push(y);
    }

    Ok(OskarCoords { u, v, lenu, lenv })
}

/// Filtered, reordered uv coverage of a multi-epoch observation.
///
/// Coordinates are laid out baseline-major: baseline `i` at epoch
/// `nt` lives at flat index `i * ntimes + nt`, which is the order the
/// visibility generator consumes them in.
#[derive(Debug)]
pub struct SkaCoords {
    pub u: Vec<f64>,
    pub v: Vec<f64>,
    /// Number of baselines retained by the threshold filter.
    pub nbaselines: usize,
    pub ntimes: usize,
    /// Largest epoch-0 baseline modulus among the retained set,
    /// which fixes the angular resolution.
    pub max_baseline: f64,
    /// `ceil` of the largest |coordinate| across all epochs, for
    /// sizing the uv grid. `None` unless requested from the loader.
    pub grid_extent: Option<f64>,
}

impl SkaCoords {
    /// The uv coordinate of baseline `i` at epoch `nt`.
    pub fn at(&self, i: usize, nt: usize) -> (f64, f64) {
        let k = i * self.ntimes + nt;
        (self.u[k], self.v[k])
    }
}

/// Loads baseline coordinates from a pair of parallel single-column
/// files, ordered epoch-major (all baselines of epoch 0, then all of
/// epoch 1, and so on).
///
/// Baselines whose epoch-0 modulus does not exceed the threshold are
/// dropped. The baseline geometry is identical at every epoch, only
/// amplitude and phase vary, so the retained index set is decided
/// once at epoch 0 and reused for all later epochs.
#[derive(Clone, Debug)]
pub struct SkaLoader {
    u_path: String,
    v_path: String,
    ntimes: usize,
    nbaselines: usize,
    threshold: f64,
    grid_extent: bool,
}

impl SkaLoader {
    pub fn from_files(u_path: &str, v_path: &str, ntimes: usize, nbaselines: usize) -> Self {
        Self {
            u_path: u_path.to_owned(),
            v_path: v_path.to_owned(),
            ntimes,
            nbaselines,
            threshold: 0.0,
            grid_extent: false,
        }
    }

    /// Reads the loader parameters from the `coords` section of a
    /// configuration file: `u_file`, `v_file`, `ntimes`, `nbaselines`
    /// and optionally `threshold` (wavelengths, default 0).
    pub fn from_config(config: &Config) -> Result<Self, InputError> {
        let u_path: String = config.read("coords:u_file")?;
        let v_path: String = config.read("coords:v_file")?;
        let ntimes: usize = config.read("coords:ntimes")?;
        let nbaselines: usize = config.read("coords:nbaselines")?;

        // an absent threshold means "keep everything", but a present
        // one that fails to parse must not be masked by the default
        let threshold: f64 = match config.read("coords:threshold") {
            Ok(t) => t,
            Err(InputError::Location(_, _)) => 0.0,
            Err(e) => return Err(e),
        };

        Ok(Self {
            u_path,
            v_path,
            ntimes,
            nbaselines,
            threshold,
            grid_extent: false,
        })
    }

    /// Discard baselines whose epoch-0 modulus is at or below
    /// `threshold` (in wavelengths).
    pub fn with_threshold(self, threshold: f64) -> Self {
        SkaLoader {
            threshold,
            ..self
        }
    }

    /// Also compute the maximum absolute coordinate extent across
    /// all epochs, reported in `SkaCoords::grid_extent`.
    pub fn with_grid_extent(self, enable: bool) -> Self {
        SkaLoader {
            grid_extent: enable,
            ..self
        }
    }

    pub fn read(&self) -> Result<SkaCoords, CoordError> {
        println!(
            "{} baseline coordinates from {} and {}...",
            "Loading".bold().cyan(), self.u_path.bold().blue(), self.v_path.bold().blue(),
        );

        let num_coords = self.ntimes * self.nbaselines;
        let temp_u = read_column(&self.u_path, num_coords)?;
        let temp_v = read_column(&self.v_path, num_coords)?;

        // Epoch 0 decides which baselines survive.
        let mut index: Vec<usize> = Vec::new();
        let mut max_baseline = 0.0_f64;
        for i in 0..self.nbaselines {
            let modulus = temp_u[i].hypot(temp_v[i]);
            if modulus > self.threshold {
                index.push(i);
                max_baseline = max_baseline.max(modulus);
            }
        }
        let nbaselines = index.len();

        let mut u = vec![0.0; nbaselines * self.ntimes];
        let mut v = vec![0.0; nbaselines * self.ntimes];
        let mut extent = 0.0_f64;

        for nt in 0..self.ntimes {
            let start = nt * self.nbaselines;
            for (i, &b) in index.iter().enumerate() {
                let xp = temp_u[start + b];
                let yp = temp_v[start + b];
                if self.grid_extent {
                    extent = extent.max(xp.abs()).max(yp.abs());
                }
                let k = i * self.ntimes + nt;
                u[k] = xp;
                v[k] = yp;
            }
        }

        println!(
            "{} import, {} of {} baselines retained over {} epochs.",
            "Completed".bold().bright_green(), nbaselines, self.nbaselines, self.ntimes,
        );

        Ok(SkaCoords {
            u,
            v,
            nbaselines,
            ntimes: self.ntimes,
            max_baseline,
            grid_extent: if self.grid_extent { Some(extent.ceil()) } else { None },
        })
    }
}

/// Reads `expected` values from a one-number-per-line file, skipping
/// blank lines.
fn read_column(path: &str, expected: usize) -> Result<Vec<f64>, CoordError> {
    let file = File::open(path).map_err(|e| CoordError::open(path, e))?;
    let mut values = Vec::with_capacity(expected);

    for (number, line) in BufReader::new(file).lines().enumerate() {
        if values.len() >= expected {
            break;
        }
        let line = line.map_err(|e| CoordError::open(path, e))?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        let value: f64 = token.parse().map_err(|_| CoordError::parse(path, number + 1))?;
        values.push(value);
    }

    if values.len() < expected {
        return Err(CoordError::truncated(path, expected, values.len()));
    }

    Ok(values)
}
