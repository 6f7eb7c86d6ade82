// Integration test driving a configuration file through the coordinate
// loader and both population samplers, the way a simulation run does.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use rand::prelude::*;
use rand_xoshiro::Xoshiro256StarStar;

use radiolens::input::Config;
use radiolens::sampler::{self, E_MAX};
use radiolens::coords::SkaLoader;

fn write_temp_file(name: &str, contents: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn config_driven_run() {
    // Three baselines over two epochs, epoch-0 moduli 5, 500, 1300.
    let u_path = write_temp_file(
        "radiolens_pipeline_u.txt",
        "3.0\n400.0\n-500.0\n1.0\n410.0\n-490.0\n",
    );
    let v_path = write_temp_file(
        "radiolens_pipeline_v.txt",
        "4.0\n-300.0\n1200.0\n2.0\n-290.0\n1210.0\n",
    );

    let text = format!("---
    galaxies:
        ngal: 20000
        points_per_ring: 4
        scalelength:
            min: 0.3 * r_median
            max: '4.0 * r_median'
            cdf: 1.0 - exp(-0.69 * x / r_median)
        e_pdf: e * exp(-8.0 * e)

    coords:
        u_file: {}
        v_file: {}
        ntimes: 2
        nbaselines: 3
        threshold: 100.0

    constants:
        r_median: 1.0
    ", u_path.display(), v_path.display());

    let mut config = Config::from_string(&text).unwrap();
    config.with_context("constants").unwrap();

    // Baseline coverage
    let coords = SkaLoader::from_config(&config)
        .unwrap()
        .with_grid_extent(true)
        .read()
        .unwrap();

    assert_eq!(coords.nbaselines, 2);
    assert_eq!(coords.ntimes, 2);
    assert!((coords.max_baseline - 1300.0).abs() < 1.0e-9);
    assert_eq!(coords.grid_extent, Some(1210.0));
    assert_eq!(coords.at(1, 1), (-490.0, 1210.0));

    // Galaxy scalelengths, from the closed-form CDF in the config
    let mut rng = Xoshiro256StarStar::seed_from_u64(42);
    let ngal: usize = config.read("galaxies:ngal").unwrap();
    let min: f64 = config.read("galaxies:scalelength:min").unwrap();
    let max: f64 = config.read("galaxies:scalelength:max").unwrap();
    let cdf = config.func("galaxies:scalelength:cdf", "x").unwrap();

    let scalelengths =
        sampler::generate_random_data(&mut rng, ngal, min, max, |_, x| cdf(x), 1.0).unwrap();

    assert_eq!(scalelengths.len(), ngal);
    assert!(scalelengths.iter().all(|&r| r >= min && r <= max));

    // Ellipticities, from the density in the config
    let np: usize = config.read("galaxies:points_per_ring").unwrap();
    let e_pdf = config.func("galaxies:e_pdf", "e").unwrap();
    let (e1, e2) = sampler::generate_ellipticity(&mut rng, |e| e_pdf(e), 200, np).unwrap();

    assert_eq!(e1.len(), 2 * 200 * np);
    for j in 0..(200 * np) {
        assert_eq!(e1[2 * j + 1], -e1[2 * j]);
        assert_eq!(e2[2 * j + 1], -e2[2 * j]);
    }
    for (x, y) in e1.iter().zip(e2.iter()) {
        assert!(x.hypot(*y) <= E_MAX + 1.0e-12);
    }
}
