#![no_main]

use libfuzzer_sys::fuzz_target;
use num_complex::Complex;
use zunft::{nufft2d1, nufft2d2, NufftOpts};

#[derive(arbitrary::Arbitrary, Debug)]
struct Target {
    nj: u16,
    ms: u8,
    mt: u8,
    seed: f32,
    positive: bool,
}

fuzz_target!(|data: Target| {
    if data.nj == 0 || data.nj > 2000 {
        return;
    }
    if !data.seed.is_finite() || data.seed.abs() > 1000. {
        return;
    }
    let nj = data.nj as usize;
    let ms = (data.ms as usize % 48) + 1;
    let mt = (data.mt as usize % 48) + 1;
    let xj: Vec<f32> = (0..nj)
        .map(|j| (j as f32 * 0.618 + data.seed).sin() * 3.0)
        .collect();
    let yj: Vec<f32> = (0..nj)
        .map(|j| (j as f32 * 0.414 - data.seed).cos() * 3.0)
        .collect();
    let cj: Vec<Complex<f32>> = (0..nj)
        .map(|j| Complex::new((j as f32 + data.seed).cos(), (j as f32 - data.seed).sin()))
        .collect();
    let iflag = if data.positive { 1 } else { -1 };
    let opts = NufftOpts::default();
    let mut fk = vec![Complex::default(); ms * mt];
    nufft2d1(&xj, &yj, &cj, iflag, 1e-4, ms, mt, &mut fk, &opts).unwrap();
    assert!(fk.iter().all(|v| v.re.is_finite() && v.im.is_finite()));
    let mut cj2 = vec![Complex::default(); nj];
    nufft2d2(&xj, &yj, &mut cj2, iflag, 1e-4, ms, mt, &mut fk, &opts).unwrap();
    assert!(cj2.iter().all(|v| v.re.is_finite() && v.im.is_finite()));
});
