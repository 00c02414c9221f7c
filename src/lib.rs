/*
 * // Copyright (c) Radzivon Bartoshyk 10/2025. All rights reserved.
 * //
 * // Redistribution and use in source and binary forms, with or without modification,
 * // are permitted provided that the following conditions are met:
 * //
 * // 1.  Redistributions of source code must retain the above copyright notice, this
 * // list of conditions and the following disclaimer.
 * //
 * // 2.  Redistributions in binary form must reproduce the above copyright notice,
 * // this list of conditions and the following disclaimer in the documentation
 * // and/or other materials provided with the distribution.
 * //
 * // 3.  Neither the name of the copyright holder nor the names of its
 * // contributors may be used to endorse or promote products derived from
 * // this software without specific prior written permission.
 * //
 * // THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
 * // AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
 * // IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
 * // DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
 * // FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
 * // DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
 * // SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
 * // CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
 * // OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
 * // OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.
 */
#![allow(clippy::too_many_arguments)]
mod deconvolve;
mod err;
mod fft;
mod grid;
mod kernel;
mod spread;
mod transform;

pub use err::NufftError;
use num_traits::{AsPrimitive, Float, FloatConst, NumAssign};
use rustfft::FftNum;
use std::fmt::{Display, Formatter};
pub use transform::{nufft2d1, nufft2d1_many, nufft2d2, nufft2d2_many, nufft2d3};

/// Scalar types the transforms run on. Implemented for f32 and f64; the
/// choice fixes the precision of every internal buffer and of the FFT
/// backend.
pub trait NufftSample:
    Float
    + FloatConst
    + FftNum
    + NumAssign
    + AsPrimitive<f64>
    + AsPrimitive<i64>
    + AsPrimitive<usize>
    + Default
{
}

impl NufftSample for f32 {}
impl NufftSample for f64 {}

/// Ordering of the mode index along each output dimension.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum ModeOrder {
    /// Index 0 holds mode -m/2; frequencies ascend and DC sits in the middle.
    Cmcl,
    /// Index 0 holds mode 0; negative frequencies fill the upper half.
    Fft,
}

impl Display for ModeOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeOrder::Cmcl => f.write_str("ModeOrder::Cmcl"),
            ModeOrder::Fft => f.write_str("ModeOrder::Fft"),
        }
    }
}

/// Whether the spreader reorders points by spatial bin before the hot loop.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SpreadSort {
    Never,
    Always,
    /// Sort when the point count or grid size makes it likely to pay off.
    Heuristic,
}

/// Discipline for batched transforms sharing one point geometry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BatchMode {
    /// One fine grid per worker, whole batches transformed by one multi-grid
    /// FFT dispatch.
    Simultaneous,
    /// A single fine grid reused across the batch; smallest footprint.
    Sequential,
}

#[derive(Debug, Copy, Clone)]
pub struct NufftOpts {
    /// 0 silent, 1 per-stage timings, 2 and up more chatter, through `log`.
    pub debug: u32,
    pub spread_debug: u32,
    pub spread_sort: SpreadSort,
    /// Validate that every coordinate lies in the accepted periodic range.
    pub chkbnds: bool,
    pub modeord: ModeOrder,
    /// Fine-grid oversampling factor sigma; 2.0 unless memory is tight.
    pub upsampfac: f64,
    pub batch_mode: BatchMode,
}

impl Default for NufftOpts {
    fn default() -> Self {
        NufftOpts {
            debug: 0,
            spread_debug: 0,
            spread_sort: SpreadSort::Heuristic,
            chkbnds: true,
            modeord: ModeOrder::Cmcl,
            upsampfac: 2.0,
            batch_mode: BatchMode::Simultaneous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;
    use rand::Rng;

    fn random_points(n: usize, half_width: f64) -> Vec<f64> {
        let mut rng = rand::rng();
        (0..n)
            .map(|_| rng.random_range(-half_width..half_width))
            .collect()
    }

    fn random_strengths(n: usize) -> Vec<Complex<f64>> {
        let mut rng = rand::rng();
        (0..n)
            .map(|_| Complex::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)))
            .collect()
    }

    /// Direct type-1 sum in CMCL ordering, the accuracy oracle.
    fn dirft2d1(
        xj: &[f64],
        yj: &[f64],
        cj: &[Complex<f64>],
        iflag: i32,
        ms: usize,
        mt: usize,
    ) -> Vec<Complex<f64>> {
        let sign = if iflag >= 0 { 1.0 } else { -1.0 };
        let mut fk = Vec::with_capacity(ms * mt);
        for k2 in -(mt as i64) / 2..=(mt as i64 - 1) / 2 {
            for k1 in -(ms as i64) / 2..=(ms as i64 - 1) / 2 {
                let mut acc = Complex::<f64>::default();
                for j in 0..xj.len() {
                    acc += cj[j] * Complex::cis(sign * (k1 as f64 * xj[j] + k2 as f64 * yj[j]));
                }
                fk.push(acc);
            }
        }
        fk
    }

    /// Direct type-2 sum from CMCL-ordered modes.
    fn dirft2d2(
        xj: &[f64],
        yj: &[f64],
        fk: &[Complex<f64>],
        iflag: i32,
        ms: usize,
        mt: usize,
    ) -> Vec<Complex<f64>> {
        let sign = if iflag >= 0 { 1.0 } else { -1.0 };
        let mut cj = Vec::with_capacity(xj.len());
        for j in 0..xj.len() {
            let mut acc = Complex::<f64>::default();
            let mut idx = 0usize;
            for k2 in -(mt as i64) / 2..=(mt as i64 - 1) / 2 {
                for k1 in -(ms as i64) / 2..=(ms as i64 - 1) / 2 {
                    acc += fk[idx] * Complex::cis(sign * (k1 as f64 * xj[j] + k2 as f64 * yj[j]));
                    idx += 1;
                }
            }
            cj.push(acc);
        }
        cj
    }

    fn dirft2d3(
        xj: &[f64],
        yj: &[f64],
        cj: &[Complex<f64>],
        iflag: i32,
        s: &[f64],
        t: &[f64],
    ) -> Vec<Complex<f64>> {
        let sign = if iflag >= 0 { 1.0 } else { -1.0 };
        s.iter()
            .zip(t.iter())
            .map(|(&sk, &tk)| {
                let mut acc = Complex::<f64>::default();
                for j in 0..xj.len() {
                    acc += cj[j] * Complex::cis(sign * (sk * xj[j] + tk * yj[j]));
                }
                acc
            })
            .collect()
    }

    fn rel_inf_err(got: &[Complex<f64>], want: &[Complex<f64>]) -> f64 {
        let scale = want.iter().map(|v| v.norm()).fold(0.0f64, f64::max);
        let err = got
            .iter()
            .zip(want.iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0.0f64, f64::max);
        err / scale.max(1e-300)
    }

    #[test]
    fn type1_matches_direct_sum_across_tolerances() {
        let nj = 1000usize;
        let (ms, mt) = (10usize, 10usize);
        let xj = random_points(nj, std::f64::consts::PI);
        let yj = random_points(nj, std::f64::consts::PI);
        let cj = random_strengths(nj);
        let want = dirft2d1(&xj, &yj, &cj, 1, ms, mt);
        let opts = NufftOpts::default();
        for eps in [1e-3f64, 1e-6, 1e-9, 1e-12] {
            let mut fk = vec![Complex::default(); ms * mt];
            nufft2d1(&xj, &yj, &cj, 1, eps, ms, mt, &mut fk, &opts).unwrap();
            let err = rel_inf_err(&fk, &want);
            assert!(err <= 50.0 * eps, "eps={eps}: rel err {err}");
        }
    }

    #[test]
    fn type2_matches_direct_sum_across_tolerances() {
        let nj = 500usize;
        let (ms, mt) = (12usize, 9usize);
        let xj = random_points(nj, std::f64::consts::PI);
        let yj = random_points(nj, std::f64::consts::PI);
        let fk0 = random_strengths(ms * mt);
        let want = dirft2d2(&xj, &yj, &fk0, -1, ms, mt);
        let opts = NufftOpts::default();
        for eps in [1e-3f64, 1e-6, 1e-9, 1e-12] {
            let mut fk = fk0.clone();
            let mut cj = vec![Complex::default(); nj];
            nufft2d2(&xj, &yj, &mut cj, -1, eps, ms, mt, &mut fk, &opts).unwrap();
            let err = rel_inf_err(&cj, &want);
            assert!(err <= 50.0 * eps, "eps={eps}: rel err {err}");
        }
    }

    #[test]
    fn type3_matches_direct_sum() {
        let nj = 200usize;
        let nk = 150usize;
        let xj = random_points(nj, std::f64::consts::PI);
        let yj = random_points(nj, std::f64::consts::PI);
        let cj = random_strengths(nj);
        let s = random_points(nk, 30.0);
        let t = random_points(nk, 30.0);
        let want = dirft2d3(&xj, &yj, &cj, 1, &s, &t);
        let opts = NufftOpts::default();
        for eps in [1e-3f64, 1e-6, 1e-9] {
            let mut fk = vec![Complex::default(); nk];
            nufft2d3(&xj, &yj, &cj, 1, eps, &s, &t, &mut fk, &opts).unwrap();
            let err = rel_inf_err(&fk, &want);
            assert!(err <= 100.0 * eps, "eps={eps}: rel err {err}");
        }
    }

    #[test]
    fn type1_and_type2_are_adjoint() {
        let nj = 80usize;
        let (ms, mt) = (7usize, 9usize);
        let eps = 1e-10f64;
        let xj = random_points(nj, std::f64::consts::PI);
        let yj = random_points(nj, std::f64::consts::PI);
        let cj = random_strengths(nj);
        let dk = random_strengths(ms * mt);
        let opts = NufftOpts::default();

        let mut fk = vec![Complex::default(); ms * mt];
        nufft2d1(&xj, &yj, &cj, 1, eps, ms, mt, &mut fk, &opts).unwrap();
        let lhs: Complex<f64> = fk
            .iter()
            .zip(dk.iter())
            .map(|(f, d)| f.conj() * d)
            .sum();

        let mut dk_in = dk.clone();
        let mut cj_out = vec![Complex::default(); nj];
        nufft2d2(&xj, &yj, &mut cj_out, -1, eps, ms, mt, &mut dk_in, &opts).unwrap();
        let rhs: Complex<f64> = cj
            .iter()
            .zip(cj_out.iter())
            .map(|(c, v)| c.conj() * v)
            .sum();

        let scale = (nj * ms * mt) as f64;
        assert!(
            (lhs - rhs).norm() <= 1e-8 * scale,
            "adjoint mismatch: {lhs} vs {rhs}"
        );
    }

    #[test]
    fn flipping_iflag_conjugates() {
        let nj = 120usize;
        let (ms, mt) = (6usize, 8usize);
        let xj = random_points(nj, std::f64::consts::PI);
        let yj = random_points(nj, std::f64::consts::PI);
        let cj = random_strengths(nj);
        let opts = NufftOpts::default();
        let eps = 1e-9f64;

        let mut plus = vec![Complex::default(); ms * mt];
        nufft2d1(&xj, &yj, &cj, 1, eps, ms, mt, &mut plus, &opts).unwrap();
        let conj_c: Vec<Complex<f64>> = cj.iter().map(|v| v.conj()).collect();
        let mut minus = vec![Complex::default(); ms * mt];
        nufft2d1(&xj, &yj, &conj_c, -1, eps, ms, mt, &mut minus, &opts).unwrap();
        for (a, b) in plus.iter().zip(minus.iter()) {
            assert!((a - b.conj()).norm() < 1e-11);
        }
    }

    #[test]
    fn mode_orders_agree_up_to_permutation() {
        let nj = 90usize;
        let (ms, mt) = (8usize, 6usize);
        let xj = random_points(nj, std::f64::consts::PI);
        let yj = random_points(nj, std::f64::consts::PI);
        let cj = random_strengths(nj);
        let eps = 1e-9f64;
        let mut opts = NufftOpts::default();

        let mut cmcl = vec![Complex::default(); ms * mt];
        opts.modeord = ModeOrder::Cmcl;
        nufft2d1(&xj, &yj, &cj, 1, eps, ms, mt, &mut cmcl, &opts).unwrap();
        let mut fft = vec![Complex::default(); ms * mt];
        opts.modeord = ModeOrder::Fft;
        nufft2d1(&xj, &yj, &cj, 1, eps, ms, mt, &mut fft, &opts).unwrap();
        for k2 in 0..mt as i64 {
            for k1 in 0..ms as i64 {
                let m1 = k1 - ms as i64 / 2;
                let m2 = k2 - mt as i64 / 2;
                let f1 = m1.rem_euclid(ms as i64) as usize;
                let f2 = m2.rem_euclid(mt as i64) as usize;
                // same transform, only the shuffle differs, so bit equality
                assert_eq!(
                    cmcl[k1 as usize + ms * k2 as usize],
                    fft[f1 + ms * f2]
                );
            }
        }
    }

    #[test]
    fn batched_type1_agrees_with_single_loop() {
        let ndata = 5usize;
        let nj = 300usize;
        let (ms, mt) = (10usize, 11usize);
        let eps = 1e-9f64;
        let xj = random_points(nj, std::f64::consts::PI);
        let yj = random_points(nj, std::f64::consts::PI);
        let c: Vec<Complex<f64>> = random_strengths(nj * ndata);

        let mut opts = NufftOpts::default();
        let mut looped = vec![Complex::default(); ms * mt * ndata];
        for i in 0..ndata {
            let mut fk = vec![Complex::default(); ms * mt];
            nufft2d1(
                &xj,
                &yj,
                &c[i * nj..(i + 1) * nj],
                1,
                eps,
                ms,
                mt,
                &mut fk,
                &opts,
            )
            .unwrap();
            looped[i * ms * mt..(i + 1) * ms * mt].copy_from_slice(&fk);
        }

        for mode in [BatchMode::Simultaneous, BatchMode::Sequential] {
            opts.batch_mode = mode;
            let mut fk = vec![Complex::default(); ms * mt * ndata];
            nufft2d1_many(ndata, &xj, &yj, &c, 1, eps, ms, mt, &mut fk, &opts).unwrap();
            let err = rel_inf_err(&fk, &looped);
            assert!(err <= 8.0 * eps, "{mode:?}: rel err {err}");
        }
    }

    #[test]
    fn batched_type2_agrees_with_single_loop() {
        let ndata = 3usize;
        let nj = 220usize;
        let (ms, mt) = (9usize, 7usize);
        let eps = 1e-9f64;
        let xj = random_points(nj, std::f64::consts::PI);
        let yj = random_points(nj, std::f64::consts::PI);
        let fk0: Vec<Complex<f64>> = random_strengths(ms * mt * ndata);

        let mut opts = NufftOpts::default();
        let mut looped = vec![Complex::default(); nj * ndata];
        for i in 0..ndata {
            let mut fk = fk0[i * ms * mt..(i + 1) * ms * mt].to_vec();
            let mut cj = vec![Complex::default(); nj];
            nufft2d2(&xj, &yj, &mut cj, 1, eps, ms, mt, &mut fk, &opts).unwrap();
            looped[i * nj..(i + 1) * nj].copy_from_slice(&cj);
        }

        for mode in [BatchMode::Simultaneous, BatchMode::Sequential] {
            opts.batch_mode = mode;
            let mut fk = fk0.clone();
            let mut c = vec![Complex::default(); nj * ndata];
            nufft2d2_many(ndata, &xj, &yj, &mut c, 1, eps, ms, mt, &mut fk, &opts).unwrap();
            let err = rel_inf_err(&c, &looped);
            assert!(err <= 8.0 * eps, "{mode:?}: rel err {err}");
        }
    }

    #[test]
    fn type3_on_integer_frequency_lattice_reproduces_type1() {
        let nj = 40usize;
        let (ms, mt) = (8usize, 8usize);
        let eps = 1e-9f64;
        let xj = random_points(nj, std::f64::consts::PI);
        let yj = random_points(nj, std::f64::consts::PI);
        let cj = random_strengths(nj);
        let opts = NufftOpts::default();

        let mut fk1 = vec![Complex::default(); ms * mt];
        nufft2d1(&xj, &yj, &cj, 1, eps, ms, mt, &mut fk1, &opts).unwrap();

        let mut s = Vec::new();
        let mut t = Vec::new();
        for k2 in -(mt as i64) / 2..=(mt as i64 - 1) / 2 {
            for k1 in -(ms as i64) / 2..=(ms as i64 - 1) / 2 {
                s.push(k1 as f64);
                t.push(k2 as f64);
            }
        }
        let mut fk3 = vec![Complex::default(); ms * mt];
        nufft2d3(&xj, &yj, &cj, 1, eps, &s, &t, &mut fk3, &opts).unwrap();
        let err = rel_inf_err(&fk3, &fk1);
        assert!(err <= 100.0 * eps, "rel err {err}");
    }

    #[test]
    fn single_mode_collects_plain_sum() {
        // three unit strengths, one requested mode: fk[0] is just sum(c)
        let xj = [0.0f64, std::f64::consts::FRAC_PI_2, 0.0];
        let yj = [0.0f64, 0.0, std::f64::consts::FRAC_PI_2];
        let cj = [Complex::<f64>::new(1.0, 0.0); 3];
        let mut fk = vec![Complex::default(); 1];
        nufft2d1(&xj, &yj, &cj, 1, 1e-9, 1, 1, &mut fk, &NufftOpts::default()).unwrap();
        assert!((fk[0] - Complex::new(3.0, 0.0)).norm() < 1e-7);
    }

    #[test]
    fn delta_at_origin_gives_flat_spectrum() {
        let mut opts = NufftOpts::default();
        opts.modeord = ModeOrder::Fft;
        let mut fk = vec![Complex::default(); 4];
        nufft2d1(
            &[0.0f64],
            &[0.0f64],
            &[Complex::new(1.0, 0.0)],
            1,
            1e-9,
            2,
            2,
            &mut fk,
            &opts,
        )
        .unwrap();
        for v in fk.iter() {
            assert!((v - Complex::new(1.0, 0.0)).norm() < 1e-7, "{v}");
        }
    }

    #[test]
    fn quadrant_dipoles_cancel_dc() {
        let p = std::f64::consts::FRAC_PI_2;
        let xj = [p, p, -p, -p];
        let yj = [p, -p, p, -p];
        let cj = [
            Complex::<f64>::new(1.0, 0.0),
            Complex::new(-1.0, 0.0),
            Complex::new(-1.0, 0.0),
            Complex::new(1.0, 0.0),
        ];
        let opts = NufftOpts::default();
        let mut fk = vec![Complex::default(); 4];
        nufft2d1(&xj, &yj, &cj, 1, 1e-9, 2, 2, &mut fk, &opts).unwrap();
        let want = dirft2d1(&xj, &yj, &cj, 1, 2, 2);
        for (a, b) in fk.iter().zip(want.iter()) {
            assert!((a - b).norm() < 1e-7);
        }
        // cmcl index (1,1) is mode (0,0): the plain sum of strengths, zero
        assert!(fk[3].norm() < 1e-7);
        // cmcl index (0,0) is mode (-1,-1), magnitude 4 for this geometry
        assert!((fk[0].norm() - 4.0).abs() < 1e-6);

        // evaluating the same modes back at the four points returns 4x the
        // strengths for this self-reciprocal geometry
        let mut cj_back = vec![Complex::<f64>::default(); 4];
        let mut fk_in = fk.clone();
        nufft2d2(&xj, &yj, &mut cj_back, 1, 1e-9, 2, 2, &mut fk_in, &opts).unwrap();
        let want = dirft2d2(&xj, &yj, &fk, 1, 2, 2);
        for (a, b) in cj_back.iter().zip(want.iter()) {
            assert!((a - b).norm() < 1e-6);
        }
        for (a, c0) in cj_back.iter().zip(cj.iter()) {
            assert!((a - c0 * 4.0).norm() < 1e-6);
        }
    }

    #[test]
    fn type3_line_pair_has_closed_form() {
        let xj = [0.0f64, std::f64::consts::PI];
        let yj = [0.0f64, 0.0];
        let cj = [Complex::<f64>::new(1.0, 0.0); 2];
        let s = [0.0f64, 1.0, 2.0, 3.0];
        let t = [0.0f64; 4];
        let mut fk = vec![Complex::default(); 4];
        nufft2d3(&xj, &yj, &cj, 1, 1e-9, &s, &t, &mut fk, &NufftOpts::default()).unwrap();
        let want = dirft2d3(&xj, &yj, &cj, 1, &s, &t);
        for (k, (a, b)) in fk.iter().zip(want.iter()).enumerate() {
            assert!((a - b).norm() < 1e-6, "k={k}: {a} vs {b}");
            // 1 + exp(i pi k) alternates between 2 and 0
            let closed = Complex::new(1.0 + (std::f64::consts::PI * k as f64).cos(), (std::f64::consts::PI * k as f64).sin());
            assert!((a - closed).norm() < 1e-6);
        }
    }

    #[test]
    fn out_of_range_point_is_reported() {
        let mut opts = NufftOpts::default();
        opts.chkbnds = true;
        let mut fk = vec![Complex::<f64>::default(); 4];
        let r = nufft2d1(
            &[10.0f64],
            &[0.0f64],
            &[Complex::new(1.0, 0.0)],
            1,
            1e-6,
            2,
            2,
            &mut fk,
            &opts,
        );
        assert!(matches!(r, Err(NufftError::PointsOutOfRange(_))));
    }

    #[test]
    fn single_precision_reaches_its_tolerances() {
        let nj = 300usize;
        let (ms, mt) = (8usize, 8usize);
        let mut rng = rand::rng();
        let xj: Vec<f32> = (0..nj)
            .map(|_| rng.random_range(-std::f32::consts::PI..std::f32::consts::PI))
            .collect();
        let yj: Vec<f32> = (0..nj)
            .map(|_| rng.random_range(-std::f32::consts::PI..std::f32::consts::PI))
            .collect();
        let cj: Vec<Complex<f32>> = (0..nj)
            .map(|_| Complex::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)))
            .collect();
        let xj64: Vec<f64> = xj.iter().map(|&v| v as f64).collect();
        let yj64: Vec<f64> = yj.iter().map(|&v| v as f64).collect();
        let cj64: Vec<Complex<f64>> = cj
            .iter()
            .map(|v| Complex::new(v.re as f64, v.im as f64))
            .collect();
        let want = dirft2d1(&xj64, &yj64, &cj64, 1, ms, mt);
        let opts = NufftOpts::default();
        for eps in [1e-3f32, 1e-5] {
            let mut fk = vec![Complex::<f32>::default(); ms * mt];
            nufft2d1(&xj, &yj, &cj, 1, eps, ms, mt, &mut fk, &opts).unwrap();
            let got: Vec<Complex<f64>> = fk
                .iter()
                .map(|v| Complex::new(v.re as f64, v.im as f64))
                .collect();
            let err = rel_inf_err(&got, &want);
            assert!(err <= 100.0 * eps as f64, "eps={eps}: rel err {err}");
        }
    }
}
