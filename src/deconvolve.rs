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
use crate::{ModeOrder, NufftSample};
use num_complex::Complex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DeconvDir {
    /// Post-FFT: read the fine grid, write amplified user modes.
    GridToModes,
    /// Pre-FFT: read user modes, write the amplified, zero-padded fine grid.
    ModesToGrid,
}

/// One x-line of the deconvolution: transfer ms modes between fk and an
/// nf1-cell grid row, scaling mode k by prefac/ker[|k|]. Mode k sits at grid
/// cell k mod nf1; fk ordering follows modeord.
pub(crate) fn deconvolve_shuffle_1d<T: NufftSample>(
    dir: DeconvDir,
    prefac: T,
    ker: &[T],
    ms: usize,
    fk: &mut [Complex<T>],
    nf1: usize,
    fw: &mut [Complex<T>],
    modeord: ModeOrder,
) {
    let kmin = -(ms as isize) / 2;
    let kmax = if ms == 0 { -1 } else { (ms as isize - 1) / 2 };
    let (mut pp, mut pn) = match modeord {
        ModeOrder::Cmcl => ((-kmin) as usize, 0usize),
        ModeOrder::Fft => (0usize, (kmax + 1) as usize),
    };
    match dir {
        DeconvDir::GridToModes => {
            for k in 0..=kmax {
                fk[pp] = fw[k as usize] * (prefac / ker[k as usize]);
                pp += 1;
            }
            for k in kmin..0 {
                fk[pn] = fw[(nf1 as isize + k) as usize] * (prefac / ker[(-k) as usize]);
                pn += 1;
            }
        }
        DeconvDir::ModesToGrid => {
            for cell in fw[(kmax + 1) as usize..(nf1 as isize + kmin) as usize].iter_mut() {
                *cell = Complex::default();
            }
            for k in 0..=kmax {
                fw[k as usize] = fk[pp] * (prefac / ker[k as usize]);
                pp += 1;
            }
            for k in kmin..0 {
                fw[(nf1 as isize + k) as usize] = fk[pn] * (prefac / ker[(-k) as usize]);
                pn += 1;
            }
        }
    }
}

/// 2D deconvolution and mode shuffle between the ms-by-mt user array fk
/// (ms fast) and the nf1-by-nf2 fine grid fw (nf1 fast), dividing mode
/// (k1, k2) by ker1[|k1|]*ker2[|k2|]. Direction ModesToGrid zeroes every fw
/// cell it does not write.
pub(crate) fn deconvolve_shuffle_2d<T: NufftSample>(
    dir: DeconvDir,
    ker1: &[T],
    ker2: &[T],
    ms: usize,
    mt: usize,
    fk: &mut [Complex<T>],
    nf1: usize,
    nf2: usize,
    fw: &mut [Complex<T>],
    modeord: ModeOrder,
) {
    let k2min = -(mt as isize) / 2;
    let k2max = if mt == 0 { -1 } else { (mt as isize - 1) / 2 };
    let (mut pp, mut pn) = match modeord {
        ModeOrder::Cmcl => (((-k2min) as usize) * ms, 0usize),
        ModeOrder::Fft => (0usize, ((k2max + 1) as usize) * ms),
    };
    if dir == DeconvDir::ModesToGrid {
        // y-lines untouched by any mode, zeroed wholesale
        let lo = nf1 * (k2max + 1) as usize;
        let hi = nf1 * (nf2 as isize + k2min) as usize;
        for cell in fw[lo..hi].iter_mut() {
            *cell = Complex::default();
        }
    }
    for k2 in 0..=k2max {
        let row = k2 as usize;
        deconvolve_shuffle_1d(
            dir,
            T::one() / ker2[row],
            ker1,
            ms,
            &mut fk[pp..pp + ms],
            nf1,
            &mut fw[nf1 * row..nf1 * (row + 1)],
            modeord,
        );
        pp += ms;
    }
    for k2 in k2min..0 {
        let row = (nf2 as isize + k2) as usize;
        deconvolve_shuffle_1d(
            dir,
            T::one() / ker2[(-k2) as usize],
            ker1,
            ms,
            &mut fk[pn..pn + ms],
            nf1,
            &mut fw[nf1 * row..nf1 * (row + 1)],
            modeord,
        );
        pn += ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn random_grid(n: usize) -> Vec<Complex<f64>> {
        let mut rng = rand::rng();
        (0..n)
            .map(|_| Complex::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)))
            .collect()
    }

    #[test]
    fn mode_orders_are_index_permutations_of_each_other() {
        let (ms, mt) = (6usize, 5usize);
        let (nf1, nf2) = (16usize, 12usize);
        let ker1 = vec![1.0f64; nf1 / 2 + 1];
        let ker2 = vec![1.0f64; nf2 / 2 + 1];
        let mut fw = random_grid(nf1 * nf2);
        let mut cmcl = vec![Complex::default(); ms * mt];
        let mut fft = vec![Complex::default(); ms * mt];
        deconvolve_shuffle_2d(
            DeconvDir::GridToModes,
            &ker1,
            &ker2,
            ms,
            mt,
            &mut cmcl,
            nf1,
            nf2,
            &mut fw,
            ModeOrder::Cmcl,
        );
        deconvolve_shuffle_2d(
            DeconvDir::GridToModes,
            &ker1,
            &ker2,
            ms,
            mt,
            &mut fft,
            nf1,
            nf2,
            &mut fw,
            ModeOrder::Fft,
        );
        for k2 in 0..mt as isize {
            for k1 in 0..ms as isize {
                // cmcl index (k1,k2) holds mode (k1-ms/2, k2-mt/2)
                let m1 = k1 - ms as isize / 2;
                let m2 = k2 - mt as isize / 2;
                let f1 = m1.rem_euclid(ms as isize) as usize;
                let f2 = m2.rem_euclid(mt as isize) as usize;
                let a = cmcl[(k1 as usize) + ms * (k2 as usize)];
                let b = fft[f1 + ms * f2];
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn modes_to_grid_zero_pads_everything_else() {
        let (ms, mt) = (4usize, 4usize);
        let (nf1, nf2) = (16usize, 16usize);
        let ker1 = vec![2.0f64; nf1 / 2 + 1];
        let ker2 = vec![0.5f64; nf2 / 2 + 1];
        let mut fk: Vec<Complex<f64>> = (0..ms * mt)
            .map(|i| Complex::new(1.0 + i as f64, -(i as f64)))
            .collect();
        let mut fw = random_grid(nf1 * nf2);
        deconvolve_shuffle_2d(
            DeconvDir::ModesToGrid,
            &ker1,
            &ker2,
            ms,
            mt,
            &mut fk,
            nf1,
            nf2,
            &mut fw,
            ModeOrder::Cmcl,
        );
        let mut written = 0usize;
        for iy in 0..nf2 {
            for ix in 0..nf1 {
                let v = fw[iy * nf1 + ix];
                let k1_hit = ix <= 1 || ix >= nf1 - 2;
                let k2_hit = iy <= 1 || iy >= nf2 - 2;
                if k1_hit && k2_hit {
                    written += 1;
                } else {
                    assert_eq!(v, Complex::default(), "cell ({ix},{iy}) not zeroed");
                }
            }
        }
        assert_eq!(written, ms * mt);
    }

    #[test]
    fn round_trip_grid_modes_grid_is_identity_on_modes() {
        let (ms, mt) = (7usize, 6usize);
        let (nf1, nf2) = (18usize, 20usize);
        let ker1: Vec<f64> = (0..=nf1 / 2).map(|k| 1.0 + 0.1 * k as f64).collect();
        let ker2: Vec<f64> = (0..=nf2 / 2).map(|k| 2.0 - 0.05 * k as f64).collect();
        let mut fk0 = random_grid(ms * mt);
        let mut fw = vec![Complex::default(); nf1 * nf2];
        deconvolve_shuffle_2d(
            DeconvDir::ModesToGrid,
            &ker1,
            &ker2,
            ms,
            mt,
            &mut fk0,
            nf1,
            nf2,
            &mut fw,
            ModeOrder::Fft,
        );
        // both directions divide by their table, so reciprocal tables undo it
        let inv1: Vec<f64> = ker1.iter().map(|&v| 1.0 / v).collect();
        let inv2: Vec<f64> = ker2.iter().map(|&v| 1.0 / v).collect();
        let mut fk1 = vec![Complex::default(); ms * mt];
        deconvolve_shuffle_2d(
            DeconvDir::GridToModes,
            &inv1,
            &inv2,
            ms,
            mt,
            &mut fk1,
            nf1,
            nf2,
            &mut fw,
            ModeOrder::Fft,
        );
        for (a, b) in fk0.iter().zip(fk1.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }
}
