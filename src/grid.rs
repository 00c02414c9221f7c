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
use crate::NufftSample;
use num_traits::AsPrimitive;

/// Hard cap on the number of oversampled grid cells one transform may
/// allocate.
pub(crate) const MAX_NF: u64 = 100_000_000_000;

/// Intervals nearly centered on the origin are snapped to it when the center
/// is below this fraction of the half-width.
const ARRAYWIDCEN_GROWFRAC: f64 = 0.1;

/// Smallest even integer not less than n whose prime factors are all in
/// {2, 3, 5}, the sizes the FFT backend dispatches fastest.
pub(crate) fn next235even(n: u64) -> u64 {
    if n <= 2 {
        return 2;
    }
    let mut nplus = if n % 2 == 1 { n + 1 } else { n };
    loop {
        let mut numdiv = nplus;
        while numdiv % 2 == 0 {
            numdiv /= 2;
        }
        while numdiv % 3 == 0 {
            numdiv /= 3;
        }
        while numdiv % 5 == 0 {
            numdiv /= 5;
        }
        if numdiv == 1 {
            return nplus;
        }
        nplus += 2;
    }
}

/// Fine-grid length for a type-1/2 dimension of m modes.
pub(crate) fn set_nf_type12(m: usize, upsampfac: f64, nspread: usize) -> usize {
    let mut nf = (upsampfac * m as f64) as u64;
    if nf < 2 * nspread as u64 {
        nf = 2 * nspread as u64;
    }
    // the 2-3-5 search gets expensive near the cap, and the caller rejects
    // such sizes anyway
    if nf < MAX_NF {
        nf = next235even(nf);
    }
    nf as usize
}

/// Half-width and center of the interval enclosing all values. Non-finite
/// for an empty slice.
pub(crate) fn arraywidcen<T: NufftSample>(a: &[T]) -> (T, T)
where
    f64: AsPrimitive<T>,
{
    let mut lo = T::infinity();
    let mut hi = T::neg_infinity();
    for &v in a.iter() {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    let half: T = 0.5f64.as_();
    let mut w = (hi - lo) * half;
    let mut c = (hi + lo) * half;
    let c_mag = num_traits::Float::abs(c);
    if c_mag < AsPrimitive::<T>::as_(ARRAYWIDCEN_GROWFRAC) * w {
        w = w + c_mag;
        c = T::zero();
    }
    (w, c)
}

/// Type-3 grid choice for one dimension: from the source half-width X and
/// target half-width S, picks the fine-grid length nf, its spacing h, and the
/// coordinate rescale factor gamma so the inner type-1 problem has spatial
/// half-width pi*gamma and the rescaled targets fall inside the kernel
/// cutoff.
pub(crate) fn set_nhg_type3<T: NufftSample>(
    s_width: T,
    x_width: T,
    upsampfac: f64,
    nspread: usize,
) -> (usize, T, T)
where
    f64: AsPrimitive<T>,
{
    let nss = nspread + 1;
    let mut xsafe: f64 = x_width.as_();
    let mut ssafe: f64 = s_width.as_();
    // degenerate clusters still need X*S >= 1 for a sane grid
    if xsafe == 0.0 {
        if ssafe == 0.0 {
            xsafe = 1.0;
            ssafe = 1.0;
        } else {
            xsafe = xsafe.max(1.0 / ssafe);
        }
    } else {
        ssafe = ssafe.max(1.0 / xsafe);
    }
    let mut nfd = 2.0 * upsampfac * ssafe * xsafe / std::f64::consts::PI + nss as f64;
    if !nfd.is_finite() {
        nfd = 0.0;
    }
    let mut nf = nfd as u64;
    if nf < 2 * nspread as u64 {
        nf = 2 * nspread as u64;
    }
    if nf < MAX_NF {
        nf = next235even(nf);
    }
    let h = std::f64::consts::TAU / nf as f64;
    let gam = nf as f64 / (2.0 * upsampfac * ssafe);
    (nf as usize, h.as_(), gam.as_())
}
