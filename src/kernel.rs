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
use crate::err::{try_vec, NufftError};
use crate::spread::SpreadOpts;
use crate::NufftSample;
use num_traits::AsPrimitive;
use rayon::prelude::*;

/// Upper bound on quadrature nodes for the widest kernel.
const MAX_NQUAD: usize = 100;

/// Exponential-of-semicircle kernel, phi(x) = exp(beta*(sqrt(1-(2x/ns)^2)-1))
/// on |x| < ns/2 and zero outside. Real, even, smooth inside its support.
#[inline]
pub(crate) fn evaluate_kernel<T: NufftSample>(x: T, opts: &SpreadOpts<T>) -> T {
    // Float::abs spelled out: the FFT backend bound also carries Signed
    if num_traits::Float::abs(x) >= opts.es_halfwidth {
        T::zero()
    } else {
        (opts.es_beta * ((T::one() - opts.es_c * x * x).sqrt() - T::one())).exp()
    }
}

/// ns kernel samples at unit stride from the leftmost offset x1. Offsets stay
/// inside [-ns/2, ns/2] by construction; the max(0) absorbs the half-ulp the
/// offset subtraction can push past the edge.
#[inline]
pub(crate) fn eval_kernel_row<T: NufftSample>(out: &mut [T], x1: T, opts: &SpreadOpts<T>)
where
    usize: AsPrimitive<T>,
{
    for (i, dst) in out.iter_mut().enumerate() {
        let z = x1 + AsPrimitive::<T>::as_(i);
        let arg = (T::one() - opts.es_c * z * z).max(T::zero());
        *dst = (opts.es_beta * (arg.sqrt() - T::one())).exp();
    }
}

/// Gauss-Legendre nodes and weights on [-1, 1], Newton iteration on the
/// three-term recurrence.
pub(crate) fn gauss_legendre(n: usize) -> Result<(Vec<f64>, Vec<f64>), NufftError> {
    let mut x = try_vec![0.0f64; n];
    let mut w = try_vec![0.0f64; n];
    let m = n.div_ceil(2);
    for i in 0..m {
        let mut z = (std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut pp = 0.0;
        for _ in 0..100 {
            let mut p1 = 1.0;
            let mut p2 = 0.0;
            for j in 0..n {
                let p3 = p2;
                p2 = p1;
                p1 = ((2.0 * j as f64 + 1.0) * z * p2 - j as f64 * p3) / (j as f64 + 1.0);
            }
            pp = n as f64 * (z * p1 - p2) / (z * z - 1.0);
            let z1 = z;
            z = z1 - p1 / pp;
            if (z - z1).abs() < 1e-15 {
                break;
            }
        }
        x[i] = -z;
        x[n - 1 - i] = z;
        w[i] = 2.0 / ((1.0 - z * z) * pp * pp);
        w[n - 1 - i] = w[i];
    }
    Ok((x, w))
}

/// Positive half of a 2q-node symmetric rule, rescaled to the kernel support
/// (0, ns/2], with the kernel value folded into the weight.
fn quadrature_nodes<T: NufftSample>(
    q: usize,
    opts: &SpreadOpts<T>,
) -> Result<([T; MAX_NQUAD], [T; MAX_NQUAD], usize), NufftError>
where
    f64: AsPrimitive<T>,
{
    let j2 = opts.nspread as f64 * 0.5;
    let (z, w) = gauss_legendre(2 * q)?;
    let mut zn = [T::zero(); MAX_NQUAD];
    let mut fn_ = [T::zero(); MAX_NQUAD];
    let mut nq = 0usize;
    for (&zi, &wi) in z.iter().zip(w.iter()) {
        if zi > 0.0 {
            let zt: T = (zi * j2).as_();
            zn[nq] = zt;
            fn_[nq] = AsPrimitive::<T>::as_(j2 * wi) * evaluate_kernel(zt, opts);
            nq += 1;
        }
    }
    Ok((zn, fn_, nq))
}

/// Fourier series coefficients of the kernel on an nf-point grid, modes
/// k = 0..nf/2, by quadrature on the cosine transform. The periodic fold
/// places the domain origin half a grid off, which negates odd modes.
pub(crate) fn onedim_fseries_kernel<T: NufftSample>(
    nf: usize,
    fwkerhalf: &mut [T],
    opts: &SpreadOpts<T>,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
{
    debug_assert_eq!(fwkerhalf.len(), nf / 2 + 1);
    let j2 = opts.nspread as f64 * 0.5;
    let q = (2.0 + 3.0 * j2) as usize;
    let (zn, fn_, nq) = quadrature_nodes(q, opts)?;
    let two: T = 2.0f64.as_();
    let mut rates = [T::zero(); MAX_NQUAD];
    for (rate, &z) in rates[..nq].iter_mut().zip(zn[..nq].iter()) {
        *rate = AsPrimitive::<T>::as_(std::f64::consts::TAU / nf as f64) * z;
    }
    fwkerhalf.par_iter_mut().enumerate().for_each(|(k, dst)| {
        let kt: T = k.as_();
        let mut x = T::zero();
        for (&f, &rate) in fn_[..nq].iter().zip(rates[..nq].iter()) {
            x = x + two * f * (rate * kt).cos();
        }
        *dst = if k % 2 == 1 { -x } else { x };
    });
    Ok(())
}

/// Fourier transform of the kernel at arbitrary frequencies s (in grid
/// units), for the type-3 deconvolution. Strictly positive for |s| below the
/// kernel cutoff.
pub(crate) fn onedim_nuft_kernel<T: NufftSample>(
    s: &[T],
    phihat: &mut [T],
    opts: &SpreadOpts<T>,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
{
    debug_assert_eq!(s.len(), phihat.len());
    let j2 = opts.nspread as f64 * 0.5;
    let q = (2.0 + 2.0 * j2) as usize;
    let (zn, fn_, nq) = quadrature_nodes(q, opts)?;
    let two: T = 2.0f64.as_();
    phihat
        .par_iter_mut()
        .zip(s.par_iter())
        .for_each(|(dst, &sk)| {
            let mut x = T::zero();
            for (&f, &z) in fn_[..nq].iter().zip(zn[..nq].iter()) {
                x = x + two * f * (sk * z).cos();
            }
            *dst = x;
        });
    Ok(())
}
