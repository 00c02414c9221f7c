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
use crate::kernel::eval_kernel_row;
use crate::{NufftOpts, NufftSample, SpreadSort};
use log::debug;
use num_complex::Complex;
use num_traits::AsPrimitive;
use rayon::prelude::*;
use std::time::Instant;

pub(crate) const MIN_NSPREAD: usize = 4;
pub(crate) const MAX_NSPREAD: usize = 16;

/// Points above this count per subproblem get their own private subgrid.
const MAX_SUBPROBLEM_SIZE: usize = 10_000;

/// Heuristic sort cutoffs: below both, the bin sort does not pay for itself.
const SORT_NJ_CUTOFF: usize = 10_000;
const SORT_GRID_CUTOFF: usize = 1 << 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SpreadDir {
    /// Nonuniform strengths accumulated onto the fine grid.
    Spread,
    /// Fine grid sampled back at the nonuniform points.
    Interp,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct SpreadOpts<T> {
    pub nspread: usize,
    pub es_beta: T,
    pub es_c: T,
    pub es_halfwidth: T,
    pub direction: SpreadDir,
    pub pirange: bool,
    pub chkbnds: bool,
    pub sort: SpreadSort,
    pub debug: u32,
}

/// Kernel width and shape from the requested tolerance and oversampling.
pub(crate) fn setup_spreader<T: NufftSample>(
    eps: T,
    upsampfac: f64,
) -> Result<SpreadOpts<T>, NufftError>
where
    f64: AsPrimitive<T>,
{
    let eps64: f64 = eps.as_();
    let mach: f64 = T::epsilon().as_();
    if !(eps64 >= 0.5 * mach && eps64 < 1.0) {
        return Err(NufftError::EpsTooSmall(eps64));
    }
    // one digit of accuracy per grid cell of width at sigma=2, else the
    // cutoff formula for general sigma
    let ns = if upsampfac == 2.0 {
        (-(eps64 / 10.0).log10()).ceil() as usize
    } else {
        (-eps64.ln() / (std::f64::consts::PI * (1.0 - 1.0 / upsampfac).sqrt())).ceil() as usize
    };
    let ns = ns.clamp(MIN_NSPREAD, MAX_NSPREAD);
    let betaoverns = if upsampfac == 2.0 {
        match ns {
            4 => 2.38,
            _ => 2.30,
        }
    } else {
        0.97 * std::f64::consts::PI * (1.0 - 0.5 / upsampfac)
    };
    Ok(SpreadOpts {
        nspread: ns,
        es_beta: (betaoverns * ns as f64).as_(),
        es_c: (4.0 / (ns * ns) as f64).as_(),
        es_halfwidth: (ns as f64 * 0.5).as_(),
        direction: SpreadDir::Spread,
        pirange: true,
        chkbnds: true,
        sort: SpreadSort::Heuristic,
        debug: 0,
    })
}

pub(crate) fn setup_spreader_for_nufft<T: NufftSample>(
    eps: T,
    opts: &NufftOpts,
    direction: SpreadDir,
) -> Result<SpreadOpts<T>, NufftError>
where
    f64: AsPrimitive<T>,
{
    let mut sp = setup_spreader(eps, opts.upsampfac)?;
    sp.direction = direction;
    sp.sort = opts.spread_sort;
    sp.chkbnds = opts.chkbnds;
    sp.debug = opts.spread_debug;
    sp.pirange = true;
    Ok(sp)
}

/// One periodic wrap from [-3pi, 3pi] (or [-nf, 2nf] in grid units) into [0, nf).
#[inline]
pub(crate) fn fold_rescale<T: NufftSample>(x: T, nf: usize, pirange: bool) -> T
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
{
    let n: T = nf.as_();
    if pirange {
        let half: T = 0.5f64.as_();
        let inv_two_pi: T = (0.5 / std::f64::consts::PI).as_();
        let z = x * inv_two_pi + half;
        (z - z.floor()) * n
    } else if x < T::zero() {
        x + n
    } else if x >= n {
        x - n
    } else {
        x
    }
}

#[inline]
pub(crate) fn wrap(i: i64, n: usize) -> usize {
    let n = n as i64;
    let mut v = i % n;
    if v < 0 {
        v += n;
    }
    v as usize
}

fn check_dim<T: NufftSample>(coords: &[T], nf: usize, pirange: bool) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
{
    let (lo, hi): (T, T) = if pirange {
        // a few ulps of slack so a 3*pi computed in the caller's own
        // arithmetic rounds in, not out
        let three_pi: T = (3.0 * std::f64::consts::PI).as_();
        let slack: T = T::one() + AsPrimitive::<T>::as_(4.0) * T::epsilon();
        let lim = three_pi * slack;
        (-lim, lim)
    } else {
        let n: T = nf.as_();
        (-n, n + n)
    };
    for &x in coords.iter() {
        // NaN fails the comparison and is rejected too
        if !(x >= lo && x <= hi) {
            let bad: f64 = x.as_();
            return Err(NufftError::PointsOutOfRange(bad));
        }
    }
    Ok(())
}

pub(crate) fn check_points<T: NufftSample>(
    nf1: usize,
    nf2: usize,
    xj: &[T],
    yj: &[T],
    opts: &SpreadOpts<T>,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
{
    if !opts.chkbnds {
        return Ok(());
    }
    check_dim(xj, nf1, opts.pirange)?;
    check_dim(yj, nf2, opts.pirange)
}

pub(crate) struct SortPlan {
    pub idx: Vec<usize>,
    pub did_sort: bool,
}

/// Permutation of the input points grouping them by coarse spatial bin, so
/// that the traversal touches the grid in coherent blocks. Counting sort over
/// ns-by-ns bins, bins concatenated row-major.
pub(crate) fn plan_sort<T: NufftSample>(
    nf1: usize,
    nf2: usize,
    xj: &[T],
    yj: &[T],
    opts: &SpreadOpts<T>,
) -> Result<SortPlan, NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
{
    let nj = xj.len();
    let do_sort = nj > 0
        && match opts.sort {
            SpreadSort::Never => false,
            SpreadSort::Always => true,
            SpreadSort::Heuristic => nj >= SORT_NJ_CUTOFF || nf1 * nf2 >= SORT_GRID_CUTOFF,
        };
    let mut idx = try_vec![0usize; nj];
    if !do_sort {
        for (i, dst) in idx.iter_mut().enumerate() {
            *dst = i;
        }
        return Ok(SortPlan {
            idx,
            did_sort: false,
        });
    }

    let start = Instant::now();
    let bs = opts.nspread.max(MIN_NSPREAD);
    let nbins1 = nf1.div_ceil(bs);
    let nbins2 = nf2.div_ceil(bs);
    let mut counts = try_vec![0usize; nbins1 * nbins2];
    let mut bins = try_vec![0usize; nj];
    for (dst, (&x, &y)) in bins.iter_mut().zip(xj.iter().zip(yj.iter())) {
        let gx: usize = fold_rescale(x, nf1, opts.pirange).as_();
        let gy: usize = fold_rescale(y, nf2, opts.pirange).as_();
        let b1 = (gx / bs).min(nbins1 - 1);
        let b2 = (gy / bs).min(nbins2 - 1);
        let b = b1 + nbins1 * b2;
        *dst = b;
        counts[b] += 1;
    }
    let mut offset = 0usize;
    for c in counts.iter_mut() {
        let here = *c;
        *c = offset;
        offset += here;
    }
    for (j, &b) in bins.iter().enumerate() {
        idx[counts[b]] = j;
        counts[b] += 1;
    }
    if opts.debug > 0 {
        debug!(
            "bin sort ({nj} pts, {nbins1}x{nbins2} bins):\t {:.3e} s",
            start.elapsed().as_secs_f64()
        );
    }
    Ok(SortPlan {
        idx,
        did_sort: true,
    })
}

/// Bounds check plus traversal-order plan in one step: the shared front half
/// of every transfer, which the batched paths run once and reuse.
pub(crate) fn check_and_sort<T: NufftSample>(
    nf1: usize,
    nf2: usize,
    xj: &[T],
    yj: &[T],
    opts: &SpreadOpts<T>,
) -> Result<SortPlan, NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
{
    check_points(nf1, nf2, xj, yj, opts)?;
    plan_sort(nf1, nf2, xj, yj, opts)
}

struct Subgrid<T> {
    off1: i64,
    off2: i64,
    size1: usize,
    size2: usize,
    du: Vec<Complex<T>>,
}

fn spread_subproblem<T: NufftSample>(
    chunk: &[usize],
    nf1: usize,
    nf2: usize,
    xj: &[T],
    yj: &[T],
    cj: &[Complex<T>],
    opts: &SpreadOpts<T>,
) -> Result<Subgrid<T>, NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    let ns = opts.nspread;
    let m = chunk.len();
    let mut fx = try_vec![T::zero(); m];
    let mut fy = try_vec![T::zero(); m];
    let mut i1s = try_vec![0i64; m];
    let mut i2s = try_vec![0i64; m];
    let (mut min1, mut max1) = (i64::MAX, i64::MIN);
    let (mut min2, mut max2) = (i64::MAX, i64::MIN);
    for (k, &j) in chunk.iter().enumerate() {
        let x = fold_rescale(xj[j], nf1, opts.pirange);
        let y = fold_rescale(yj[j], nf2, opts.pirange);
        let i1: i64 = (x - opts.es_halfwidth).ceil().as_();
        let i2: i64 = (y - opts.es_halfwidth).ceil().as_();
        fx[k] = x;
        fy[k] = y;
        i1s[k] = i1;
        i2s[k] = i2;
        min1 = min1.min(i1);
        max1 = max1.max(i1);
        min2 = min2.min(i2);
        max2 = max2.max(i2);
    }
    let size1 = (max1 - min1) as usize + ns;
    let size2 = (max2 - min2) as usize + ns;
    let mut du = try_vec![Complex::<T>::default(); size1 * size2];

    let mut ker1 = [T::zero(); MAX_NSPREAD];
    let mut ker2 = [T::zero(); MAX_NSPREAD];
    for (k, &j) in chunk.iter().enumerate() {
        let x1: T = AsPrimitive::<T>::as_(i1s[k]) - fx[k];
        let y1: T = AsPrimitive::<T>::as_(i2s[k]) - fy[k];
        eval_kernel_row(&mut ker1[..ns], x1, opts);
        eval_kernel_row(&mut ker2[..ns], y1, opts);
        let cval = cj[j];
        let ox = (i1s[k] - min1) as usize;
        let oy = (i2s[k] - min2) as usize;
        for (dy, &ky) in ker2[..ns].iter().enumerate() {
            let row = (oy + dy) * size1 + ox;
            for (dst, &kx) in du[row..row + ns].iter_mut().zip(ker1[..ns].iter()) {
                *dst += cval * (kx * ky);
            }
        }
    }
    Ok(Subgrid {
        off1: min1,
        off2: min2,
        size1,
        size2,
        du,
    })
}

fn add_wrapped_subgrid<T: NufftSample>(
    fw: &mut [Complex<T>],
    nf1: usize,
    nf2: usize,
    sub: &Subgrid<T>,
) {
    for dy in 0..sub.size2 {
        let iy = wrap(sub.off2 + dy as i64, nf2);
        let dst = iy * nf1;
        let src = dy * sub.size1;
        for dx in 0..sub.size1 {
            let ix = wrap(sub.off1 + dx as i64, nf1);
            fw[dst + ix] += sub.du[src + dx];
        }
    }
}

fn spread_direct<T: NufftSample>(
    plan: &SortPlan,
    nf1: usize,
    nf2: usize,
    fw: &mut [Complex<T>],
    xj: &[T],
    yj: &[T],
    cj: &[Complex<T>],
    opts: &SpreadOpts<T>,
) where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    let ns = opts.nspread;
    let mut ker1 = [T::zero(); MAX_NSPREAD];
    let mut ker2 = [T::zero(); MAX_NSPREAD];
    for &j in plan.idx.iter() {
        let x = fold_rescale(xj[j], nf1, opts.pirange);
        let y = fold_rescale(yj[j], nf2, opts.pirange);
        let i1: i64 = (x - opts.es_halfwidth).ceil().as_();
        let i2: i64 = (y - opts.es_halfwidth).ceil().as_();
        let x1: T = AsPrimitive::<T>::as_(i1) - x;
        let y1: T = AsPrimitive::<T>::as_(i2) - y;
        eval_kernel_row(&mut ker1[..ns], x1, opts);
        eval_kernel_row(&mut ker2[..ns], y1, opts);
        let cval = cj[j];
        for (dy, &ky) in ker2[..ns].iter().enumerate() {
            let base = wrap(i2 + dy as i64, nf2) * nf1;
            for (dx, &kx) in ker1[..ns].iter().enumerate() {
                let ix = wrap(i1 + dx as i64, nf1);
                fw[base + ix] += cval * (kx * ky);
            }
        }
    }
}

/// Direction-1 transfer: accumulate every strength onto its ns-by-ns kernel
/// footprint. The grid is zeroed here, so each call owns its output slice.
///
/// With a sort plan and more than one worker the sorted order is cut into
/// bounded subproblems spread into private padded subgrids, which are folded
/// back into fw after the parallel region; no cell is ever write-shared.
pub(crate) fn spread_sorted<T: NufftSample>(
    plan: &SortPlan,
    nf1: usize,
    nf2: usize,
    fw: &mut [Complex<T>],
    xj: &[T],
    yj: &[T],
    cj: &[Complex<T>],
    opts: &SpreadOpts<T>,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    debug_assert_eq!(opts.direction, SpreadDir::Spread);
    let start = Instant::now();
    for v in fw.iter_mut() {
        *v = Complex::default();
    }
    if xj.is_empty() {
        return Ok(());
    }
    if rayon::current_num_threads() > 1 && plan.did_sort {
        let subgrids = plan
            .idx
            .par_chunks(MAX_SUBPROBLEM_SIZE)
            .map(|chunk| spread_subproblem(chunk, nf1, nf2, xj, yj, cj, opts))
            .collect::<Result<Vec<_>, NufftError>>()?;
        for sub in subgrids.iter() {
            add_wrapped_subgrid(fw, nf1, nf2, sub);
        }
    } else {
        spread_direct(plan, nf1, nf2, fw, xj, yj, cj, opts);
    }
    if opts.debug > 0 {
        debug!(
            "spread dir=1 ({} pts, sorted={}):\t {:.3e} s",
            xj.len(),
            plan.did_sort,
            start.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

/// Complete direction-1 transfer for one set of strengths: bounds check, bin
/// sort, then the sorted spread. The single-transform paths and the type-3
/// inner spread come through here.
pub(crate) fn spread<T: NufftSample>(
    nf1: usize,
    nf2: usize,
    fw: &mut [Complex<T>],
    xj: &[T],
    yj: &[T],
    cj: &[Complex<T>],
    opts: &SpreadOpts<T>,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    let plan = check_and_sort(nf1, nf2, xj, yj, opts)?;
    spread_sorted(&plan, nf1, nf2, fw, xj, yj, cj, opts)
}

#[inline]
fn interp_one<T: NufftSample>(
    fw: &[Complex<T>],
    nf1: usize,
    nf2: usize,
    x: T,
    y: T,
    opts: &SpreadOpts<T>,
) -> Complex<T>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    let ns = opts.nspread;
    let mut ker1 = [T::zero(); MAX_NSPREAD];
    let mut ker2 = [T::zero(); MAX_NSPREAD];
    let i1: i64 = (x - opts.es_halfwidth).ceil().as_();
    let i2: i64 = (y - opts.es_halfwidth).ceil().as_();
    let x1: T = AsPrimitive::<T>::as_(i1) - x;
    let y1: T = AsPrimitive::<T>::as_(i2) - y;
    eval_kernel_row(&mut ker1[..ns], x1, opts);
    eval_kernel_row(&mut ker2[..ns], y1, opts);
    let mut acc = Complex::<T>::default();
    for (dy, &ky) in ker2[..ns].iter().enumerate() {
        let base = wrap(i2 + dy as i64, nf2) * nf1;
        for (dx, &kx) in ker1[..ns].iter().enumerate() {
            let ix = wrap(i1 + dx as i64, nf1);
            acc += fw[base + ix] * (kx * ky);
        }
    }
    acc
}

/// Direction-2 transfer: sample the fine grid at every nonuniform point.
/// Evaluated in sorted order for read locality, scattered back afterwards.
pub(crate) fn interp_sorted<T: NufftSample>(
    plan: &SortPlan,
    nf1: usize,
    nf2: usize,
    fw: &[Complex<T>],
    xj: &[T],
    yj: &[T],
    cj: &mut [Complex<T>],
    opts: &SpreadOpts<T>,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    debug_assert_eq!(opts.direction, SpreadDir::Interp);
    let start = Instant::now();
    let nj = xj.len();
    if nj == 0 {
        return Ok(());
    }
    let mut vals = try_vec![Complex::<T>::default(); nj];
    vals.par_iter_mut()
        .zip(plan.idx.par_iter())
        .for_each(|(dst, &j)| {
            let x = fold_rescale(xj[j], nf1, opts.pirange);
            let y = fold_rescale(yj[j], nf2, opts.pirange);
            *dst = interp_one(fw, nf1, nf2, x, y, opts);
        });
    for (&j, &v) in plan.idx.iter().zip(vals.iter()) {
        cj[j] = v;
    }
    if opts.debug > 0 {
        debug!(
            "interp dir=2 ({nj} pts, sorted={}):\t {:.3e} s",
            plan.did_sort,
            start.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

/// Complete direction-2 transfer: bounds check, bin sort, then the sorted
/// gather back to the nonuniform points.
pub(crate) fn interpolate<T: NufftSample>(
    nf1: usize,
    nf2: usize,
    fw: &[Complex<T>],
    xj: &[T],
    yj: &[T],
    cj: &mut [Complex<T>],
    opts: &SpreadOpts<T>,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    let plan = check_and_sort(nf1, nf2, xj, yj, opts)?;
    interp_sorted(&plan, nf1, nf2, fw, xj, yj, cj, opts)
}
