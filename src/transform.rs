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
use crate::deconvolve::{deconvolve_shuffle_2d, DeconvDir};
use crate::err::{try_vec, NufftError};
use crate::fft::Fft2dPlan;
use crate::grid::{arraywidcen, set_nf_type12, set_nhg_type3, MAX_NF};
use crate::kernel::{onedim_fseries_kernel, onedim_nuft_kernel};
use crate::spread::{
    check_and_sort, interp_sorted, interpolate, setup_spreader_for_nufft, spread, spread_sorted,
    SpreadDir, SpreadOpts,
};
use crate::{BatchMode, ModeOrder, NufftOpts, NufftSample};
use log::debug;
use num_complex::Complex;
use num_traits::AsPrimitive;
use rayon::prelude::*;
use std::time::Instant;

#[inline]
fn expect_len(expected: usize, got: usize) -> Result<(), NufftError> {
    if expected != got {
        return Err(NufftError::MismatchedLength(expected, got));
    }
    Ok(())
}

struct Type12Setup<T> {
    spopts: SpreadOpts<T>,
    nf1: usize,
    nf2: usize,
    fwkerhalf1: Vec<T>,
    fwkerhalf2: Vec<T>,
}

/// Step 0 shared by every type-1/2 path: spreader parameters, fine-grid
/// sizes, allocation cap, and the kernel Fourier-series tables per dimension.
fn setup_type12<T: NufftSample>(
    eps: T,
    ms: usize,
    mt: usize,
    nj: usize,
    opts: &NufftOpts,
    direction: SpreadDir,
    label: &str,
) -> Result<Type12Setup<T>, NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
{
    let spopts = setup_spreader_for_nufft(eps, opts, direction)?;
    let nf1 = set_nf_type12(ms, opts.upsampfac, spopts.nspread);
    let nf2 = set_nf_type12(mt, opts.upsampfac, spopts.nspread);
    let cells = nf1 as u64 * nf2 as u64;
    if cells > MAX_NF {
        return Err(NufftError::GridTooLarge(cells, MAX_NF));
    }
    if opts.debug > 0 {
        debug!("{label}: (ms,mt)=({ms},{mt}) (nf1,nf2)=({nf1},{nf2}) nj={nj}");
    }
    let start = Instant::now();
    let mut fwkerhalf1 = try_vec![T::zero(); nf1 / 2 + 1];
    let mut fwkerhalf2 = try_vec![T::zero(); nf2 / 2 + 1];
    onedim_fseries_kernel(nf1, &mut fwkerhalf1, &spopts)?;
    onedim_fseries_kernel(nf2, &mut fwkerhalf2, &spopts)?;
    if opts.debug > 0 {
        debug!(
            "kernel fser (ns={}):\t {:.3e} s",
            spopts.nspread,
            start.elapsed().as_secs_f64()
        );
    }
    Ok(Type12Setup {
        spopts,
        nf1,
        nf2,
        fwkerhalf1,
        fwkerhalf2,
    })
}

/// Type-1 2D transform: fk[k1,k2] = sum_j cj[j] exp(+-i (k1 xj[j] + k2 yj[j]))
/// over k1 in [-ms/2, (ms-1)/2], k2 in [-mt/2, (mt-1)/2], to relative
/// tolerance eps. Coordinates lie in [-3pi, 3pi]; fk is ms-fast, mt-slow with
/// the ordering picked by opts.modeord. A nonnegative iflag selects the +
/// sign in the exponential.
pub fn nufft2d1<T: NufftSample>(
    xj: &[T],
    yj: &[T],
    cj: &[Complex<T>],
    iflag: i32,
    eps: T,
    ms: usize,
    mt: usize,
    fk: &mut [Complex<T>],
    opts: &NufftOpts,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    let nj = xj.len();
    expect_len(nj, yj.len())?;
    expect_len(nj, cj.len())?;
    expect_len(ms * mt, fk.len())?;
    let setup = setup_type12(eps, ms, mt, nj, opts, SpreadDir::Spread, "2d1")?;
    let (nf1, nf2) = (setup.nf1, setup.nf2);

    let start = Instant::now();
    let mut fw = try_vec![Complex::<T>::default(); nf1 * nf2];
    let plan = Fft2dPlan::<T>::new(nf1, nf2, 1, iflag);
    if opts.debug > 0 {
        debug!("fft plan:\t\t {:.3e} s", start.elapsed().as_secs_f64());
    }

    let start = Instant::now();
    spread(nf1, nf2, &mut fw, xj, yj, cj, &setup.spopts)?;
    if opts.debug > 0 {
        debug!("spread:\t\t\t {:.3e} s", start.elapsed().as_secs_f64());
    }

    let start = Instant::now();
    plan.execute(&mut fw)?;
    if opts.debug > 0 {
        debug!(
            "fft ({} threads):\t {:.3e} s",
            rayon::current_num_threads(),
            start.elapsed().as_secs_f64()
        );
    }

    let start = Instant::now();
    deconvolve_shuffle_2d(
        DeconvDir::GridToModes,
        &setup.fwkerhalf1,
        &setup.fwkerhalf2,
        ms,
        mt,
        fk,
        nf1,
        nf2,
        &mut fw,
        opts.modeord,
    );
    if opts.debug > 0 {
        debug!("deconvolve & copy out:\t {:.3e} s", start.elapsed().as_secs_f64());
    }
    Ok(())
}

/// Type-2 2D transform: cj[j] = sum_{k1,k2} fk[k1,k2] exp(+-i (k1 xj[j] +
/// k2 yj[j])), the evaluation of a given Fourier series at nonuniform
/// points. fk is read, cj written; layouts as in [`nufft2d1`].
pub fn nufft2d2<T: NufftSample>(
    xj: &[T],
    yj: &[T],
    cj: &mut [Complex<T>],
    iflag: i32,
    eps: T,
    ms: usize,
    mt: usize,
    fk: &mut [Complex<T>],
    opts: &NufftOpts,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    let nj = xj.len();
    expect_len(nj, yj.len())?;
    expect_len(nj, cj.len())?;
    expect_len(ms * mt, fk.len())?;
    let setup = setup_type12(eps, ms, mt, nj, opts, SpreadDir::Interp, "2d2")?;
    let (nf1, nf2) = (setup.nf1, setup.nf2);

    let start = Instant::now();
    let mut fw = try_vec![Complex::<T>::default(); nf1 * nf2];
    let plan = Fft2dPlan::<T>::new(nf1, nf2, 1, iflag);
    if opts.debug > 0 {
        debug!("fft plan:\t\t {:.3e} s", start.elapsed().as_secs_f64());
    }

    let start = Instant::now();
    deconvolve_shuffle_2d(
        DeconvDir::ModesToGrid,
        &setup.fwkerhalf1,
        &setup.fwkerhalf2,
        ms,
        mt,
        fk,
        nf1,
        nf2,
        &mut fw,
        opts.modeord,
    );
    if opts.debug > 0 {
        debug!("amplify & copy in:\t {:.3e} s", start.elapsed().as_secs_f64());
    }

    let start = Instant::now();
    plan.execute(&mut fw)?;
    if opts.debug > 0 {
        debug!(
            "fft ({} threads):\t {:.3e} s",
            rayon::current_num_threads(),
            start.elapsed().as_secs_f64()
        );
    }

    let start = Instant::now();
    interpolate(nf1, nf2, &fw, xj, yj, cj, &setup.spopts)?;
    if opts.debug > 0 {
        debug!("unspread:\t\t {:.3e} s", start.elapsed().as_secs_f64());
    }
    Ok(())
}

/// Type-3 2D transform: fk[k] = sum_j cj[j] exp(+-i (s[k] xj[j] + t[k]
/// yj[j])) for arbitrary real source points and target frequencies. Runs a
/// type-1-style spread on centered, rescaled sources, evaluates the grid at
/// the rescaled targets through a type-2 call, and divides out the kernel
/// transform at each target.
pub fn nufft2d3<T: NufftSample>(
    xj: &[T],
    yj: &[T],
    cj: &[Complex<T>],
    iflag: i32,
    eps: T,
    s: &[T],
    t: &[T],
    fk: &mut [Complex<T>],
    opts: &NufftOpts,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    let nj = xj.len();
    let nk = s.len();
    expect_len(nj, yj.len())?;
    expect_len(nj, cj.len())?;
    expect_len(nk, t.len())?;
    expect_len(nk, fk.len())?;
    let mut spopts = setup_spreader_for_nufft(eps, opts, SpreadDir::Spread)?;

    // pick x and s intervals and shifts that minimize the fine grids
    let (x1w, c1) = arraywidcen(xj);
    let (s1w, d1) = arraywidcen(s);
    let (x2w, c2) = arraywidcen(yj);
    let (s2w, d2) = arraywidcen(t);
    let (nf1, h1, gam1) = set_nhg_type3(s1w, x1w, opts.upsampfac, spopts.nspread);
    let (nf2, h2, gam2) = set_nhg_type3(s2w, x2w, opts.upsampfac, spopts.nspread);
    if opts.debug > 0 {
        let (x1f, c1f, s1f, d1f): (f64, f64, f64, f64) = (x1w.as_(), c1.as_(), s1w.as_(), d1.as_());
        let g1: f64 = gam1.as_();
        debug!(
            "2d3: X1={x1f:.3} C1={c1f:.3} S1={s1f:.3} D1={d1f:.3} gam1={g1:.3} (nf1,nf2)=({nf1},{nf2}) nj={nj} nk={nk}"
        );
    }
    let cells = nf1 as u64 * nf2 as u64;
    if cells > MAX_NF {
        return Err(NufftError::GridTooLarge(cells, MAX_NF));
    }

    let sign: T = if iflag >= 0 { T::one() } else { -T::one() };
    let mut xpj = try_vec![T::zero(); nj];
    let mut ypj = try_vec![T::zero(); nj];
    for j in 0..nj {
        xpj[j] = (xj[j] - c1) / gam1;
        ypj[j] = (yj[j] - c2) / gam2;
    }
    let mut cpj = try_vec![Complex::<T>::default(); nj];
    if d1 != T::zero() || d2 != T::zero() {
        let start = Instant::now();
        cpj.par_iter_mut().enumerate().for_each(|(j, dst)| {
            *dst = cj[j] * Complex::cis(sign * (d1 * xj[j] + d2 * yj[j]));
        });
        if opts.debug > 0 {
            debug!("prephase:\t\t {:.3e} s", start.elapsed().as_secs_f64());
        }
    } else {
        cpj.copy_from_slice(cj);
    }

    // step 1: type-1-style spread of the rescaled sources
    let mut fw = try_vec![Complex::<T>::default(); nf1 * nf2];
    let start = Instant::now();
    spopts.direction = SpreadDir::Spread;
    spread(nf1, nf2, &mut fw, &xpj, &ypj, &cpj, &spopts)?;
    drop(xpj);
    drop(ypj);
    drop(cpj);
    if opts.debug > 0 {
        debug!("spread:\t\t\t {:.3e} s", start.elapsed().as_secs_f64());
    }

    // step 2: evaluate the grid as a Fourier series at the rescaled targets.
    // The grid is consumed as a mode array whose first entry is mode -nf/2,
    // so the inner call always runs in CMCL ordering.
    let start = Instant::now();
    let mut sp = try_vec![T::zero(); nk];
    let mut tp = try_vec![T::zero(); nk];
    for k in 0..nk {
        sp[k] = h1 * gam1 * (s[k] - d1);
        tp[k] = h2 * gam2 * (t[k] - d2);
    }
    let mut t2opts = *opts;
    t2opts.modeord = ModeOrder::Cmcl;
    nufft2d2(&sp, &tp, fk, iflag, eps, nf1, nf2, &mut fw, &t2opts)?;
    drop(fw);
    if opts.debug > 0 {
        debug!("total type-2:\t\t {:.3e} s", start.elapsed().as_secs_f64());
    }

    // step 3: kernel transform at the rescaled targets, then the center
    // shift phases
    let start = Instant::now();
    let mut fkker1 = try_vec![T::zero(); nk];
    let mut fkker2 = try_vec![T::zero(); nk];
    onedim_nuft_kernel(&sp, &mut fkker1, &spopts)?;
    onedim_nuft_kernel(&tp, &mut fkker2, &spopts)?;
    if opts.debug > 0 {
        debug!(
            "kernel FT (ns={}):\t {:.3e} s",
            spopts.nspread,
            start.elapsed().as_secs_f64()
        );
    }
    drop(sp);
    drop(tp);
    let start = Instant::now();
    if c1.is_finite() && c2.is_finite() && (c1 != T::zero() || c2 != T::zero()) {
        fk.par_iter_mut().enumerate().for_each(|(k, v)| {
            let scale = T::one() / (fkker1[k] * fkker2[k]);
            let phase = sign * ((s[k] - d1) * c1 + (t[k] - d2) * c2);
            *v = *v * Complex::cis(phase) * scale;
        });
    } else {
        fk.par_iter_mut().enumerate().for_each(|(k, v)| {
            *v = *v * (T::one() / (fkker1[k] * fkker2[k]));
        });
    }
    if opts.debug > 0 {
        debug!("deconvolve:\t\t {:.3e} s", start.elapsed().as_secs_f64());
    }
    Ok(())
}

fn nufft2d1_many_seq<T: NufftSample>(
    ndata: usize,
    xj: &[T],
    yj: &[T],
    c: &[Complex<T>],
    iflag: i32,
    eps: T,
    ms: usize,
    mt: usize,
    fk: &mut [Complex<T>],
    opts: &NufftOpts,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    let nj = xj.len();
    let setup = setup_type12(eps, ms, mt, nj, opts, SpreadDir::Spread, "2d1many")?;
    let (nf1, nf2) = (setup.nf1, setup.nf2);
    let mut fw = try_vec![Complex::<T>::default(); nf1 * nf2];
    let plan = Fft2dPlan::<T>::new(nf1, nf2, 1, iflag);
    let sort = check_and_sort(nf1, nf2, xj, yj, &setup.spopts)?;

    let (mut time_spread, mut time_fft, mut time_deconv) = (0.0f64, 0.0, 0.0);
    for i in 0..ndata {
        let cstart = &c[i * nj..(i + 1) * nj];
        let start = Instant::now();
        spread_sorted(&sort, nf1, nf2, &mut fw, xj, yj, cstart, &setup.spopts)?;
        time_spread += start.elapsed().as_secs_f64();

        let start = Instant::now();
        plan.execute(&mut fw)?;
        time_fft += start.elapsed().as_secs_f64();

        let start = Instant::now();
        let fkstart = &mut fk[i * ms * mt..(i + 1) * ms * mt];
        deconvolve_shuffle_2d(
            DeconvDir::GridToModes,
            &setup.fwkerhalf1,
            &setup.fwkerhalf2,
            ms,
            mt,
            fkstart,
            nf1,
            nf2,
            &mut fw,
            opts.modeord,
        );
        time_deconv += start.elapsed().as_secs_f64();
    }
    if opts.debug > 0 {
        debug!("[manyseq] spread:\t\t {time_spread:.3e} s");
        debug!(
            "[manyseq] fft ({} threads):\t {time_fft:.3e} s",
            rayon::current_num_threads()
        );
        debug!("[manyseq] deconvolve & copy out: {time_deconv:.3e} s");
        debug!(
            "[manyseq] total execute time:\t {:.3e} s",
            time_spread + time_fft + time_deconv
        );
    }
    Ok(())
}

fn nufft2d1_many_simul<T: NufftSample>(
    ndata: usize,
    xj: &[T],
    yj: &[T],
    c: &[Complex<T>],
    iflag: i32,
    eps: T,
    ms: usize,
    mt: usize,
    fk: &mut [Complex<T>],
    opts: &NufftOpts,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    let nj = xj.len();
    let setup = setup_type12(eps, ms, mt, nj, opts, SpreadDir::Spread, "2d1many")?;
    let (nf1, nf2) = (setup.nf1, setup.nf2);
    let cells = nf1 * nf2;
    let nth = rayon::current_num_threads();
    let mut fw = try_vec![Complex::<T>::default(); cells * nth];
    let plan = Fft2dPlan::<T>::new(nf1, nf2, nth, iflag);
    let sort = check_and_sort(nf1, nf2, xj, yj, &setup.spopts)?;

    let (mut time_spread, mut time_fft, mut time_deconv) = (0.0f64, 0.0, 0.0);
    let mut start_idx = 0usize;
    while start_idx < ndata {
        let nbatch = nth.min(ndata - start_idx);
        // each batch member spreads onto its own fw slice; errors surface at
        // the join
        let begin = Instant::now();
        fw.par_chunks_exact_mut(cells)
            .take(nbatch)
            .enumerate()
            .try_for_each(|(i, fwslice)| {
                let d = start_idx + i;
                spread_sorted(
                    &sort,
                    nf1,
                    nf2,
                    fwslice,
                    xj,
                    yj,
                    &c[d * nj..(d + 1) * nj],
                    &setup.spopts,
                )
            })?;
        time_spread += begin.elapsed().as_secs_f64();

        let begin = Instant::now();
        plan.execute(&mut fw)?;
        time_fft += begin.elapsed().as_secs_f64();

        let begin = Instant::now();
        fk[start_idx * ms * mt..(start_idx + nbatch) * ms * mt]
            .par_chunks_exact_mut(ms * mt)
            .zip(fw.par_chunks_exact_mut(cells))
            .for_each(|(fkslice, fwslice)| {
                deconvolve_shuffle_2d(
                    DeconvDir::GridToModes,
                    &setup.fwkerhalf1,
                    &setup.fwkerhalf2,
                    ms,
                    mt,
                    fkslice,
                    nf1,
                    nf2,
                    fwslice,
                    opts.modeord,
                )
            });
        time_deconv += begin.elapsed().as_secs_f64();
        start_idx += nbatch;
    }
    if opts.debug > 0 {
        debug!("[manysimul] spread:\t\t {time_spread:.3e} s");
        debug!("[manysimul] fft ({nth} threads):\t {time_fft:.3e} s");
        debug!("[manysimul] deconvolve & copy out: {time_deconv:.3e} s");
        debug!(
            "[manysimul] total execute time:\t {:.3e} s",
            time_spread + time_fft + time_deconv
        );
    }
    Ok(())
}

/// Batched type-1: ndata transforms sharing one point geometry. The kernel
/// tables, the sort, and the FFT plan are computed once; strengths advance
/// nj-fast, outputs ms*mt-fast with the transform index slowest. The batch
/// discipline comes from opts.batch_mode.
pub fn nufft2d1_many<T: NufftSample>(
    ndata: usize,
    xj: &[T],
    yj: &[T],
    c: &[Complex<T>],
    iflag: i32,
    eps: T,
    ms: usize,
    mt: usize,
    fk: &mut [Complex<T>],
    opts: &NufftOpts,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    if ndata < 1 {
        return Err(NufftError::InvalidBatchCount(ndata));
    }
    let nj = xj.len();
    expect_len(nj, yj.len())?;
    expect_len(nj * ndata, c.len())?;
    expect_len(ms * mt * ndata, fk.len())?;
    match opts.batch_mode {
        BatchMode::Sequential => {
            nufft2d1_many_seq(ndata, xj, yj, c, iflag, eps, ms, mt, fk, opts)
        }
        BatchMode::Simultaneous => {
            nufft2d1_many_simul(ndata, xj, yj, c, iflag, eps, ms, mt, fk, opts)
        }
    }
}

fn nufft2d2_many_seq<T: NufftSample>(
    ndata: usize,
    xj: &[T],
    yj: &[T],
    c: &mut [Complex<T>],
    iflag: i32,
    eps: T,
    ms: usize,
    mt: usize,
    fk: &mut [Complex<T>],
    opts: &NufftOpts,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    let nj = xj.len();
    let setup = setup_type12(eps, ms, mt, nj, opts, SpreadDir::Interp, "2d2many")?;
    let (nf1, nf2) = (setup.nf1, setup.nf2);
    let mut fw = try_vec![Complex::<T>::default(); nf1 * nf2];
    let plan = Fft2dPlan::<T>::new(nf1, nf2, 1, iflag);
    let sort = check_and_sort(nf1, nf2, xj, yj, &setup.spopts)?;

    let (mut time_spread, mut time_fft, mut time_deconv) = (0.0f64, 0.0, 0.0);
    for i in 0..ndata {
        let start = Instant::now();
        let fkstart = &mut fk[i * ms * mt..(i + 1) * ms * mt];
        deconvolve_shuffle_2d(
            DeconvDir::ModesToGrid,
            &setup.fwkerhalf1,
            &setup.fwkerhalf2,
            ms,
            mt,
            fkstart,
            nf1,
            nf2,
            &mut fw,
            opts.modeord,
        );
        time_deconv += start.elapsed().as_secs_f64();

        let start = Instant::now();
        plan.execute(&mut fw)?;
        time_fft += start.elapsed().as_secs_f64();

        let start = Instant::now();
        let cstart = &mut c[i * nj..(i + 1) * nj];
        interp_sorted(&sort, nf1, nf2, &fw, xj, yj, cstart, &setup.spopts)?;
        time_spread += start.elapsed().as_secs_f64();
    }
    if opts.debug > 0 {
        debug!("[manyseq] amplify & copy in:\t {time_deconv:.3e} s");
        debug!(
            "[manyseq] fft ({} threads):\t {time_fft:.3e} s",
            rayon::current_num_threads()
        );
        debug!("[manyseq] unspread:\t\t {time_spread:.3e} s");
        debug!(
            "[manyseq] total execute time:\t {:.3e} s",
            time_spread + time_fft + time_deconv
        );
    }
    Ok(())
}

fn nufft2d2_many_simul<T: NufftSample>(
    ndata: usize,
    xj: &[T],
    yj: &[T],
    c: &mut [Complex<T>],
    iflag: i32,
    eps: T,
    ms: usize,
    mt: usize,
    fk: &mut [Complex<T>],
    opts: &NufftOpts,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    let nj = xj.len();
    let setup = setup_type12(eps, ms, mt, nj, opts, SpreadDir::Interp, "2d2many")?;
    let (nf1, nf2) = (setup.nf1, setup.nf2);
    let cells = nf1 * nf2;
    let nth = rayon::current_num_threads();
    let mut fw = try_vec![Complex::<T>::default(); cells * nth];
    let plan = Fft2dPlan::<T>::new(nf1, nf2, nth, iflag);
    let sort = check_and_sort(nf1, nf2, xj, yj, &setup.spopts)?;

    let (mut time_spread, mut time_fft, mut time_deconv) = (0.0f64, 0.0, 0.0);
    let mut start_idx = 0usize;
    while start_idx < ndata {
        let nbatch = nth.min(ndata - start_idx);
        let begin = Instant::now();
        fk[start_idx * ms * mt..(start_idx + nbatch) * ms * mt]
            .par_chunks_exact_mut(ms * mt)
            .zip(fw.par_chunks_exact_mut(cells))
            .for_each(|(fkslice, fwslice)| {
                deconvolve_shuffle_2d(
                    DeconvDir::ModesToGrid,
                    &setup.fwkerhalf1,
                    &setup.fwkerhalf2,
                    ms,
                    mt,
                    fkslice,
                    nf1,
                    nf2,
                    fwslice,
                    opts.modeord,
                )
            });
        time_deconv += begin.elapsed().as_secs_f64();

        let begin = Instant::now();
        plan.execute(&mut fw)?;
        time_fft += begin.elapsed().as_secs_f64();

        let begin = Instant::now();
        c[start_idx * nj..(start_idx + nbatch) * nj]
            .par_chunks_exact_mut(nj)
            .zip(fw.par_chunks_exact(cells))
            .try_for_each(|(cslice, fwslice)| {
                interp_sorted(&sort, nf1, nf2, fwslice, xj, yj, cslice, &setup.spopts)
            })?;
        time_spread += begin.elapsed().as_secs_f64();
        start_idx += nbatch;
    }
    if opts.debug > 0 {
        debug!("[manysimul] amplify & copy in:\t {time_deconv:.3e} s");
        debug!("[manysimul] fft ({nth} threads):\t {time_fft:.3e} s");
        debug!("[manysimul] unspread:\t\t {time_spread:.3e} s");
        debug!(
            "[manysimul] total execute time:\t {:.3e} s",
            time_spread + time_fft + time_deconv
        );
    }
    Ok(())
}

/// Batched type-2, the evaluation counterpart of [`nufft2d1_many`]; same
/// sharing and layout rules.
pub fn nufft2d2_many<T: NufftSample>(
    ndata: usize,
    xj: &[T],
    yj: &[T],
    c: &mut [Complex<T>],
    iflag: i32,
    eps: T,
    ms: usize,
    mt: usize,
    fk: &mut [Complex<T>],
    opts: &NufftOpts,
) -> Result<(), NufftError>
where
    f64: AsPrimitive<T>,
    usize: AsPrimitive<T>,
    i64: AsPrimitive<T>,
{
    if ndata < 1 {
        return Err(NufftError::InvalidBatchCount(ndata));
    }
    let nj = xj.len();
    expect_len(nj, yj.len())?;
    expect_len(nj * ndata, c.len())?;
    expect_len(ms * mt * ndata, fk.len())?;
    match opts.batch_mode {
        BatchMode::Sequential => {
            nufft2d2_many_seq(ndata, xj, yj, c, iflag, eps, ms, mt, fk, opts)
        }
        BatchMode::Simultaneous => {
            nufft2d2_many_simul(ndata, xj, yj, c, iflag, eps, ms, mt, fk, opts)
        }
    }
}
