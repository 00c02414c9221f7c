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
use crate::NufftSample;
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::sync::Arc;

/// In-place 2D FFT plan over one or more stacked nf1-by-nf2 grids (nf1 fast),
/// the seam to the external uniform FFT library. A positive iflag selects the
/// e^{+i} exponential, which is the backend's unnormalized inverse transform.
pub(crate) struct Fft2dPlan<T> {
    nf1: usize,
    nf2: usize,
    howmany: usize,
    row_fft: Arc<dyn Fft<T>>,
    col_fft: Arc<dyn Fft<T>>,
}

impl<T: NufftSample> Fft2dPlan<T> {
    pub(crate) fn new(nf1: usize, nf2: usize, howmany: usize, iflag: i32) -> Fft2dPlan<T> {
        let mut planner = FftPlanner::new();
        let direction = if iflag >= 0 {
            FftDirection::Inverse
        } else {
            FftDirection::Forward
        };
        Fft2dPlan {
            nf1,
            nf2,
            howmany,
            row_fft: planner.plan_fft(nf1, direction),
            col_fft: planner.plan_fft(nf2, direction),
        }
    }

    pub(crate) fn execute(&self, fw: &mut [Complex<T>]) -> Result<(), NufftError> {
        let cells = self.nf1 * self.nf2;
        if fw.len() != cells * self.howmany {
            return Err(NufftError::MismatchedLength(cells * self.howmany, fw.len()));
        }
        fw.par_chunks_exact_mut(cells)
            .try_for_each(|grid| self.execute_grid(grid))
    }

    fn execute_grid(&self, grid: &mut [Complex<T>]) -> Result<(), NufftError> {
        // x lines are contiguous rows
        let row_scratch = self.row_fft.get_inplace_scratch_len();
        grid.par_chunks_exact_mut(self.nf1).for_each_init(
            || vec![Complex::default(); row_scratch],
            |scratch, row| self.row_fft.process_with_scratch(row, scratch),
        );
        // y lines are strided by nf1: gather, transform, scatter
        let mut col = try_vec![Complex::<T>::default(); self.nf2];
        let mut scratch =
            try_vec![Complex::<T>::default(); self.col_fft.get_inplace_scratch_len()];
        for ix in 0..self.nf1 {
            for (iy, v) in col.iter_mut().enumerate() {
                *v = grid[iy * self.nf1 + ix];
            }
            self.col_fft.process_with_scratch(&mut col, &mut scratch);
            for (iy, &v) in col.iter().enumerate() {
                grid[iy * self.nf1 + ix] = v;
            }
        }
        Ok(())
    }
}
