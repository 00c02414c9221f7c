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
use std::error::Error;
use std::fmt::Formatter;

#[derive(Clone, Debug)]
pub enum NufftError {
    /// Requested tolerance lies outside `[machine_eps/2, 1)`.
    EpsTooSmall(f64),
    /// Oversampled grid would need more cells than the allocation cap.
    GridTooLarge(u64, u64),
    /// A nonuniform coordinate fell outside the accepted periodic range.
    PointsOutOfRange(f64),
    OutOfMemory(usize),
    /// Batched transform called with fewer than one transform.
    InvalidBatchCount(usize),
    MismatchedLength(usize, usize),
}

impl Error for NufftError {}

impl std::fmt::Display for NufftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NufftError::EpsTooSmall(eps) => f.write_fmt(format_args!(
                "Tolerance {eps} is outside the representable range [eps_mach/2, 1)"
            )),
            NufftError::GridTooLarge(cells, cap) => f.write_fmt(format_args!(
                "Oversampled grid of {cells} cells exceeds the cap of {cap}"
            )),
            NufftError::PointsOutOfRange(x) => f.write_fmt(format_args!(
                "Nonuniform point coordinate {x} lies outside [-3pi, 3pi]"
            )),
            NufftError::OutOfMemory(length) => {
                f.write_fmt(format_args!("Cannot allocate {length} elements to vector"))
            }
            NufftError::InvalidBatchCount(ndata) => f.write_fmt(format_args!(
                "Batched transform needs at least 1 transform, but ndata was {ndata}"
            )),
            NufftError::MismatchedLength(s0, s1) => f.write_fmt(format_args!(
                "Array length expected to be {s0}, but it was {s1}"
            )),
        }
    }
}

macro_rules! try_vec {
    () => {
        Vec::new()
    };
    ($elem:expr; $n:expr) => {{
        let mut v = Vec::new();
        v.try_reserve_exact($n)
            .map_err(|_| crate::err::NufftError::OutOfMemory($n))?;
        v.resize($n, $elem);
        v
    }};
}

pub(crate) use try_vec;
