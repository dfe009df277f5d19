use std::{fmt, str::FromStr};

use crate::{
    components::{sample::Sample, window::Window},
    errors::PyramidioError,
};

/// Algorithm used to compute pixel values when changing resolution.
///
/// Tokens follow GDAL/rasterio spelling; unknown tokens are rejected at
/// parse time rather than somewhere down the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resampling {
    Nearest,
    Bilinear,
    Cubic,
    CubicSpline,
    Lanczos,
    Average,
    Mode,
    Gauss,
}

impl Resampling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resampling::Nearest => "nearest",
            Resampling::Bilinear => "bilinear",
            Resampling::Cubic => "cubic",
            Resampling::CubicSpline => "cubic_spline",
            Resampling::Lanczos => "lanczos",
            Resampling::Average => "average",
            Resampling::Mode => "mode",
            Resampling::Gauss => "gauss",
        }
    }

    /// Name understood by GDAL's overview builder.
    #[cfg(feature = "gdal")]
    pub(crate) fn gdal_name(&self) -> &'static str {
        match self {
            Resampling::Nearest => "NEAREST",
            Resampling::Bilinear => "BILINEAR",
            Resampling::Cubic => "CUBIC",
            Resampling::CubicSpline => "CUBICSPLINE",
            Resampling::Lanczos => "LANCZOS",
            Resampling::Average => "AVERAGE",
            Resampling::Mode => "MODE",
            Resampling::Gauss => "GAUSS",
        }
    }

    /// Source pixels needed around a window's footprint for this kernel.
    pub(crate) fn margin(&self, scale: f64) -> usize {
        match self {
            Resampling::Nearest | Resampling::Bilinear => 1,
            Resampling::Cubic | Resampling::CubicSpline => 2,
            Resampling::Lanczos => 3,
            Resampling::Average | Resampling::Mode | Resampling::Gauss => {
                scale.ceil().max(1.0) as usize + 1
            }
        }
    }
}

impl Default for Resampling {
    fn default() -> Self {
        Resampling::Nearest
    }
}

impl FromStr for Resampling {
    type Err = PyramidioError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "nearest" => Ok(Resampling::Nearest),
            "bilinear" => Ok(Resampling::Bilinear),
            "cubic" => Ok(Resampling::Cubic),
            "cubic_spline" => Ok(Resampling::CubicSpline),
            "lanczos" => Ok(Resampling::Lanczos),
            "average" => Ok(Resampling::Average),
            "mode" => Ok(Resampling::Mode),
            "gauss" => Ok(Resampling::Gauss),
            unknown => Err(PyramidioError::UnknownResamplingMethod(unknown.to_string())),
        }
    }
}

impl fmt::Display for Resampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source samples backing one band of a resampled read.
///
/// `window` is the region of the source grid the slice covers; sample
/// lookups clamp to it, replicating edges.
struct Sampler<'a, T> {
    src: &'a [T],
    window: &'a Window,
}

impl<T: Sample> Sampler<'_, T> {
    fn get(&self, col: isize, row: isize) -> T {
        let col = clamp_index(col, self.window.col_off, self.window.col_off + self.window.width);
        let row = clamp_index(row, self.window.row_off, self.window.row_off + self.window.height);
        self.src[(row - self.window.row_off) * self.window.width + (col - self.window.col_off)]
    }
}

fn clamp_index(value: isize, lo: usize, hi: usize) -> usize {
    value.clamp(lo as isize, hi as isize - 1) as usize
}

/// Source coordinate of a target pixel center.
fn src_center(dst_index: usize, scale: f64) -> f64 {
    (dst_index as f64 + 0.5) * scale - 0.5
}

/// Resample one band of `dst_window` from a source footprint.
///
/// `scale` is source pixels per target pixel on each axis; `out` must hold
/// `dst_window.size()` samples.
pub(crate) fn sample_region<T: Sample>(
    method: Resampling,
    src: &[T],
    src_window: &Window,
    scale: (f64, f64),
    dst_window: &Window,
    out: &mut [T],
) {
    debug_assert_eq!(out.len(), dst_window.size());
    if scale == (1.0, 1.0) {
        // Identity grid: every method degenerates to a pass-through.
        copy_rows(src, src_window, dst_window, out);
        return;
    }
    let sampler = Sampler {
        src,
        window: src_window,
    };
    match method {
        Resampling::Nearest => nearest_into(&sampler, scale, dst_window, out),
        Resampling::Bilinear => convolve_into(&sampler, scale, dst_window, out, 1, linear_weight),
        Resampling::Cubic => convolve_into(&sampler, scale, dst_window, out, 2, cubic_weight),
        Resampling::CubicSpline => {
            convolve_into(&sampler, scale, dst_window, out, 2, bspline_weight)
        }
        Resampling::Lanczos => convolve_into(&sampler, scale, dst_window, out, 3, lanczos_weight),
        Resampling::Average => average_into(&sampler, scale, dst_window, out),
        Resampling::Mode => mode_into(&sampler, scale, dst_window, out),
        Resampling::Gauss => gauss_into(&sampler, scale, dst_window, out),
    }
}

fn copy_rows<T: Sample>(src: &[T], src_window: &Window, dst_window: &Window, out: &mut [T]) {
    for row in 0..dst_window.height {
        let src_row = dst_window.row_off + row - src_window.row_off;
        let src_col = dst_window.col_off - src_window.col_off;
        let src_start = src_row * src_window.width + src_col;
        out[row * dst_window.width..(row + 1) * dst_window.width]
            .copy_from_slice(&src[src_start..src_start + dst_window.width]);
    }
}

fn nearest_into<T: Sample>(
    sampler: &Sampler<'_, T>,
    scale: (f64, f64),
    dst_window: &Window,
    out: &mut [T],
) {
    for row in 0..dst_window.height {
        let src_row = src_center(dst_window.row_off + row, scale.1).round() as isize;
        for col in 0..dst_window.width {
            let src_col = src_center(dst_window.col_off + col, scale.0).round() as isize;
            out[row * dst_window.width + col] = sampler.get(src_col, src_row);
        }
    }
}

fn convolve_into<T: Sample>(
    sampler: &Sampler<'_, T>,
    scale: (f64, f64),
    dst_window: &Window,
    out: &mut [T],
    radius: isize,
    weight: fn(f64) -> f64,
) {
    for row in 0..dst_window.height {
        let v = src_center(dst_window.row_off + row, scale.1);
        let row_base = v.floor() as isize;
        for col in 0..dst_window.width {
            let u = src_center(dst_window.col_off + col, scale.0);
            let col_base = u.floor() as isize;

            let mut acc = 0.0;
            let mut weight_sum = 0.0;
            for tap_row in (row_base - radius + 1)..=(row_base + radius) {
                let row_weight = weight(v - tap_row as f64);
                if row_weight == 0.0 {
                    continue;
                }
                for tap_col in (col_base - radius + 1)..=(col_base + radius) {
                    let tap_weight = row_weight * weight(u - tap_col as f64);
                    if tap_weight == 0.0 {
                        continue;
                    }
                    acc += tap_weight * sampler.get(tap_col, tap_row).as_f64();
                    weight_sum += tap_weight;
                }
            }
            out[row * dst_window.width + col] = if weight_sum != 0.0 {
                T::from_f64(acc / weight_sum)
            } else {
                sampler.get(col_base, row_base)
            };
        }
    }
}

/// Source index range covered by one target pixel, at least one sample wide.
fn footprint_bounds(dst_index: usize, scale: f64, lo: usize, hi: usize) -> (usize, usize) {
    let start = (dst_index as f64 * scale).floor() as isize;
    let end = ((dst_index as f64 + 1.0) * scale).ceil() as isize;
    let start = clamp_index(start, lo, hi);
    let end = (end.clamp(start as isize + 1, hi as isize)) as usize;
    (start, end)
}

fn average_into<T: Sample>(
    sampler: &Sampler<'_, T>,
    scale: (f64, f64),
    dst_window: &Window,
    out: &mut [T],
) {
    let window = sampler.window;
    for row in 0..dst_window.height {
        let (row_start, row_end) = footprint_bounds(
            dst_window.row_off + row,
            scale.1,
            window.row_off,
            window.row_off + window.height,
        );
        for col in 0..dst_window.width {
            let (col_start, col_end) = footprint_bounds(
                dst_window.col_off + col,
                scale.0,
                window.col_off,
                window.col_off + window.width,
            );
            let mut acc = 0.0;
            let mut count = 0usize;
            for src_row in row_start..row_end {
                for src_col in col_start..col_end {
                    acc += sampler.get(src_col as isize, src_row as isize).as_f64();
                    count += 1;
                }
            }
            out[row * dst_window.width + col] = T::from_f64(acc / count as f64);
        }
    }
}

fn mode_into<T: Sample>(
    sampler: &Sampler<'_, T>,
    scale: (f64, f64),
    dst_window: &Window,
    out: &mut [T],
) {
    let window = sampler.window;
    let mut counts: Vec<(T, usize)> = Vec::new();
    for row in 0..dst_window.height {
        let (row_start, row_end) = footprint_bounds(
            dst_window.row_off + row,
            scale.1,
            window.row_off,
            window.row_off + window.height,
        );
        for col in 0..dst_window.width {
            let (col_start, col_end) = footprint_bounds(
                dst_window.col_off + col,
                scale.0,
                window.col_off,
                window.col_off + window.width,
            );
            counts.clear();
            for src_row in row_start..row_end {
                for src_col in col_start..col_end {
                    let sample = sampler.get(src_col as isize, src_row as isize);
                    match counts.iter_mut().find(|(value, _)| *value == sample) {
                        Some((_, count)) => *count += 1,
                        None => counts.push((sample, 1)),
                    }
                }
            }
            // First encountered wins ties.
            let mut winner = counts[0];
            for candidate in &counts[1..] {
                if candidate.1 > winner.1 {
                    winner = *candidate;
                }
            }
            out[row * dst_window.width + col] = winner.0;
        }
    }
}

fn gauss_into<T: Sample>(
    sampler: &Sampler<'_, T>,
    scale: (f64, f64),
    dst_window: &Window,
    out: &mut [T],
) {
    let sigma = (scale.0.max(scale.1).max(1.0)) * 0.5;
    let radius = scale.0.max(scale.1).ceil().max(1.0) as isize;
    let gauss = |d: f64| (-(d * d) / (2.0 * sigma * sigma)).exp();

    for row in 0..dst_window.height {
        let v = src_center(dst_window.row_off + row, scale.1);
        let row_base = v.floor() as isize;
        for col in 0..dst_window.width {
            let u = src_center(dst_window.col_off + col, scale.0);
            let col_base = u.floor() as isize;

            let mut acc = 0.0;
            let mut weight_sum = 0.0;
            for tap_row in (row_base - radius)..=(row_base + radius) {
                let row_weight = gauss(v - tap_row as f64);
                for tap_col in (col_base - radius)..=(col_base + radius) {
                    let tap_weight = row_weight * gauss(u - tap_col as f64);
                    acc += tap_weight * sampler.get(tap_col, tap_row).as_f64();
                    weight_sum += tap_weight;
                }
            }
            out[row * dst_window.width + col] = T::from_f64(acc / weight_sum);
        }
    }
}

fn linear_weight(t: f64) -> f64 {
    let t = t.abs();
    if t < 1.0 {
        1.0 - t
    } else {
        0.0
    }
}

// Cubic convolution with a = -0.5, GDAL's cubic.
fn cubic_weight(t: f64) -> f64 {
    let t = t.abs();
    if t < 1.0 {
        (1.5 * t - 2.5) * t * t + 1.0
    } else if t < 2.0 {
        ((-0.5 * t + 2.5) * t - 4.0) * t + 2.0
    } else {
        0.0
    }
}

fn bspline_weight(t: f64) -> f64 {
    let t = t.abs();
    if t < 1.0 {
        (0.5 * t - 1.0) * t * t + 2.0 / 3.0
    } else if t < 2.0 {
        let u = 2.0 - t;
        u * u * u / 6.0
    } else {
        0.0
    }
}

fn lanczos_weight(t: f64) -> f64 {
    const A: f64 = 3.0;
    let t = t.abs();
    if t < 1e-12 {
        1.0
    } else if t < A {
        let pt = std::f64::consts::PI * t;
        A * pt.sin() * (pt / A).sin() / (pt * pt)
    } else {
        0.0
    }
}

/// Resample a whole band to a new shape.
pub(crate) fn resample_band<T: Sample>(
    method: Resampling,
    src: &[T],
    src_shape: (usize, usize),
    dst_shape: (usize, usize),
    scale: (f64, f64),
) -> Vec<T> {
    let src_window = Window::new(0, 0, src_shape.0, src_shape.1);
    let dst_window = Window::new(0, 0, dst_shape.0, dst_shape.1);
    let mut out = vec![T::zero(); dst_window.size()];
    sample_region(method, src, &src_window, scale, &dst_window, &mut out);
    out
}
