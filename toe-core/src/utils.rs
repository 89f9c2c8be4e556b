//! Small helpers for preparing gridded and paired data

use crate::errors::{ToeError, ToeResult};
use crate::labeled::{DataArray, Dataset};
use crate::FloatValue;
use ndarray::{Array2, ArrayD, ArrayViewD, Axis, Zip};

/// Drop every index where either `x` or `y` is NaN
pub fn clean_xy(
    x: &[FloatValue],
    y: &[FloatValue],
) -> ToeResult<(Vec<FloatValue>, Vec<FloatValue>)> {
    if x.len() != y.len() {
        return Err(ToeError::InvalidInput(format!(
            "paired observations differ in length ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    Ok(x.iter()
        .zip(y.iter())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| (*a, *b))
        .unzip())
}

/// Index of the element of `values` closest to `target`
///
/// NaN values are ignored; ties resolve to the first index. Returns `None`
/// when there is nothing to compare against.
pub fn find_nearest(values: &[FloatValue], target: FloatValue) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .map(|(i, v)| (i, (v - target).abs()))
        .fold(None, |best: Option<(usize, FloatValue)>, (i, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((i, d)),
        })
        .map(|(i, _)| i)
}

/// Elementwise membership of `data` in `values`
pub fn is_in(data: ArrayViewD<FloatValue>, values: &[FloatValue]) -> ArrayD<bool> {
    data.mapv(|v| values.contains(&v))
}

/// The calendar months within `width` of `month`, wrapping around the year
///
/// ```rust
/// use toe_core::utils::months_surrounding;
///
/// assert_eq!(months_surrounding(7, 1).unwrap(), vec![6, 7, 8]);
/// assert_eq!(months_surrounding(1, 2).unwrap(), vec![11, 12, 1, 2, 3]);
/// ```
pub fn months_surrounding(month: u32, width: u32) -> ToeResult<Vec<u32>> {
    if !(1..=12).contains(&month) {
        return Err(ToeError::InvalidInput(format!(
            "month must be between 1 and 12, got {}",
            month
        )));
    }
    if width >= 6 {
        return Ok((1..=12).collect());
    }
    let (month, width) = (month as i64, width as i64);
    Ok((month - width..=month + width)
        .map(|m| ((m - 1).rem_euclid(12) + 1) as u32)
        .collect())
}

/// All combinations of 1 up to `max_n` elements, smallest first
///
/// Within one size, combinations are in lexicographic order of element position.
pub fn all_combos<T: Clone>(elements: &[T], max_n: usize) -> Vec<Vec<T>> {
    let n = elements.len();
    let mut combos = Vec::new();
    for k in 1..=max_n.min(n) {
        let mut indices: Vec<usize> = (0..k).collect();
        loop {
            combos.push(indices.iter().map(|&i| elements[i].clone()).collect());

            // Advance the rightmost index that still has room
            let Some(pos) = (0..k).rev().find(|&p| indices[p] < n - k + p) else {
                break;
            };
            indices[pos] += 1;
            for p in pos + 1..k {
                indices[p] = indices[p - 1] + 1;
            }
        }
    }
    combos
}

/// Stack the named fields of `dataset` into a `(points, fields)` matrix
///
/// With `reshape`, every field must be 2-D with a common shape and is
/// flattened in row-major order; otherwise every field must already be 1-D.
/// Missing values are replaced by zero.
pub fn stack_fields(dataset: &Dataset, fields: &[&str], reshape: bool) -> ToeResult<Array2<FloatValue>> {
    let mut columns = Vec::with_capacity(fields.len());
    for name in fields {
        let variable = dataset
            .get(name)
            .ok_or_else(|| ToeError::InvalidInput(format!("no field named '{}'", name)))?;
        let expected_ndim = if reshape { 2 } else { 1 };
        if variable.data().ndim() != expected_ndim {
            return Err(ToeError::InvalidInput(format!(
                "field '{}' is {}-dimensional, expected {}",
                name,
                variable.data().ndim(),
                expected_ndim
            )));
        }
        columns.push(variable.data());
    }

    let Some(first) = columns.first() else {
        return Ok(Array2::zeros((0, 0)));
    };
    if let Some((name, _)) = fields
        .iter()
        .zip(columns.iter())
        .find(|(_, c)| c.shape() != first.shape())
    {
        return Err(ToeError::InvalidInput(format!(
            "field '{}' has shape {:?}, expected {:?}",
            name,
            dataset.get(name).map(|v| v.shape().to_vec()).unwrap_or_default(),
            first.shape()
        )));
    }

    let points = first.len();
    let mut stacked = Array2::zeros((points, columns.len()));
    for (mut column, data) in stacked.axis_iter_mut(Axis(1)).zip(columns.iter()) {
        // Row-major traversal matches a C-order flatten of each field
        for (out, v) in column.iter_mut().zip(data.iter()) {
            *out = if v.is_nan() { 0.0 } else { *v };
        }
    }
    Ok(stacked)
}

/// Subtract a moving average along `dim`
///
/// Each window holds `window` steps, centred on the current step when
/// `center` is set and trailing it otherwise. NaN values are skipped inside
/// a window; a window with fewer than `min_periods` valid values gives NaN.
pub fn detrend_moving_avg(
    field: &DataArray,
    window: usize,
    dim: &str,
    center: bool,
    min_periods: usize,
) -> ToeResult<DataArray> {
    if window == 0 {
        return Err(ToeError::InvalidInput("window must be at least 1".to_string()));
    }
    let axis = Axis(field.axis_index(dim)?);
    let data = field.data();
    let n = data.len_of(axis);

    let mut means = ArrayD::<FloatValue>::zeros(data.raw_dim());
    for i in 0..n {
        let (lo, hi) = if center {
            (i.saturating_sub(window / 2), (i + (window - 1) / 2).min(n - 1))
        } else {
            (i.saturating_sub(window - 1), i)
        };
        let mut sum = data.index_axis(axis, lo).mapv(|v| if v.is_nan() { 0.0 } else { v });
        let mut count = data.index_axis(axis, lo).mapv(|v| if v.is_nan() { 0usize } else { 1 });
        for j in lo + 1..=hi {
            Zip::from(&mut sum)
                .and(&mut count)
                .and(data.index_axis(axis, j))
                .for_each(|s, c, &v| {
                    if !v.is_nan() {
                        *s += v;
                        *c += 1;
                    }
                });
        }
        Zip::from(means.index_axis_mut(axis, i))
            .and(&sum)
            .and(&count)
            .for_each(|m, &s, &c| {
                *m = if c >= min_periods.max(1) {
                    s / c as FloatValue
                } else {
                    FloatValue::NAN
                };
            });
    }
    field.with_data(data - &means)
}
