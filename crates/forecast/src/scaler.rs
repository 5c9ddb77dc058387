//! Per-feature min-max scaling to `[0, 1]`.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ForecastResult};

/// Min-max scaler fitted column-wise.
///
/// A column with zero range is shifted by its minimum but not stretched, so
/// constant features map to `0` instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    data_min: Vec<f64>,
    data_max: Vec<f64>,
}

impl MinMaxScaler {
    pub fn fit<'a, I>(rows: I) -> ForecastResult<Self>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let mut rows = rows.into_iter();
        let first = rows
            .next()
            .ok_or_else(|| ForecastError::InsufficientData("cannot fit scaler on zero rows".into()))?;

        let mut data_min = first.to_vec();
        let mut data_max = first.to_vec();

        for row in rows {
            if row.len() != data_min.len() {
                return Err(ForecastError::invalid(format!(
                    "scaler rows must all have width {}, got {}",
                    data_min.len(),
                    row.len()
                )));
            }
            for (j, v) in row.iter().enumerate() {
                data_min[j] = data_min[j].min(*v);
                data_max[j] = data_max[j].max(*v);
            }
        }

        if data_min.iter().chain(&data_max).any(|v| !v.is_finite()) {
            return Err(ForecastError::invalid("scaler input contains non-finite values"));
        }

        Ok(Self { data_min, data_max })
    }

    pub fn width(&self) -> usize {
        self.data_min.len()
    }

    /// Min and max vectors agree in length (not guaranteed for deserialized input).
    pub(crate) fn is_well_formed(&self) -> bool {
        self.data_min.len() == self.data_max.len()
    }

    fn scale(&self, j: usize) -> f64 {
        let range = self.data_max[j] - self.data_min[j];
        if range == 0.0 { 1.0 } else { range }
    }

    fn check_width(&self, row: &[f64]) -> ForecastResult<()> {
        if row.len() != self.width() {
            return Err(ForecastError::invalid(format!(
                "expected {} features, got {}",
                self.width(),
                row.len()
            )));
        }
        Ok(())
    }

    pub fn transform(&self, row: &[f64]) -> ForecastResult<Vec<f64>> {
        self.check_width(row)?;
        Ok(row
            .iter()
            .enumerate()
            .map(|(j, v)| (v - self.data_min[j]) / self.scale(j))
            .collect())
    }

    pub fn inverse_transform(&self, row: &[f64]) -> ForecastResult<Vec<f64>> {
        self.check_width(row)?;
        Ok(row
            .iter()
            .enumerate()
            .map(|(j, v)| v * self.scale(j) + self.data_min[j])
            .collect())
    }

    /// Convenience for single-column scalers (targets).
    pub fn inverse_scalar(&self, value: f64) -> ForecastResult<f64> {
        Ok(self.inverse_transform(&[value])?[0])
    }

    pub fn transform_scalar(&self, value: f64) -> ForecastResult<f64> {
        Ok(self.transform(&[value])?[0])
    }
}
