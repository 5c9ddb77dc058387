//! CSV persistence of order history.
//!
//! The generator writes the engineered columns; the training pipeline only
//! needs `OrderID, SR.NO., OrderDate, Quantity` and ignores the rest.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use meditrust_core::{OrderRecord, ProductKey, Reordered};

use crate::error::ForecastResult;
use crate::features::FeatureSet;

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(rename = "OrderID")]
    order_id: String,
    #[serde(rename = "SR.NO.")]
    sr_no: ProductKey,
    #[serde(rename = "OrderDate")]
    order_date: String,
    #[serde(rename = "Quantity")]
    quantity: i64,
    #[serde(rename = "Reordered", default)]
    reordered: Option<Reordered>,
}

/// Parse `YYYY-MM-DD`, tolerating a trailing time component.
fn parse_order_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split([' ', 'T']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

pub fn write_feature_set<W: Write>(writer: W, set: &FeatureSet, lags: usize) -> ForecastResult<()> {
    let mut w = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = [
        "OrderID",
        "SR.NO.",
        "OrderDate",
        "Quantity",
        "Reordered",
        "DayOfWeek",
        "Month",
        "WeekOfYear",
        "RollingQty5",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend((1..=lags).map(|l| format!("Qty_t-{l}")));
    w.write_record(&header)?;

    for row in &set.rows {
        let mut rec = vec![
            row.record.order_id.clone(),
            row.record.product.to_string(),
            row.record.order_date.format("%Y-%m-%d").to_string(),
            row.record.quantity.to_string(),
            row.record.reordered.as_str().to_string(),
            row.calendar.day_of_week.to_string(),
            row.calendar.month.to_string(),
            row.calendar.week_of_year.to_string(),
            row.rolling_quantity.to_string(),
        ];
        rec.extend(row.lags.iter().take(lags).map(|v| v.to_string()));
        w.write_record(&rec)?;
    }

    w.flush()?;
    Ok(())
}

pub fn write_feature_set_file(path: &Path, set: &FeatureSet, lags: usize) -> ForecastResult<()> {
    write_feature_set(File::create(path)?, set, lags)
}

/// Read order records; rows with an unparseable date or quantity are skipped.
pub fn read_order_history<R: Read>(reader: R) -> ForecastResult<Vec<OrderRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut out = Vec::new();

    for (num, result) in rdr.deserialize::<HistoryRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(row = num + 1, %err, "skipping malformed order history row");
                continue;
            }
        };

        let Some(order_date) = parse_order_date(&row.order_date) else {
            tracing::warn!(row = num + 1, date = %row.order_date, "skipping row with bad date");
            continue;
        };

        match OrderRecord::new(
            row.order_id,
            row.sr_no,
            order_date,
            row.quantity,
            row.reordered.unwrap_or(Reordered::No),
        ) {
            Ok(rec) => out.push(rec),
            Err(err) => tracing::warn!(row = num + 1, %err, "skipping invalid order row"),
        }
    }

    Ok(out)
}

pub fn read_order_history_file(path: &Path) -> ForecastResult<Vec<OrderRecord>> {
    read_order_history(File::open(path)?)
}
