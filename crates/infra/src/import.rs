//! Catalog spreadsheet import (`.xlsx`/`.xls`/`.ods` or `.csv`).
//!
//! Header cells are normalised before matching: whitespace (including line
//! breaks and non-breaking spaces) collapses to single spaces and letters are
//! upper-cased. The pack-size header carries a free-text legend in the source
//! sheet, so any header starting with `PACK SIZE` is accepted.

use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use calamine::{Data, Reader, open_workbook_auto};
use meditrust_core::{Medicine, ProductKey};

use crate::catalog::CatalogRepository;
use crate::error::{InfraError, InfraResult};

pub const SERIAL_HEADER: &str = "SR.NO.";

/// Parsed sheet contents before they reach the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSheet {
    pub medicines: Vec<Medicine>,
    /// Rows without a usable serial number.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
}

pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[derive(Debug)]
struct Columns {
    serial: usize,
    product_name: Option<usize>,
    generic_name: Option<usize>,
    composition: Option<usize>,
    packet_size: Option<usize>,
    uses: Option<usize>,
    transfer_price: Option<usize>,
    storage_condition: Option<usize>,
}

impl Columns {
    fn locate(headers: &[String]) -> InfraResult<Self> {
        let exact = |name: &str| headers.iter().position(|h| h == name);
        let prefix = |name: &str| headers.iter().position(|h| h.starts_with(name));

        let serial = exact(SERIAL_HEADER).ok_or_else(|| {
            InfraError::import(format!("missing required column {SERIAL_HEADER}; found {headers:?}"))
        })?;

        Ok(Self {
            serial,
            product_name: exact("PRODUCT NAME"),
            generic_name: exact("GENERIC NAME"),
            composition: exact("COMPOSITION"),
            packet_size: prefix("PACK SIZE"),
            uses: exact("USES"),
            transfer_price: prefix("TRANSFER PRICE"),
            storage_condition: exact("STORAGE CONDITION"),
        })
    }

    fn medicine(&self, row: &[Option<String>]) -> Option<Medicine> {
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i).cloned().flatten());

        let key = ProductKey::from_str(cell(Some(self.serial))?.as_str()).ok()?;
        if key.get() <= 0 {
            return None;
        }

        let transfer_price = cell(self.transfer_price).and_then(|raw| {
            let price = raw.replace(',', "").parse::<f64>().ok().filter(|p| p.is_finite() && *p >= 0.0);
            if price.is_none() {
                tracing::warn!(%key, raw = %raw, "unparseable transfer price; storing NULL");
            }
            price
        });

        Some(Medicine {
            sr_number: key,
            product_name: cell(self.product_name),
            generic_name: cell(self.generic_name),
            composition: cell(self.composition),
            packet_size: cell(self.packet_size),
            uses: cell(self.uses),
            transfer_price,
            storage_condition: cell(self.storage_condition),
        })
    }
}

fn text_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn collect_rows<I>(headers: Vec<String>, rows: I) -> InfraResult<CatalogSheet>
where
    I: IntoIterator<Item = Vec<Option<String>>>,
{
    let columns = Columns::locate(&headers)?;
    let mut medicines = Vec::new();
    let mut skipped = 0usize;

    for (line, row) in rows.into_iter().enumerate() {
        if row.iter().all(Option::is_none) {
            continue;
        }
        match columns.medicine(&row) {
            Some(m) => medicines.push(m),
            None => {
                skipped += 1;
                tracing::warn!(row = line + 2, "row without a valid serial number skipped");
            }
        }
    }

    Ok(CatalogSheet { medicines, skipped })
}

pub fn read_catalog_csv<R: Read>(reader: R) -> InfraResult<CatalogSheet> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| InfraError::import(format!("csv header: {e}")))?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| InfraError::import(format!("csv row: {e}")))?;
        rows.push(record.iter().map(text_cell).collect());
    }
    collect_rows(headers, rows)
}

fn data_cell(data: &Data) -> Option<String> {
    match data {
        Data::Empty | Data::Error(_) => None,
        other => text_cell(&other.to_string()),
    }
}

fn read_catalog_workbook(path: &Path) -> InfraResult<CatalogSheet> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| InfraError::import(format!("{}: {e}", path.display())))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| InfraError::import(format!("{}: workbook has no sheets", path.display())))?
        .map_err(|e| InfraError::import(format!("{}: {e}", path.display())))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| InfraError::import(format!("{}: first sheet is empty", path.display())))?
        .iter()
        .map(|c| normalize_header(&c.to_string()))
        .collect();

    collect_rows(headers, rows.map(|r| r.iter().map(data_cell).collect::<Vec<_>>()))
}

/// Read a catalog file, dispatching on its extension.
pub fn read_catalog(path: &Path) -> InfraResult<CatalogSheet> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => read_catalog_csv(std::fs::File::open(path)?),
        "xlsx" | "xlsm" | "xls" | "ods" => read_catalog_workbook(path),
        other => Err(InfraError::import(format!(
            "{}: unsupported catalog format {other:?}",
            path.display()
        ))),
    }
}

pub async fn import_catalog(repo: &CatalogRepository, path: &Path) -> InfraResult<ImportReport> {
    let sheet = read_catalog(path)?;
    let inserted = repo.upsert_many(&sheet.medicines).await?;
    tracing::info!(
        path = %path.display(),
        inserted,
        skipped = sheet.skipped,
        "catalog import finished"
    );
    Ok(ImportReport {
        inserted,
        skipped: sheet.skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    const SHEET: &str = "\
SR.NO.,PRODUCT NAME,GENERIC NAME,COMPOSITION,\"PACK SIZE\n   (T=TABLETS, C=CAPSULES)\",USES,TRANSFER PRICE (RS),STORAGE CONDITION
1,Paracetamol 500,Paracetamol,Paracetamol 500mg,10 T,Fever,\"1,250.50\",Cool and dry
2.0,Cetirizine,,Cetirizine 10mg,10 T,,12,
,Orphan row,,,,,,
abc,Bad serial,,,,,,
,,,,,,,
3,Amoxicillin,Amoxicillin,,15 C,Infection,n/a,
";

    #[test]
    fn headers_are_normalised() {
        assert_eq!(normalize_header("  sr.no. "), "SR.NO.");
        assert_eq!(
            normalize_header("PACK SIZE\n\u{a0}  (T=TABLETS)"),
            "PACK SIZE (T=TABLETS)"
        );
        assert_eq!(normalize_header("Transfer\u{a0}Price (Rs)"), "TRANSFER PRICE (RS)");
    }

    #[test]
    fn csv_rows_map_to_medicines() {
        let sheet = read_catalog_csv(SHEET.as_bytes()).unwrap();
        assert_eq!(sheet.medicines.len(), 3);
        assert_eq!(sheet.skipped, 2);

        let first = &sheet.medicines[0];
        assert_eq!(first.sr_number, ProductKey::new(1));
        assert_eq!(first.packet_size.as_deref(), Some("10 T"));
        assert_eq!(first.transfer_price, Some(1250.5));
        assert_eq!(first.storage_condition.as_deref(), Some("Cool and dry"));

        let second = &sheet.medicines[1];
        assert_eq!(second.sr_number, ProductKey::new(2));
        assert_eq!(second.generic_name, None);
        assert_eq!(second.uses, None);

        assert_eq!(sheet.medicines[2].transfer_price, None);
    }

    #[test]
    fn missing_serial_column_is_an_error() {
        let csv = "PRODUCT NAME,USES\nA,B\n";
        assert!(matches!(read_catalog_csv(csv.as_bytes()), Err(InfraError::Import(_))));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            read_catalog(Path::new("catalog.txt")),
            Err(InfraError::Import(_))
        ));
    }

    #[tokio::test]
    async fn import_writes_rows_and_reports_skips() {
        let path = std::env::temp_dir().join(format!("meditrust-catalog-{}.csv", std::process::id()));
        std::fs::write(&path, SHEET).unwrap();

        let repo = CatalogRepository::new(connect_in_memory().await.unwrap());
        let report = import_catalog(&repo, &path).await.unwrap();
        assert_eq!(report, ImportReport { inserted: 3, skipped: 2 });
        assert_eq!(repo.keys().await.unwrap().len(), 3);

        std::fs::remove_file(&path).ok();
    }
}
