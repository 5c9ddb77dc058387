//! Medicine catalog persistence.

use meditrust_core::{Medicine, ProductKey};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::error::{InfraError, InfraResult, map_sqlx_error};

const COLUMNS: &str = "sr_number, product_name, generic_name, composition, packet_size, \
                       uses, transfer_price, storage_condition";

#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

fn medicine_from_row(row: &SqliteRow) -> InfraResult<Medicine> {
    let decode = |e: sqlx::Error| InfraError::Decode(format!("medicines row: {e}"));
    Ok(Medicine {
        sr_number: ProductKey::new(row.try_get("sr_number").map_err(decode)?),
        product_name: row.try_get("product_name").map_err(decode)?,
        generic_name: row.try_get("generic_name").map_err(decode)?,
        composition: row.try_get("composition").map_err(decode)?,
        packet_size: row.try_get("packet_size").map_err(decode)?,
        uses: row.try_get("uses").map_err(decode)?,
        transfer_price: row.try_get("transfer_price").map_err(decode)?,
        storage_condition: row.try_get("storage_condition").map_err(decode)?,
    })
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace by serial number, all in one transaction.
    pub async fn upsert_many(&self, medicines: &[Medicine]) -> InfraResult<usize> {
        for m in medicines {
            m.validate()?;
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let insert =
            format!("INSERT OR REPLACE INTO medicines ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)");
        for m in medicines {
            sqlx::query(&insert)
                .bind(m.sr_number.get())
                .bind(m.product_name.as_deref())
                .bind(m.generic_name.as_deref())
                .bind(m.composition.as_deref())
                .bind(m.packet_size.as_deref())
                .bind(m.uses.as_deref())
                .bind(m.transfer_price)
                .bind(m.storage_condition.as_deref())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("upsert_medicine", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        tracing::info!(count = medicines.len(), "catalog rows upserted");
        Ok(medicines.len())
    }

    pub async fn list_all(&self) -> InfraResult<Vec<Medicine>> {
        let select = format!("SELECT {COLUMNS} FROM medicines ORDER BY sr_number");
        let rows = sqlx::query(&select)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_medicines", e))?;
        rows.iter().map(medicine_from_row).collect()
    }

    /// Rows for `keys`, ordered by serial number. Unknown keys are absent.
    pub async fn find_by_keys(&self, keys: &[ProductKey]) -> InfraResult<Vec<Medicine>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM medicines WHERE sr_number IN ("));
        let mut separated = qb.separated(", ");
        for key in keys {
            separated.push_bind(key.get());
        }
        separated.push_unseparated(") ORDER BY sr_number");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_medicines", e))?;
        rows.iter().map(medicine_from_row).collect()
    }

    pub async fn keys(&self) -> InfraResult<Vec<ProductKey>> {
        let keys: Vec<(i64,)> = sqlx::query_as("SELECT sr_number FROM medicines ORDER BY sr_number")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_keys", e))?;
        Ok(keys.into_iter().map(|(k,)| ProductKey::new(k)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    fn medicine(key: i64, name: &str) -> Medicine {
        let mut m = Medicine::new(ProductKey::new(key));
        m.product_name = Some(name.to_string());
        m.transfer_price = Some(12.5);
        m
    }

    #[tokio::test]
    async fn upsert_replaces_by_serial_number() {
        let repo = CatalogRepository::new(connect_in_memory().await.unwrap());
        repo.upsert_many(&[medicine(2, "B"), medicine(1, "A")]).await.unwrap();
        repo.upsert_many(&[medicine(2, "B2")]).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].sr_number, ProductKey::new(1));
        assert_eq!(all[1].product_name.as_deref(), Some("B2"));
        assert_eq!(all[1].transfer_price, Some(12.5));
        assert_eq!(all[1].uses, None);
    }

    #[tokio::test]
    async fn find_by_keys_ignores_unknown_and_empty() {
        let repo = CatalogRepository::new(connect_in_memory().await.unwrap());
        repo.upsert_many(&[medicine(1, "A"), medicine(2, "B"), medicine(3, "C")])
            .await
            .unwrap();

        let found = repo
            .find_by_keys(&[ProductKey::new(3), ProductKey::new(99), ProductKey::new(1)])
            .await
            .unwrap();
        let keys: Vec<i64> = found.iter().map(|m| m.sr_number.get()).collect();
        assert_eq!(keys, vec![1, 3]);

        assert!(repo.find_by_keys(&[]).await.unwrap().is_empty());
        assert_eq!(repo.keys().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn invalid_rows_abort_before_writing() {
        let repo = CatalogRepository::new(connect_in_memory().await.unwrap());
        let mut bad = medicine(5, "X");
        bad.transfer_price = Some(-3.0);

        assert!(matches!(
            repo.upsert_many(&[medicine(4, "ok"), bad]).await,
            Err(InfraError::Domain(_))
        ));
        assert!(repo.list_all().await.unwrap().is_empty());
    }
}
