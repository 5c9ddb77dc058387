//! Customer order history.

use chrono::{NaiveDate, NaiveDateTime};
use meditrust_core::{DomainError, OrderId, OrderLine, ProductKey, UserId};
use sqlx::{Row, SqlitePool};

use crate::error::{InfraError, InfraResult, map_sqlx_error};

/// Accepts `YYYY-MM-DD[ T]HH:MM:SS[.f]` or a bare date (taken as midnight).
fn parse_order_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The user's most recent order lines, newest first.
    pub async fn recent_lines(&self, user: UserId, limit: usize) -> InfraResult<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT oi.product_id, o.order_date
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.user_id = ?
            ORDER BY o.order_date DESC, oi.id DESC
            LIMIT ?
            "#,
        )
        .bind(user.get())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("recent_order_lines", e))?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            let decode = |e: sqlx::Error| InfraError::Decode(format!("order line: {e}"));
            let product = ProductKey::new(row.try_get("product_id").map_err(decode)?);
            let raw: String = row.try_get("order_date").map_err(decode)?;
            match parse_order_date(&raw) {
                Some(ordered_at) => lines.push(OrderLine { product, ordered_at }),
                None => tracing::warn!(%product, date = %raw, "skipping order line with bad date"),
            }
        }
        Ok(lines)
    }

    /// Record one order with its `(product, quantity)` lines.
    pub async fn place_order(
        &self,
        user: UserId,
        ordered_at: NaiveDateTime,
        items: &[(ProductKey, i64)],
    ) -> InfraResult<OrderId> {
        if items.is_empty() {
            return Err(DomainError::validation("an order needs at least one line").into());
        }
        if let Some((product, qty)) = items.iter().find(|(_, q)| *q <= 0) {
            return Err(DomainError::validation(format!(
                "quantity for product {product} must be positive, got {qty}"
            ))
            .into());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let order_id: i64 = sqlx::query("INSERT INTO orders (user_id, order_date) VALUES (?, ?)")
            .bind(user.get())
            .bind(ordered_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order", e))?
            .last_insert_rowid();

        for (product, quantity) in items {
            sqlx::query("INSERT INTO order_items (order_id, product_id, quantity) VALUES (?, ?, ?)")
                .bind(order_id)
                .bind(product.get())
                .bind(*quantity)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        tracing::debug!(%user, order_id, lines = items.len(), "order recorded");
        Ok(OrderId::new(order_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn key(k: i64) -> ProductKey {
        ProductKey::new(k)
    }

    #[tokio::test]
    async fn recent_lines_are_newest_first_and_per_user() {
        let repo = OrderRepository::new(connect_in_memory().await.unwrap());
        let alice = UserId::new(1);
        let bob = UserId::new(2);

        repo.place_order(alice, at(1, 9), &[(key(10), 5)]).await.unwrap();
        repo.place_order(alice, at(3, 9), &[(key(11), 1), (key(12), 2)]).await.unwrap();
        repo.place_order(bob, at(2, 9), &[(key(99), 1)]).await.unwrap();

        let lines = repo.recent_lines(alice, 50).await.unwrap();
        let products: Vec<i64> = lines.iter().map(|l| l.product.get()).collect();
        assert_eq!(products, vec![12, 11, 10]);
        assert_eq!(lines[0].ordered_at, at(3, 9));
    }

    #[tokio::test]
    async fn limit_caps_history() {
        let repo = OrderRepository::new(connect_in_memory().await.unwrap());
        let user = UserId::new(7);
        for day in 1..=6 {
            repo.place_order(user, at(day, 12), &[(key(day as i64), 1)]).await.unwrap();
        }

        let lines = repo.recent_lines(user, 4).await.unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].product, key(6));
        assert!(repo.recent_lines(UserId::new(8), 50).await.unwrap().is_empty());
    }

    async fn insert_raw(repo: &OrderRepository, user: UserId, date: &str, product: i64) {
        let order_id = sqlx::query("INSERT INTO orders (user_id, order_date) VALUES (?, ?)")
            .bind(user.get())
            .bind(date)
            .execute(&repo.pool)
            .await
            .unwrap()
            .last_insert_rowid();
        sqlx::query("INSERT INTO order_items (order_id, product_id, quantity) VALUES (?, ?, 1)")
            .bind(order_id)
            .bind(product)
            .execute(&repo.pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn date_only_rows_decode_and_bad_dates_are_skipped() {
        let repo = OrderRepository::new(connect_in_memory().await.unwrap());
        let user = UserId::new(3);
        repo.place_order(user, at(1, 9), &[(key(1), 2)]).await.unwrap();
        insert_raw(&repo, user, "2024-05-02", 2).await;
        insert_raw(&repo, user, "2024-05-03T08:15:00", 3).await;
        insert_raw(&repo, user, "last tuesday", 4).await;

        let lines = repo.recent_lines(user, 50).await.unwrap();
        let products: Vec<i64> = lines.iter().map(|l| l.product.get()).collect();
        assert_eq!(products, vec![3, 2, 1]);
        assert_eq!(lines[1].ordered_at, at(2, 0));
        assert_eq!(lines[0].ordered_at, at(3, 8) + chrono::Duration::minutes(15));
    }

    #[test]
    fn order_dates_parse_leniently() {
        assert_eq!(parse_order_date("2024-05-01 09:00:00"), Some(at(1, 9)));
        assert_eq!(parse_order_date("2024-05-01 09:00:00.250").map(|d| d.date()), Some(at(1, 9).date()));
        assert_eq!(parse_order_date(" 2024-05-04 "), Some(at(4, 0)));
        assert_eq!(parse_order_date("05/04/2024"), None);
    }

    #[tokio::test]
    async fn rejects_empty_and_non_positive_orders() {
        let repo = OrderRepository::new(connect_in_memory().await.unwrap());
        let user = UserId::new(1);
        assert!(matches!(
            repo.place_order(user, at(1, 1), &[]).await,
            Err(InfraError::Domain(_))
        ));
        assert!(matches!(
            repo.place_order(user, at(1, 1), &[(key(1), 0)]).await,
            Err(InfraError::Domain(_))
        ));
    }
}
