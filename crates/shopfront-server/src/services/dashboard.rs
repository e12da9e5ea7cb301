use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;

use crate::error::AppResult;
use crate::models::ProfilePublic;
use crate::services::cart::round_cents;
use crate::services::catalog::{self, CategoryCount};

const RECENT_CUSTOMERS: i64 = 5;

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_products: i64,
    pub total_orders: i64,
    pub total_customers: i64,
    /// Cancelled orders are not revenue.
    pub total_revenue: f64,
    pub pending_orders: i64,
    pub completed_orders: i64,
    pub products_by_category: Vec<CategoryCount>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub recent_customers: Vec<ProfilePublic>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: f64,
    pub orders: i64,
}

pub fn compute(conn: &Connection) -> AppResult<DashboardStats> {
    let count = |sql: &str| -> rusqlite::Result<i64> { conn.query_row(sql, [], |row| row.get(0)) };

    let total_products = count("SELECT COUNT(*) FROM products")?;
    let total_orders = count("SELECT COUNT(*) FROM orders")?;
    let total_customers = count("SELECT COUNT(*) FROM profiles")?;
    let pending_orders = count("SELECT COUNT(*) FROM orders WHERE status = 'pending'")?;
    let completed_orders = count("SELECT COUNT(*) FROM orders WHERE status = 'completed'")?;

    let mut stmt = conn.prepare(
        "SELECT created_at, total_amount FROM orders WHERE status != 'cancelled'",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;
    let orders: Vec<(String, f64)> = rows.collect::<Result<_, _>>()?;
    let monthly_revenue = bucket_by_month(&orders);
    let total_revenue = round_cents(orders.iter().map(|(_, amount)| amount).sum());

    let mut stmt = conn.prepare(
        "SELECT id, email, full_name, created_at FROM profiles ORDER BY created_at DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(rusqlite::params![RECENT_CUSTOMERS], |row| {
        Ok(ProfilePublic {
            id: row.get(0)?,
            email: row.get(1)?,
            full_name: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;
    let recent_customers: Vec<ProfilePublic> = rows.collect::<Result<_, _>>()?;

    Ok(DashboardStats {
        total_products,
        total_orders,
        total_customers,
        total_revenue,
        pending_orders,
        completed_orders,
        products_by_category: catalog::category_counts(conn)?,
        monthly_revenue,
        recent_customers,
    })
}

/// Groups `(created_at, amount)` pairs by the `YYYY-MM` prefix of the
/// timestamp, oldest month first.
pub fn bucket_by_month(orders: &[(String, f64)]) -> Vec<MonthlyRevenue> {
    let mut months: BTreeMap<&str, (f64, i64)> = BTreeMap::new();
    for (created_at, amount) in orders {
        let Some(month) = created_at.get(..7) else {
            continue;
        };
        let entry = months.entry(month).or_default();
        entry.0 += amount;
        entry.1 += 1;
    }
    months
        .into_iter()
        .map(|(month, (revenue, orders))| MonthlyRevenue {
            month: month.to_string(),
            revenue: round_cents(revenue),
            orders,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn months_are_grouped_and_sorted() {
        let orders = vec![
            ("2024-03-02T10:00:00.000Z".to_string(), 10.5),
            ("2024-01-15T10:00:00.000Z".to_string(), 100.0),
            ("2024-03-20T10:00:00.000Z".to_string(), 4.5),
            ("bad".to_string(), 1.0),
        ];
        let months = bucket_by_month(&orders);
        assert_eq!(
            months,
            vec![
                MonthlyRevenue { month: "2024-01".into(), revenue: 100.0, orders: 1 },
                MonthlyRevenue { month: "2024-03".into(), revenue: 15.0, orders: 2 },
            ]
        );
    }

    #[test]
    fn empty_store_has_zero_stats() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("../db/schema.sql")).unwrap();
        let stats = compute(&conn).unwrap();
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.total_revenue, 0.0);
        assert!(stats.monthly_revenue.is_empty());
        assert!(stats.recent_customers.is_empty());
    }
}
