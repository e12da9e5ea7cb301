use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::Product;

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub original_price: f64,
    pub sale_price: Option<f64>,
    pub condition: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub stock: i64,
    pub rating: Option<f64>,
    pub reviews: Option<i64>,
}

/// Partial update. For the optional text fields an absent key keeps the
/// stored value and an explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub original_price: Option<f64>,
    pub sale_price: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub condition: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
    pub stock: Option<i64>,
    pub rating: Option<f64>,
    pub reviews: Option<i64>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Newest first. `search` matches anywhere in the name, ignoring case.
pub fn list_products(conn: &Connection, filter: &ProductFilter) -> AppResult<Vec<Product>> {
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(&search_key(s))));
    let category = filter
        .category
        .as_deref()
        .filter(|c| !c.is_empty() && *c != "all");

    let sql = format!(
        "SELECT {} FROM products
         WHERE (?1 IS NULL OR name_search LIKE ?1 ESCAPE '\\')
           AND (?2 IS NULL OR category = ?2)
         ORDER BY created_at DESC, id DESC",
        Product::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params![search, category], Product::from_row)?;
    let products: Result<Vec<_>, _> = rows.collect();
    Ok(products?)
}

pub fn get_product(conn: &Connection, id: i64) -> AppResult<Product> {
    find_product(conn, id)?.ok_or_else(|| AppError::NotFound("Product not found".into()))
}

pub fn find_product(conn: &Connection, id: i64) -> AppResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", Product::COLUMNS);
    Ok(conn
        .query_row(&sql, rusqlite::params![id], Product::from_row)
        .optional()?)
}

pub fn category_counts(conn: &Connection) -> AppResult<Vec<CategoryCount>> {
    let mut stmt = conn.prepare(
        "SELECT category, COUNT(*) FROM products
         WHERE category IS NOT NULL AND category != ''
         GROUP BY category ORDER BY category",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(CategoryCount {
            category: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    let counts: Result<Vec<_>, _> = rows.collect();
    Ok(counts?)
}

pub fn create_product(conn: &Connection, body: NewProduct, admin_id: Option<&str>) -> AppResult<Product> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    let sale_price = body.sale_price.unwrap_or(body.original_price);
    validate_price("original_price", body.original_price)?;
    validate_price("sale_price", sale_price)?;
    validate_stock(body.stock)?;
    let rating = body.rating.unwrap_or(5.0);
    validate_rating(rating)?;
    let reviews = body.reviews.unwrap_or(0).max(0);

    let now = db::now();
    conn.execute(
        "INSERT INTO products (name, name_search, description, original_price, sale_price, condition, category, image, stock, rating, reviews, admin_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        rusqlite::params![
            name,
            search_key(name),
            body.description,
            body.original_price,
            sale_price,
            body.condition,
            body.category,
            body.image,
            body.stock,
            rating,
            reviews,
            admin_id,
            now,
            now
        ],
    )?;

    get_product(conn, conn.last_insert_rowid())
}

pub fn update_product(conn: &Connection, id: i64, changes: ProductChanges) -> AppResult<Product> {
    let existing = get_product(conn, id)?;

    let name = match changes.name {
        Some(n) if n.trim().is_empty() => {
            return Err(AppError::BadRequest("Name cannot be empty".into()))
        }
        Some(n) => n.trim().to_string(),
        None => existing.name,
    };
    let original_price = changes.original_price.unwrap_or(existing.original_price);
    let sale_price = changes.sale_price.unwrap_or(existing.sale_price);
    let stock = changes.stock.unwrap_or(existing.stock);
    let rating = changes.rating.unwrap_or(existing.rating);
    validate_price("original_price", original_price)?;
    validate_price("sale_price", sale_price)?;
    validate_stock(stock)?;
    validate_rating(rating)?;

    let description = changes.description.unwrap_or(existing.description);
    let condition = changes.condition.unwrap_or(existing.condition);
    let category = changes.category.unwrap_or(existing.category);
    let image = changes.image.unwrap_or(existing.image);
    let reviews = changes.reviews.unwrap_or(existing.reviews).max(0);

    conn.execute(
        "UPDATE products SET name = ?1, name_search = ?2, description = ?3, original_price = ?4, sale_price = ?5,
                condition = ?6, category = ?7, image = ?8, stock = ?9, rating = ?10, reviews = ?11, updated_at = ?12
         WHERE id = ?13",
        rusqlite::params![
            name,
            search_key(&name),
            description,
            original_price,
            sale_price,
            condition,
            category,
            image,
            stock,
            rating,
            reviews,
            db::now(),
            id
        ],
    )?;

    get_product(conn, id)
}

/// Refuses to delete products that existing orders point at.
pub fn delete_product(conn: &Connection, id: i64) -> AppResult<()> {
    let referenced: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM order_items WHERE product_id = ?1)",
        rusqlite::params![id],
        |row| row.get(0),
    )?;
    if referenced {
        return Err(AppError::Conflict(
            "Product has associated orders and cannot be deleted".into(),
        ));
    }

    let affected = match conn.execute("DELETE FROM products WHERE id = ?1", rusqlite::params![id]) {
        Ok(n) => n,
        // An order landed between the check and the delete
        Err(e) if db::is_constraint_violation(&e) => {
            return Err(AppError::Conflict(
                "Product has associated orders and cannot be deleted".into(),
            ))
        }
        Err(e) => return Err(AppError::Database(e)),
    };

    if affected == 0 {
        return Err(AppError::NotFound("Product not found".into()));
    }
    Ok(())
}

/// Unicode-aware lowercase form of a product name. SQLite's own `lower()`
/// only folds ASCII, so both sides of a search are folded here.
fn search_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn validate_price(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::BadRequest(format!("{field} must be a non-negative number")));
    }
    Ok(())
}

fn validate_stock(stock: i64) -> AppResult<()> {
    if stock < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".into()));
    }
    Ok(())
}

fn validate_rating(rating: f64) -> AppResult<()> {
    if !(0.0..=5.0).contains(&rating) {
        return Err(AppError::BadRequest("rating must be between 0 and 5".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("../db/schema.sql")).unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    fn product(name: &str, category: &str, price: f64) -> NewProduct {
        NewProduct {
            name: name.into(),
            description: None,
            original_price: price,
            sale_price: None,
            condition: Some("Excelente".into()),
            category: Some(category.into()),
            image: None,
            stock: 3,
            rating: None,
            reviews: None,
        }
    }

    #[test]
    fn create_applies_defaults() {
        let conn = conn();
        let p = create_product(&conn, product("Mouse Logitech G502", "Mouse", 120.0), None).unwrap();
        assert_eq!(p.sale_price, 120.0);
        assert_eq!(p.rating, 5.0);
        assert_eq!(p.reviews, 0);
        assert!(p.admin_id.is_none());
    }

    #[test]
    fn create_rejects_bad_input() {
        let conn = conn();
        assert!(matches!(
            create_product(&conn, product("  ", "Mouse", 1.0), None),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            create_product(&conn, product("Mouse", "Mouse", -1.0), None),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn search_is_case_insensitive_and_category_exact() {
        let conn = conn();
        create_product(&conn, product("Mouse Razer", "Mouse", 100.0), None).unwrap();
        create_product(&conn, product("Teclado HyperX", "Teclado", 200.0), None).unwrap();

        let found = list_products(
            &conn,
            &ProductFilter {
                search: Some("razer".into()),
                category: None,
            },
        )
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Mouse Razer");

        let keyboards = list_products(
            &conn,
            &ProductFilter {
                search: None,
                category: Some("Teclado".into()),
            },
        )
        .unwrap();
        assert_eq!(keyboards.len(), 1);

        let all = list_products(
            &conn,
            &ProductFilter {
                search: Some("".into()),
                category: Some("all".into()),
            },
        )
        .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let conn = conn();
        let p = create_product(&conn, product("Headset", "Headset", 80.0), None).unwrap();
        let updated = update_product(
            &conn,
            p.id,
            ProductChanges {
                sale_price: Some(60.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.sale_price, 60.0);
        assert_eq!(updated.original_price, 80.0);
        assert_eq!(updated.name, "Headset");

        assert!(matches!(
            update_product(&conn, 9999, ProductChanges::default()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn search_folds_accented_capitals() {
        let conn = conn();
        create_product(&conn, product("Monitor ÁGIL", "Monitor", 900.0), None).unwrap();
        create_product(&conn, product("Monitor Dell", "Monitor", 700.0), None).unwrap();

        for term in ["ágil", "ÁGIL", "Ágil"] {
            let found = list_products(
                &conn,
                &ProductFilter {
                    search: Some(term.into()),
                    category: None,
                },
            )
            .unwrap();
            assert_eq!(found.len(), 1, "search {term}");
            assert_eq!(found[0].name, "Monitor ÁGIL");
        }
    }

    #[test]
    fn search_treats_like_wildcards_literally() {
        let conn = conn();
        create_product(&conn, product("Cabo 100% cobre", "Cabo", 30.0), None).unwrap();
        create_product(&conn, product("Cabo_USB", "Cabo", 20.0), None).unwrap();
        create_product(&conn, product("Cabo HDMI", "Cabo", 25.0), None).unwrap();

        let search = |term: &str| {
            list_products(
                &conn,
                &ProductFilter {
                    search: Some(term.into()),
                    category: None,
                },
            )
            .unwrap()
        };
        assert_eq!(search("%").len(), 1);
        assert_eq!(search("_").len(), 1);
        assert_eq!(search("_")[0].name, "Cabo_USB");
        assert_eq!(search("cabo").len(), 3);
    }

    #[test]
    fn renaming_updates_search() {
        let conn = conn();
        let p = create_product(&conn, product("Mouse", "Mouse", 50.0), None).unwrap();
        update_product(
            &conn,
            p.id,
            ProductChanges {
                name: Some("Mouse Ótico".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let found = list_products(
            &conn,
            &ProductFilter {
                search: Some("ÓTICO".into()),
                category: None,
            },
        )
        .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn explicit_null_clears_optional_fields() {
        let conn = conn();
        let p = create_product(&conn, product("Webcam", "Webcam", 150.0), None).unwrap();
        assert!(p.condition.is_some());

        let changes: ProductChanges =
            serde_json::from_str(r#"{"condition": null, "stock": 1}"#).unwrap();
        let updated = update_product(&conn, p.id, changes).unwrap();
        assert!(updated.condition.is_none());
        assert_eq!(updated.category.as_deref(), Some("Webcam"));
        assert_eq!(updated.stock, 1);
    }

    #[test]
    fn categories_are_counted() {
        let conn = conn();
        create_product(&conn, product("A", "Mouse", 1.0), None).unwrap();
        create_product(&conn, product("B", "Mouse", 1.0), None).unwrap();
        create_product(&conn, product("C", "Monitor", 1.0), None).unwrap();

        let counts = category_counts(&conn).unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].category, "Monitor");
        assert_eq!(counts[1].count, 2);
    }

    #[test]
    fn delete_missing_product_is_not_found() {
        let conn = conn();
        assert!(matches!(delete_product(&conn, 1), Err(AppError::NotFound(_))));
    }
}
