use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::{Order, OrderItem, OrderStatus};
use crate::services::cart::{Cart, CartItem};
use crate::services::catalog;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutLine {
    #[serde(default)]
    pub product_id: i64,
    #[serde(default)]
    pub quantity: i64,
}

/// Order as the admin panel lists it: with the buyer attached.
#[derive(Debug, Serialize)]
pub struct AdminOrderView {
    #[serde(flatten)]
    pub order: Order,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

/// Prices each line from the catalog and merges repeats into a cart.
pub fn build_cart(conn: &Connection, lines: &[CheckoutLine]) -> AppResult<Cart> {
    let mut cart = Cart::new();
    for line in lines {
        if line.quantity < 1 {
            return Err(AppError::BadRequest("Quantity must be at least 1".into()));
        }
        let quantity = u32::try_from(line.quantity)
            .map_err(|_| AppError::BadRequest("Quantity is too large".into()))?;
        let product = catalog::find_product(conn, line.product_id)?.ok_or_else(|| {
            AppError::BadRequest(format!("Product {} does not exist", line.product_id))
        })?;
        cart.add(CartItem {
            product_id: product.id,
            name: product.name,
            price: product.sale_price,
            quantity,
            image: product.image,
        })?;
    }
    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    Ok(cart)
}

/// Writes the order and all of its lines in one transaction.
pub fn place_order(
    conn: &mut Connection,
    user_id: &str,
    cart: &Cart,
    shipping_address: Option<String>,
) -> AppResult<Order> {
    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let order_id = Uuid::new_v4().to_string();
    let total_amount = cart.total();
    let now = db::now();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO orders (id, user_id, total_amount, status, shipping_address, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            order_id,
            user_id,
            total_amount,
            OrderStatus::Pending.as_str(),
            shipping_address,
            now,
            now
        ],
    )?;

    let mut items = Vec::with_capacity(cart.items().len());
    {
        let mut stmt = tx.prepare(
            "INSERT INTO order_items (id, order_id, product_id, quantity, price) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for line in cart.items() {
            let item_id = Uuid::new_v4().to_string();
            stmt.execute(rusqlite::params![
                item_id,
                order_id,
                line.product_id,
                line.quantity,
                line.price
            ])?;
            items.push(OrderItem {
                id: item_id,
                order_id: order_id.clone(),
                product_id: line.product_id,
                product_name: Some(line.name.clone()),
                product_image: line.image.clone(),
                quantity: i64::from(line.quantity),
                price: line.price,
            });
        }
    }
    tx.commit()?;

    Ok(Order {
        id: order_id,
        user_id: user_id.to_string(),
        total_amount,
        status: OrderStatus::Pending,
        shipping_address,
        created_at: now.clone(),
        updated_at: now,
        items,
    })
}

pub fn list_orders_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<Order>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, total_amount, status, shipping_address, created_at, updated_at
         FROM orders WHERE user_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(rusqlite::params![user_id], order_from_row)?;
    let mut orders: Vec<Order> = rows.collect::<Result<_, _>>()?;
    for order in &mut orders {
        order.items = load_items(conn, &order.id)?;
    }
    Ok(orders)
}

pub fn list_all_orders(conn: &Connection, status: Option<OrderStatus>) -> AppResult<Vec<AdminOrderView>> {
    let mut stmt = conn.prepare(
        "SELECT o.id, o.user_id, o.total_amount, o.status, o.shipping_address, o.created_at, o.updated_at,
                p.full_name, p.email
         FROM orders o
         LEFT JOIN profiles p ON p.id = o.user_id
         WHERE (?1 IS NULL OR o.status = ?1)
         ORDER BY o.created_at DESC",
    )?;
    let rows = stmt.query_map(rusqlite::params![status.map(OrderStatus::as_str)], |row| {
        Ok(AdminOrderView {
            order: order_from_row(row)?,
            customer_name: row.get(7)?,
            customer_email: row.get(8)?,
        })
    })?;
    let mut views: Vec<AdminOrderView> = rows.collect::<Result<_, _>>()?;
    for view in &mut views {
        view.order.items = load_items(conn, &view.order.id)?;
    }
    Ok(views)
}

pub fn get_order(conn: &Connection, order_id: &str) -> AppResult<Order> {
    let mut order = conn
        .query_row(
            "SELECT id, user_id, total_amount, status, shipping_address, created_at, updated_at
             FROM orders WHERE id = ?1",
            rusqlite::params![order_id],
            order_from_row,
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    order.items = load_items(conn, order_id)?;
    Ok(order)
}

/// Completed and cancelled orders cannot move anymore. The terminal check
/// lives in the `UPDATE` itself.
pub fn update_status(conn: &Connection, order_id: &str, next: OrderStatus) -> AppResult<Order> {
    let changed = conn.execute(
        "UPDATE orders SET status = ?1, updated_at = ?2
         WHERE id = ?3 AND status NOT IN (?4, ?5)",
        rusqlite::params![
            next.as_str(),
            db::now(),
            order_id,
            OrderStatus::Completed.as_str(),
            OrderStatus::Cancelled.as_str()
        ],
    )?;

    if changed == 0 {
        // Either missing (404 from the lookup) or already terminal
        let current = get_order(conn, order_id)?;
        return Err(AppError::Conflict(format!(
            "Order is {} and can no longer change status",
            current.status
        )));
    }

    get_order(conn, order_id)
}

fn load_items(conn: &Connection, order_id: &str) -> AppResult<Vec<OrderItem>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.order_id, i.product_id, p.name, p.image, i.quantity, i.price
         FROM order_items i
         LEFT JOIN products p ON p.id = i.product_id
         WHERE i.order_id = ?1
         ORDER BY p.name",
    )?;
    let rows = stmt.query_map(rusqlite::params![order_id], |row| {
        Ok(OrderItem {
            id: row.get(0)?,
            order_id: row.get(1)?,
            product_id: row.get(2)?,
            product_name: row.get(3)?,
            product_image: row.get(4)?,
            quantity: row.get(5)?,
            price: row.get(6)?,
        })
    })?;
    let items: Result<Vec<_>, _> = rows.collect();
    Ok(items?)
}

fn order_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        user_id: row.get(1)?,
        total_amount: row.get(2)?,
        status: row.get(3)?,
        shipping_address: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        items: Vec::new(),
    })
}
