// ==========================================
// 订单仓储
// ==========================================
// 职责: shop_order / shop_order_products 表的数据访问
// 红线: Repository 不含业务规则，只做数据 CRUD
// 两阶段写入:
//   1) bulk_create: 单事务批量写入订单（不含商品）
//   2) attach_products: 单事务为每个订单设置商品集合
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::order::{NewOrder, Order, OrderTotals, OrderWithRelations};
use crate::domain::product::Product;
use crate::domain::user::User;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::product_repo::{
    decimal_from_column, map_product_row, placeholders, MAX_IN_PARAMS,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const ORDER_COLUMNS: &str = "id, delivery_address, promocode, created_at, user_id";

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn map_order_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let created_at: String = row.get(3)?;
    Ok(Order {
        id: row.get(0)?,
        delivery_address: row.get(1)?,
        promocode: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
        user_id: row.get(4)?,
    })
}

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 创建新的 OrderRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::connection(db_path, e))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn insert_order_tx(tx: &Transaction<'_>, order: &NewOrder) -> RepositoryResult<Order> {
        let created_at = Utc::now();
        tx.execute(
            "INSERT INTO shop_order (delivery_address, promocode, created_at, user_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                order.delivery_address,
                order.promocode,
                created_at.to_rfc3339(),
                order.user_id,
            ],
        )?;
        Ok(Order {
            id: tx.last_insert_rowid(),
            delivery_address: order.delivery_address.clone(),
            promocode: order.promocode.clone(),
            created_at,
            user_id: order.user_id,
        })
    }

    /// 在事务中按 id 解析商品并写入关联（不存在的商品 id 被 SELECT 自然过滤）
    fn link_products_tx(
        tx: &Transaction<'_>,
        order_id: i64,
        product_ids: &[i64],
    ) -> RepositoryResult<usize> {
        let mut linked = 0;
        for chunk in product_ids.chunks(MAX_IN_PARAMS) {
            let mut args: Vec<Value> = vec![Value::Integer(order_id)];
            args.extend(chunk.iter().map(|id| Value::Integer(*id)));

            let sql = format!(
                r#"
                INSERT OR IGNORE INTO shop_order_products (order_id, product_id)
                SELECT ?, id FROM product WHERE id IN ({})
                "#,
                placeholders(chunk.len())
            );
            linked += tx.execute(&sql, params_from_iter(args.iter()))?;
        }
        Ok(linked)
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 阶段 1: 批量创建订单（单事务，全部成功或全部回滚）
    ///
    /// # 返回
    /// - Ok(Vec<Order>): 按输入顺序返回已分配主键的订单
    pub fn bulk_create(&self, orders: Vec<NewOrder>) -> RepositoryResult<Vec<Order>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut created = Vec::with_capacity(orders.len());
        for order in &orders {
            created.push(Self::insert_order_tx(&tx, order)?);
        }

        tx.commit()?;
        Ok(created)
    }

    /// 阶段 2: 为每个订单设置商品集合（单事务）
    ///
    /// # 参数
    /// - assignments: (订单 id, 商品 id 列表)
    ///
    /// # 说明
    /// - “设置”语义: 先清空订单已有关联再写入
    /// - 商品 id 在事务内按 `id IN (...)` 解析，不存在的 id 静默丢弃
    ///
    /// # 返回
    /// - Ok(usize): 实际写入的关联行数
    pub fn attach_products(&self, assignments: &[(i64, Vec<i64>)]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut linked = 0;
        for (order_id, product_ids) in assignments {
            tx.execute(
                "DELETE FROM shop_order_products WHERE order_id = ?1",
                params![order_id],
            )?;
            linked += Self::link_products_tx(&tx, *order_id, product_ids)?;
        }

        tx.commit()?;
        Ok(linked)
    }

    /// 获取或创建订单，并追加商品（单事务）
    ///
    /// # 返回
    /// - (Order, true): 新建
    /// - (Order, false): 已存在同地址/优惠码/用户的订单
    pub fn get_or_create_with_products(
        &self,
        order: &NewOrder,
        product_ids: &[i64],
    ) -> RepositoryResult<(Order, bool)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = tx
            .query_row(
                &format!(
                    "SELECT {} FROM shop_order WHERE delivery_address = ?1 AND promocode = ?2 AND user_id = ?3 ORDER BY id LIMIT 1",
                    ORDER_COLUMNS
                ),
                params![order.delivery_address, order.promocode, order.user_id],
                map_order_row,
            )
            .optional()?;

        let (saved, created) = match existing {
            Some(found) => (found, false),
            None => (Self::insert_order_tx(&tx, order)?, true),
        };
        Self::link_products_tx(&tx, saved.id, product_ids)?;

        tx.commit()?;
        Ok((saved, created))
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        let order = conn
            .query_row(
                &format!("SELECT {} FROM shop_order WHERE id = ?1", ORDER_COLUMNS),
                params![id],
                map_order_row,
            )
            .optional()?;
        Ok(order)
    }

    /// 按主键批量查询（结果按主键升序）
    pub fn find_by_ids(&self, ids: &[i64]) -> RepositoryResult<Vec<Order>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let conn = self.get_conn()?;

        let mut orders = Vec::new();
        for chunk in ids.chunks(MAX_IN_PARAMS) {
            let sql = format!(
                "SELECT {} FROM shop_order WHERE id IN ({})",
                ORDER_COLUMNS,
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), map_order_row)?;
            for row in rows {
                orders.push(row?);
            }
        }

        orders.sort_by_key(|o| o.id);
        orders.dedup_by_key(|o| o.id);
        Ok(orders)
    }

    /// 全部订单，按主键升序
    pub fn list_all(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM shop_order ORDER BY id",
            ORDER_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_order_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// 某用户的订单，按主键升序
    pub fn list_by_user(&self, user_id: i64) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM shop_order WHERE user_id = ?1 ORDER BY id",
            ORDER_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id], map_order_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// 订单当前关联的商品 id（升序）
    pub fn product_ids_for(&self, order_id: i64) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT product_id FROM shop_order_products WHERE order_id = ?1 ORDER BY product_id",
        )?;
        let rows = stmt.query_map(params![order_id], |row| row.get::<_, i64>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// 订单 + 用户 + 商品
    ///
    /// # 说明
    /// - 用户通过 JOIN 一次取回
    /// - 商品通过第二次查询取回后按订单分组（每个订单内按商品主键升序）
    /// - 订单按主键升序
    pub fn list_with_relations(&self) -> RepositoryResult<Vec<OrderWithRelations>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT o.id, o.delivery_address, o.promocode, o.created_at, o.user_id,
                   u.id, u.username, u.first_name, u.is_staff
            FROM shop_order o
            JOIN auth_user u ON u.id = o.user_id
            ORDER BY o.id
            "#,
        )?;
        let orders = stmt
            .query_map([], |row| {
                let order = map_order_row(row)?;
                let user = User {
                    id: row.get(5)?,
                    username: row.get(6)?,
                    first_name: row.get(7)?,
                    is_staff: row.get(8)?,
                };
                Ok((order, user))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT p.id, p.name, p.description, p.price, p.discount, p.archived, p.preview, p.user_id,
                   sop.order_id
            FROM shop_order_products sop
            JOIN product p ON p.id = sop.product_id
            ORDER BY sop.order_id, p.id
            "#,
        )?;
        let mut products_by_order: HashMap<i64, Vec<Product>> = HashMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(8)?, map_product_row(row)?)))?;
        for row in rows {
            let (order_id, product) = row?;
            products_by_order.entry(order_id).or_default().push(product);
        }

        Ok(orders
            .into_iter()
            .map(|(order, user)| {
                let products = products_by_order.remove(&order.id).unwrap_or_default();
                OrderWithRelations {
                    order,
                    user,
                    products,
                }
            })
            .collect())
    }

    /// 每个订单的商品数量与总价（无商品的订单总价为 0）
    pub fn totals(&self) -> RepositoryResult<Vec<OrderTotals>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT o.id, p.price
            FROM shop_order o
            LEFT JOIN shop_order_products sop ON sop.order_id = o.id
            LEFT JOIN product p ON p.id = sop.product_id
            ORDER BY o.id
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let order_id: i64 = row.get(0)?;
            let price = row
                .get::<_, Option<String>>(1)?
                .map(|raw| decimal_from_column(1, &raw))
                .transpose()?;
            Ok((order_id, price))
        })?;

        let mut totals: Vec<OrderTotals> = Vec::new();
        for row in rows {
            let (order_id, price) = row?;
            if totals.last().map(|t| t.order_id) != Some(order_id) {
                totals.push(OrderTotals {
                    order_id,
                    products_count: 0,
                    total: Decimal::ZERO,
                });
            }
            if let (Some(current), Some(price)) = (totals.last_mut(), price) {
                current.products_count += 1;
                current.total += price;
            }
        }
        Ok(totals)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM shop_order", [], |row| row.get(0))?)
    }
}
