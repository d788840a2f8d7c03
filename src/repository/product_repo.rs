// ==========================================
// 商品仓储
// ==========================================
// 职责: product / product_image 表的数据访问
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约束: 所有查询使用参数化
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::product::{
    NewProduct, Product, ProductImage, ProductOrderField, ProductQuery,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, discount, archived, preview, user_id";

/// 单条 `IN (...)` 语句最多绑定的 id 数（低于 SQLite 的变量上限）
pub(crate) const MAX_IN_PARAMS: usize = 500;

/// 生成 `?, ?, ?` 占位符
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// price 以 TEXT 存储，读取时还原为 Decimal
pub(crate) fn decimal_from_column(idx: usize, raw: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn map_product_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    let price_raw: String = row.get(3)?;
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: decimal_from_column(3, &price_raw)?,
        discount: row.get(4)?,
        archived: row.get(5)?,
        preview: row.get(6)?,
        user_id: row.get(7)?,
    })
}

/// LIKE 通配符转义（配合 ESCAPE '\'）
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// ==========================================
// ProductRepository - 商品仓储
// ==========================================
pub struct ProductRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductRepository {
    /// 创建新的 ProductRepository 实例
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

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 批量创建商品（单事务，全部成功或全部回滚）
    ///
    /// # 返回
    /// - Ok(Vec<Product>): 按输入顺序返回已分配主键的商品
    /// - Err: 任一行被存储拒绝（如 user_id 外键不存在），整批回滚
    pub fn bulk_create(&self, products: Vec<NewProduct>) -> RepositoryResult<Vec<Product>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut created = Vec::with_capacity(products.len());
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO product (name, description, price, discount, archived, preview, user_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;

            for p in products {
                stmt.execute(params![
                    p.name,
                    p.description,
                    p.price.to_string(),
                    p.discount,
                    p.archived,
                    p.preview,
                    p.user_id,
                ])?;
                created.push(Product {
                    id: tx.last_insert_rowid(),
                    name: p.name,
                    description: p.description,
                    price: p.price,
                    discount: p.discount,
                    archived: p.archived,
                    preview: p.preview,
                    user_id: p.user_id,
                });
            }
        }

        tx.commit()?;
        Ok(created)
    }

    /// 按名称获取商品，不存在则以默认字段创建
    ///
    /// # 返回
    /// - (Product, true): 新建
    /// - (Product, false): 已存在（同名多条时取主键最小者）
    pub fn get_or_create_by_name(&self, name: &str) -> RepositoryResult<(Product, bool)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = tx
            .query_row(
                &format!(
                    "SELECT {} FROM product WHERE name = ?1 ORDER BY id LIMIT 1",
                    PRODUCT_COLUMNS
                ),
                params![name],
                map_product_row,
            )
            .optional()?;

        if let Some(product) = existing {
            tx.commit()?;
            return Ok((product, false));
        }

        let new = NewProduct::named(name);
        tx.execute(
            "INSERT INTO product (name, description, price, discount, archived) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![new.name, new.description, new.price.to_string(), new.discount, new.archived],
        )?;
        let product = Product {
            id: tx.last_insert_rowid(),
            name: new.name,
            description: new.description,
            price: new.price,
            discount: new.discount,
            archived: new.archived,
            preview: None,
            user_id: None,
        };
        tx.commit()?;
        Ok((product, true))
    }

    /// 批量设置 archived 标记（软删除/恢复）
    ///
    /// # 返回
    /// - Ok(usize): 受影响行数
    pub fn set_archived(&self, ids: &[i64], archived: bool) -> RepositoryResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut updated = 0;
        for chunk in ids.chunks(MAX_IN_PARAMS) {
            let mut args: Vec<Value> = vec![Value::Integer(archived as i64)];
            args.extend(chunk.iter().map(|id| Value::Integer(*id)));

            let sql = format!(
                "UPDATE product SET archived = ? WHERE id IN ({})",
                placeholders(chunk.len())
            );
            updated += tx.execute(&sql, params_from_iter(args.iter()))?;
        }

        tx.commit()?;
        Ok(updated)
    }

    /// 名称包含指定片段的商品统一设置折扣
    ///
    /// # 说明
    /// - 匹配方式为 SQLite LIKE（ASCII 不区分大小写）
    pub fn update_discount_where_name_contains(
        &self,
        fragment: &str,
        discount: i32,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let pattern = format!("%{}%", escape_like(fragment));
        Ok(conn.execute(
            r"UPDATE product SET discount = ?1 WHERE name LIKE ?2 ESCAPE '\'",
            params![discount, pattern],
        )?)
    }

    /// 为商品追加图片
    pub fn add_image(&self, product_id: i64, image: &str) -> RepositoryResult<ProductImage> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO product_image (product_id, image) VALUES (?1, ?2)",
            params![product_id, image],
        )?;
        Ok(ProductImage {
            id: conn.last_insert_rowid(),
            product_id,
            image: image.to_string(),
        })
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按主键查询
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                &format!("SELECT {} FROM product WHERE id = ?1", PRODUCT_COLUMNS),
                params![id],
                map_product_row,
            )
            .optional()?;
        Ok(product)
    }

    /// 按主键批量查询（不存在的 id 直接忽略，结果按主键升序）
    pub fn find_by_ids(&self, ids: &[i64]) -> RepositoryResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let conn = self.get_conn()?;

        let mut products = Vec::new();
        for chunk in ids.chunks(MAX_IN_PARAMS) {
            let sql = format!(
                "SELECT {} FROM product WHERE id IN ({})",
                PRODUCT_COLUMNS,
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), map_product_row)?;
            for row in rows {
                products.push(row?);
            }
        }

        products.sort_by_key(|p| p.id);
        products.dedup_by_key(|p| p.id);
        Ok(products)
    }

    /// 返回给定 id 中实际存在的那些
    pub fn existing_ids(&self, ids: &[i64]) -> RepositoryResult<BTreeSet<i64>> {
        if ids.is_empty() {
            return Ok(BTreeSet::new());
        }
        let conn = self.get_conn()?;

        let mut existing = BTreeSet::new();
        for chunk in ids.chunks(MAX_IN_PARAMS) {
            let sql = format!(
                "SELECT id FROM product WHERE id IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| row.get::<_, i64>(0))?;
            for id in rows {
                existing.insert(id?);
            }
        }
        Ok(existing)
    }

    /// 全部商品，按主键升序
    pub fn list_all(&self) -> RepositoryResult<Vec<Product>> {
        self.query(&ProductQuery::default())
    }

    /// 条件查询
    ///
    /// # 说明
    /// - search 匹配 name 或 description（LIKE 包含）
    /// - archived 精确过滤
    /// - ordering 为空时按主键升序；非空时以主键作为第二排序键
    pub fn query(&self, query: &ProductQuery) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;

        let mut sql = format!("SELECT {} FROM product WHERE 1 = 1", PRODUCT_COLUMNS);
        let mut args: Vec<Value> = Vec::new();

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            sql.push_str(r" AND (name LIKE ? ESCAPE '\' OR description LIKE ? ESCAPE '\')");
            args.push(Value::Text(pattern.clone()));
            args.push(Value::Text(pattern));
        }

        if let Some(name) = &query.name {
            sql.push_str(" AND name = ?");
            args.push(Value::Text(name.clone()));
        }

        if let Some(description) = &query.description {
            sql.push_str(" AND description = ?");
            args.push(Value::Text(description.clone()));
        }

        // price 以 TEXT 存储，按数值比较
        if let Some(price) = query.price {
            sql.push_str(" AND CAST(price AS REAL) = CAST(? AS REAL)");
            args.push(Value::Text(price.to_string()));
        }

        if let Some(discount) = query.discount {
            sql.push_str(" AND discount = ?");
            args.push(Value::Integer(discount as i64));
        }

        if let Some(archived) = query.archived {
            sql.push_str(" AND archived = ?");
            args.push(Value::Integer(archived as i64));
        }

        match query.ordering {
            Some(ordering) => {
                let column = match ordering.field {
                    ProductOrderField::Name => "name",
                    ProductOrderField::Price => "CAST(price AS REAL)",
                    ProductOrderField::Discount => "discount",
                };
                let direction = if ordering.descending { "DESC" } else { "ASC" };
                sql.push_str(&format!(" ORDER BY {} {}, id ASC", column, direction));
            }
            None => sql.push_str(" ORDER BY id ASC"),
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), map_product_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// 按名称倒序取前 N 条（最新商品订阅源）
    pub fn latest_by_name_desc(&self, limit: usize) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM product ORDER BY name DESC, id DESC LIMIT ?1",
            PRODUCT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit as i64], map_product_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// 商品图片，按主键升序
    pub fn images_for(&self, product_id: i64) -> RepositoryResult<Vec<ProductImage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, product_id, image FROM product_image WHERE product_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![product_id], |row| {
            Ok(ProductImage {
                id: row.get(0)?,
                product_id: row.get(1)?,
                image: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// 商品总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM product", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::product::ProductOrdering;

    fn setup() -> ProductRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        ProductRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn priced(name: &str, price: &str) -> NewProduct {
        NewProduct {
            price: Decimal::from_str(price).unwrap(),
            ..NewProduct::named(name)
        }
    }

    #[test]
    fn test_id_lookups_beyond_variable_limit() {
        let repo = setup();
        let created = repo
            .bulk_create(vec![priced("A", "1"), priced("B", "2")])
            .unwrap();

        // 超过 SQLite 默认变量上限（32766）的 id 列表
        let mut ids: Vec<i64> = (100_000..140_000).collect();
        ids.push(created[1].id);
        ids.push(created[0].id);

        let existing = repo.existing_ids(&ids).unwrap();
        assert_eq!(existing.into_iter().collect::<Vec<_>>(), vec![created[0].id, created[1].id]);

        let found = repo.find_by_ids(&ids).unwrap();
        assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![created[0].id, created[1].id]);

        assert_eq!(repo.set_archived(&ids, true).unwrap(), 2);
    }

    #[test]
    fn test_bulk_create_assigns_ids_in_order() {
        let repo = setup();
        let created = repo
            .bulk_create(vec![priced("Laptop", "1999"), priced("Phone", "999.50")])
            .unwrap();

        assert_eq!(created.len(), 2);
        assert!(created[0].id < created[1].id);
        let loaded = repo.find_by_id(created[1].id).unwrap().unwrap();
        assert_eq!(loaded.price, Decimal::from_str("999.50").unwrap());
    }

    #[test]
    fn test_bulk_create_rolls_back_on_foreign_key_violation() {
        let repo = setup();
        let mut bad = priced("Ghost", "1");
        bad.user_id = Some(404);

        let result = repo.bulk_create(vec![priced("Laptop", "1"), bad]);
        assert!(matches!(result, Err(RepositoryError::ForeignKeyViolation(_))));
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_query_search_archived_and_ordering() {
        let repo = setup();
        let created = repo
            .bulk_create(vec![
                priced("Phone 1", "30"),
                priced("Phone 2", "10"),
                priced("Desktop", "20"),
            ])
            .unwrap();
        repo.set_archived(&[created[0].id], true).unwrap();

        let phones = repo
            .query(&ProductQuery {
                search: Some("phone".to_string()),
                archived: Some(false),
                ..ProductQuery::default()
            })
            .unwrap();
        assert_eq!(phones.len(), 1);
        assert_eq!(phones[0].name, "Phone 2");

        let by_price = repo
            .query(&ProductQuery {
                ordering: ProductOrdering::parse("-price"),
                ..ProductQuery::default()
            })
            .unwrap();
        let names: Vec<_> = by_price.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Phone 1", "Desktop", "Phone 2"]);
    }

    #[test]
    fn test_query_exact_field_filters() {
        let repo = setup();
        let mut described = priced("Phone", "999.50");
        described.description = "Black".to_string();
        described.discount = 10;
        repo.bulk_create(vec![described, priced("Phone case", "15"), priced("Laptop", "1999")])
            .unwrap();

        let names = |query: ProductQuery| -> Vec<String> {
            repo.query(&query).unwrap().into_iter().map(|p| p.name).collect()
        };

        // name 精确匹配，不做包含匹配
        assert_eq!(
            names(ProductQuery { name: Some("Phone".to_string()), ..ProductQuery::default() }),
            vec!["Phone"]
        );
        assert!(names(ProductQuery { name: Some("phone".to_string()), ..ProductQuery::default() })
            .is_empty());

        // 1999 与 1999.00 数值相等
        assert_eq!(
            names(ProductQuery {
                price: Some(Decimal::from_str("1999.00").unwrap()),
                ..ProductQuery::default()
            }),
            vec!["Laptop"]
        );
        assert_eq!(
            names(ProductQuery {
                price: Some(Decimal::from_str("999.5").unwrap()),
                ..ProductQuery::default()
            }),
            vec!["Phone"]
        );

        assert_eq!(
            names(ProductQuery { discount: Some(0), ..ProductQuery::default() }),
            vec!["Phone case", "Laptop"]
        );
        assert_eq!(
            names(ProductQuery {
                description: Some("Black".to_string()),
                discount: Some(10),
                ..ProductQuery::default()
            }),
            vec!["Phone"]
        );
    }

    #[test]
    fn test_search_escapes_like_wildcards() {
        let repo = setup();
        repo.bulk_create(vec![priced("100% cotton", "1"), priced("1000 cotton", "1")])
            .unwrap();

        let found = repo
            .query(&ProductQuery {
                search: Some("100%".to_string()),
                ..ProductQuery::default()
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "100% cotton");
    }

    #[test]
    fn test_get_or_create_by_name() {
        let repo = setup();
        let (first, created) = repo.get_or_create_by_name("Laptop").unwrap();
        assert!(created);
        let (second, created) = repo.get_or_create_by_name("Laptop").unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_existing_ids_and_discount_update() {
        let repo = setup();
        let created = repo
            .bulk_create(vec![priced("Phone", "1"), priced("Smartphone X", "1"), priced("Desk", "1")])
            .unwrap();

        let ids: Vec<i64> = vec![created[0].id, 999];
        let existing = repo.existing_ids(&ids).unwrap();
        assert_eq!(existing.into_iter().collect::<Vec<_>>(), vec![created[0].id]);

        let updated = repo.update_discount_where_name_contains("phone", 10).unwrap();
        assert_eq!(updated, 2);
        assert_eq!(repo.find_by_id(created[2].id).unwrap().unwrap().discount, 0);
    }

    #[test]
    fn test_latest_and_images() {
        let repo = setup();
        let created = repo
            .bulk_create(vec![priced("Alpha", "1"), priced("Gamma", "1"), priced("Beta", "1")])
            .unwrap();

        let latest = repo.latest_by_name_desc(2).unwrap();
        let names: Vec<_> = latest.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Beta"]);

        repo.add_image(created[0].id, "products/alpha.png").unwrap();
        let images = repo.images_for(created[0].id).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].image, "products/alpha.png");
    }
}
