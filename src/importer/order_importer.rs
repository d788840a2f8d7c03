// ==========================================
// 订单 CSV 导入器
// ==========================================
// 流程:
//   解码 → 列校验 → 行映射（含商品 id 解析）→ 用户解析
//   → [FAIL 策略] 商品存在性校验
//   → 阶段 1: 单事务批量写入订单
//   → 阶段 2: 单事务为每个订单设置商品集合
// 红线: 阶段 1 之前发现的任何错误都不产生写入
//       阶段 2 失败时阶段 1 已提交的订单保留（无商品）
// ==========================================

use crate::config::ShopConfigReader;
use crate::domain::order::Order;
use crate::domain::types::{MissingProductPolicy, OrderProductsMode};
use crate::importer::csv_importer_trait::CsvImporter;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{OrderFieldMapper, OrderRow};
use crate::importer::record_parser::{CsvRecordParser, Encoding, RecordParser};
use crate::repository::{OrderRepository, ProductRepository, UserRepository};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// OrderCsvImporter - 订单导入器
// ==========================================
pub struct OrderCsvImporter<C>
where
    C: ShopConfigReader,
{
    // 数据访问层
    orders: Arc<OrderRepository>,
    products: Arc<ProductRepository>,
    users: Arc<UserRepository>,

    // 配置读取器
    config: Arc<C>,

    // 导入组件
    parser: Box<dyn RecordParser>,
    mapper: OrderFieldMapper,
}

impl<C> OrderCsvImporter<C>
where
    C: ShopConfigReader,
{
    pub fn new(
        orders: Arc<OrderRepository>,
        products: Arc<ProductRepository>,
        users: Arc<UserRepository>,
        config: Arc<C>,
    ) -> Self {
        Self {
            orders,
            products,
            users,
            config,
            parser: Box::new(CsvRecordParser),
            mapper: OrderFieldMapper::default(),
        }
    }

    async fn resolve_encoding(&self, encoding: Option<&str>) -> ImportResult<Encoding> {
        match encoding.map(str::trim).filter(|e| !e.is_empty()) {
            Some(label) => Encoding::from_label(label),
            None => Encoding::from_label(&self.config.get_default_encoding().await?),
        }
    }

    /// 按 id 解析每一行的用户（同一用户只查询一次）
    fn resolve_users(&self, rows: &[OrderRow]) -> ImportResult<()> {
        let mut known: HashMap<i64, bool> = HashMap::new();
        for row in rows {
            let user_id = row.order.user_id;
            let exists = match known.get(&user_id) {
                Some(exists) => *exists,
                None => {
                    let exists = self.users.find_by_id(user_id)?.is_some();
                    known.insert(user_id, exists);
                    exists
                }
            };
            if !exists {
                return Err(ImportError::NotFound {
                    entity: "User".to_string(),
                    id: user_id.to_string(),
                    row: row.row_number,
                });
            }
        }
        Ok(())
    }

    /// FAIL 策略: 任一引用的商品不存在即报错
    fn ensure_products_exist(&self, rows: &[OrderRow]) -> ImportResult<()> {
        let referenced: BTreeSet<i64> = rows
            .iter()
            .flat_map(|r| r.product_ids.iter().copied())
            .collect();
        let referenced: Vec<i64> = referenced.into_iter().collect();
        let existing = self.products.existing_ids(&referenced)?;

        for row in rows {
            if let Some(missing) = row.product_ids.iter().find(|id| !existing.contains(*id)) {
                return Err(ImportError::NotFound {
                    entity: "Product".to_string(),
                    id: missing.to_string(),
                    row: row.row_number,
                });
            }
        }
        Ok(())
    }
}

/// 按关联方式为每个订单确定商品 id 列表
///
/// - PerRow: 每个订单取自己那一行
/// - LegacyLastRow: 所有订单都取最后一行
fn pair_product_ids(rows: &[OrderRow], mode: OrderProductsMode) -> Vec<Vec<i64>> {
    match mode {
        OrderProductsMode::PerRow => rows.iter().map(|r| r.product_ids.clone()).collect(),
        OrderProductsMode::LegacyLastRow => {
            let last = rows.last().map(|r| r.product_ids.clone()).unwrap_or_default();
            vec![last; rows.len()]
        }
    }
}

#[async_trait]
impl<C> CsvImporter for OrderCsvImporter<C>
where
    C: ShopConfigReader,
{
    type Output = Order;

    #[instrument(skip(self, content), fields(batch_id, bytes = content.len()))]
    async fn import_csv(
        &self,
        content: &[u8],
        encoding: Option<&str>,
    ) -> ImportResult<Vec<Order>> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let encoding = self.resolve_encoding(encoding).await?;
        let mode = self.config.get_order_products_mode().await?;
        let policy = self.config.get_missing_product_policy().await?;
        info!(
            batch_id = %batch_id,
            mode = %mode,
            policy = %policy,
            "开始导入订单 CSV"
        );

        // === 步骤 1: 解码 + 列校验 ===
        let rows = self.parser.parse(content, encoding)?;
        self.mapper.check_columns(rows.headers())?;

        // === 步骤 2: 行映射（商品 id 格式错误在此阶段暴露） ===
        let mut order_rows = Vec::new();
        for row in rows {
            let row = row?;
            match self.mapper.map_row(&row) {
                Ok(mapped) => order_rows.push(mapped),
                Err(e) => {
                    warn!(batch_id = %batch_id, row_number = row.row_number, error = %e, "行映射失败");
                    return Err(e);
                }
            }
        }

        // === 步骤 3: 引用解析 ===
        self.resolve_users(&order_rows)?;
        if policy == MissingProductPolicy::Fail {
            self.ensure_products_exist(&order_rows)?;
        }
        debug!(rows = order_rows.len(), "引用解析完成");

        let product_lists = pair_product_ids(&order_rows, mode);

        // === 阶段 1: 写入订单 ===
        let created = self
            .orders
            .bulk_create(order_rows.into_iter().map(|r| r.order).collect())?;

        // === 阶段 2: 设置商品集合 ===
        let assignments: Vec<(i64, Vec<i64>)> = created
            .iter()
            .map(|o| o.id)
            .zip(product_lists)
            .collect();
        let linked = self.orders.attach_products(&assignments)?;

        info!(
            batch_id = %batch_id,
            imported = created.len(),
            linked_products = linked,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "订单 CSV 导入完成"
        );
        Ok(created)
    }
}
