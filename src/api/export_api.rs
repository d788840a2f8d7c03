// ==========================================
// 导出 API
// ==========================================
// 职责:
// - REST download_csv: 按查询条件导出商品（固定字段）
// - 后台动作: 导出选中行（全部模型字段，按主键排序）
// - JSON 导出: 商品 / 订单（仅员工）/ 用户订单，商品与用户订单带缓存
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::order::ORDER_FIELDS;
use crate::domain::product::{ProductQuery, PRODUCT_FIELDS};
use crate::domain::types::ExportEntity;
use crate::domain::user::User;
use crate::exporter::{
    CsvExport, ExportCache, ExportWriter, OrdersExport, ProductsExport, UserOrdersExport,
};
use crate::i18n;
use crate::repository::{OrderRepository, ProductRepository, UserRepository};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// REST download_csv 输出的商品字段
pub const DOWNLOAD_PRODUCT_FIELDS: &[&str] = &["name", "price", "description", "discount"];

pub struct ExportApi {
    products: Arc<ProductRepository>,
    orders: Arc<OrderRepository>,
    users: Arc<UserRepository>,
    cache: Arc<ExportCache>,
    writer: ExportWriter,
}

impl ExportApi {
    pub fn new(
        products: Arc<ProductRepository>,
        orders: Arc<OrderRepository>,
        users: Arc<UserRepository>,
        cache: Arc<ExportCache>,
    ) -> Self {
        Self {
            products,
            orders,
            users,
            cache,
            writer: ExportWriter,
        }
    }

    // ==========================================
    // CSV
    // ==========================================

    /// REST download_csv: 过滤/搜索/排序后的商品，字段 name, price, description, discount
    #[instrument(skip(self))]
    pub fn download_products_csv(&self, query: &ProductQuery) -> ApiResult<CsvExport> {
        let products = self.products.query(query)?;
        let export = self
            .writer
            .write(ExportEntity::Products, &products, DOWNLOAD_PRODUCT_FIELDS)?;
        info!(rows = products.len(), "商品 CSV 下载");
        Ok(export)
    }

    /// 后台动作: 导出选中的行（全部模型字段，按主键升序）
    #[instrument(skip(self, ids), fields(selected = ids.len()))]
    pub fn export_selected_csv(&self, entity: ExportEntity, ids: &[i64]) -> ApiResult<CsvExport> {
        let export = match entity {
            ExportEntity::Products => {
                let products = self.products.find_by_ids(ids)?;
                self.writer.write(entity, &products, PRODUCT_FIELDS)?
            }
            ExportEntity::Orders => {
                let orders = self.orders.find_by_ids(ids)?;
                self.writer.write(entity, &orders, ORDER_FIELDS)?
            }
        };
        info!(entity = %entity, "选中行 CSV 导出");
        Ok(export)
    }

    /// 导出整表（全部模型字段，按主键升序）
    pub fn export_all_csv(&self, entity: ExportEntity) -> ApiResult<CsvExport> {
        let export = match entity {
            ExportEntity::Products => {
                self.writer
                    .write(entity, &self.products.list_all()?, PRODUCT_FIELDS)?
            }
            ExportEntity::Orders => self
                .writer
                .write(entity, &self.orders.list_all()?, ORDER_FIELDS)?,
        };
        Ok(export)
    }

    // ==========================================
    // JSON
    // ==========================================

    /// JSON 导出缓存的有效期
    pub fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }

    /// {"products": [...]}，缓存键 products_data_export
    pub async fn products_json(&self) -> ApiResult<Arc<ProductsExport>> {
        self.cache
            .products_or_try_insert_with(|| async {
                let products = self.products.list_all()?;
                Ok::<_, ApiError>(ProductsExport::from_products(&products))
            })
            .await
    }

    /// {"orders": [...]}，仅员工可用，不缓存
    pub fn orders_json(&self, requester: &User) -> ApiResult<OrdersExport> {
        if !requester.is_staff {
            return Err(ApiError::PermissionDenied(i18n::t("export.staff_only")));
        }
        let orders = self.orders.list_all()?;
        Ok(OrdersExport::from_orders(&orders))
    }

    /// {"user_id": .., "orders": [...]}，缓存键 {user_id}_user_orders_data_cache
    ///
    /// # 返回
    /// - Err(NotFound): 用户不存在
    pub async fn user_orders_json(&self, user_id: i64) -> ApiResult<Arc<UserOrdersExport>> {
        let user = self.users.get(user_id)?;
        self.cache
            .user_orders_or_try_insert_with(user.id, || async {
                let orders = self.orders.list_by_user(user.id)?;
                Ok::<_, ApiError>(UserOrdersExport::from_orders(user.id, &orders))
            })
            .await
    }
}
