// ==========================================
// 商品目录 / 订单 API
// ==========================================
// 职责:
// - 后台动作: 归档 / 取消归档
// - 商品列表、详情、软删除、最新商品订阅源
// - 订单列表（带用户与商品）、订单汇总
// - 管理命令用的演示数据与批量折扣
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::order::{NewOrder, Order, OrderTotals, OrderWithRelations};
use crate::domain::product::{FeedItem, Product, ProductImage, ProductQuery};
use crate::repository::{OrderRepository, ProductRepository, UserRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// 最新商品订阅源条数
pub const LATEST_PRODUCTS_LIMIT: usize = 5;

/// 演示商品名称
pub const DEMO_PRODUCT_NAMES: &[&str] = &["Laptop", "Desktop", "Phone"];

/// 演示订单
const DEMO_ORDER_USERNAME: &str = "admin";
const DEMO_ORDER_ADDRESS: &str = "Pushkina str, 10";
const DEMO_ORDER_PROMOCODE: &str = "SALE21";

/// 商品详情（含图片）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub product: Product,
    pub images: Vec<ProductImage>,
}

pub struct CatalogApi {
    products: Arc<ProductRepository>,
    orders: Arc<OrderRepository>,
    users: Arc<UserRepository>,
}

impl CatalogApi {
    pub fn new(
        products: Arc<ProductRepository>,
        orders: Arc<OrderRepository>,
        users: Arc<UserRepository>,
    ) -> Self {
        Self {
            products,
            orders,
            users,
        }
    }

    // ==========================================
    // 后台动作
    // ==========================================

    /// 标记为已归档，返回更新行数
    pub fn mark_archived(&self, ids: &[i64]) -> ApiResult<usize> {
        let updated = self.products.set_archived(ids, true)?;
        info!(updated = updated, "商品已归档");
        Ok(updated)
    }

    /// 取消归档，返回更新行数
    pub fn mark_unarchived(&self, ids: &[i64]) -> ApiResult<usize> {
        let updated = self.products.set_archived(ids, false)?;
        info!(updated = updated, "商品已取消归档");
        Ok(updated)
    }

    // ==========================================
    // 商品
    // ==========================================

    pub fn list_products(&self, query: &ProductQuery) -> ApiResult<Vec<Product>> {
        Ok(self.products.query(query)?)
    }

    pub fn product_details(&self, product_id: i64) -> ApiResult<ProductDetails> {
        let product = self.products.find_by_id(product_id)?.ok_or_else(|| {
            ApiError::NotFound(format!("Product(id={})不存在", product_id))
        })?;
        let images = self.products.images_for(product_id)?;
        Ok(ProductDetails { product, images })
    }

    pub fn add_product_image(&self, product_id: i64, image: &str) -> ApiResult<ProductImage> {
        if self.products.find_by_id(product_id)?.is_none() {
            return Err(ApiError::NotFound(format!("Product(id={})不存在", product_id)));
        }
        Ok(self.products.add_image(product_id, image)?)
    }

    /// 软删除: 只置 archived，不做物理删除
    pub fn soft_delete_product(&self, product_id: i64) -> ApiResult<()> {
        match self.products.set_archived(&[product_id], true)? {
            0 => Err(ApiError::NotFound(format!(
                "Product(id={})不存在",
                product_id
            ))),
            _ => Ok(()),
        }
    }

    /// 最新商品订阅源: 按名称倒序取前 5 条
    pub fn latest_products(&self) -> ApiResult<Vec<Product>> {
        Ok(self.products.latest_by_name_desc(LATEST_PRODUCTS_LIMIT)?)
    }

    /// 订阅源条目: 标题为名称，描述截取前 100 字符
    pub fn latest_feed(&self) -> ApiResult<Vec<FeedItem>> {
        Ok(self.latest_products()?.iter().map(FeedItem::from).collect())
    }

    /// 名称包含 fragment 的商品统一设置折扣
    pub fn apply_bulk_discount(&self, fragment: &str, discount: i32) -> ApiResult<usize> {
        if !(0..=100).contains(&discount) {
            return Err(ApiError::InvalidInput(format!(
                "折扣必须在 0..=100 之间: {}",
                discount
            )));
        }
        Ok(self
            .products
            .update_discount_where_name_contains(fragment, discount)?)
    }

    /// 演示商品（已存在则复用），返回 (商品, 是否新建)
    pub fn create_demo_products(&self) -> ApiResult<Vec<(Product, bool)>> {
        let mut result = Vec::with_capacity(DEMO_PRODUCT_NAMES.len());
        for name in DEMO_PRODUCT_NAMES {
            let (product, created) = self.products.get_or_create_by_name(name)?;
            info!(name = %product.name, created = created, "演示商品");
            result.push((product, created));
        }
        Ok(result)
    }

    // ==========================================
    // 订单
    // ==========================================

    /// 订单列表（带用户与商品，按主键升序）
    pub fn list_orders(&self) -> ApiResult<Vec<OrderWithRelations>> {
        Ok(self.orders.list_with_relations()?)
    }

    /// 演示订单: admin 用户、全部商品（单事务）
    pub fn create_demo_order(&self) -> ApiResult<(Order, bool)> {
        let user = self
            .users
            .find_by_username(DEMO_ORDER_USERNAME)?
            .ok_or_else(|| ApiError::NotFound(format!("用户 {} 不存在", DEMO_ORDER_USERNAME)))?;
        let product_ids: Vec<i64> = self.products.list_all()?.iter().map(|p| p.id).collect();

        let order = NewOrder {
            delivery_address: DEMO_ORDER_ADDRESS.to_string(),
            promocode: DEMO_ORDER_PROMOCODE.to_string(),
            user_id: user.id,
        };
        Ok(self
            .orders
            .get_or_create_with_products(&order, &product_ids)?)
    }

    /// 每个订单的商品数量与总价
    pub fn order_totals(&self) -> ApiResult<Vec<OrderTotals>> {
        Ok(self.orders.totals()?)
    }
}
