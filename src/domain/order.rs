// ==========================================
// 订单领域模型
// ==========================================
// 对齐: shop_order / shop_order_products 表
// 约束: 订单-商品关联只能在订单落库之后写入（两阶段）
// ==========================================

use crate::domain::product::Product;
use crate::domain::user::User;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 订单实体字段（顺序即导出顺序；多对多 products 不在其中）
pub const ORDER_FIELDS: &[&str] = &["id", "delivery_address", "promocode", "created_at", "user"];

/// 订单 CSV 导入所需的列
pub const ORDER_IMPORT_COLUMNS: &[&str] = &["delivery_address", "promocode", "user", "products"];

/// 优惠码最大长度
pub const PROMOCODE_MAX_LEN: usize = 20;

// ==========================================
// Order - 订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub delivery_address: String,
    pub promocode: String,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
}

// ==========================================
// NewOrder - 待写入订单（无主键、无商品）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub delivery_address: String,
    pub promocode: String,
    pub user_id: i64,
}

// ==========================================
// OrderWithRelations - 订单 + 用户 + 商品
// ==========================================
// 查询方式: 用户 JOIN 取回，商品第二次查询按订单分组
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithRelations {
    pub order: Order,
    pub user: User,
    pub products: Vec<Product>,
}

impl OrderWithRelations {
    /// 后台列表展示的用户名（优先 first_name）
    pub fn user_verbose(&self) -> &str {
        self.user.display_name()
    }
}

// ==========================================
// OrderTotals - 订单聚合（商品数量/总价）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub order_id: i64,
    pub products_count: usize,
    pub total: Decimal,
}
