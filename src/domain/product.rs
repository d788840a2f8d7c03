// ==========================================
// 商品领域模型
// ==========================================
// 对齐: product / product_image 表
// 软删除: archived = true，不做物理删除
// ==========================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 商品实体字段（顺序即导出顺序）
pub const PRODUCT_FIELDS: &[&str] = &[
    "id",
    "name",
    "description",
    "price",
    "discount",
    "archived",
    "preview",
    "user",
];

/// 商品名称最大长度
pub const PRODUCT_NAME_MAX_LEN: usize = 100;

/// 列表页描述截断长度
const DESCRIPTION_SHORT_LEN: usize = 48;

/// 订阅源条目描述截断长度
const FEED_DESCRIPTION_LEN: usize = 100;

// ==========================================
// Product - 商品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,           // 最多 8 位数字，2 位小数
    pub discount: i32,            // 折扣百分比 0..=100
    pub archived: bool,           // 软删除标记
    pub preview: Option<String>,  // 预览图路径
    pub user_id: Option<i64>,     // 创建者
}

impl Product {
    /// 列表展示用的简短描述（超过 48 字符截断并追加 "..."）
    pub fn description_short(&self) -> String {
        if self.description.chars().count() < DESCRIPTION_SHORT_LEN {
            return self.description.clone();
        }
        let head: String = self.description.chars().take(DESCRIPTION_SHORT_LEN).collect();
        format!("{}...", head)
    }

    /// 订阅源描述: 前 100 个字符，不追加省略号
    pub fn feed_description(&self) -> String {
        self.description.chars().take(FEED_DESCRIPTION_LEN).collect()
    }
}

// ==========================================
// FeedItem - 最新商品订阅源条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub product_id: i64,
    pub title: String,
    pub description: String,
}

impl From<&Product> for FeedItem {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            title: product.name.clone(),
            description: product.feed_description(),
        }
    }
}

// ==========================================
// NewProduct - 待写入商品（无主键）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub discount: i32,
    pub archived: bool,
    pub preview: Option<String>,
    pub user_id: Option<i64>,
}

impl NewProduct {
    /// 按名称构造，其余字段取默认值
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Default for NewProduct {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            price: Decimal::ZERO,
            discount: 0,
            archived: false,
            preview: None,
            user_id: None,
        }
    }
}

// ==========================================
// ProductImage - 商品图片
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    pub image: String,
}

// ==========================================
// ProductQuery - 商品查询条件
// ==========================================
// search: name/description 包含（不区分 ASCII 大小写）
// name / description / price / discount / archived: 精确匹配
// ordering: 排序字段，None 时按主键升序
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,   // 按数值比较，1999 与 1999.00 相等
    pub discount: Option<i32>,
    pub archived: Option<bool>,
    pub ordering: Option<ProductOrdering>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductOrderField {
    Name,
    Price,
    Discount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOrdering {
    pub field: ProductOrderField,
    pub descending: bool,
}

impl ProductOrdering {
    /// 解析 `name` / `-price` 形式的排序参数
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "name" => ProductOrderField::Name,
            "price" => ProductOrderField::Price,
            "discount" => ProductOrderField::Discount,
            _ => return None,
        };
        Some(Self { field, descending })
    }
}
