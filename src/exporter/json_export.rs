// ==========================================
// JSON 导出载荷
// ==========================================
// {"products": [...]} / {"orders": [...]} / {"user_id": .., "orders": [...]}
// price 以字符串序列化（rust_decimal serde-with-str）
// ==========================================

use crate::domain::order::Order;
use crate::domain::product::Product;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductExportRow {
    pub pk: i64,
    pub name: String,
    pub price: Decimal,
    pub archived: bool,
}

impl From<&Product> for ProductExportRow {
    fn from(product: &Product) -> Self {
        Self {
            pk: product.id,
            name: product.name.clone(),
            price: product.price,
            archived: product.archived,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductsExport {
    pub products: Vec<ProductExportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderExportRow {
    pub pk: i64,
    pub delivery_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdersExport {
    pub orders: Vec<OrderExportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOrderExportRow {
    pub pk: i64,
    pub delivery_address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOrdersExport {
    pub user_id: i64,
    pub orders: Vec<UserOrderExportRow>,
}

impl ProductsExport {
    pub fn from_products(products: &[Product]) -> Self {
        Self {
            products: products.iter().map(ProductExportRow::from).collect(),
        }
    }
}

impl OrdersExport {
    pub fn from_orders(orders: &[Order]) -> Self {
        Self {
            orders: orders
                .iter()
                .map(|o| OrderExportRow {
                    pk: o.id,
                    delivery_address: o.delivery_address.clone(),
                })
                .collect(),
        }
    }
}

impl UserOrdersExport {
    pub fn from_orders(user_id: i64, orders: &[Order]) -> Self {
        Self {
            user_id,
            orders: orders
                .iter()
                .map(|o| UserOrderExportRow {
                    pk: o.id,
                    delivery_address: o.delivery_address.clone(),
                    created_at: o.created_at,
                })
                .collect(),
        }
    }
}
