// ==========================================
// 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑
// ==========================================

pub mod order;
pub mod product;
pub mod types;
pub mod user;

// 重导出核心类型
pub use order::{
    NewOrder, Order, OrderTotals, OrderWithRelations, ORDER_FIELDS, ORDER_IMPORT_COLUMNS,
};
pub use product::{
    FeedItem, NewProduct, Product, ProductImage, ProductOrderField, ProductOrdering, ProductQuery,
    PRODUCT_FIELDS,
};
pub use types::{ExportEntity, MissingProductPolicy, OrderProductsMode};
pub use user::User;
