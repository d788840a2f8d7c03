// ==========================================
// 导出层
// ==========================================
// 职责: 查询结果 → CSV 下载 / JSON 导出（带缓存）
// ==========================================

pub mod cache;
pub mod csv_writer;
pub mod json_export;
pub mod records;

pub use cache::{user_orders_cache_key, ExportCache, PRODUCTS_CACHE_KEY};
pub use csv_writer::{CsvExport, CsvRecord, ExportError, ExportResult, ExportWriter};
pub use json_export::{
    OrderExportRow, OrdersExport, ProductExportRow, ProductsExport, UserOrderExportRow,
    UserOrdersExport,
};
