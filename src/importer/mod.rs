// ==========================================
// 导入层
// ==========================================
// 职责: CSV 上传 → 校验后的实体 → 批量落库
// 支持: 商品 CSV / 订单 CSV（两阶段）
// ==========================================

// 模块声明
pub mod csv_importer_trait;
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod order_importer;
pub mod product_importer;
pub mod record_parser;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::{OrderFieldMapper, OrderRow, ProductFieldMapper};
pub use order_importer::OrderCsvImporter;
pub use product_importer::ProductCsvImporter;
pub use record_parser::{CsvRecordParser, CsvRows, Encoding, RecordParser, RowMapping};

// 重导出 Trait 接口
pub use csv_importer_trait::{CsvImporter, CsvUpload};
