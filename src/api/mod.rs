// ==========================================
// API 层
// ==========================================
// 职责: 后台动作 / REST 接口的业务入口，供管理命令与上层调用
// ==========================================

pub mod catalog_api;
pub mod error;
pub mod export_api;
pub mod import_api;

// 重导出核心类型
pub use catalog_api::{CatalogApi, ProductDetails};
pub use error::{ApiError, ApiResult, FieldError};
pub use export_api::{ExportApi, DOWNLOAD_PRODUCT_FIELDS};
pub use import_api::{AdminImportOutcome, CsvImportForm, ImportApi, ImportApiResponse, UploadedFile};
