// ==========================================
// 商品/订单 CSV 批量导入导出 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 范围: 商品/订单 CSV 导入、CSV/JSON 导出、后台动作、管理命令
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - CSV 解析与批量写入
pub mod importer;

// 导出层 - CSV 写出 / JSON 导出 / 导出缓存
pub mod exporter;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    MissingProductPolicy, NewOrder, NewProduct, Order, OrderProductsMode, Product, ProductImage,
    User,
};

// 导入/导出
pub use exporter::{CsvExport, ExportWriter};
pub use importer::{ImportError, OrderCsvImporter, ProductCsvImporter};

// API
pub use api::{ApiError, CatalogApi, ExportApi, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "shopapp";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
