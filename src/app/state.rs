// ==========================================
// 应用状态
// ==========================================
// 职责: 装配仓储 / 导入器 / 导出缓存 / API，所有仓储共享同一个连接
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::{CatalogApi, ExportApi, ImportApi};
use crate::config::ConfigManager;
use crate::db::{
    configure_sqlite_connection, init_schema, open_sqlite_connection, CURRENT_SCHEMA_VERSION,
};
use crate::exporter::ExportCache;
use crate::importer::{OrderCsvImporter, ProductCsvImporter};
use crate::repository::{OrderRepository, ProductRepository, RepositoryError, UserRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 导入API
    pub import_api: Arc<ImportApi>,

    /// 导出API
    pub export_api: Arc<ExportApi>,

    /// 商品目录/订单API
    pub catalog_api: Arc<CatalogApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 用户仓储（管理命令与测试数据准备）
    pub user_repo: Arc<UserRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并建表（幂等）
    /// 2. 基于共享连接初始化所有Repository
    /// 3. 按配置创建导出缓存
    /// 4. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, RepositoryError> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| RepositoryError::connection(&db_path, e))?;
        init_schema(&conn)?;
        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 内存数据库（测试/演示用）
    pub fn in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory()?;
        configure_sqlite_connection(&conn)?;
        init_schema(&conn)?;
        Self::from_connection(":memory:".to_string(), Arc::new(Mutex::new(conn)))
    }

    fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, RepositoryError> {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let product_repo = Arc::new(ProductRepository::from_connection(conn.clone()));
        let order_repo = Arc::new(OrderRepository::from_connection(conn.clone()));
        let user_repo = Arc::new(UserRepository::from_connection(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn));

        // ==========================================
        // 初始化导入器 / 导出缓存
        // ==========================================
        let product_importer = Arc::new(ProductCsvImporter::new(
            product_repo.clone(),
            config_manager.clone(),
        ));
        let order_importer = Arc::new(OrderCsvImporter::new(
            order_repo.clone(),
            product_repo.clone(),
            user_repo.clone(),
            config_manager.clone(),
        ));

        let schema_version = config_manager.schema_version()?;
        tracing::info!(
            schema_version = ?schema_version,
            expected = CURRENT_SCHEMA_VERSION,
            "数据库 schema 版本"
        );

        let ttl_secs = config_manager.export_cache_ttl_secs()?;
        let export_cache = Arc::new(ExportCache::with_ttl(Duration::from_secs(ttl_secs)));
        tracing::debug!(ttl_secs = export_cache.ttl().as_secs(), "导出缓存已创建");

        // ==========================================
        // 创建API实例
        // ==========================================
        let import_api = Arc::new(ImportApi::new(product_importer, order_importer));
        let export_api = Arc::new(ExportApi::new(
            product_repo.clone(),
            order_repo.clone(),
            user_repo.clone(),
            export_cache,
        ));
        let catalog_api = Arc::new(CatalogApi::new(product_repo, order_repo, user_repo.clone()));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            import_api,
            export_api,
            catalog_api,
            config_manager,
            user_repo,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先使用环境变量 SHOPAPP_DB_PATH，其次是用户数据目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("SHOPAPP_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./shopapp.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("shopapp");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("shopapp.db");
        }
    }

    path.to_string_lossy().to_string()
}
