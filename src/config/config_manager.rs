// ==========================================
// 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::import_config_trait::ShopConfigReader;
use crate::db::read_schema_version;
use crate::domain::types::{MissingProductPolicy, OrderProductsMode};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导入
    pub const DEFAULT_ENCODING: &str = "import.default_encoding";
    pub const ORDER_PRODUCTS_MODE: &str = "import.order_products_mode";
    pub const MISSING_PRODUCT_POLICY: &str = "import.missing_product_policy";

    // 导出
    pub const EXPORT_CACHE_TTL_SECS: &str = "export.cache_ttl_secs";
}

/// 默认编码
pub const DEFAULT_ENCODING: &str = "utf-8";

/// 默认导出缓存有效期（秒）
pub const DEFAULT_EXPORT_CACHE_TTL_SECS: u64 = 300;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 获取所有配置的快照（JSON 格式，按 key 排序）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&json!(config_map))
            .map_err(|e| RepositoryError::InternalError(e.to_string()))
    }

    /// 数据库中记录的 schema 版本（未建表时为 None）
    pub fn schema_version(&self) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(read_schema_version(&conn)?)
    }

    // ===== 同步读取（供启动期装配使用） =====

    /// 订单商品关联方式（无法识别的值回退为默认值并告警）
    pub fn order_products_mode(&self) -> RepositoryResult<OrderProductsMode> {
        let value = self.get_config_or_default(config_keys::ORDER_PRODUCTS_MODE, "PER_ROW")?;
        Ok(value.parse().unwrap_or_else(|e: String| {
            tracing::warn!(
                config_key = config_keys::ORDER_PRODUCTS_MODE,
                raw_value = %value,
                error = %e,
                "配置格式错误，使用默认值"
            );
            OrderProductsMode::default()
        }))
    }

    pub fn missing_product_policy(&self) -> RepositoryResult<MissingProductPolicy> {
        let value = self.get_config_or_default(config_keys::MISSING_PRODUCT_POLICY, "DROP")?;
        Ok(value.parse().unwrap_or_else(|e: String| {
            tracing::warn!(
                config_key = config_keys::MISSING_PRODUCT_POLICY,
                raw_value = %value,
                error = %e,
                "配置格式错误，使用默认值"
            );
            MissingProductPolicy::default()
        }))
    }

    pub fn default_encoding(&self) -> RepositoryResult<String> {
        let value = self.get_config_or_default(config_keys::DEFAULT_ENCODING, DEFAULT_ENCODING)?;
        let value = value.trim();
        if value.is_empty() {
            Ok(DEFAULT_ENCODING.to_string())
        } else {
            Ok(value.to_string())
        }
    }

    pub fn export_cache_ttl_secs(&self) -> RepositoryResult<u64> {
        let value = self.get_config_or_default(
            config_keys::EXPORT_CACHE_TTL_SECS,
            &DEFAULT_EXPORT_CACHE_TTL_SECS.to_string(),
        )?;
        Ok(value
            .trim()
            .parse::<u64>()
            .unwrap_or(DEFAULT_EXPORT_CACHE_TTL_SECS))
    }
}

// ==========================================
// ShopConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ShopConfigReader for ConfigManager {
    async fn get_default_encoding(&self) -> RepositoryResult<String> {
        self.default_encoding()
    }

    async fn get_order_products_mode(&self) -> RepositoryResult<OrderProductsMode> {
        self.order_products_mode()
    }

    async fn get_missing_product_policy(&self) -> RepositoryResult<MissingProductPolicy> {
        self.missing_product_policy()
    }
}
