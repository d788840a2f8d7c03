// ==========================================
// JSON 导出缓存
// ==========================================
// 工具: moka future cache（按 TTL 过期）
// 键:
// - products_data_export
// - {user_id}_user_orders_data_cache
// 说明: TTL 内允许读到旧数据
// ==========================================

use crate::exporter::json_export::{ProductsExport, UserOrdersExport};
use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const PRODUCTS_CACHE_KEY: &str = "products_data_export";

const MAX_CAPACITY: u64 = 1_024;

pub fn user_orders_cache_key(user_id: i64) -> String {
    format!("{}_user_orders_data_cache", user_id)
}

#[derive(Debug, Clone)]
enum CachedExport {
    Products(Arc<ProductsExport>),
    UserOrders(Arc<UserOrdersExport>),
}

#[derive(Debug, Clone)]
pub struct ExportCache {
    inner: Cache<String, CachedExport>,
    ttl: Duration,
}

impl ExportCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_CAPACITY)
                .time_to_live(ttl)
                .build(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 商品导出: 命中则直接返回，否则调用 loader 计算并写入
    pub async fn products_or_try_insert_with<E, F, Fut>(
        &self,
        loader: F,
    ) -> Result<Arc<ProductsExport>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ProductsExport, E>>,
    {
        if let Some(CachedExport::Products(cached)) = self.inner.get(PRODUCTS_CACHE_KEY).await {
            debug!(key = PRODUCTS_CACHE_KEY, "导出缓存命中");
            return Ok(cached);
        }

        let fresh = Arc::new(loader().await?);
        self.inner
            .insert(
                PRODUCTS_CACHE_KEY.to_string(),
                CachedExport::Products(fresh.clone()),
            )
            .await;
        Ok(fresh)
    }

    /// 用户订单导出: 命中则直接返回，否则调用 loader 计算并写入
    pub async fn user_orders_or_try_insert_with<E, F, Fut>(
        &self,
        user_id: i64,
        loader: F,
    ) -> Result<Arc<UserOrdersExport>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<UserOrdersExport, E>>,
    {
        let key = user_orders_cache_key(user_id);
        if let Some(CachedExport::UserOrders(cached)) = self.inner.get(&key).await {
            debug!(key = %key, "导出缓存命中");
            return Ok(cached);
        }

        let fresh = Arc::new(loader().await?);
        self.inner
            .insert(key, CachedExport::UserOrders(fresh.clone()))
            .await;
        Ok(fresh)
    }

    /// 失效单个键
    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}
