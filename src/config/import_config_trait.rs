// ==========================================
// 导入/导出配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::{MissingProductPolicy, OrderProductsMode};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ShopConfigReader Trait
// ==========================================
// 用途: 导入器每次导入时读取的配置
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ShopConfigReader: Send + Sync {
    /// 未声明编码时使用的默认编码标签
    ///
    /// # 默认值
    /// - utf-8
    async fn get_default_encoding(&self) -> RepositoryResult<String>;

    /// 订单导入时订单与商品列表的配对方式
    ///
    /// # 默认值
    /// - PER_ROW
    async fn get_order_products_mode(&self) -> RepositoryResult<OrderProductsMode>;

    /// 订单导入时不存在的商品 id 的处理策略
    ///
    /// # 默认值
    /// - DROP
    async fn get_missing_product_policy(&self) -> RepositoryResult<MissingProductPolicy>;
}
