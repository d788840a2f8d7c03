// ==========================================
// 领域类型定义
// ==========================================
// 导入策略枚举 + 导出实体枚举
// 序列化格式: SCREAMING_SNAKE_CASE（与 config_kv 取值一致）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 订单-商品关联方式 (Order Products Mode)
// ==========================================
// PerRow: 每个订单取自己那一行的 products 列
// LegacyLastRow: 所有订单都取最后一行的 products 列（历史行为，仅为兼容保留）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderProductsMode {
    #[default]
    PerRow,
    LegacyLastRow,
}

impl fmt::Display for OrderProductsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderProductsMode::PerRow => write!(f, "PER_ROW"),
            OrderProductsMode::LegacyLastRow => write!(f, "LEGACY_LAST_ROW"),
        }
    }
}

impl FromStr for OrderProductsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PER_ROW" => Ok(OrderProductsMode::PerRow),
            "LEGACY_LAST_ROW" => Ok(OrderProductsMode::LegacyLastRow),
            other => Err(format!("未知的订单商品关联方式: {}", other)),
        }
    }
}

// ==========================================
// 缺失商品处理策略 (Missing Product Policy)
// ==========================================
// Drop: 不存在的商品 id 静默丢弃（默认，与既有行为一致）
// Fail: 任一商品 id 不存在则整个导入失败（写入前校验）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingProductPolicy {
    #[default]
    Drop,
    Fail,
}

impl fmt::Display for MissingProductPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingProductPolicy::Drop => write!(f, "DROP"),
            MissingProductPolicy::Fail => write!(f, "FAIL"),
        }
    }
}

impl FromStr for MissingProductPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DROP" => Ok(MissingProductPolicy::Drop),
            "FAIL" => Ok(MissingProductPolicy::Fail),
            other => Err(format!("未知的缺失商品处理策略: {}", other)),
        }
    }
}

// ==========================================
// 导出实体 (Export Entity)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportEntity {
    Products,
    Orders,
}

impl ExportEntity {
    /// 建议下载文件名: `<entity>-export.csv`
    pub fn export_filename(&self) -> String {
        format!("{}-export.csv", self)
    }
}

impl fmt::Display for ExportEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportEntity::Products => write!(f, "products"),
            ExportEntity::Orders => write!(f, "orders"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_products_mode_parse() {
        assert_eq!(
            "per_row".parse::<OrderProductsMode>().unwrap(),
            OrderProductsMode::PerRow
        );
        assert_eq!(
            " LEGACY_LAST_ROW ".parse::<OrderProductsMode>().unwrap(),
            OrderProductsMode::LegacyLastRow
        );
        assert!("sometimes".parse::<OrderProductsMode>().is_err());
    }

    #[test]
    fn test_policy_round_trip_display() {
        for policy in [MissingProductPolicy::Drop, MissingProductPolicy::Fail] {
            assert_eq!(policy.to_string().parse::<MissingProductPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(ExportEntity::Products.export_filename(), "products-export.csv");
        assert_eq!(ExportEntity::Orders.export_filename(), "orders-export.csv");
    }
}
