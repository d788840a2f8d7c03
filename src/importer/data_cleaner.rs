// ==========================================
// 数据清洗器
// ==========================================
// 职责: TRIM / NULL 标准化 / 布尔标记 / 数值范围校验
// 所有错误都带行号与字段名
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use rust_decimal::Decimal;
use std::str::FromStr;

/// 价格上限（不含）: 8 位数字、2 位小数 → 整数部分最多 6 位
const PRICE_UPPER_BOUND: i64 = 1_000_000;

/// 价格最多小数位
const PRICE_MAX_SCALE: u32 = 2;

pub struct DataCleaner;

impl DataCleaner {
    /// 空白视为缺失
    pub fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 解析布尔标记（1/Y/YES/TRUE/T/是 与 0/N/NO/FALSE/F/否）
    pub fn parse_flag(&self, value: &str, row: usize, field: &str) -> ImportResult<bool> {
        match value.trim().to_uppercase().as_str() {
            "1" | "Y" | "YES" | "TRUE" | "T" | "是" => Ok(true),
            "0" | "N" | "NO" | "FALSE" | "F" | "否" => Ok(false),
            other => Err(ImportError::validation(
                row,
                field,
                format!("无法识别的布尔值: {}", other),
            )),
        }
    }

    /// 解析价格（Decimal，>= 0，最多 2 位小数，小于 1,000,000）
    pub fn parse_price(&self, value: &str, row: usize, field: &str) -> ImportResult<Decimal> {
        let price = Decimal::from_str(value.trim()).map_err(|_| {
            ImportError::validation(row, field, format!("无法解析为十进制数: {}", value))
        })?;
        let price = price.normalize();

        if price.is_sign_negative() && !price.is_zero() {
            return Err(ImportError::validation(row, field, "价格不能为负数"));
        }
        if price.scale() > PRICE_MAX_SCALE {
            return Err(ImportError::validation(
                row,
                field,
                format!("小数位不能超过 {} 位: {}", PRICE_MAX_SCALE, value),
            ));
        }
        if price >= Decimal::from(PRICE_UPPER_BOUND) {
            return Err(ImportError::validation(
                row,
                field,
                format!("价格超出范围: {}", value),
            ));
        }
        Ok(price)
    }

    /// 解析整数并校验闭区间 [min, max]
    pub fn parse_int_in_range(
        &self,
        value: &str,
        min: i64,
        max: i64,
        row: usize,
        field: &str,
    ) -> ImportResult<i64> {
        let parsed = self.parse_id(value, row, field)?;
        if parsed < min || parsed > max {
            return Err(ImportError::validation(
                row,
                field,
                format!("值 {} 超出范围 [{}, {}]", parsed, min, max),
            ));
        }
        Ok(parsed)
    }

    /// 解析主键引用
    pub fn parse_id(&self, value: &str, row: usize, field: &str) -> ImportResult<i64> {
        value.trim().parse::<i64>().map_err(|_| {
            ImportError::validation(row, field, format!("无法解析为整数: {}", value))
        })
    }

    /// 解析逗号分隔的 id 列表（去除空白，跳过空项，保持原顺序）
    pub fn parse_id_list(&self, value: &str, row: usize, field: &str) -> ImportResult<Vec<i64>> {
        value
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| self.parse_id(token, row, field))
            .collect()
    }

    /// 校验字符长度上限（按字符计）
    pub fn validate_max_len(
        &self,
        value: &str,
        max_len: usize,
        row: usize,
        field: &str,
    ) -> ImportResult<()> {
        let len = value.chars().count();
        if len > max_len {
            return Err(ImportError::validation(
                row,
                field,
                format!("长度 {} 超过上限 {}", len, max_len),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_null() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.normalize_null(Some("  ")), None);
        assert_eq!(cleaner.normalize_null(None), None);
        assert_eq!(
            cleaner.normalize_null(Some("  value  ")),
            Some("value".to_string())
        );
    }

    #[test]
    fn test_parse_flag() {
        let cleaner = DataCleaner;
        assert!(cleaner.parse_flag("True", 1, "archived").unwrap());
        assert!(cleaner.parse_flag("1", 1, "archived").unwrap());
        assert!(cleaner.parse_flag("是", 1, "archived").unwrap());
        assert!(!cleaner.parse_flag("false", 1, "archived").unwrap());
        assert!(!cleaner.parse_flag("N", 1, "archived").unwrap());
        assert!(cleaner.parse_flag("maybe", 1, "archived").is_err());
    }

    #[test]
    fn test_parse_price() {
        let cleaner = DataCleaner;
        assert_eq!(
            cleaner.parse_price("10.50", 1, "price").unwrap(),
            Decimal::from_str("10.5").unwrap()
        );
        assert_eq!(
            cleaner.parse_price("999999.99", 1, "price").unwrap(),
            Decimal::from_str("999999.99").unwrap()
        );
        // 尾随零不计入小数位
        assert!(cleaner.parse_price("1.500", 1, "price").is_ok());
        assert!(cleaner.parse_price("1.555", 1, "price").is_err());
        assert!(cleaner.parse_price("-1", 1, "price").is_err());
        assert!(cleaner.parse_price("1000000", 1, "price").is_err());
        assert!(cleaner.parse_price("abc", 1, "price").is_err());
    }

    #[test]
    fn test_parse_int_in_range() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_int_in_range("15", 0, 100, 1, "discount").unwrap(), 15);
        assert!(cleaner.parse_int_in_range("101", 0, 100, 1, "discount").is_err());
        assert!(cleaner.parse_int_in_range("1.5", 0, 100, 1, "discount").is_err());
    }

    #[test]
    fn test_parse_id_list() {
        let cleaner = DataCleaner;
        assert_eq!(
            cleaner.parse_id_list(" 1, 2,,999 ", 1, "products").unwrap(),
            vec![1, 2, 999]
        );
        assert!(cleaner.parse_id_list("", 1, "products").unwrap().is_empty());

        match cleaner.parse_id_list("1,two", 4, "products") {
            Err(ImportError::Validation { row, field, .. }) => {
                assert_eq!(row, 4);
                assert_eq!(field, "products");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
