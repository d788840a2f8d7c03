// ==========================================
// 字段映射器
// ==========================================
// 职责: 列结构校验 + 行映射 → 待写入实体（含类型转换与默认值）
// 商品: 列 ⊆ PRODUCT_FIELDS，id 列接受但忽略
// 订单: 列 == ORDER_IMPORT_COLUMNS
// ==========================================

use crate::domain::order::{NewOrder, ORDER_IMPORT_COLUMNS, PROMOCODE_MAX_LEN};
use crate::domain::product::{NewProduct, PRODUCT_FIELDS, PRODUCT_NAME_MAX_LEN};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::record_parser::RowMapping;
use rust_decimal::Decimal;
use std::collections::HashSet;

const MAX_DISCOUNT: i64 = 100;

/// 表头中的重复列（按首次重复出现的顺序）
fn reject_duplicate_columns(headers: &[String]) -> ImportResult<()> {
    let mut seen = HashSet::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for header in headers {
        if !seen.insert(header.as_str()) && !duplicates.contains(&header.as_str()) {
            duplicates.push(header);
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(ImportError::SchemaMismatch(format!(
            "重复的列: {}",
            duplicates.join(", ")
        )))
    }
}

// ==========================================
// ProductFieldMapper - 商品行映射
// ==========================================
pub struct ProductFieldMapper {
    cleaner: DataCleaner,
}

impl Default for ProductFieldMapper {
    fn default() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }
}

impl ProductFieldMapper {
    /// 校验表头: 每一列都必须是商品字段，且不能重复
    pub fn check_columns(&self, headers: &[String]) -> ImportResult<()> {
        reject_duplicate_columns(headers)?;
        let unknown: Vec<&str> = headers
            .iter()
            .map(String::as_str)
            .filter(|h| !PRODUCT_FIELDS.contains(h))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(ImportError::SchemaMismatch(format!(
                "未知的商品列: {}",
                unknown.join(", ")
            )))
        }
    }

    /// 行映射 → NewProduct
    ///
    /// # 默认值
    /// - description: ""
    /// - price: 0
    /// - discount: 0
    /// - archived: false
    pub fn map_row(&self, row: &RowMapping) -> ImportResult<NewProduct> {
        let n = row.row_number;

        let name = row
            .get("name")
            .ok_or_else(|| ImportError::validation(n, "name", "商品名称不能为空"))?;
        self.cleaner
            .validate_max_len(name, PRODUCT_NAME_MAX_LEN, n, "name")?;

        let price = match row.get("price") {
            Some(v) => self.cleaner.parse_price(v, n, "price")?,
            None => Decimal::ZERO,
        };

        let discount = match row.get("discount") {
            Some(v) => self.cleaner.parse_int_in_range(v, 0, MAX_DISCOUNT, n, "discount")? as i32,
            None => 0,
        };

        let archived = match row.get("archived") {
            Some(v) => self.cleaner.parse_flag(v, n, "archived")?,
            None => false,
        };

        let user_id = row
            .get("user")
            .map(|v| self.cleaner.parse_id(v, n, "user"))
            .transpose()?;

        Ok(NewProduct {
            name: name.to_string(),
            // 描述保留原文（仅在完全空白时取默认值）
            description: row
                .raw("description")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_default()
                .to_string(),
            price,
            discount,
            archived,
            preview: self.cleaner.normalize_null(row.raw("preview")),
            user_id,
        })
    }
}

// ==========================================
// OrderRow - 订单行（订单 + 本行商品 id 列表）
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRow {
    pub row_number: usize,
    pub order: NewOrder,
    pub product_ids: Vec<i64>,
}

// ==========================================
// OrderFieldMapper - 订单行映射
// ==========================================
pub struct OrderFieldMapper {
    cleaner: DataCleaner,
}

impl Default for OrderFieldMapper {
    fn default() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }
}

impl OrderFieldMapper {
    /// 校验表头: 必须恰好是 delivery_address, promocode, user, products（不重复）
    pub fn check_columns(&self, headers: &[String]) -> ImportResult<()> {
        reject_duplicate_columns(headers)?;
        let missing: Vec<&str> = ORDER_IMPORT_COLUMNS
            .iter()
            .copied()
            .filter(|c| !headers.iter().any(|h| h == c))
            .collect();
        let extra: Vec<&str> = headers
            .iter()
            .map(String::as_str)
            .filter(|h| !ORDER_IMPORT_COLUMNS.contains(h))
            .collect();

        if missing.is_empty() && extra.is_empty() {
            return Ok(());
        }
        Err(ImportError::SchemaMismatch(format!(
            "订单列不匹配: 缺少 [{}], 多余 [{}]",
            missing.join(", "),
            extra.join(", ")
        )))
    }

    /// 行映射 → OrderRow（用户只做格式校验，存在性由导入器解析）
    pub fn map_row(&self, row: &RowMapping) -> ImportResult<OrderRow> {
        let n = row.row_number;

        let promocode = row.get("promocode").unwrap_or_default();
        self.cleaner
            .validate_max_len(promocode, PROMOCODE_MAX_LEN, n, "promocode")?;

        let user_id = row
            .get("user")
            .ok_or_else(|| ImportError::validation(n, "user", "用户不能为空"))
            .and_then(|v| self.cleaner.parse_id(v, n, "user"))?;

        let product_ids = match row.get("products") {
            Some(v) => self.cleaner.parse_id_list(v, n, "products")?,
            None => Vec::new(),
        };

        Ok(OrderRow {
            row_number: n,
            order: NewOrder {
                delivery_address: row.get("delivery_address").unwrap_or_default().to_string(),
                promocode: promocode.to_string(),
                user_id,
            },
            product_ids,
        })
    }
}
