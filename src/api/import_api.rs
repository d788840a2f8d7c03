// ==========================================
// 导入 API
// ==========================================
// 职责: 后台 CSV 导入表单 / REST 上传 / 批量上传
// 表单校验失败 → FormInvalid（400，返回字段错误）
// 导入失败 → ImportFailed（400，每个写入阶段整体回滚）
// 成功 → 提示消息 + 重定向到上一级列表页
// ==========================================

use crate::api::error::{ApiError, ApiResult, FieldError};
use crate::config::ConfigManager;
use crate::domain::order::Order;
use crate::domain::product::Product;
use crate::i18n;
use crate::importer::{CsvImporter, CsvUpload, OrderCsvImporter, ProductCsvImporter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// 成功后返回的重定向目标（上一级列表页）
pub const IMPORT_REDIRECT: &str = "..";

// ==========================================
// 表单
// ==========================================

/// 上传的文件
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: &str, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            content: content.into(),
        }
    }
}

/// 后台 CSV 导入表单
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvImportForm {
    pub csv_file: Option<UploadedFile>,
    pub encoding: Option<String>,
}

impl CsvImportForm {
    pub fn with_file(file: UploadedFile) -> Self {
        Self {
            csv_file: Some(file),
            encoding: None,
        }
    }

    /// 表单校验: csv_file 必填且非空
    pub fn validate(&self) -> ApiResult<&UploadedFile> {
        let error = |message: String| ApiError::FormInvalid {
            errors: vec![FieldError {
                field: "csv_file".to_string(),
                message,
            }],
        };
        match &self.csv_file {
            None => Err(error(i18n::t("form.required"))),
            Some(file) if file.content.is_empty() => Err(error(i18n::t("form.empty_file"))),
            Some(file) => Ok(file),
        }
    }
}

// ==========================================
// 响应
// ==========================================

/// 后台导入成功结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminImportOutcome {
    /// 导入的行数
    pub imported: usize,
    /// 提示消息（已本地化）
    pub message: String,
    /// 重定向目标
    pub redirect: String,
}

impl AdminImportOutcome {
    fn success(imported: usize) -> Self {
        Self {
            imported,
            message: i18n::t("import.success"),
            redirect: IMPORT_REDIRECT.to_string(),
        }
    }
}

/// 批量上传中单个文件的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportApiResponse {
    pub file: String,
    pub imported: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ==========================================
// ImportApi
// ==========================================
pub struct ImportApi {
    product_importer: Arc<ProductCsvImporter<ConfigManager>>,
    order_importer: Arc<OrderCsvImporter<ConfigManager>>,
}

impl ImportApi {
    pub fn new(
        product_importer: Arc<ProductCsvImporter<ConfigManager>>,
        order_importer: Arc<OrderCsvImporter<ConfigManager>>,
    ) -> Self {
        Self {
            product_importer,
            order_importer,
        }
    }

    /// 后台动作: 从 CSV 导入商品
    pub async fn import_products_csv(&self, form: CsvImportForm) -> ApiResult<AdminImportOutcome> {
        let file = form.validate()?;
        let created = self
            .product_importer
            .import_csv(&file.content, form.encoding.as_deref())
            .await
            .map_err(|e| {
                warn!(file = %file.name, error = %e, "商品 CSV 导入失败");
                ApiError::from(e)
            })?;

        info!(file = %file.name, imported = created.len(), "商品 CSV 导入成功");
        Ok(AdminImportOutcome::success(created.len()))
    }

    /// 后台动作: 从 CSV 导入订单
    pub async fn import_orders_csv(&self, form: CsvImportForm) -> ApiResult<AdminImportOutcome> {
        let file = form.validate()?;
        let created = self
            .order_importer
            .import_csv(&file.content, form.encoding.as_deref())
            .await
            .map_err(|e| {
                warn!(file = %file.name, error = %e, "订单 CSV 导入失败");
                ApiError::from(e)
            })?;

        info!(file = %file.name, imported = created.len(), "订单 CSV 导入成功");
        Ok(AdminImportOutcome::success(created.len()))
    }

    /// REST 上传: 返回新建的商品
    pub async fn upload_products_csv(
        &self,
        file: UploadedFile,
        encoding: Option<&str>,
    ) -> ApiResult<Vec<Product>> {
        CsvImportForm::with_file(file.clone()).validate()?;
        Ok(self
            .product_importer
            .import_csv(&file.content, encoding)
            .await?)
    }

    /// REST 上传: 返回新建的订单
    pub async fn upload_orders_csv(
        &self,
        file: UploadedFile,
        encoding: Option<&str>,
    ) -> ApiResult<Vec<Order>> {
        CsvImportForm::with_file(file.clone()).validate()?;
        Ok(self.order_importer.import_csv(&file.content, encoding).await?)
    }

    /// 并发导入多个商品 CSV（彼此独立，各自成功或失败）
    pub async fn batch_import_products(&self, files: Vec<UploadedFile>) -> Vec<ImportApiResponse> {
        let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
        let uploads = files
            .into_iter()
            .map(|f| CsvUpload::new(&f.name, f.content))
            .collect();

        self.product_importer
            .batch_import(uploads)
            .await
            .into_iter()
            .zip(names)
            .map(|(result, file)| match result {
                Ok(created) => ImportApiResponse {
                    file,
                    imported: created.len(),
                    error_kind: None,
                    error: None,
                },
                Err(e) => ImportApiResponse {
                    file,
                    imported: 0,
                    error_kind: Some(e.kind().to_string()),
                    error: Some(e.to_string()),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_requires_file() {
        let err = CsvImportForm::default().validate().unwrap_err();
        assert_eq!(err.status_code(), 400);
        match err {
            ApiError::FormInvalid { errors } => assert_eq!(errors[0].field, "csv_file"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_form_rejects_empty_file() {
        let form = CsvImportForm::with_file(UploadedFile::new("empty.csv", Vec::new()));
        assert!(matches!(form.validate(), Err(ApiError::FormInvalid { .. })));

        let form = CsvImportForm::with_file(UploadedFile::new("ok.csv", "name\nA\n"));
        assert_eq!(form.validate().unwrap().name, "ok.csv");
    }
}
