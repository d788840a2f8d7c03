// ==========================================
// API 层错误类型
// ==========================================
// 职责: 汇总仓储/导入/导出错误，转换为用户可读的错误消息
// 状态码: 400 / 403 / 404 / 500
// ==========================================

use crate::exporter::ExportError;
use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    /// 表单校验失败（字段 → 错误信息）
    #[error("表单校验失败: {}", format_field_errors(.errors))]
    FormInvalid { errors: Vec<FieldError> },

    /// CSV 导入失败
    ///
    /// 商品导入与订单阶段 1 之前的失败不留下任何写入；
    /// 订单阶段 2（关联商品）失败时，阶段 1 已提交的订单保留、商品集合为空
    #[error("CSV 导入失败 [{kind}]: {}", .errors.join("; "))]
    ImportFailed { kind: String, errors: Vec<String> },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 权限 / 资源
    // ==========================================
    #[error("权限不足: {0}")]
    PermissionDenied(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("导出失败: {0}")]
    ExportFailed(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

/// 表单字段错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ApiError {
    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::FormInvalid { .. }
            | ApiError::ImportFailed { .. }
            | ApiError::InvalidInput(_)
            | ApiError::BusinessRuleViolation(_) => 400,
            ApiError::PermissionDenied(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::ExportFailed(_)
            | ApiError::InternalError(_) => 500,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
// 除锁/连接等基础设施故障外，导入失败都按 400 返回
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(RepositoryError::LockError(msg)) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            other => ApiError::ImportFailed {
                kind: other.kind().to_string(),
                errors: vec![other.to_string()],
            },
        }
    }
}

// ==========================================
// 从 ExportError 转换
// ==========================================
impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::UnknownField(field) => {
                ApiError::InvalidInput(format!("未知的导出字段: {}", field))
            }
            ExportError::Encoding(msg) => ApiError::ExportFailed(msg),
            ExportError::Repository(e) => e.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::FormInvalid { errors: vec![] }.status_code(), 400);
        assert_eq!(ApiError::PermissionDenied("x".into()).status_code(), 403);
        assert_eq!(ApiError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ApiError::InternalError("x".into()).status_code(), 500);
    }

    #[test]
    fn test_import_error_conversion() {
        let err: ApiError = ImportError::SchemaMismatch("colour".into()).into();
        match err {
            ApiError::ImportFailed { kind, errors } => {
                assert_eq!(kind, "SCHEMA_MISMATCH");
                assert_eq!(errors.len(), 1);
            }
            other => panic!("unexpected: {:?}", other),
        }

        let err: ApiError =
            ImportError::Repository(RepositoryError::ForeignKeyViolation("fk".into())).into();
        assert_eq!(err.status_code(), 400);

        let err: ApiError = ImportError::Repository(RepositoryError::LockError("poisoned".into())).into();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_repository_not_found_maps_to_404() {
        let err: ApiError = RepositoryError::NotFound {
            entity: "User".into(),
            id: "9".into(),
        }
        .into();
        assert_eq!(err.status_code(), 404);
        assert!(err.to_string().contains("User(id=9)"));
    }
}
