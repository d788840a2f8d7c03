// ==========================================
// 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 解码 / 列结构 / 校验 / 引用不存在 / 存储
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("CSV 解码失败: {0}")]
    Decoding(String),

    #[error("CSV 列结构不匹配: {0}")]
    SchemaMismatch(String),

    // ===== 数据映射错误 =====
    #[error("字段校验失败 (行 {row}, 字段 {field}): {message}")]
    Validation {
        row: usize,
        field: String,
        message: String,
    },

    #[error("引用的记录不存在 (行 {row}): {entity} id={id}")]
    NotFound {
        entity: String,
        id: String,
        row: usize,
    },

    // ===== 数据库错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ImportError {
    /// 稳定的错误类别代码（API 层返回给调用方）
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::Decoding(_) => "DECODING",
            ImportError::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            ImportError::Validation { .. } => "VALIDATION",
            ImportError::NotFound { .. } => "NOT_FOUND",
            ImportError::Repository(_) => "REPOSITORY",
        }
    }

    pub(crate) fn validation(row: usize, field: &str, message: impl Into<String>) -> Self {
        ImportError::Validation {
            row,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Decoding(err.to_string())
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::Decoding(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
