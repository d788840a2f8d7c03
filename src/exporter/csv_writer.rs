// ==========================================
// CSV 导出写入器
// ==========================================
// 职责: 有序实体 + 有序字段列表 → CSV 文本 + 下载响应头
// 表头: 字段名原样输出；值: None → 空、bool → true/false
// 红线: 数据内容不会导致导出失败，只有未知字段（调用方错误）会
// ==========================================

use crate::domain::types::ExportEntity;
use crate::repository::error::RepositoryError;
use csv::WriterBuilder;
use thiserror::Error;
use tracing::debug;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// 导出错误类型
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("未知的导出字段: {0}")]
    UnknownField(String),

    #[error("CSV 编码失败: {0}")]
    Encoding(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Encoding(err.to_string())
    }
}

/// Result 类型别名
pub type ExportResult<T> = Result<T, ExportError>;

// ==========================================
// CsvRecord Trait - 可导出为 CSV 行的实体
// ==========================================
pub trait CsvRecord {
    /// 可导出的字段（即模型字段，按声明顺序）
    const FIELDS: &'static [&'static str];

    /// 字段值的字符串形式；未知字段返回 None
    fn csv_value(&self, field: &str) -> Option<String>;
}

// ==========================================
// CsvExport - 导出结果（下载响应）
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

impl CsvExport {
    /// `attachment; filename="<entity>-export.csv"`
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }

    /// 下载响应头
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", self.content_type.to_string()),
            ("Content-Disposition", self.content_disposition()),
        ]
    }
}

// ==========================================
// ExportWriter
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportWriter;

impl ExportWriter {
    /// 写出 CSV
    ///
    /// # 参数
    /// - entity: 决定下载文件名
    /// - records: 已排序的实体
    /// - fields: 输出列（顺序即列顺序）
    ///
    /// # 返回
    /// - Err(UnknownField): 字段不属于该实体（即使 records 为空也会校验）
    pub fn write<T: CsvRecord>(
        &self,
        entity: ExportEntity,
        records: &[T],
        fields: &[&str],
    ) -> ExportResult<CsvExport> {
        if let Some(unknown) = fields.iter().find(|f| !T::FIELDS.contains(*f)) {
            return Err(ExportError::UnknownField(unknown.to_string()));
        }

        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(fields)?;

        for record in records {
            let row = fields
                .iter()
                .map(|f| {
                    record
                        .csv_value(f)
                        .ok_or_else(|| ExportError::UnknownField(f.to_string()))
                })
                .collect::<ExportResult<Vec<String>>>()?;
            writer.write_record(&row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Encoding(e.to_string()))?;
        let body = String::from_utf8(bytes).map_err(|e| ExportError::Encoding(e.to_string()))?;

        debug!(entity = %entity, rows = records.len(), columns = fields.len(), "CSV 写出完成");
        Ok(CsvExport {
            filename: entity.export_filename(),
            content_type: CSV_CONTENT_TYPE,
            body,
        })
    }
}
