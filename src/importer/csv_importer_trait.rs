// ==========================================
// CSV 导入 Trait
// ==========================================
// 职责: 定义商品/订单 CSV 导入的统一接口（不包含实现）
// 实现者: ProductCsvImporter, OrderCsvImporter
// ==========================================

use crate::importer::error::ImportResult;
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{error, info};

// ==========================================
// CsvUpload - 一次上传（文件名 + 内容 + 声明编码）
// ==========================================
#[derive(Debug, Clone)]
pub struct CsvUpload {
    pub name: String,
    pub content: Vec<u8>,
    pub encoding: Option<String>,
}

impl CsvUpload {
    pub fn new(name: &str, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            content: content.into(),
            encoding: None,
        }
    }

    pub fn with_encoding(mut self, encoding: &str) -> Self {
        self.encoding = Some(encoding.to_string());
        self
    }
}

#[async_trait]
pub trait CsvImporter: Send + Sync {
    /// 导入后返回的实体类型
    type Output: Send;

    /// 从 CSV 字节流导入
    ///
    /// # 参数
    /// - content: 文件内容
    /// - encoding: 声明的编码标签；None 时使用配置中的默认编码
    ///
    /// # 返回
    /// - Ok(Vec<Output>): 按行顺序返回已分配主键的实体
    /// - Err: 写入前发现的错误不留下任何写入；每个写入阶段各自在一个事务内，
    ///   多阶段导入（订单）在后一阶段失败时保留前一阶段已提交的数据
    async fn import_csv(
        &self,
        content: &[u8],
        encoding: Option<&str>,
    ) -> ImportResult<Vec<Self::Output>>;

    /// 批量导入多个上传（并发执行）
    ///
    /// # 说明
    /// - 每个上传的导入是独立的，互不影响
    /// - 某个上传失败不影响其他上传
    async fn batch_import(&self, uploads: Vec<CsvUpload>) -> Vec<ImportResult<Vec<Self::Output>>> {
        info!(count = uploads.len(), "开始批量导入");

        let import_tasks = uploads.into_iter().map(|upload| async move {
            let result = self
                .import_csv(&upload.content, upload.encoding.as_deref())
                .await;
            match &result {
                Ok(rows) => info!(file = %upload.name, imported = rows.len(), "文件导入成功"),
                Err(e) => error!(file = %upload.name, error = %e, "文件导入失败"),
            }
            result
        });

        // 并发执行所有导入任务
        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );
        results
    }
}
