// ==========================================
// 商品 CSV 导入器
// ==========================================
// 流程: 解码 → 列校验 → 行映射/清洗 → 单事务批量写入
// 红线: 任一行失败则不写入任何商品
// ==========================================

use crate::config::ShopConfigReader;
use crate::domain::product::Product;
use crate::importer::csv_importer_trait::CsvImporter;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::ProductFieldMapper;
use crate::importer::record_parser::{CsvRecordParser, Encoding, RecordParser};
use crate::repository::ProductRepository;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ProductCsvImporter - 商品导入器
// ==========================================
pub struct ProductCsvImporter<C>
where
    C: ShopConfigReader,
{
    // 数据访问层
    products: Arc<ProductRepository>,

    // 配置读取器
    config: Arc<C>,

    // 导入组件
    parser: Box<dyn RecordParser>,
    mapper: ProductFieldMapper,
}

impl<C> ProductCsvImporter<C>
where
    C: ShopConfigReader,
{
    pub fn new(products: Arc<ProductRepository>, config: Arc<C>) -> Self {
        Self::with_parser(products, config, Box::new(CsvRecordParser))
    }

    pub fn with_parser(
        products: Arc<ProductRepository>,
        config: Arc<C>,
        parser: Box<dyn RecordParser>,
    ) -> Self {
        Self {
            products,
            config,
            parser,
            mapper: ProductFieldMapper::default(),
        }
    }

    async fn resolve_encoding(&self, encoding: Option<&str>) -> ImportResult<Encoding> {
        match encoding.map(str::trim).filter(|e| !e.is_empty()) {
            Some(label) => Encoding::from_label(label),
            None => Encoding::from_label(&self.config.get_default_encoding().await?),
        }
    }
}

#[async_trait]
impl<C> CsvImporter for ProductCsvImporter<C>
where
    C: ShopConfigReader,
{
    type Output = Product;

    #[instrument(skip(self, content), fields(batch_id, bytes = content.len()))]
    async fn import_csv(
        &self,
        content: &[u8],
        encoding: Option<&str>,
    ) -> ImportResult<Vec<Product>> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());
        info!(batch_id = %batch_id, "开始导入商品 CSV");

        let encoding = self.resolve_encoding(encoding).await?;

        // === 步骤 1: 解码 + 列校验 ===
        let rows = self.parser.parse(content, encoding)?;
        self.mapper.check_columns(rows.headers())?;
        debug!(columns = ?rows.headers(), "列校验通过");

        // === 步骤 2: 行映射 ===
        let mut new_products = Vec::new();
        for row in rows {
            let row = row?;
            match self.mapper.map_row(&row) {
                Ok(product) => new_products.push(product),
                Err(e) => {
                    warn!(batch_id = %batch_id, row_number = row.row_number, error = %e, "行映射失败");
                    return Err(e);
                }
            }
        }

        // === 步骤 3: 单事务落库 ===
        let created = self.products.bulk_create(new_products)?;

        info!(
            batch_id = %batch_id,
            imported = created.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "商品 CSV 导入完成"
        );
        Ok(created)
    }
}
