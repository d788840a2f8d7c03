// ==========================================
// CSV 记录解析器
// ==========================================
// 职责: 字节流 + 编码标签 → 按表头取值的行映射（惰性、单遍）
// 支持编码: utf-8（去除 BOM）/ iso-8859-1
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use std::collections::HashMap;
use std::io::Cursor;

const UTF8_BOM: char = '\u{feff}';

// ==========================================
// Encoding - 声明的文件编码
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

impl Encoding {
    /// 解析编码标签（大小写不敏感）
    pub fn from_label(label: &str) -> ImportResult<Self> {
        match label.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "iso-8859-1" | "latin-1" | "latin1" => Ok(Encoding::Latin1),
            other => Err(ImportError::Decoding(format!("不支持的编码: {}", other))),
        }
    }

    /// 按编码解码为字符串
    pub fn decode(&self, bytes: &[u8]) -> ImportResult<String> {
        match self {
            Encoding::Utf8 => {
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    ImportError::Decoding(format!("非法 UTF-8 字节 (偏移 {})", e.valid_up_to()))
                })?;
                Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text).to_string())
            }
            // ISO-8859-1 的每个字节对应同值码点
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

// ==========================================
// RowMapping - 单行数据（列名 → 原始字符串）
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct RowMapping {
    /// 数据行号（从 1 开始，不含表头）
    pub row_number: usize,
    pub values: HashMap<String, String>,
}

impl RowMapping {
    /// 取值（去除首尾空白；空字符串视为缺失）
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// 原始取值（不做空白处理）
    pub fn raw(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

// ==========================================
// CsvRows - 惰性行迭代器
// ==========================================
pub struct CsvRows {
    headers: Vec<String>,
    records: StringRecordsIntoIter<Cursor<Vec<u8>>>,
    row_number: usize,
}

impl CsvRows {
    /// 表头（已去除首尾空白）
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn to_mapping(&self, record: &StringRecord) -> ImportResult<RowMapping> {
        if record.len() > self.headers.len() {
            return Err(ImportError::Decoding(format!(
                "第 {} 行字段数 {} 超过表头列数 {}",
                self.row_number,
                record.len(),
                self.headers.len()
            )));
        }

        // 字段不足的行: 缺失的列不出现在映射中
        let values = self
            .headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();

        Ok(RowMapping {
            row_number: self.row_number,
            values,
        })
    }
}

impl Iterator for CsvRows {
    type Item = ImportResult<RowMapping>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e.into())),
            };
            self.row_number += 1;

            // 跳过完全空白的行
            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            return Some(self.to_mapping(&record));
        }
    }
}

// ==========================================
// RecordParser Trait
// ==========================================
// 实现者: CsvRecordParser
pub trait RecordParser: Send + Sync {
    /// 解码并读取表头，返回惰性行迭代器
    ///
    /// # 返回
    /// - Err(Decoding): 字节无法按编码解码 / 表头无法解析 / 引号字段未闭合
    fn parse(&self, content: &[u8], encoding: Encoding) -> ImportResult<CsvRows>;
}

/// 查找到文件末尾仍未闭合的引号字段，返回其起始行号（含表头，从 1 开始）
///
/// 只有位于字段开头的 `"` 才开启引号字段；引号字段内 `""` 为转义。
/// 非引号字段中的 `"` 按字面值处理，与读取器的宽松模式一致。
fn unterminated_quote_line(text: &str) -> Option<usize> {
    let mut chars = text.chars().peekable();
    let mut line = 1;
    let mut field_start = true;
    let mut opened_at: Option<usize> = None;

    while let Some(c) = chars.next() {
        if opened_at.is_some() {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    opened_at = None;
                }
            } else if c == '\n' {
                line += 1;
            }
            continue;
        }

        match c {
            '"' if field_start => {
                opened_at = Some(line);
                field_start = false;
            }
            ',' | '\r' => field_start = true,
            '\n' => {
                line += 1;
                field_start = true;
            }
            _ => field_start = false,
        }
    }

    opened_at
}

/// 标准 CSV 方言（逗号分隔、双引号转义）
pub struct CsvRecordParser;

impl RecordParser for CsvRecordParser {
    fn parse(&self, content: &[u8], encoding: Encoding) -> ImportResult<CsvRows> {
        let text = encoding.decode(content)?;

        // 读取器会把未闭合引号之后的全部内容吞进同一个字段
        if let Some(line) = unterminated_quote_line(&text) {
            return Err(ImportError::Decoding(format!(
                "第 {} 行的引号字段未闭合",
                line
            )));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 行长度在迭代时单独校验
            .from_reader(Cursor::new(text.into_bytes()));

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        Ok(CsvRows {
            headers,
            records: reader.into_records(),
            row_number: 0,
        })
    }
}
