//! Roster Parser
//!
//! calamineを使用して名簿（受験者一覧）を読み込み、ヘッダー契約を検証して
//! `CandidateRecord`の列に変換します。

use std::io::{Cursor, Read, Seek};

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use tracing::{debug, warn};

use crate::api::{DateFormat, EmptyRowPolicy};
use crate::error::AdmitCardError;
use crate::formatter::CellFormatter;
use crate::security::SecurityConfig;
use crate::types::{CandidateRecord, CellCoord, CellValue, ExtraField, Roster};

/// 1列目のヘッダーとして要求されるラベル
pub const NAME_HEADER: &str = "姓名";

/// 2列目のヘッダーとして要求されるラベル
pub const ID_HEADER: &str = "身份证号";

/// 名簿パーサー
///
/// ワークブックの先頭シートを読み込みます。
pub(crate) struct RosterParser<'a> {
    formatter: &'a CellFormatter,
    date_format: &'a DateFormat,
    empty_rows: EmptyRowPolicy,
    security: &'a SecurityConfig,
}

impl<'a> RosterParser<'a> {
    pub fn new(
        formatter: &'a CellFormatter,
        date_format: &'a DateFormat,
        empty_rows: EmptyRowPolicy,
        security: &'a SecurityConfig,
    ) -> Self {
        Self {
            formatter,
            date_format,
            empty_rows,
            security,
        }
    }

    /// 名簿を読み込む
    ///
    /// # 引数
    ///
    /// * `reader` - Excelファイルを読み込むためのリーダー（xlsx/xlsm/xls/ods）
    ///
    /// # 戻り値
    ///
    /// * `Ok(Roster)` - シート順のレコードと追加項目ラベル
    /// * `Err(AdmitCardError::InvalidSchema)` - 1列目・2列目のヘッダーが一致しない場合
    /// * `Err(AdmitCardError::MissingField)` - 空でない行で姓名・身份证号が空の場合
    /// * `Err(AdmitCardError::SecurityViolation)` - サイズ・件数の上限を超えた場合
    pub fn parse<R: Read + Seek>(&self, reader: R) -> Result<Roster, AdmitCardError> {
        // セキュリティ: 上限+1バイトまでしか読まない
        let limit = self.security.max_input_file_size;
        let mut buffer = Vec::new();
        let bytes_read = reader.take(limit.saturating_add(1)).read_to_end(&mut buffer)?;

        if bytes_read as u64 > limit {
            return Err(AdmitCardError::SecurityViolation(format!(
                "Input file size exceeds maximum: more than {} bytes",
                limit
            )));
        }

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(buffer))?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range?,
            None => {
                // シートが1枚もない
                return Err(Self::schema_error(Vec::new()));
            }
        };

        self.extract(&range)
    }

    /// シートの範囲からレコードを抽出
    ///
    /// calamineの`Range`は最初の非空セルから始まるため、座標はすべて絶対位置で扱います。
    fn extract(&self, range: &Range<Data>) -> Result<Roster, AdmitCardError> {
        let Some((last_row, last_col)) = range.end() else {
            return Err(Self::schema_error(Vec::new()));
        };

        let name_header = self.cell_text(range, CellCoord::new(0, 0));
        let id_header = self.cell_text(range, CellCoord::new(0, 1));
        if name_header != NAME_HEADER || id_header != ID_HEADER {
            return Err(Self::schema_error(vec![name_header, id_header]));
        }

        // 表の幅 = ヘッダー行の最後の非空セルまで
        let width = (0..=last_col)
            .rev()
            .find(|&col| !self.cell_value(range, CellCoord::new(0, col)).is_empty())
            .map(|col| col + 1)
            .unwrap_or(2)
            .max(2);

        let labels: Vec<String> = (2..width)
            .map(|col| self.cell_text(range, CellCoord::new(0, col)))
            .collect();

        let mut records = Vec::new();
        for row in 1..=last_row {
            let values: Vec<CellValue> = (0..width)
                .map(|col| self.cell_value(range, CellCoord::new(row, col)))
                .collect();

            if values.iter().all(CellValue::is_empty) {
                match self.empty_rows {
                    EmptyRowPolicy::Skip => {
                        debug!(row = row + 1, "skipping empty row");
                        continue;
                    }
                    EmptyRowPolicy::Keep => {
                        warn!(row = row + 1, "keeping empty row as a record");
                    }
                }
            } else {
                Self::require(&values[0], NAME_HEADER, CellCoord::new(row, 0))?;
                Self::require(&values[1], ID_HEADER, CellCoord::new(row, 1))?;
            }

            if records.len() >= self.security.max_records {
                return Err(AdmitCardError::SecurityViolation(format!(
                    "Roster has more than {} records",
                    self.security.max_records
                )));
            }

            let mut texts = values
                .iter()
                .map(|value| self.formatter.format_cell(value, self.date_format));
            let name = texts.next().unwrap_or_default();
            let id = texts.next().unwrap_or_default();
            let extra_fields = labels
                .iter()
                .zip(texts)
                .map(|(label, value)| ExtraField {
                    label: label.clone(),
                    value,
                })
                .collect();

            records.push(CandidateRecord {
                row: row + 1,
                name,
                id,
                extra_fields,
            });
        }

        debug!(records = records.len(), extra_fields = labels.len(), "roster extracted");
        Ok(Roster { labels, records })
    }

    fn require(value: &CellValue, column: &str, coord: CellCoord) -> Result<(), AdmitCardError> {
        if value.is_empty() {
            return Err(AdmitCardError::MissingField {
                column: column.to_string(),
                cell: coord.to_a1_notation(),
            });
        }
        Ok(())
    }

    fn schema_error(found: Vec<String>) -> AdmitCardError {
        AdmitCardError::InvalidSchema {
            expected: vec![NAME_HEADER.to_string(), ID_HEADER.to_string()],
            found,
        }
    }

    fn cell_text(&self, range: &Range<Data>, coord: CellCoord) -> String {
        self.formatter
            .format_cell(&self.cell_value(range, coord), self.date_format)
    }

    /// セル値を取得（範囲外は空セル）
    fn cell_value(&self, range: &Range<Data>, coord: CellCoord) -> CellValue {
        match range.get_value((coord.row, coord.col)) {
            Some(data) => to_cell_value(data),
            None => CellValue::Empty,
        }
    }
}

/// calamineのセルデータを`CellValue`に変換
fn to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => match dt.as_duration() {
            Some(d) => CellValue::Duration(d),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::DateTime(value),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
    }
}
