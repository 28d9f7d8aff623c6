//! Formatter Module
//!
//! セル値を準考証に表示する文字列へ変換するモジュール。
//! 名簿のセルは任意の型を取り得るため、ここで正規の文字列化規則を定義します。

use std::fmt::Write as _;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};

use crate::api::DateFormat;
use crate::types::CellValue;

/// セルフォーマッター
///
/// セル値のフォーマット処理のファサードとして機能します。
#[derive(Debug)]
pub(crate) struct CellFormatter {
    /// 日付フォーマッター
    date_formatter: DateFormatter,

    /// 数値フォーマッター
    number_formatter: NumberFormatter,
}

impl CellFormatter {
    /// 新しいCellFormatterインスタンスを生成
    pub fn new() -> Self {
        Self {
            date_formatter: DateFormatter,
            number_formatter: NumberFormatter,
        }
    }

    /// セル値をフォーマット
    ///
    /// # 引数
    ///
    /// * `value` - セル値
    /// * `date_format` - 日付セルの出力形式
    ///
    /// # 変換規則
    ///
    /// | 値 | 出力 |
    /// |----|------|
    /// | 文字列 | そのまま |
    /// | 整数 | 10進表記 |
    /// | 浮動小数点数 | 整数値なら小数部なし（`42.0` → `42`） |
    /// | 論理値 | `TRUE` / `FALSE` |
    /// | 日付 | `DateFormat`に従う |
    /// | 時間 | `H:MM:SS` |
    /// | エラー | Excelのエラー表記（`#DIV/0!`など） |
    /// | 空 | 空文字列 |
    pub fn format_cell(&self, value: &CellValue, date_format: &DateFormat) -> String {
        match value {
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => self.number_formatter.format(*f),
            CellValue::String(s) => s.clone(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::DateTime(dt) => self.date_formatter.format(dt, date_format),
            CellValue::Duration(d) => self.date_formatter.format_duration(d),
            CellValue::Error(e) => e.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

impl Default for CellFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// 日付フォーマッター
///
/// calamineが1900年/1904年エポックを解決した後の日時を文字列に変換します。
#[derive(Debug)]
pub(crate) struct DateFormatter;

impl DateFormatter {
    /// 日時をフォーマット
    ///
    /// `DateFormat::Iso8601`の場合、時刻部分が0時ちょうどなら日付のみを出力します。
    /// カスタム形式が書式エラーを起こした場合はISO 8601にフォールバックします
    /// （`GeneratorBuilder::build()`で事前検証されるため、通常は発生しません）。
    pub fn format(&self, value: &NaiveDateTime, date_format: &DateFormat) -> String {
        match date_format {
            DateFormat::Iso8601 => Self::iso8601(value),
            DateFormat::Custom(format_str) => {
                let mut out = String::new();
                if write!(out, "{}", value.format(format_str)).is_err() {
                    return Self::iso8601(value);
                }
                out
            }
        }
    }

    fn iso8601(value: &NaiveDateTime) -> String {
        if value.time() == NaiveTime::MIN {
            value.format("%Y-%m-%d").to_string()
        } else {
            value.format("%Y-%m-%d %H:%M:%S").to_string()
        }
    }

    /// 経過時間を`H:MM:SS`形式でフォーマット
    pub fn format_duration(&self, value: &TimeDelta) -> String {
        let total = value.num_seconds();
        let sign = if total < 0 { "-" } else { "" };
        let total = total.unsigned_abs();
        format!(
            "{}{}:{:02}:{:02}",
            sign,
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

/// 数値フォーマッター
#[derive(Debug)]
pub(crate) struct NumberFormatter;

impl NumberFormatter {
    /// 整数として正確に表現できる上限（2^53）
    const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

    /// 数値をフォーマット
    ///
    /// 小数部のない値は整数表記、それ以外は`f64`の最短表記で出力します。
    /// Excelは数値セルを常に浮動小数点数で保持するため、`3`が`3.0`として
    /// 読み込まれることへの対策です。
    pub fn format(&self, value: f64) -> String {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < Self::MAX_EXACT_INTEGER {
            format!("{}", value as i64)
        } else {
            value.to_string()
        }
    }
}
