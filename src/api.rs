//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

/// 日付セルの出力形式
///
/// 名簿の日付セル（例: 生年月日、入学日）を準考証に表示する際の形式を指定します。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DateFormat {
    /// ISO 8601形式
    ///
    /// 日付のみのセルは `2025-11-20`、時刻を含むセルは `2025-11-20 08:30:00`。
    Iso8601,

    /// カスタム形式（chrono互換フォーマット文字列）
    ///
    /// # フォーマット指定子（主要なもの）
    ///
    /// - `%Y`: 4桁の年（例: 2025）
    /// - `%m`: 2桁の月（01-12）
    /// - `%d`: 2桁の日（01-31）
    /// - `%H`: 24時間形式の時（00-23）
    /// - `%M`: 分（00-59）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use admitcard::{GeneratorBuilder, DateFormat};
    ///
    /// # fn main() -> Result<(), admitcard::AdmitCardError> {
    /// let generator = GeneratorBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%Y年%m月%d日".to_string()))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    Custom(String),
}

/// 完全に空のデータ行の扱い
///
/// 名簿の途中や末尾に、すべてのセルが空の行が含まれている場合の処理方法を指定します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum EmptyRowPolicy {
    /// 空行をスキップする（デフォルト）
    #[default]
    Skip,

    /// 空行もレコードとして扱う
    ///
    /// 姓名・身份证号が空のレコードが生成され、ファイル名は `-.pdf` になります。
    Keep,
}
