//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::path::PathBuf;

use thiserror::Error;

/// admitcardクレート全体で使用するエラー型
///
/// 設定ファイルの読み込み、名簿（Excel）の解析、準考証PDFの生成処理中に
/// 発生するすべてのエラーを統一的に扱うために使用されます。
///
/// # バッチ処理への影響
///
/// どのバリアントもバッチ全体を中断します。中断前に書き出された準考証ファイルは
/// そのまま残ります（ロールバックなし）。
///
/// - `ConfigNotFound` / `ConfigParse`: 名簿を開く前に発生
/// - `InvalidSchema` / `MissingField`: 1件もレンダリングする前に発生
/// - `FontUnavailable`: 1件もレンダリングする前に発生
/// - `Render` / `Pdf`: 該当レコードで中断、それ以降のレコードは処理しない
///
/// # 使用例
///
/// ```rust,no_run
/// use admitcard::AdmitCardError;
/// use std::fs::File;
///
/// fn open_roster(path: &str) -> Result<(), AdmitCardError> {
///     let _file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum AdmitCardError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー（calamine由来）
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// PDFドキュメントの構築・シリアライズ中に発生したエラー（lopdf由来）
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// 指定された名前の設定ファイルが存在しない
    #[error("Config file {} not found", path.display())]
    ConfigNotFound {
        /// 解決された設定ファイルのパス
        path: PathBuf,
    },

    /// 設定ファイルの内容が不正
    ///
    /// JSONとして不正な場合、必須キー（`exam_name`, `exam_location`,
    /// `exam_schedule`, `exam_notes`）が欠けている場合、型が一致しない場合に発生します。
    /// 検証は読み込み時に一括で行われます。
    #[error("Invalid config file {}: {message}", path.display())]
    ConfigParse {
        /// 設定ファイルのパス
        path: PathBuf,
        /// 詳細メッセージ
        message: String,
    },

    /// 名簿のヘッダー行が契約と一致しない
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use admitcard::AdmitCardError;
    ///
    /// let error = AdmitCardError::InvalidSchema {
    ///     expected: vec!["姓名".to_string(), "身份证号".to_string()],
    ///     found: vec!["名前".to_string(), "身份证号".to_string()],
    /// };
    /// println!("{}", error);
    /// ```
    #[error("Invalid roster header: expected {expected:?}, found {found:?}")]
    InvalidSchema {
        /// 期待されるヘッダー（1列目・2列目）
        expected: Vec<String>,
        /// 実際のヘッダー（1列目・2列目）
        found: Vec<String>,
    },

    /// 空でないデータ行で必須セル（姓名・身份证号）が空
    #[error("Missing {column} at cell {cell}")]
    MissingField {
        /// 列名（ヘッダーラベル）
        column: String,
        /// セル座標（A1記法）
        cell: String,
    },

    /// フォントファイルを読み込めない、または解析できない
    #[error("Font resource {} unavailable: {reason}", path.display())]
    FontUnavailable {
        /// フォントファイルのパス
        path: PathBuf,
        /// 失敗理由
        reason: String,
    },

    /// 1件の準考証のレイアウト・描画に失敗した
    #[error("Failed to render admit card for {record}: {message}")]
    Render {
        /// 対象レコード（`{id}-{name}`）
        record: String,
        /// 詳細メッセージ
        message: String,
    },

    /// ジェネレーター設定の検証に失敗したエラー
    ///
    /// `GeneratorBuilder::build()`時に発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力ファイルサイズ上限、レコード数上限、設定名のパストラバーサルなど。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}
