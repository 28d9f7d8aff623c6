//! Builder Module
//!
//! Fluent Builder APIを提供し、`Generator`インスタンスを段階的に構築する。

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use tracing::{debug, info, warn};

use crate::api::{DateFormat, EmptyRowPolicy};
use crate::config::{ConfigLoader, ExamConfig, DEFAULT_CONFIG_DIR};
use crate::error::AdmitCardError;
use crate::font::{FontFace, FontResource};
use crate::formatter::CellFormatter;
use crate::layout::CardLayout;
use crate::output::{card_file_name, write_atomic};
use crate::parser::RosterParser;
use crate::security::SecurityConfig;
use crate::types::{CandidateRecord, Roster};

/// 出力ディレクトリのデフォルト
pub const DEFAULT_OUTPUT_DIR: &str = "AdmitCards";

/// フォントファイルのデフォルト
pub const DEFAULT_FONT_PATH: &str = "fonts/wqy-microhei.ttc";

/// 生成処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct GenerationConfig {
    /// 試験設定を置くディレクトリ
    pub config_dir: PathBuf,

    /// 準考証の出力先
    pub output_dir: PathBuf,

    /// 埋め込むフォントファイル
    pub font_path: PathBuf,

    /// 日付セルの形式
    pub date_format: DateFormat,

    /// 空行の扱い
    pub empty_rows: EmptyRowPolicy,

    /// セキュリティ制限
    pub security: SecurityConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
            date_format: DateFormat::Iso8601,
            empty_rows: EmptyRowPolicy::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use admitcard::{GeneratorBuilder, EmptyRowPolicy};
///
/// # fn main() -> Result<(), admitcard::AdmitCardError> {
/// let generator = GeneratorBuilder::new()
///     .with_output_dir("AdmitCards")
///     .with_empty_row_policy(EmptyRowPolicy::Skip)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GeneratorBuilder {
    /// 内部設定（構築中）
    config: GenerationConfig,
}

impl Default for GeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 設定ディレクトリ: `config`
    /// - 出力ディレクトリ: `AdmitCards`
    /// - フォント: `fonts/wqy-microhei.ttc`
    /// - 日付形式: ISO 8601 (YYYY-MM-DD)
    /// - 空行: スキップ
    /// - 入力ファイルの上限: 64MB、レコード数の上限: 100000
    pub fn new() -> Self {
        Self {
            config: GenerationConfig::default(),
        }
    }

    /// 試験設定を置くディレクトリを指定する
    ///
    /// 設定名`name`は`<dir>/<name>.json`に解決されます。
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.config_dir = dir.into();
        self
    }

    /// 準考証の出力ディレクトリを指定する（存在しない場合は作成されます）
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// 埋め込むフォントファイルを指定する
    ///
    /// # 引数
    ///
    /// * `path` - CJKをカバーするTrueType/OpenTypeフォント（`.ttc`は最初のフェイス）
    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = path.into();
        self
    }

    /// 日付セルの出力形式を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use admitcard::{GeneratorBuilder, DateFormat};
    ///
    /// let builder = GeneratorBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%Y年%m月%d日".to_string()));
    /// ```
    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.config.date_format = format;
        self
    }

    /// 完全に空の行の扱いを指定する
    pub fn with_empty_row_policy(mut self, policy: EmptyRowPolicy) -> Self {
        self.config.empty_rows = policy;
        self
    }

    /// 入力ファイルの最大サイズ（バイト）を指定する
    pub fn with_max_input_file_size(mut self, bytes: u64) -> Self {
        self.config.security.max_input_file_size = bytes;
        self
    }

    /// 1回のバッチで扱う最大レコード数を指定する
    pub fn with_max_records(mut self, records: usize) -> Self {
        self.config.security.max_records = records;
        self
    }

    /// 設定を検証し、`Generator`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Generator)`: 設定が有効な場合
    /// * `Err(AdmitCardError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * カスタム日付形式が空、または不正な書式指定子を含む
    /// * 入力ファイルの上限、レコード数の上限が0
    /// * 出力ディレクトリが空のパス
    pub fn build(self) -> Result<Generator, AdmitCardError> {
        // 1. カスタム日付形式の検証
        if let DateFormat::Custom(ref format_str) = self.config.date_format {
            if format_str.is_empty() {
                return Err(AdmitCardError::Config(
                    "Date format string must not be empty".to_string(),
                ));
            }
            if StrftimeItems::new(format_str).any(|item| matches!(item, Item::Error)) {
                return Err(AdmitCardError::Config(format!(
                    "Invalid date format string: '{}'",
                    format_str
                )));
            }
        }

        // 2. セキュリティ制限の検証
        if self.config.security.max_input_file_size == 0 {
            return Err(AdmitCardError::Config(
                "Maximum input file size must be greater than 0".to_string(),
            ));
        }
        if self.config.security.max_records == 0 {
            return Err(AdmitCardError::Config(
                "Maximum record count must be greater than 0".to_string(),
            ));
        }

        // 3. 出力先の検証
        if self.config.output_dir.as_os_str().is_empty() {
            return Err(AdmitCardError::Config(
                "Output directory must not be empty".to_string(),
            ));
        }

        Ok(Generator::new(self.config))
    }
}

/// 1回のバッチで全レコードが共有するレンダリング資源
///
/// 試験設定とフォントはバッチ開始時に1度だけ読み込まれ、不変のまま借用されます。
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    /// 試験設定
    pub exam: &'a ExamConfig,
    /// フォントフェイス
    pub face: &'a dyn FontFace,
}

/// バッチ処理の結果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    /// 書き出した準考証のパス（名簿の順）
    pub documents: Vec<PathBuf>,
}

impl BatchReport {
    /// 書き出した準考証の数
    pub fn count(&self) -> usize {
        self.documents.len()
    }
}

/// 準考証生成のファサード
///
/// 設定の読み込み、名簿の解析、レイアウト、PDF出力を順に実行します。
/// 処理は1スレッドで逐次実行され、最初のエラーでバッチ全体を中断します。
/// 中断前に書き出したファイルは残ります。
///
/// # 使用例
///
/// ```rust,no_run
/// use admitcard::GeneratorBuilder;
///
/// # fn main() -> Result<(), admitcard::AdmitCardError> {
/// let generator = GeneratorBuilder::new().build()?;
/// let report = generator.run("students.xlsx", "default")?;
/// println!("{} cards written", report.count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Generator {
    /// 生成設定
    config: GenerationConfig,
    /// 試験設定ローダー
    loader: ConfigLoader,
    /// セルフォーマッター
    formatter: CellFormatter,
}

impl Generator {
    pub(crate) fn new(config: GenerationConfig) -> Self {
        Self {
            loader: ConfigLoader::new(config.config_dir.clone()),
            formatter: CellFormatter::new(),
            config,
        }
    }

    /// 名簿の全レコードについて準考証を生成する
    ///
    /// # 引数
    ///
    /// * `input` - 名簿ファイル（xlsx/xlsm/xls/ods）のパス
    /// * `config_name` - 試験設定の名前（拡張子なし）
    ///
    /// # 戻り値
    ///
    /// * `Ok(BatchReport)` - すべてのレコードの出力に成功した場合
    /// * `Err(AdmitCardError)` - 最初に発生したエラー
    ///
    /// # 処理フロー
    ///
    /// 1. 試験設定の読み込み（名簿を開く前に検証）
    /// 2. フォントの読み込み
    /// 3. 名簿の解析（1件もレンダリングする前にすべて検証）
    /// 4. 出力ディレクトリの作成
    /// 5. レコードごとにレイアウト、PDF化、書き込み
    pub fn run(
        &self,
        input: impl AsRef<Path>,
        config_name: &str,
    ) -> Result<BatchReport, AdmitCardError> {
        let exam = self.loader.load(config_name)?;
        let font = FontResource::load(&self.config.font_path)?;
        self.run_batch(&exam, &font, input.as_ref())
    }

    /// 呼び出し側が用意したフォントフェイスで準考証を生成する
    ///
    /// フォントの読み込み以外は`run`と同じです。
    pub fn run_with_font(
        &self,
        face: &dyn FontFace,
        input: impl AsRef<Path>,
        config_name: &str,
    ) -> Result<BatchReport, AdmitCardError> {
        let exam = self.loader.load(config_name)?;
        self.run_batch(&exam, face, input.as_ref())
    }

    fn run_batch(
        &self,
        exam: &ExamConfig,
        face: &dyn FontFace,
        input: &Path,
    ) -> Result<BatchReport, AdmitCardError> {
        info!(
            input = %input.display(),
            exam = %exam.exam_name,
            output = %self.config.output_dir.display(),
            "starting batch"
        );

        let roster = self.load_roster(File::open(input)?)?;
        fs::create_dir_all(&self.config.output_dir)?;

        let context = RenderContext { exam, face };
        let mut seen = HashSet::new();
        let mut report = BatchReport::default();

        for record in &roster.records {
            let path = self.render_card(&context, record)?;
            if !seen.insert(path.clone()) {
                warn!(
                    row = record.row,
                    path = %path.display(),
                    "duplicate record overwrote an earlier admit card"
                );
            }
            report.documents.push(path);
        }

        info!(count = report.count(), "batch finished");
        Ok(report)
    }

    /// 名簿を読み込み、ヘッダー契約を検証してレコードを抽出する
    ///
    /// # 引数
    ///
    /// * `reader` - Excelファイルを読み込むためのリーダー（Read + Seekトレイトを実装）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use admitcard::GeneratorBuilder;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), admitcard::AdmitCardError> {
    /// let generator = GeneratorBuilder::new().build()?;
    /// let roster = generator.load_roster(File::open("students.xlsx")?)?;
    /// for record in &roster.records {
    ///     println!("{}", record.display_key());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_roster<R: Read + Seek>(&self, reader: R) -> Result<Roster, AdmitCardError> {
        let parser = RosterParser::new(
            &self.formatter,
            &self.config.date_format,
            self.config.empty_rows,
            &self.config.security,
        );
        let roster = parser.parse(reader)?;
        debug!(records = roster.len(), labels = ?roster.labels, "roster loaded");
        Ok(roster)
    }

    /// 1件の準考証をPDFのバイト列として生成する
    pub fn render_to_bytes(
        &self,
        context: &RenderContext<'_>,
        record: &CandidateRecord,
    ) -> Result<Vec<u8>, AdmitCardError> {
        let layout = CardLayout::build(record, context.exam, context.face)?;
        crate::pdf::PdfWriter::new(context.face).write(&layout.pages, &context.exam.title)
    }

    /// 1件の準考証を出力ディレクトリに書き出す
    ///
    /// # 戻り値
    ///
    /// * `Ok(PathBuf)` - `{id}-{name}.pdf`のパス
    /// * `Err(AdmitCardError::Render)` - レイアウトできない場合
    /// * `Err(AdmitCardError::Io)` - 書き込みに失敗した場合
    pub fn render_card(
        &self,
        context: &RenderContext<'_>,
        record: &CandidateRecord,
    ) -> Result<PathBuf, AdmitCardError> {
        let bytes = self.render_to_bytes(context, record)?;
        let file_name = card_file_name(&record.id, &record.name);
        let path = write_atomic(&self.config.output_dir, &file_name, &bytes)?;

        debug!(row = record.row, path = %path.display(), bytes = bytes.len(), "admit card written");
        Ok(path)
    }

    /// 出力ディレクトリ
    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// 試験設定ディレクトリ
    pub fn config_dir(&self) -> &Path {
        self.loader.config_dir()
    }
}
