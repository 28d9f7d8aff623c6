//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use chrono::{NaiveDateTime, TimeDelta};

/// セルの値を表す列挙型
///
/// calamineの`Data`から変換され、`CellFormatter`で表示用文字列になります。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellValue {
    /// 整数
    Int(i64),

    /// 浮動小数点数
    Float(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// 日付・日時
    DateTime(NaiveDateTime),

    /// 時間（経過時間）
    Duration(TimeDelta),

    /// エラー値（例: #DIV/0!）
    Error(String),

    /// 空セル
    Empty,
}

impl CellValue {
    /// 値が空かどうかを判定
    ///
    /// 空白文字のみの文字列も空として扱います。
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    #[allow(clippy::wrong_self_convention)]
    pub fn to_a1_notation(&self) -> String {
        let col_str = Self::col_index_to_letter(self.col);
        format!("{}{}", col_str, self.row + 1)
    }

    /// 列インデックスを文字列に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
    fn col_index_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            let remainder = col % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }
}

/// 追加項目（3列目以降）のラベルと値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraField {
    /// ヘッダー行の同じ列のテキスト
    pub label: String,
    /// 表示用に文字列化されたセル値（空の場合あり）
    pub value: String,
}

/// 名簿の1行分の受験者レコード
///
/// 抽出後は不変で、1回のレンダリングでのみ消費されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    /// シート上の行番号（1始まり、診断用）
    pub row: u32,
    /// 姓名（1列目）
    pub name: String,
    /// 身份证号（2列目）
    pub id: String,
    /// 3列目以降の項目（列順）
    pub extra_fields: Vec<ExtraField>,
}

impl CandidateRecord {
    /// ログ・エラーメッセージ用の識別子（`{id}-{name}`）
    pub fn display_key(&self) -> String {
        format!("{}-{}", self.id, self.name)
    }
}

/// 名簿の抽出結果
///
/// すべてのレコードは同じ`labels`を共有し、
/// `record.extra_fields.len() == labels.len()`が常に成り立ちます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    /// 追加項目のラベル（ヘッダー行3列目以降）
    pub labels: Vec<String>,
    /// シート順のレコード
    pub records: Vec<CandidateRecord>,
}

impl Roster {
    /// レコード数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// レコードが1件もないか
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
