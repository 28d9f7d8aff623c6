//! 結合テスト共通のフィクスチャ
//!
//! 名簿（rust_xlsxwriter）、試験設定（JSON）、固定幅のフォントフェイスを生成します。

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use admitcard::{
    AdmitCardError, FontFace, FontProgram, FontProgramKind, Generator, GeneratorBuilder,
};
use rust_xlsxwriter::{Workbook, XlsxError};
use tempfile::TempDir;

/// 全角1000、半角500の固定幅フェイス
///
/// 実フォントを同梱せずにレイアウトとPDF出力を検証するために使用します。
pub struct MonoFace;

impl FontFace for MonoFace {
    fn postscript_name(&self) -> &str {
        "MonoFace"
    }

    fn glyph_id(&self, ch: char) -> Option<u16> {
        Some((u32::from(ch) % 0xFFFF) as u16 + 1)
    }

    fn advance(&self, glyph: u16) -> f32 {
        if glyph > 0 && glyph <= 0x80 {
            500.0
        } else {
            1000.0
        }
    }

    fn ascent(&self) -> f32 {
        880.0
    }

    fn descent(&self) -> f32 {
        -120.0
    }

    fn program(&self, _glyphs: &[u16]) -> Result<FontProgram, AdmitCardError> {
        Ok(FontProgram {
            bytes: Vec::new(),
            kind: FontProgramKind::TrueType,
        })
    }
}

/// 例題の試験設定
pub const DEFAULT_CONFIG: &str = r#"{
    "exam_name": "期末考试",
    "exam_location": "第一教学楼",
    "exam_schedule": [{"subject": "语文", "time": "08:00-10:00"}],
    "exam_notes": ["请携带身份证"]
}"#;

/// テスト用の作業ディレクトリ
///
/// `config/`、`AdmitCards/`、名簿ファイルをすべて一時ディレクトリ内に置きます。
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let workspace = Self {
            dir: TempDir::new().unwrap(),
        };
        fs::create_dir_all(workspace.config_dir()).unwrap();
        workspace
    }

    pub fn config_dir(&self) -> PathBuf {
        self.dir.path().join("config")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("AdmitCards")
    }

    /// 設定ファイル`config/<name>.json`を書き込む
    pub fn write_config(&self, name: &str, json: &str) {
        fs::write(self.config_dir().join(format!("{}.json", name)), json).unwrap();
    }

    /// 名簿ファイルを書き込み、そのパスを返す
    pub fn write_roster(&self, file_name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(file_name);
        fs::write(&path, bytes).unwrap();
        path
    }

    /// この作業ディレクトリを使うジェネレーター
    pub fn generator(&self) -> Generator {
        self.builder().build().unwrap()
    }

    pub fn builder(&self) -> GeneratorBuilder {
        GeneratorBuilder::new()
            .with_config_dir(self.config_dir())
            .with_output_dir(self.output_dir())
    }

    /// 出力ディレクトリ内のファイル名（ソート済み）
    pub fn output_files(&self) -> Vec<String> {
        list_files(&self.output_dir())
    }
}

pub fn list_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// 文字列セルだけの名簿を生成（1行目がヘッダー）
pub fn roster(rows: &[&[&str]]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(r as u32, c as u16, *value)?;
            }
        }
    }

    workbook.save_to_buffer()
}

/// 例題の名簿（张三、三年二班）
pub fn worked_example_roster() -> Result<Vec<u8>, XlsxError> {
    roster(&[
        &["姓名", "身份证号", "班级"],
        &["张三", "110101199001011234", "三年二班"],
    ])
}
