//! Exam Configuration Module
//!
//! 名前付きの試験設定（試験名、会場、時間割、注意事項）を読み込むモジュール。
//! 設定は `<config_dir>/<name>.json` に置かれ、1回のバッチで1度だけ読み込まれます。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AdmitCardError;
use crate::security::validate_config_name;

/// 設定ファイルを置くディレクトリのデフォルト
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// デフォルトの設定名
pub const DEFAULT_CONFIG_NAME: &str = "default";

/// 設定ファイルの拡張子
const CONFIG_EXTENSION: &str = "json";

fn default_title() -> String {
    "准考证".to_string()
}

fn default_photo_caption() -> String {
    "一寸照片粘贴处".to_string()
}

/// 時間割の1行（科目と時間）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// 科目
    pub subject: String,
    /// 試験時間（自由記述、例: `08:00-10:00`）
    pub time: String,
}

/// 試験設定
///
/// 読み込み後は不変で、バッチ内のすべての準考証で共有されます。
///
/// # JSON形式
///
/// ```json
/// {
///   "exam_name": "期末考试",
///   "exam_location": "第一教学楼",
///   "exam_schedule": [{"subject": "语文", "time": "08:00-10:00"}],
///   "exam_notes": ["请携带身份证"]
/// }
/// ```
///
/// `title`（デフォルト: `准考证`）と`photo_caption`（デフォルト: `一寸照片粘贴处`）は省略可能です。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamConfig {
    /// 試験名
    pub exam_name: String,
    /// 試験会場
    pub exam_location: String,
    /// 時間割（表示順）
    pub exam_schedule: Vec<ScheduleEntry>,
    /// 注意事項（1項目1段落）
    pub exam_notes: Vec<String>,
    /// 文書タイトル
    #[serde(default = "default_title")]
    pub title: String,
    /// 写真欄のキャプション
    #[serde(default = "default_photo_caption")]
    pub photo_caption: String,
}

impl ExamConfig {
    /// JSON文字列から設定を解析し、検証する
    ///
    /// 必須キーの欠落・型不一致はserdeのエラーとして、
    /// 試験名・会場の空文字列は検証エラーとして返されます。
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let config: ExamConfig = serde_json::from_str(json).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.exam_name.trim().is_empty() {
            return Err("`exam_name` must not be empty".to_string());
        }
        if self.exam_location.trim().is_empty() {
            return Err("`exam_location` must not be empty".to_string());
        }
        Ok(())
    }
}

/// 設定ローダー
///
/// 設定名を `<config_dir>/<name>.json` に解決して読み込みます。キャッシュはしません。
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_DIR)
    }
}

impl ConfigLoader {
    /// 設定ディレクトリを指定してローダーを生成
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// 設定名から設定ファイルのパスを解決
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.config_dir.join(format!("{}.{}", name, CONFIG_EXTENSION))
    }

    /// 設定を読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(ExamConfig)` - 読み込みと検証に成功した場合
    /// * `Err(AdmitCardError::ConfigNotFound)` - ファイルが存在しない場合
    /// * `Err(AdmitCardError::ConfigParse)` - 設定名が不正、JSONが不正、必須キーが欠けている場合
    pub fn load(&self, name: &str) -> Result<ExamConfig, AdmitCardError> {
        let path = self.resolve(name);

        validate_config_name(name).map_err(|message| AdmitCardError::ConfigParse {
            path: path.clone(),
            message,
        })?;

        if !path.is_file() {
            return Err(AdmitCardError::ConfigNotFound { path });
        }

        let content = fs::read_to_string(&path)?;
        let config = ExamConfig::from_json_str(&content)
            .map_err(|message| AdmitCardError::ConfigParse {
                path: path.clone(),
                message,
            })?;

        debug!(
            path = %path.display(),
            subjects = config.exam_schedule.len(),
            notes = config.exam_notes.len(),
            "loaded exam config"
        );
        Ok(config)
    }

    /// 設定ディレクトリ
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}
