//! Output Module
//!
//! 準考証ファイルの命名と書き込みを行うモジュール。
//! 書き込みは出力ディレクトリ内の一時ファイルを経由し、完成したファイルだけが
//! 最終的な名前で現れるようにします。

mod naming;

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::AdmitCardError;

pub use naming::{card_file_name, sanitize_component};

/// バイト列をアトミックに書き込む
///
/// # 引数
///
/// * `dir` - 出力ディレクトリ（存在している必要があります）
/// * `file_name` - ファイル名（パス区切りを含まないこと）
/// * `bytes` - 書き込む内容
///
/// # 戻り値
///
/// * `Ok(PathBuf)` - 書き込んだファイルのパス
/// * `Err(AdmitCardError::Io)` - 一時ファイルの作成・書き込み・リネームに失敗した場合
///
/// 同名のファイルが既にある場合は置き換えます。失敗時に一時ファイルは残りません。
pub(crate) fn write_atomic(
    dir: &Path,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, AdmitCardError> {
    let target = dir.join(file_name);

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(&target).map_err(|e| e.error)?;

    Ok(target)
}
