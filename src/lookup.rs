//! Card Lookup Module
//!
//! 生成済みの準考証を身份证号と姓名から探すモジュール。

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::output::card_file_name;

/// 少数民族の姓名で使われる区切り（間隔号）
const NAME_SEPARATOR: char = '·';

/// 姓名を正規化する
///
/// `·`を含む場合は最初の`·`より前の部分だけを残します。
///
/// # 使用例
///
/// ```rust
/// use admitcard::normalize_name;
///
/// assert_eq!(normalize_name("阿卜杜·热合曼"), "阿卜杜");
/// assert_eq!(normalize_name("张三"), "张三");
/// ```
pub fn normalize_name(name: &str) -> &str {
    match name.split_once(NAME_SEPARATOR) {
        Some((head, _)) => head,
        None => name,
    }
}

/// 準考証ファイルを探す
///
/// `{id}-{name}.pdf`、次に`{id}-{normalize_name(name)}.pdf`の順に探します。
/// どちらの構成要素も生成時と同じ規則で無害化されるため、
/// 検索が出力ディレクトリの外に出ることはありません。
///
/// # 引数
///
/// * `dir` - 出力ディレクトリ
/// * `id` - 身份证号（空の場合は常に`None`）
/// * `name` - 姓名
///
/// # 戻り値
///
/// 見つかったファイルのパス。見つからない場合は`None`
pub fn find_card(dir: impl AsRef<Path>, id: &str, name: &str) -> Option<PathBuf> {
    let dir = dir.as_ref();
    let id = id.trim();
    let name = name.trim();
    if id.is_empty() {
        return None;
    }

    let normalized = normalize_name(name);
    let candidates = std::iter::once(name).chain((normalized != name).then_some(normalized));

    for candidate in candidates {
        let path = dir.join(card_file_name(id, candidate));
        if path.is_file() {
            debug!(path = %path.display(), "found admit card");
            return Some(path);
        }
    }

    debug!(id, name, "admit card not found");
    None
}
