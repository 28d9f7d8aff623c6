//! 出力ファイル名の生成

use sanitize_filename::{sanitize_with_options, Options};

/// 準考証ファイルの拡張子
pub const CARD_EXTENSION: &str = "pdf";

/// 無害化で置き換える文字
const REPLACEMENT: &str = "_";

/// ファイル名の構成要素を無害化する
///
/// パス区切りと予約文字、制御文字を`_`に置き換えます。
/// Windowsの予約名（`CON`、`NUL`など）と末尾の`.`や空白も置き換えの対象です。
/// CJKを含むそれ以外の文字はそのまま残ります。
///
/// # 使用例
///
/// ```rust
/// use admitcard::sanitize_component;
///
/// assert_eq!(sanitize_component("张三"), "张三");
/// assert_eq!(sanitize_component("a/b:c"), "a_b_c");
/// ```
pub fn sanitize_component(component: &str) -> String {
    let sanitized = sanitize_with_options(
        component,
        Options {
            windows: true,
            truncate: true,
            replacement: REPLACEMENT,
        },
    );

    // `.`と`..`はそれ自体がディレクトリを指す
    match sanitized.as_str() {
        "." | ".." => REPLACEMENT.repeat(sanitized.len()),
        _ => sanitized,
    }
}

/// 準考証のファイル名（`{id}-{name}.pdf`）
///
/// 前後の空白は取り除いてから無害化します。
///
/// # 使用例
///
/// ```rust
/// use admitcard::card_file_name;
///
/// assert_eq!(
///     card_file_name("110101199001011234", "张三"),
///     "110101199001011234-张三.pdf"
/// );
/// ```
pub fn card_file_name(id: &str, name: &str) -> String {
    format!(
        "{}-{}.{}",
        sanitize_component(id.trim()),
        sanitize_component(name.trim()),
        CARD_EXTENSION
    )
}
