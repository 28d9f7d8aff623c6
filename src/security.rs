//! Security Module
//!
//! 入力ファイルと設定名に対するセキュリティ制限を実装するモジュール。
//! 巨大ファイルによるメモリ枯渇、設定名によるパストラバーサルへの対策を提供します。

/// セキュリティ設定
///
/// 名簿読み込み時のセキュリティ制限を定義します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 64MB (67_108_864 bytes)
    pub max_input_file_size: u64,
    /// 1回のバッチで扱う最大レコード数
    /// デフォルト: 100000
    pub max_records: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_file_size: 67_108_864, // 64MB
            max_records: 100_000,
        }
    }
}

/// 設定名の検証
///
/// 設定名は `<config_dir>/<name>.json` に解決されるため、
/// ディレクトリ外を指す名前を拒否します。
///
/// # 戻り値
///
/// * `Ok(())` - 名前が安全な場合
/// * `Err(String)` - 名前が危険な場合（空、`..`、パス区切り、絶対パス）
pub(crate) fn validate_config_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Empty config name is not allowed".to_string());
    }

    // 絶対パスを拒否（Windows形式の`C:`やUnix形式の`/`で始まる名前）
    if name.starts_with('/') || name.get(1..2) == Some(":") {
        return Err(format!("Absolute path is not allowed: {}", name));
    }

    if name.contains("..") {
        return Err(format!("Path traversal detected: {}", name));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(format!("Path separator in config name is not allowed: {}", name));
    }

    if name.chars().any(char::is_control) {
        return Err(format!("Control character in config name: {:?}", name));
    }

    Ok(())
}
