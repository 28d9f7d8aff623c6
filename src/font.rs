//! Font Module
//!
//! 準考証の計測と埋め込みに使用するフォントフェイスを提供するモジュール。
//! フォントはバッチ開始時に1度だけ読み込まれ、すべてのレンダリングで共有されます。
//! 埋め込むのは文書で使用したグリフだけです。

use std::fs;
use std::path::{Path, PathBuf};

use rusttype::{Font, GlyphId, Scale};
use subsetter::Profile;
use tracing::debug;

use crate::error::AdmitCardError;

/// TrueType Collectionのマジックナンバー
const TTC_MAGIC: &[u8; 4] = b"ttcf";

/// CFFアウトラインを持つOpenTypeのマジックナンバー
const OTTO_MAGIC: &[u8; 4] = b"OTTO";

/// コレクションから読み込むフェイスの番号
const COLLECTION_FACE: u32 = 0;

/// PostScript名が導出できない場合の名前
const FALLBACK_POSTSCRIPT_NAME: &str = "AdmitCardFont";

/// 埋め込むフォントプログラムの形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontProgramKind {
    /// glyfアウトライン（`FontFile2`として埋め込む）
    TrueType,
    /// CFFアウトライン（`FontFile3 /OpenType`として埋め込む）
    OpenType,
}

/// 埋め込み用のフォントプログラム
#[derive(Debug, Clone)]
pub struct FontProgram {
    /// 単独のフォントファイル（sfnt）のバイト列
    pub bytes: Vec<u8>,
    /// 形式
    pub kind: FontProgramKind,
}

/// 文字の計測とグリフ変換を行うフォントフェイス
///
/// 寸法はすべて1000 em単位（PDFのグリフ空間）で返します。
/// レイアウトとPDF出力はこのトレイトだけに依存するため、
/// 組み込み側やテストは固定幅のフェイスを差し込むことができます。
pub trait FontFace {
    /// PDFの`BaseFont`に使用する名前（空白を含まないASCII）
    fn postscript_name(&self) -> &str;

    /// 文字に対応するグリフID（フェイスに含まれない場合は`None`）
    fn glyph_id(&self, ch: char) -> Option<u16>;

    /// グリフの送り幅（1000 em単位）
    fn advance(&self, glyph: u16) -> f32;

    /// アセンダー（1000 em単位、正の値）
    fn ascent(&self) -> f32;

    /// ディセンダー（1000 em単位、通常は負の値）
    fn descent(&self) -> f32;

    /// 指定したグリフだけを含む埋め込み用のフォントプログラム
    ///
    /// グリフIDは元のフェイスと同じ値のまま残るため、
    /// 幅の配列やToUnicode CMapを付け替える必要はありません。
    ///
    /// # 引数
    ///
    /// * `glyphs` - 残すグリフID（`.notdef`を含める）
    ///
    /// # 戻り値
    ///
    /// * `Ok(FontProgram)` - サブセット化したプログラム
    /// * `Err(AdmitCardError::FontUnavailable)` - サブセット化に失敗した場合
    fn program(&self, glyphs: &[u16]) -> Result<FontProgram, AdmitCardError>;

    /// 1文字の送り幅（1000 em単位）
    ///
    /// フェイスに含まれない文字は`.notdef`（グリフ0）の幅になります。
    fn char_advance(&self, ch: char) -> f32 {
        self.advance(self.glyph_id(ch).unwrap_or(0))
    }

    /// 文字列の幅（ポイント）
    fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|ch| self.char_advance(ch)).sum::<f32>() * size / 1000.0
    }
}

/// rusttypeで読み込んだTrueType/OpenTypeフォント
///
/// フォントコレクション（`.ttc`）は最初のフェイスを使用します。
pub struct FontResource {
    path: PathBuf,
    bytes: Vec<u8>,
    index: u32,
    font: Font<'static>,
    postscript_name: String,
    kind: FontProgramKind,
    units_per_em: f32,
    ascent: f32,
    descent: f32,
}

impl std::fmt::Debug for FontResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontResource")
            .field("path", &self.path)
            .field("postscript_name", &self.postscript_name)
            .field("kind", &self.kind)
            .field("index", &self.index)
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

impl FontResource {
    /// フォントファイルを読み込む
    ///
    /// # 引数
    ///
    /// * `path` - TrueType（`.ttf`）、OpenType（`.otf`）またはコレクション（`.ttc`）のパス
    ///
    /// # 戻り値
    ///
    /// * `Ok(FontResource)` - 読み込みに成功した場合
    /// * `Err(AdmitCardError::FontUnavailable)` - ファイルが読めないか、
    ///   フォントとして解析できない場合
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AdmitCardError> {
        let path = path.as_ref();
        let unavailable = |reason: String| AdmitCardError::FontUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = fs::read(path).map_err(|e| unavailable(e.to_string()))?;
        let resource = Self::from_bytes(bytes, Self::postscript_name_for(path))
            .map_err(unavailable)?;

        debug!(
            path = %path.display(),
            name = %resource.postscript_name,
            glyphs = resource.font.glyph_count(),
            face = resource.index,
            "loaded font face"
        );

        Ok(Self {
            path: path.to_path_buf(),
            ..resource
        })
    }

    /// バイト列からフォントを構築
    fn from_bytes(bytes: Vec<u8>, postscript_name: String) -> Result<Self, String> {
        let index = if bytes.get(..4) == Some(TTC_MAGIC.as_slice()) {
            COLLECTION_FACE
        } else {
            0
        };
        let magic = face_magic(&bytes, index)
            .ok_or_else(|| "font collection has no readable face".to_string())?;
        let kind = if magic == OTTO_MAGIC {
            FontProgramKind::OpenType
        } else {
            FontProgramKind::TrueType
        };

        let font = Font::try_from_vec_and_index(bytes.clone(), index)
            .ok_or_else(|| "not a valid TrueType/OpenType font".to_string())?;

        let units_per_em = f32::from(font.units_per_em());
        if units_per_em <= 0.0 {
            return Err("font reports zero units per em".to_string());
        }
        let metrics = font.v_metrics_unscaled();

        Ok(Self {
            path: PathBuf::new(),
            bytes,
            index,
            postscript_name,
            kind,
            units_per_em,
            ascent: metrics.ascent * 1000.0 / units_per_em,
            descent: metrics.descent * 1000.0 / units_per_em,
            font,
        })
    }

    /// ファイル名からPostScript名を導出（ASCII英数字と`-`のみ）
    fn postscript_name_for(path: &Path) -> String {
        let name: String = path
            .file_stem()
            .map(|stem| stem.to_string_lossy())
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();

        if name.is_empty() {
            FALLBACK_POSTSCRIPT_NAME.to_string()
        } else {
            name
        }
    }

    /// 読み込んだファイルのパス
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FontFace for FontResource {
    fn postscript_name(&self) -> &str {
        &self.postscript_name
    }

    fn glyph_id(&self, ch: char) -> Option<u16> {
        match self.font.glyph(ch).id() {
            GlyphId(0) => None,
            GlyphId(id) => Some(id),
        }
    }

    fn advance(&self, glyph: u16) -> f32 {
        // rusttypeのScaleは(ascent - descent)を基準にするため、
        // そのままの値を渡すとフォント単位の送り幅が得られる
        let metrics = self.font.v_metrics_unscaled();
        let scale = Scale::uniform(metrics.ascent - metrics.descent);
        let advance = self
            .font
            .glyph(GlyphId(glyph))
            .scaled(scale)
            .h_metrics()
            .advance_width;
        advance * 1000.0 / self.units_per_em
    }

    fn ascent(&self) -> f32 {
        self.ascent
    }

    fn descent(&self) -> f32 {
        self.descent
    }

    fn program(&self, glyphs: &[u16]) -> Result<FontProgram, AdmitCardError> {
        let bytes = subsetter::subset(&self.bytes, self.index, Profile::pdf(glyphs)).map_err(
            |e| AdmitCardError::FontUnavailable {
                path: self.path.clone(),
                reason: format!("failed to subset font: {}", e),
            },
        )?;

        debug!(
            glyphs = glyphs.len(),
            original = self.bytes.len(),
            subset = bytes.len(),
            "subset font program"
        );

        Ok(FontProgram {
            bytes,
            kind: self.kind,
        })
    }
}

/// フェイス先頭のマジックナンバー
///
/// コレクションの場合は`index`番目のフェイスのオフセットを辿ります。
fn face_magic(bytes: &[u8], index: u32) -> Option<&[u8]> {
    let offset = if bytes.get(..4)? == TTC_MAGIC.as_slice() {
        let entry = 12 + index as usize * 4;
        let raw: [u8; 4] = bytes.get(entry..entry + 4)?.try_into().ok()?;
        u32::from_be_bytes(raw) as usize
    } else {
        0
    };
    bytes.get(offset..offset + 4)
}
