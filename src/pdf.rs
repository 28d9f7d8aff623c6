//! PDF Writer Module
//!
//! レイアウト済みのページをlopdfの`Document`に変換し、メモリ上でシリアライズするモジュール。
//!
//! フォントは文書ごとに1度だけType0（CIDFontType2, Identity-H）として埋め込み、
//! テキストはグリフIDの16進文字列として書き出します。
//! 埋め込むフォントプログラムは文書で使用したグリフだけのサブセットです。
//! 同じ入力からは常に同じバイト列が生成されます（タイムスタンプや`/ID`は含めません）。

use std::collections::{BTreeMap, BTreeSet};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, warn};

use crate::error::AdmitCardError;
use crate::font::{FontFace, FontProgramKind};
use crate::layout::{Color, Page, Primitive, Stroke};

/// ページリソース内のフォント名
const FONT_RESOURCE: &str = "F1";

/// 文書情報の`Producer`
const PRODUCER: &str = "admitcard";

/// ToUnicode CMapの1ブロックあたりの最大エントリ数
const BFCHAR_BLOCK: usize = 100;

/// 塗り+線による擬似太字の線幅（フォントサイズ比）
const EMPHASIS_STROKE_RATIO: f32 = 0.03;

/// 円弧をベジェ曲線で近似するための係数
const KAPPA: f32 = 0.552_284_8;

/// PDFライター
///
/// # 使用例
///
/// ```rust,ignore
/// let writer = PdfWriter::new(&face);
/// let bytes = writer.write(&layout.pages, "准考证")?;
/// ```
pub(crate) struct PdfWriter<'a> {
    face: &'a dyn FontFace,
}

impl<'a> PdfWriter<'a> {
    pub fn new(face: &'a dyn FontFace) -> Self {
        Self { face }
    }

    /// ページをPDFのバイト列に変換
    ///
    /// # 引数
    ///
    /// * `pages` - レイアウト済みのページ
    /// * `title` - 文書情報の`Title`
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - 圧縮済みのPDF
    /// * `Err(AdmitCardError::Pdf)` - コンテンツストリームのエンコードや保存に失敗した場合
    /// * `Err(AdmitCardError::FontUnavailable)` - フォントのサブセット化に失敗した場合
    pub fn write(&self, pages: &[Page], title: &str) -> Result<Vec<u8>, AdmitCardError> {
        let glyphs = self.collect_glyphs(pages);

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = self.embed_font(&mut doc, &glyphs)?;

        let mut kids = Vec::with_capacity(pages.len());
        for page in pages {
            let content = Content {
                operations: self.page_operations(page),
            };
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), page.width.into(), page.height.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { FONT_RESOURCE => font_id },
                },
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => text_string(title),
            "Producer" => Object::string_literal(PRODUCER),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;
        Ok(buffer)
    }

    /// 文書中で使用するグリフと、その元の文字を収集
    ///
    /// フェイスに含まれない文字はグリフ0として扱い、レンダリングごとに1度だけ警告します。
    fn collect_glyphs(&self, pages: &[Page]) -> BTreeMap<u16, char> {
        let mut glyphs = BTreeMap::new();
        let mut missing = BTreeSet::new();

        for page in pages {
            for text in page.texts() {
                for ch in text.chars() {
                    match self.face.glyph_id(ch) {
                        Some(glyph) => {
                            glyphs.entry(glyph).or_insert(ch);
                        }
                        None => {
                            missing.insert(ch);
                        }
                    }
                }
            }
        }

        if !missing.is_empty() {
            let chars: String = missing.into_iter().collect();
            warn!(
                font = self.face.postscript_name(),
                missing = %chars,
                "characters not covered by the font are rendered as .notdef"
            );
        }

        glyphs
    }

    /// Type0フォントを埋め込み、そのオブジェクトIDを返す
    ///
    /// サブセットはグリフIDを保つため、`W`配列とToUnicodeは元のIDで書き出します。
    fn embed_font(
        &self,
        doc: &mut Document,
        glyphs: &BTreeMap<u16, char>,
    ) -> Result<ObjectId, AdmitCardError> {
        let face = self.face;
        let name = face.postscript_name();
        let used: Vec<u16> = std::iter::once(0)
            .chain(glyphs.keys().copied())
            .collect::<BTreeSet<u16>>()
            .into_iter()
            .collect();
        let program = face.program(&used)?;
        debug!(
            font = name,
            glyphs = used.len(),
            bytes = program.bytes.len(),
            "embedding font subset"
        );
        let ascent = face.ascent().round() as i64;
        let descent = face.descent().round() as i64;

        let (file_key, cid_subtype, file_id) = match program.kind {
            FontProgramKind::TrueType => {
                let stream = Stream::new(
                    dictionary! { "Length1" => program.bytes.len() as i64 },
                    program.bytes,
                );
                ("FontFile2", "CIDFontType2", doc.add_object(stream))
            }
            FontProgramKind::OpenType => {
                let stream = Stream::new(
                    dictionary! { "Subtype" => "OpenType" },
                    program.bytes,
                );
                ("FontFile3", "CIDFontType0", doc.add_object(stream))
            }
        };

        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => name,
            "Flags" => 4,
            "FontBBox" => vec![0.into(), descent.into(), 1000.into(), ascent.into()],
            "ItalicAngle" => 0,
            "Ascent" => ascent,
            "Descent" => descent,
            "CapHeight" => ascent,
            "StemV" => 80,
            file_key => file_id,
        });

        let mut widths = Vec::with_capacity(used.len() * 2);
        for &glyph in &used {
            widths.push(Object::Integer(i64::from(glyph)));
            widths.push(Object::Array(vec![face.advance(glyph).into()]));
        }

        let mut cid_font = dictionary! {
            "Type" => "Font",
            "Subtype" => cid_subtype,
            "BaseFont" => name,
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "DW" => 1000,
            "W" => widths,
        };
        if cid_subtype == "CIDFontType2" {
            cid_font.set("CIDToGIDMap", "Identity");
        }
        let cid_font_id = doc.add_object(cid_font);

        let to_unicode_id = doc.add_object(Stream::new(
            Dictionary::new(),
            to_unicode_cmap(glyphs).into_bytes(),
        ));

        Ok(doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => name,
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => to_unicode_id,
        }))
    }

    fn page_operations(&self, page: &Page) -> Vec<Operation> {
        let mut ops = Vec::new();
        for item in &page.items {
            match item {
                Primitive::Text {
                    x,
                    y,
                    size,
                    text,
                    emphasis,
                    color,
                } => self.text_operations(&mut ops, *x, *y, *size, text, *emphasis, *color),
                Primitive::Rect {
                    x,
                    y,
                    width,
                    height,
                    stroke,
                    fill,
                    radius,
                } => rect_operations(&mut ops, *x, *y, *width, *height, stroke.as_ref(), *fill, *radius),
                Primitive::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    stroke,
                } => {
                    ops.push(Operation::new("q", vec![]));
                    push_stroke(&mut ops, stroke);
                    ops.push(Operation::new("m", vec![(*x1).into(), (*y1).into()]));
                    ops.push(Operation::new("l", vec![(*x2).into(), (*y2).into()]));
                    ops.push(Operation::new("S", vec![]));
                    ops.push(Operation::new("Q", vec![]));
                }
            }
        }
        ops
    }

    #[allow(clippy::too_many_arguments)]
    fn text_operations(
        &self,
        ops: &mut Vec<Operation>,
        x: f32,
        y: f32,
        size: f32,
        text: &str,
        emphasis: bool,
        color: Color,
    ) {
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("rg", color_operands(color)));
        if emphasis {
            ops.push(Operation::new("RG", color_operands(color)));
            ops.push(Operation::new("w", vec![(size * EMPHASIS_STROKE_RATIO).into()]));
        }
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), size.into()],
        ));
        if emphasis {
            ops.push(Operation::new("Tr", vec![Object::Integer(2)]));
        }
        ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        ops.push(Operation::new("Tj", vec![self.encode(text)]));
        ops.push(Operation::new("ET", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// テキストをIdentity-Hのグリフ列（ビッグエンディアン16ビット）に変換
    fn encode(&self, text: &str) -> Object {
        let bytes = text
            .chars()
            .flat_map(|ch| self.face.glyph_id(ch).unwrap_or(0).to_be_bytes())
            .collect();
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

#[allow(clippy::too_many_arguments)]
fn rect_operations(
    ops: &mut Vec<Operation>,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    stroke: Option<&Stroke>,
    fill: Option<Color>,
    radius: f32,
) {
    let paint = match (stroke.is_some(), fill.is_some()) {
        (true, true) => "B",
        (true, false) => "S",
        (false, true) => "f",
        (false, false) => return,
    };

    ops.push(Operation::new("q", vec![]));
    if let Some(stroke) = stroke {
        push_stroke(ops, stroke);
    }
    if let Some(color) = fill {
        ops.push(Operation::new("rg", color_operands(color)));
    }

    let radius = radius.min(width / 2.0).min(height / 2.0);
    if radius > 0.0 {
        rounded_rect_path(ops, x, y, width, height, radius);
    } else {
        ops.push(Operation::new(
            "re",
            vec![x.into(), y.into(), width.into(), height.into()],
        ));
    }
    ops.push(Operation::new(paint, vec![]));
    ops.push(Operation::new("Q", vec![]));
}

/// 角丸矩形のパス（左下から反時計回り）
fn rounded_rect_path(ops: &mut Vec<Operation>, x: f32, y: f32, w: f32, h: f32, r: f32) {
    let k = r * KAPPA;
    let (x1, y1) = (x + w, y + h);

    let point = |op: &str, coords: &[f32]| {
        Operation::new(op, coords.iter().map(|&v| v.into()).collect())
    };

    ops.push(point("m", &[x + r, y]));
    ops.push(point("l", &[x1 - r, y]));
    ops.push(point("c", &[x1 - r + k, y, x1, y + r - k, x1, y + r]));
    ops.push(point("l", &[x1, y1 - r]));
    ops.push(point("c", &[x1, y1 - r + k, x1 - r + k, y1, x1 - r, y1]));
    ops.push(point("l", &[x + r, y1]));
    ops.push(point("c", &[x + r - k, y1, x, y1 - r + k, x, y1 - r]));
    ops.push(point("l", &[x, y + r]));
    ops.push(point("c", &[x, y + r - k, x + r - k, y, x + r, y]));
    ops.push(point("h", &[]));
}

fn push_stroke(ops: &mut Vec<Operation>, stroke: &Stroke) {
    ops.push(Operation::new("RG", color_operands(stroke.color)));
    ops.push(Operation::new("w", vec![stroke.width.into()]));
    let dash = match stroke.dash {
        Some([on, off]) => vec![on.into(), off.into()],
        None => Vec::new(),
    };
    ops.push(Operation::new("d", vec![Object::Array(dash), Object::Integer(0)]));
}

fn color_operands(color: Color) -> Vec<Object> {
    vec![color.r.into(), color.g.into(), color.b.into()]
}

/// 文書情報用のテキスト文字列（BOM付きUTF-16BE）
fn text_string(text: &str) -> Object {
    let mut bytes = vec![0xfe, 0xff];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// グリフIDからUnicodeへのToUnicode CMapを生成
fn to_unicode_cmap(glyphs: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );

    let entries: Vec<(&u16, &char)> = glyphs.iter().collect();
    for block in entries.chunks(BFCHAR_BLOCK) {
        cmap.push_str(&format!("{} beginbfchar\n", block.len()));
        for (glyph, ch) in block {
            let mut units = [0u16; 2];
            let hex: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{:04X}", unit))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", glyph, hex));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExamConfig, ScheduleEntry};
    use crate::font::test_support::MonoFace;
    use crate::font::FontProgram;
    use crate::layout::CardLayout;
    use crate::types::CandidateRecord;

    fn sample_layout() -> CardLayout {
        let record = CandidateRecord {
            row: 2,
            name: "张三".to_string(),
            id: "110101199001011234".to_string(),
            extra_fields: Vec::new(),
        };
        let config = ExamConfig {
            exam_name: "期末考试".to_string(),
            exam_location: "第一教学楼".to_string(),
            exam_schedule: vec![ScheduleEntry {
                subject: "语文".to_string(),
                time: "08:00-10:00".to_string(),
            }],
            exam_notes: vec!["请携带身份证".to_string()],
            title: "准考证".to_string(),
            photo_caption: "一寸照片粘贴处".to_string(),
        };
        CardLayout::build(&record, &config, &MonoFace).unwrap()
    }

    fn fonts_in(doc: &Document, subtype: &[u8]) -> usize {
        doc.objects
            .values()
            .filter_map(|object| object.as_dict().ok())
            .filter(|dict| {
                dict.get(b"Subtype")
                    .and_then(Object::as_name)
                    .map(|name| name == subtype)
                    .unwrap_or(false)
            })
            .count()
    }

    #[test]
    fn test_write_produces_loadable_pdf() {
        let layout = sample_layout();
        let bytes = PdfWriter::new(&MonoFace).write(&layout.pages, "准考证").unwrap();

        assert!(bytes.starts_with(b"%PDF-1.7"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_font_embedded_once_across_pages() {
        let mut layout = sample_layout();
        let extra = layout.pages[0].clone();
        layout.pages.push(extra);

        let bytes = PdfWriter::new(&MonoFace).write(&layout.pages, "准考证").unwrap();
        let doc = Document::load_mem(&bytes).unwrap();

        assert_eq!(doc.get_pages().len(), 2);
        assert_eq!(fonts_in(&doc, b"Type0"), 1);
        assert_eq!(fonts_in(&doc, b"CIDFontType2"), 1);
    }

    /// 要求されたグリフIDをそのままプログラムとして返すフェイス
    struct SubsetEcho;

    impl FontFace for SubsetEcho {
        fn postscript_name(&self) -> &str {
            MonoFace.postscript_name()
        }

        fn glyph_id(&self, ch: char) -> Option<u16> {
            MonoFace.glyph_id(ch)
        }

        fn advance(&self, glyph: u16) -> f32 {
            MonoFace.advance(glyph)
        }

        fn ascent(&self) -> f32 {
            MonoFace.ascent()
        }

        fn descent(&self) -> f32 {
            MonoFace.descent()
        }

        fn program(&self, glyphs: &[u16]) -> Result<FontProgram, AdmitCardError> {
            Ok(FontProgram {
                bytes: glyphs.iter().flat_map(|g| g.to_be_bytes()).collect(),
                kind: FontProgramKind::TrueType,
            })
        }
    }

    fn embedded_program(doc: &Document) -> (i64, Vec<u8>) {
        let descriptor = doc
            .objects
            .values()
            .filter_map(|object| object.as_dict().ok())
            .find(|dict| {
                dict.get(b"Type").and_then(Object::as_name).ok() == Some(b"FontDescriptor".as_slice())
            })
            .unwrap();
        let file_id = descriptor.get(b"FontFile2").and_then(Object::as_reference).unwrap();
        let stream = doc.get_object(file_id).and_then(Object::as_stream).unwrap();
        let length1 = stream.dict.get(b"Length1").and_then(Object::as_i64).unwrap();
        let content = if stream.dict.has(b"Filter") {
            stream.decompressed_content().unwrap()
        } else {
            stream.content.clone()
        };
        (length1, content)
    }

    #[test]
    fn test_font_program_holds_only_used_glyphs() {
        let layout = sample_layout();
        let bytes = PdfWriter::new(&SubsetEcho).write(&layout.pages, "准考证").unwrap();
        let doc = Document::load_mem(&bytes).unwrap();

        let (length1, program) = embedded_program(&doc);
        assert_eq!(length1 as usize, program.len());

        let glyphs: Vec<u16> = program
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        // .notdefが先頭で、昇順かつ重複なし
        assert_eq!(glyphs[0], 0);
        assert!(glyphs.windows(2).all(|pair| pair[0] < pair[1]));
        let zhang = MonoFace.glyph_id('张').unwrap();
        assert!(glyphs.contains(&zhang));
        let unused = MonoFace.glyph_id('龘').unwrap();
        assert!(!glyphs.contains(&unused));
    }

    #[test]
    fn test_write_is_deterministic() {
        let layout = sample_layout();
        let writer = PdfWriter::new(&MonoFace);
        let first = writer.write(&layout.pages, "准考证").unwrap();
        let second = writer.write(&layout.pages, "准考证").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_encode_uses_glyph_ids() {
        let writer = PdfWriter::new(&MonoFace);
        match writer.encode("a?") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                // 'a' (0x61) -> 0x62, '?' -> .notdef
                assert_eq!(bytes, vec![0x00, 0x62, 0x00, 0x00]);
            }
            other => panic!("Expected hex string, got {:?}", other),
        }
    }

    #[test]
    fn test_to_unicode_cmap_blocks() {
        let glyphs: BTreeMap<u16, char> = (1..=150u16)
            .map(|g| (g, char::from_u32(0x4e00 + u32::from(g)).unwrap()))
            .collect();
        let cmap = to_unicode_cmap(&glyphs);

        assert!(cmap.contains("100 beginbfchar"));
        assert!(cmap.contains("50 beginbfchar"));
        assert!(cmap.contains("<0001> <4E01>"));
    }

    #[test]
    fn test_to_unicode_cmap_surrogate_pairs() {
        let glyphs: BTreeMap<u16, char> = [(7u16, '𠀀')].into_iter().collect();
        let cmap = to_unicode_cmap(&glyphs);
        assert!(cmap.contains("<0007> <D840DC00>"));
    }

    #[test]
    fn test_text_string_is_utf16_with_bom() {
        match text_string("准") {
            Object::String(bytes, _) => assert_eq!(bytes, vec![0xfe, 0xff, 0x51, 0xc6]),
            other => panic!("Expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_rounded_rect_uses_curves() {
        let mut ops = Vec::new();
        let stroke = Stroke {
            color: Color::BORDER,
            width: 1.0,
            dash: None,
        };
        rect_operations(&mut ops, 0.0, 0.0, 100.0, 50.0, Some(&stroke), None, 4.0);

        let curves = ops.iter().filter(|op| op.operator == "c").count();
        assert_eq!(curves, 4);
        assert_eq!(ops.iter().filter(|op| op.operator == "S").count(), 1);
    }

    #[test]
    fn test_rect_without_paint_is_skipped() {
        let mut ops = Vec::new();
        rect_operations(&mut ops, 0.0, 0.0, 10.0, 10.0, None, None, 0.0);
        assert!(ops.is_empty());
    }
}
