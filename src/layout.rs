//! Card Layout Module
//!
//! 1人分の準考証を、ページ上に配置された描画プリミティブの列に変換するモジュール。
//! 幾何計算のみを行い、I/Oは行いません。
//!
//! # 座標系
//!
//! PDFと同じく左下原点、単位はポイント（1/72インチ）です。
//! `Primitive::Text`の`y`はベースライン、`Primitive::Rect`の`y`は下端を表します。

use std::ops::Range;

use crate::config::ExamConfig;
use crate::error::AdmitCardError;
use crate::font::FontFace;
use crate::types::CandidateRecord;

/// 1センチメートル（ポイント）
pub const CM: f32 = 28.346_457;

/// A4の幅（ポイント）
pub const PAGE_WIDTH: f32 = 595.275_6;

/// A4の高さ（ポイント）
pub const PAGE_HEIGHT: f32 = 841.889_8;

const MARGIN: f32 = 2.0 * CM;
const BLOCK_WIDTH: f32 = 14.0 * CM;
const BLOCK_GAP: f32 = 0.5 * CM;
const BORDER_WIDTH: f32 = 1.0;
const CORNER_RADIUS: f32 = 4.0;

const TITLE_SIZE: f32 = 24.0;
const TITLE_GAP: f32 = 1.0 * CM;

const BODY_SIZE: f32 = 14.0;
const LEADING_FACTOR: f32 = 1.2;
const PARAGRAPH_GAP: f32 = 0.5 * CM;

const IDENTITY_COLUMNS: [f32; 3] = [10.0 * CM, 3.0 * CM, 1.0 * CM];
const IDENTITY_PADDING: f32 = 16.0;
const PHOTO_WIDTH: f32 = 2.5 * CM;
const PHOTO_HEIGHT: f32 = 3.5 * CM;
const PHOTO_DASH: [f32; 2] = [2.0, 2.0];
const CAPTION_SIZE: f32 = 10.0;

const SCHEDULE_COLUMNS: [f32; 2] = [4.0 * CM, 10.0 * CM];
const SCHEDULE_ROW_HEIGHT: f32 = 1.0 * CM;
const SCHEDULE_PADDING: f32 = 14.0;
const GRID_WIDTH: f32 = 0.5;

const NOTES_PADDING: f32 = 12.0;
const NOTES_HEADING_LEADING: f32 = 18.0;
const NOTES_HEADING_GAP: f32 = 6.0;

/// 身元欄のラベル
pub const LABEL_EXAM_NAME: &str = "考试名称";
pub const LABEL_EXAM_LOCATION: &str = "考试地点";
pub const LABEL_NAME: &str = "姓名";
pub const LABEL_ID: &str = "身份证号";

/// 時間割表のヘッダー
pub const LABEL_SUBJECT: &str = "科目";
pub const LABEL_TIME: &str = "考试时间";

/// 注意事項欄の見出し
pub const NOTES_HEADING: &str = "注意事项：";

/// RGB色（各成分0.0〜1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::gray(0.0);
    pub const TITLE: Color = Color::gray(51.0 / 255.0);
    pub const BORDER: Color = Color {
        r: 74.0 / 255.0,
        g: 134.0 / 255.0,
        b: 232.0 / 255.0,
    };
    pub const GRID: Color = Color::gray(221.0 / 255.0);
    pub const HEADER_FILL: Color = Color::gray(245.0 / 255.0);

    const fn gray(level: f32) -> Self {
        Self {
            r: level,
            g: level,
            b: level,
        }
    }
}

/// 線の描画属性
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
    /// 破線パターン（オン, オフ）。`None`は実線
    pub dash: Option<[f32; 2]>,
}

impl Stroke {
    fn solid(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            dash: None,
        }
    }
}

/// ページ上に配置された描画要素
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// テキスト（1行）
    Text {
        x: f32,
        y: f32,
        size: f32,
        text: String,
        /// 太字の代わりに塗り+線で描画する
        emphasis: bool,
        color: Color,
    },
    /// 矩形（`radius > 0`で角丸）
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        stroke: Option<Stroke>,
        fill: Option<Color>,
        radius: f32,
    },
    /// 線分
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        stroke: Stroke,
    },
}

impl Primitive {
    /// 垂直方向に平行移動
    fn translate(&mut self, dy: f32) {
        match self {
            Primitive::Text { y, .. } | Primitive::Rect { y, .. } => *y += dy,
            Primitive::Line { y1, y2, .. } => {
                *y1 += dy;
                *y2 += dy;
            }
        }
    }
}

/// 1ページ分の描画要素
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub width: f32,
    pub height: f32,
    pub items: Vec<Primitive>,
}

impl Page {
    fn new() -> Self {
        Self {
            width: PAGE_WIDTH,
            height: PAGE_HEIGHT,
            items: Vec::new(),
        }
    }

    /// ページ上のテキストを出現順に返す
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            Primitive::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// 縦に積まれる1ブロック
///
/// 要素の座標はブロック上端を`y = 0`とした相対値で保持し、配置時に平行移動します。
struct Block {
    name: &'static str,
    height: f32,
    gap_after: f32,
    items: Vec<Primitive>,
}

/// ページに配置する単位
enum Section {
    /// 分割しないブロック
    Block(Block),
    /// 行の境界でページをまたげる表
    Table(Table),
}

/// 行単位で分割できる表
///
/// 各行の要素は行の上端を`y = 0`とした相対値で保持します。
/// 分割した断片ごとに外枠と列の区切り線を描きます。
struct Table {
    name: &'static str,
    rows: Vec<TableRow>,
    gap_after: f32,
}

struct TableRow {
    height: f32,
    items: Vec<Primitive>,
}

impl Table {
    /// `start`行目から、高さ`room`に収まる行の終端（排他的）
    fn fit(&self, start: usize, room: f32) -> usize {
        let mut used = 0.0_f32;
        let mut end = start;
        while let Some(row) = self.rows.get(end) {
            if used + row.height > room {
                break;
            }
            used += row.height;
            end += 1;
        }
        end
    }

    /// 指定した範囲の行を1つのブロックにまとめる
    fn fragment(&self, range: Range<usize>) -> Block {
        let x0 = block_x();
        let grid = Stroke::solid(Color::GRID, GRID_WIDTH);
        let last = range.end.saturating_sub(1);
        let gap_after = if range.end == self.rows.len() {
            self.gap_after
        } else {
            0.0
        };

        let mut items = Vec::new();
        let mut top = 0.0_f32;
        for index in range {
            let row = &self.rows[index];
            items.extend(row.items.iter().cloned().map(|mut item| {
                item.translate(top);
                item
            }));
            top -= row.height;
            if index < last {
                items.push(Primitive::Line {
                    x1: x0,
                    y1: top,
                    x2: x0 + BLOCK_WIDTH,
                    y2: top,
                    stroke: grid,
                });
            }
        }

        let height = -top;
        let divider_x = x0 + SCHEDULE_COLUMNS[0];
        items.push(Primitive::Line {
            x1: divider_x,
            y1: 0.0,
            x2: divider_x,
            y2: -height,
            stroke: grid,
        });
        items.push(border(x0, height));

        Block {
            name: self.name,
            height,
            gap_after,
            items,
        }
    }
}

/// 1人分の準考証のレイアウト結果
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    /// ページ（1ページ以上）
    pub pages: Vec<Page>,
    /// 身元欄の論理行（`ラベル: 値`）
    pub identity_lines: Vec<String>,
    /// 時間割表の行（ヘッダーと末尾の空行を含む）
    pub schedule_rows: Vec<[String; 2]>,
}

impl CardLayout {
    /// 準考証をレイアウトする
    ///
    /// # 引数
    ///
    /// * `record` - 受験者レコード
    /// * `config` - 試験設定
    /// * `face` - 計測に使用するフォントフェイス
    ///
    /// # 戻り値
    ///
    /// * `Ok(CardLayout)` - レイアウトに成功した場合
    /// * `Err(AdmitCardError::Render)` - 空のページにも収まらないブロックか表の行がある場合
    pub fn build(
        record: &CandidateRecord,
        config: &ExamConfig,
        face: &dyn FontFace,
    ) -> Result<Self, AdmitCardError> {
        let metrics = TextMetrics { face };

        let mut identity_lines = vec![
            format!("{}: {}", LABEL_EXAM_NAME, config.exam_name),
            format!("{}: {}", LABEL_EXAM_LOCATION, config.exam_location),
            format!("{}: {}", LABEL_NAME, record.name),
            format!("{}: {}", LABEL_ID, record.id),
        ];
        identity_lines.extend(
            record
                .extra_fields
                .iter()
                .map(|field| format!("{}: {}", field.label, field.value)),
        );
        // 各行の先頭から`ラベル: `の終端までのバイト数
        let label_ends: Vec<usize> = [LABEL_EXAM_NAME, LABEL_EXAM_LOCATION, LABEL_NAME, LABEL_ID]
            .iter()
            .map(|label| label.len())
            .chain(record.extra_fields.iter().map(|f| f.label.len()))
            .map(|n| n + ": ".len())
            .collect();

        let mut schedule_rows = vec![[LABEL_SUBJECT.to_string(), LABEL_TIME.to_string()]];
        schedule_rows.extend(
            config
                .exam_schedule
                .iter()
                .map(|entry| [entry.subject.clone(), entry.time.clone()]),
        );
        schedule_rows.push([String::new(), String::new()]);

        let sections = vec![
            Section::Block(title_block(&config.title, &metrics)),
            Section::Block(identity_block(
                &identity_lines,
                &label_ends,
                &config.photo_caption,
                &metrics,
            )),
            Section::Table(schedule_table(&schedule_rows, &metrics)),
            Section::Block(notes_block(&config.exam_notes, &metrics)),
        ];

        let pages = paginate(sections).map_err(|message| AdmitCardError::Render {
            record: record.display_key(),
            message,
        })?;

        Ok(Self {
            pages,
            identity_lines,
            schedule_rows,
        })
    }
}

/// 上から順にブロックを積むページ列
struct Sheet {
    pages: Vec<Page>,
    cursor: f32,
}

impl Sheet {
    const TOP: f32 = PAGE_HEIGHT - MARGIN;
    const USABLE: f32 = PAGE_HEIGHT - 2.0 * MARGIN;

    fn new() -> Self {
        Self {
            pages: vec![Page::new()],
            cursor: Self::TOP,
        }
    }

    /// 現在のページの残りの高さ
    fn room(&self) -> f32 {
        self.cursor - MARGIN
    }

    fn page_is_empty(&self) -> bool {
        self.pages.last().is_some_and(|page| page.items.is_empty())
    }

    fn new_page(&mut self) {
        self.pages.push(Page::new());
        self.cursor = Self::TOP;
    }

    /// ブロックを現在の位置に置き、カーソルを進める
    fn place(&mut self, block: Block) {
        let cursor = self.cursor;
        if let Some(page) = self.pages.last_mut() {
            page.items.extend(block.items.into_iter().map(|mut item| {
                item.translate(cursor);
                item
            }));
        }
        self.cursor -= block.height + block.gap_after;
    }
}

/// セクションをページに配置する
///
/// ブロックは分割せず、収まらなければ次のページに送ります。
/// 表は行の境界で分割し、残りの行を次のページに続けます。
fn paginate(sections: Vec<Section>) -> Result<Vec<Page>, String> {
    let mut sheet = Sheet::new();

    for section in sections {
        match section {
            Section::Block(block) => {
                if block.height > Sheet::USABLE {
                    return Err(format!(
                        "{} block is {:.1}pt tall but a page holds only {:.1}pt",
                        block.name,
                        block.height,
                        Sheet::USABLE
                    ));
                }
                if block.height > sheet.room() && !sheet.page_is_empty() {
                    sheet.new_page();
                }
                sheet.place(block);
            }
            Section::Table(table) => {
                let mut start = 0;
                while start < table.rows.len() {
                    let end = table.fit(start, sheet.room());
                    if end == start {
                        if sheet.page_is_empty() {
                            return Err(format!(
                                "{} row {} is {:.1}pt tall but a page holds only {:.1}pt",
                                table.name,
                                start,
                                table.rows[start].height,
                                Sheet::USABLE
                            ));
                        }
                        sheet.new_page();
                        continue;
                    }
                    sheet.place(table.fragment(start..end));
                    start = end;
                    if start < table.rows.len() {
                        sheet.new_page();
                    }
                }
            }
        }
    }

    Ok(sheet.pages)
}

/// フォントフェイスを使ったテキスト計測
struct TextMetrics<'a> {
    face: &'a dyn FontFace,
}

impl TextMetrics<'_> {
    fn width(&self, text: &str, size: f32) -> f32 {
        self.face.text_width(text, size)
    }

    /// 行ボックス上端からベースラインまでの距離
    ///
    /// フォントの(ascent - descent)を行の高さの中で垂直中央に置きます。
    fn baseline_offset(&self, line_height: f32, size: f32) -> f32 {
        let ascent = self.face.ascent() * size / 1000.0;
        let descent = self.face.descent() * size / 1000.0;
        (line_height - (ascent - descent)) / 2.0 + ascent
    }

    /// 文字単位で折り返す
    ///
    /// 単語の区切りを持たないCJKテキストを前提に、幅を超える直前の文字で改行します。
    /// 改行直後の空白は捨てます。`\n`は強制改行として扱います。
    /// 空文字列でも1行を返します。
    fn wrap(&self, text: &str, max_width: f32, size: f32) -> Vec<String> {
        self.wrap_spans(text, max_width, size)
            .into_iter()
            .map(|span| text[span].to_string())
            .collect()
    }

    /// [`wrap`](Self::wrap)と同じ規則で、各行を`text`内のバイト範囲として返す
    fn wrap_spans(&self, text: &str, max_width: f32, size: f32) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut start = 0;
        let mut width = 0.0_f32;

        for (index, ch) in text.char_indices() {
            if ch == '\n' {
                spans.push(start..index);
                start = index + ch.len_utf8();
                width = 0.0;
                continue;
            }

            let char_width = self.face.char_advance(ch) * size / 1000.0;
            if width + char_width > max_width && index > start {
                spans.push(start..index);
                width = 0.0;
                if ch.is_whitespace() {
                    start = index + ch.len_utf8();
                    continue;
                }
                start = index;
            }
            width += char_width;
        }
        spans.push(start..text.len());

        spans
    }
}

fn leading(size: f32) -> f32 {
    size * LEADING_FACTOR
}

fn text(x: f32, y: f32, size: f32, text: String, emphasis: bool, color: Color) -> Primitive {
    Primitive::Text {
        x,
        y,
        size,
        text,
        emphasis,
        color,
    }
}

/// ブロックの外枠（角丸、青）
fn border(x: f32, height: f32) -> Primitive {
    Primitive::Rect {
        x,
        y: -height,
        width: BLOCK_WIDTH,
        height,
        stroke: Some(Stroke::solid(Color::BORDER, BORDER_WIDTH)),
        fill: None,
        radius: CORNER_RADIUS,
    }
}

fn block_x() -> f32 {
    (PAGE_WIDTH - BLOCK_WIDTH) / 2.0
}

fn title_block(title: &str, metrics: &TextMetrics<'_>) -> Block {
    let line_height = leading(TITLE_SIZE);
    let width = metrics.width(title, TITLE_SIZE);
    let baseline = -metrics.baseline_offset(line_height, TITLE_SIZE);

    Block {
        name: "title",
        height: line_height,
        gap_after: TITLE_GAP,
        items: vec![text(
            (PAGE_WIDTH - width) / 2.0,
            baseline,
            TITLE_SIZE,
            title.to_string(),
            true,
            Color::TITLE,
        )],
    }
}

/// 身元欄: 左に`ラベル: 値`の行、中央に写真欄、右は空白列
fn identity_block(
    lines: &[String],
    label_ends: &[usize],
    caption: &str,
    metrics: &TextMetrics<'_>,
) -> Block {
    let x0 = block_x();
    let line_height = leading(BODY_SIZE);
    let column_width = IDENTITY_COLUMNS[0] - 2.0 * IDENTITY_PADDING;

    let wrapped: Vec<Vec<Range<usize>>> = lines
        .iter()
        .map(|line| metrics.wrap_spans(line, column_width, BODY_SIZE))
        .collect();
    let stack_height: f32 = wrapped
        .iter()
        .map(|w| w.len() as f32 * line_height + PARAGRAPH_GAP)
        .sum();

    let inner_height = stack_height.max(PHOTO_HEIGHT);
    let height = inner_height + 2.0 * IDENTITY_PADDING;

    let mut items = vec![border(x0, height)];

    // 左列: 行ボックスを上から積む
    let mut top = -IDENTITY_PADDING - (inner_height - stack_height) / 2.0;
    let text_x = x0 + IDENTITY_PADDING;
    for ((line, spans), &label_end) in lines.iter().zip(&wrapped).zip(label_ends) {
        for span in spans {
            let baseline = top - metrics.baseline_offset(line_height, BODY_SIZE);
            // 折り返しで落ちた空白をまたいでも、ラベルはバイト位置で判定する
            let split = label_end.clamp(span.start, span.end);
            let label = &line[span.start..split];
            let value = &line[split..span.end];

            if !label.is_empty() {
                items.push(text(text_x, baseline, BODY_SIZE, label.to_string(), true, Color::BLACK));
            }
            if !value.is_empty() {
                let value_x = text_x + metrics.width(label, BODY_SIZE);
                items.push(text(value_x, baseline, BODY_SIZE, value.to_string(), false, Color::BLACK));
            }
            top -= line_height;
        }
        top -= PARAGRAPH_GAP;
    }

    // 中央列: 右寄せの写真欄（破線）とキャプション
    let photo_x = x0 + IDENTITY_COLUMNS[0] + IDENTITY_COLUMNS[1] - IDENTITY_PADDING - PHOTO_WIDTH;
    let photo_y = -IDENTITY_PADDING - (inner_height - PHOTO_HEIGHT) / 2.0 - PHOTO_HEIGHT;
    items.push(Primitive::Rect {
        x: photo_x,
        y: photo_y,
        width: PHOTO_WIDTH,
        height: PHOTO_HEIGHT,
        stroke: Some(Stroke {
            color: Color::BLACK,
            width: BORDER_WIDTH,
            dash: Some(PHOTO_DASH),
        }),
        fill: None,
        radius: 0.0,
    });
    let caption_width = metrics.width(caption, CAPTION_SIZE);
    items.push(text(
        photo_x + (PHOTO_WIDTH - caption_width) / 2.0,
        photo_y + PHOTO_HEIGHT / 2.0 - CAPTION_SIZE / 2.0,
        CAPTION_SIZE,
        caption.to_string(),
        false,
        Color::BLACK,
    ));

    Block {
        name: "identity",
        height,
        gap_after: BLOCK_GAP,
        items,
    }
}

/// 時間割表: ヘッダー行、科目ごとの行、末尾の空行
fn schedule_table(rows: &[[String; 2]], metrics: &TextMetrics<'_>) -> Table {
    let x0 = block_x();
    let line_height = leading(BODY_SIZE);

    let rows = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let is_header = index == 0;
            let cells = [
                metrics.wrap(&row[0], SCHEDULE_COLUMNS[0] - 2.0 * SCHEDULE_PADDING, BODY_SIZE),
                metrics.wrap(&row[1], SCHEDULE_COLUMNS[1] - 2.0 * SCHEDULE_PADDING, BODY_SIZE),
            ];
            let lines = cells[0].len().max(cells[1].len()) as f32;
            let height = SCHEDULE_ROW_HEIGHT.max(lines * line_height);

            let mut items = Vec::new();
            // ヘッダー背景は罫線より先に描く
            if is_header {
                items.push(Primitive::Rect {
                    x: x0,
                    y: -height,
                    width: BLOCK_WIDTH,
                    height,
                    stroke: None,
                    fill: Some(Color::HEADER_FILL),
                    radius: 0.0,
                });
            }

            let mut cell_x = x0;
            for (lines, &column_width) in cells.iter().zip(&SCHEDULE_COLUMNS) {
                let text_height = lines.len() as f32 * line_height;
                let mut line_top = -(height - text_height) / 2.0;
                for line in lines.iter().filter(|line| !line.is_empty()) {
                    let x = if is_header {
                        cell_x + (column_width - metrics.width(line, BODY_SIZE)) / 2.0
                    } else {
                        cell_x + SCHEDULE_PADDING
                    };
                    let baseline = line_top - metrics.baseline_offset(line_height, BODY_SIZE);
                    items.push(text(x, baseline, BODY_SIZE, line.clone(), false, Color::BLACK));
                    line_top -= line_height;
                }
                cell_x += column_width;
            }

            TableRow { height, items }
        })
        .collect();

    Table {
        name: "schedule",
        rows,
        gap_after: BLOCK_GAP,
    }
}

/// 注意事項欄: 見出しと、注意事項ごとの段落
fn notes_block(notes: &[String], metrics: &TextMetrics<'_>) -> Block {
    let x0 = block_x();
    let text_x = x0 + NOTES_PADDING;
    let line_height = leading(BODY_SIZE);
    let column_width = BLOCK_WIDTH - 2.0 * NOTES_PADDING;

    let mut items = Vec::new();
    let mut top = -NOTES_PADDING;

    let heading_baseline = top - metrics.baseline_offset(NOTES_HEADING_LEADING, BODY_SIZE);
    items.push(text(
        text_x,
        heading_baseline,
        BODY_SIZE,
        NOTES_HEADING.to_string(),
        true,
        Color::BLACK,
    ));
    top -= NOTES_HEADING_LEADING + NOTES_HEADING_GAP;

    for note in notes {
        for line in metrics.wrap(note, column_width, BODY_SIZE) {
            let baseline = top - metrics.baseline_offset(line_height, BODY_SIZE);
            if !line.is_empty() {
                items.push(text(text_x, baseline, BODY_SIZE, line, false, Color::BLACK));
            }
            top -= line_height;
        }
        top -= PARAGRAPH_GAP;
    }

    let height = -top + NOTES_PADDING;
    items.insert(0, border(x0, height));

    Block {
        name: "notes",
        height,
        gap_after: 0.0,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScheduleEntry;
    use crate::font::test_support::MonoFace;
    use crate::types::ExtraField;

    fn worked_example() -> (CandidateRecord, ExamConfig) {
        let record = CandidateRecord {
            row: 2,
            name: "张三".to_string(),
            id: "110101199001011234".to_string(),
            extra_fields: vec![ExtraField {
                label: "班级".to_string(),
                value: "三年二班".to_string(),
            }],
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
        (record, config)
    }

    fn rects(page: &Page) -> Vec<&Primitive> {
        page.items
            .iter()
            .filter(|item| matches!(item, Primitive::Rect { .. }))
            .collect()
    }

    #[test]
    fn test_worked_example_identity_lines() {
        let (record, config) = worked_example();
        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();

        assert_eq!(
            layout.identity_lines,
            vec![
                "考试名称: 期末考试",
                "考试地点: 第一教学楼",
                "姓名: 张三",
                "身份证号: 110101199001011234",
                "班级: 三年二班",
            ]
        );
    }

    #[test]
    fn test_worked_example_schedule_rows() {
        let (record, config) = worked_example();
        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();

        assert_eq!(layout.schedule_rows.len(), 3);
        assert_eq!(layout.schedule_rows[0], ["科目".to_string(), "考试时间".to_string()]);
        assert_eq!(layout.schedule_rows[1], ["语文".to_string(), "08:00-10:00".to_string()]);
        assert_eq!(layout.schedule_rows[2], [String::new(), String::new()]);
    }

    #[test]
    fn test_worked_example_fits_one_page() {
        let (record, config) = worked_example();
        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();

        assert_eq!(layout.pages.len(), 1);
        let texts: Vec<&str> = layout.pages[0].texts().collect();
        assert_eq!(texts[0], "准考证");
        assert!(texts.contains(&"考试名称: "));
        assert!(texts.contains(&"期末考试"));
        assert!(texts.contains(&"一寸照片粘贴处"));
        assert!(texts.contains(&"注意事项："));
        assert!(texts.contains(&"请携带身份证"));
    }

    #[test]
    fn test_schedule_rows_are_m_plus_two() {
        let (record, mut config) = worked_example();
        for m in [0usize, 1, 4] {
            config.exam_schedule = (0..m)
                .map(|i| ScheduleEntry {
                    subject: format!("科目{}", i),
                    time: "09:00".to_string(),
                })
                .collect();
            let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();
            assert_eq!(layout.schedule_rows.len(), m + 2);
        }
    }

    #[test]
    fn test_labels_are_emphasized() {
        let (record, config) = worked_example();
        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();

        let emphasized: Vec<&str> = layout.pages[0]
            .items
            .iter()
            .filter_map(|item| match item {
                Primitive::Text { text, emphasis: true, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(emphasized.contains(&"姓名: "));
        assert!(emphasized.contains(&"班级: "));
        assert!(!emphasized.contains(&"张三"));
    }

    #[test]
    fn test_photo_box_is_dashed_and_sized() {
        let (record, config) = worked_example();
        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();

        let photo = rects(&layout.pages[0])
            .into_iter()
            .find_map(|item| match item {
                Primitive::Rect {
                    width,
                    height,
                    stroke: Some(stroke),
                    ..
                } if stroke.dash.is_some() => Some((*width, *height, stroke.dash)),
                _ => None,
            })
            .unwrap();

        assert!((photo.0 - 2.5 * CM).abs() < 1e-3);
        assert!((photo.1 - 3.5 * CM).abs() < 1e-3);
        assert_eq!(photo.2, Some([2.0, 2.0]));
    }

    #[test]
    fn test_blocks_have_rounded_blue_borders() {
        let (record, config) = worked_example();
        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();

        assert_eq!(borders_on(&layout.pages[0]), 3);
    }

    #[test]
    fn test_content_stays_inside_margins() {
        let (record, config) = worked_example();
        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();

        for item in &layout.pages[0].items {
            if let Primitive::Rect { x, y, width, height, .. } = item {
                assert!(*x >= MARGIN - 1e-3);
                assert!(*y >= MARGIN - 1e-3);
                assert!(x + width <= PAGE_WIDTH - MARGIN + 1e-3);
                assert!(y + height <= PAGE_HEIGHT - MARGIN + 1e-3);
            }
        }
    }

    #[test]
    fn test_long_value_wraps_within_column() {
        let (mut record, config) = worked_example();
        record.extra_fields[0].value = "很".repeat(40);
        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();

        let column_right = block_x() + IDENTITY_COLUMNS[0] - IDENTITY_PADDING;
        for item in &layout.pages[0].items {
            if let Primitive::Text { x, size, text, .. } = item {
                if text.starts_with('很') {
                    assert!(x + MonoFace.text_width(text, *size) <= column_right + 1e-3);
                }
            }
        }
        assert_eq!(layout.identity_lines.len(), 5);
    }

    #[test]
    fn test_many_notes_paginate() {
        let (record, mut config) = worked_example();
        config.exam_schedule = schedule_of(12);
        config.exam_notes = (0..8).map(|i| format!("注意事项第{}条", i)).collect();

        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();
        assert_eq!(layout.pages.len(), 2);
        assert!(layout.pages[1].texts().any(|t| t == "注意事项："));
        assert!(!layout.pages[0].texts().any(|t| t == "注意事项："));
    }

    fn schedule_of(count: usize) -> Vec<ScheduleEntry> {
        (0..count)
            .map(|i| ScheduleEntry {
                subject: format!("科目{}", i),
                time: "09:00-11:00".to_string(),
            })
            .collect()
    }

    fn borders_on(page: &Page) -> usize {
        rects(page)
            .into_iter()
            .filter(|item| {
                matches!(item, Primitive::Rect { stroke: Some(stroke), radius, .. }
                    if stroke.color == Color::BORDER && *radius == CORNER_RADIUS)
            })
            .count()
    }

    #[test]
    fn test_long_schedule_splits_between_rows() {
        let (record, mut config) = worked_example();
        config.exam_schedule = schedule_of(30);

        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();
        assert_eq!(layout.pages.len(), 2);
        assert_eq!(layout.schedule_rows.len(), 32);

        // ヘッダーは最初のページだけ、最後の科目と注意事項は次のページ
        assert!(layout.pages[0].texts().any(|t| t == "科目"));
        assert!(!layout.pages[1].texts().any(|t| t == "科目"));
        assert!(layout.pages[0].texts().any(|t| t == "科目0"));
        assert!(layout.pages[1].texts().any(|t| t == "科目29"));
        assert!(layout.pages[1].texts().any(|t| t == "注意事项："));

        // 各断片に外枠がある（身元欄+表の断片、表の断片+注意事項欄）
        assert_eq!(borders_on(&layout.pages[0]), 2);
        assert_eq!(borders_on(&layout.pages[1]), 2);
    }

    #[test]
    fn test_split_schedule_keeps_blank_row_last() {
        let (record, mut config) = worked_example();
        config.exam_schedule = schedule_of(30);
        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();

        // 2ページ目の表の外枠の下端は、最後の科目の行の1行分下にある
        let page = &layout.pages[1];
        let last_subject_y = page
            .items
            .iter()
            .find_map(|item| match item {
                Primitive::Text { y, text, .. } if text == "科目29" => Some(*y),
                _ => None,
            })
            .unwrap();
        let table_bottom = page
            .items
            .iter()
            .find_map(|item| match item {
                Primitive::Rect { y, stroke: Some(stroke), .. }
                    if stroke.color == Color::BORDER && *y < last_subject_y =>
                {
                    Some(*y)
                }
                _ => None,
            })
            .unwrap();
        let gap = last_subject_y - table_bottom;
        assert!(gap > SCHEDULE_ROW_HEIGHT && gap < 2.0 * SCHEDULE_ROW_HEIGHT);
    }

    #[test]
    fn test_very_long_schedule_spans_three_pages() {
        let (record, mut config) = worked_example();
        config.exam_schedule = schedule_of(60);

        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();
        assert_eq!(layout.pages.len(), 3);
        for page in &layout.pages {
            for item in &page.items {
                if let Primitive::Rect { y, height, .. } = item {
                    assert!(*y >= MARGIN - 1e-3);
                    assert!(y + height <= PAGE_HEIGHT - MARGIN + 1e-3);
                }
            }
        }
    }

    #[test]
    fn test_schedule_row_taller_than_page_fails() {
        let (record, mut config) = worked_example();
        config.exam_schedule[0].time = "时".repeat(800);

        match CardLayout::build(&record, &config, &MonoFace) {
            Err(AdmitCardError::Render { message, .. }) => {
                assert!(message.starts_with("schedule row 1"));
            }
            other => panic!("Expected Render error, got {:?}", other),
        }
    }

    #[test]
    fn test_label_split_survives_dropped_space() {
        let (mut record, config) = worked_example();
        // ラベルと`:`で列幅をほぼ使い切り、`: `の空白で折り返す
        record.extra_fields[0].label = "项".repeat(17);
        let layout = CardLayout::build(&record, &config, &MonoFace).unwrap();

        let texts: Vec<(&str, bool)> = layout.pages[0]
            .items
            .iter()
            .filter_map(|item| match item {
                Primitive::Text { text, emphasis, .. } => Some((text.as_str(), *emphasis)),
                _ => None,
            })
            .collect();
        let label = format!("{}:", "项".repeat(17));
        assert!(texts.contains(&(label.as_str(), true)));
        assert!(texts.contains(&("三年二班", false)));
        assert!(!texts.iter().any(|(text, emphasis)| *emphasis && text.starts_with('三')));
    }

    #[test]
    fn test_oversized_block_fails() {
        let (record, mut config) = worked_example();
        config.exam_notes = (0..60).map(|i| format!("第{}条", i)).collect();

        match CardLayout::build(&record, &config, &MonoFace) {
            Err(AdmitCardError::Render { record, message }) => {
                assert_eq!(record, "110101199001011234-张三");
                assert!(message.starts_with("notes block"));
            }
            other => panic!("Expected Render error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrap_breaks_by_character() {
        let metrics = TextMetrics { face: &MonoFace };
        // 14ptの全角文字は14pt幅
        let lines = metrics.wrap("一二三四五", 42.0, 14.0);
        assert_eq!(lines, vec!["一二三", "四五"]);
    }

    #[test]
    fn test_wrap_drops_leading_space_and_keeps_empty() {
        let metrics = TextMetrics { face: &MonoFace };
        assert_eq!(metrics.wrap("", 100.0, 14.0), vec![String::new()]);
        // 半角は7pt幅
        let lines = metrics.wrap("abcd efgh", 28.0, 14.0);
        assert_eq!(lines, vec!["abcd", "efgh"]);
        assert_eq!(metrics.wrap("a\nb", 100.0, 14.0), vec!["a", "b"]);
    }

    #[test]
    fn test_wrap_spans_are_byte_ranges() {
        let metrics = TextMetrics { face: &MonoFace };
        // "一二" (6バイト) + 空白 + "三"
        let spans = metrics.wrap_spans("一二 三", 28.0, 14.0);
        assert_eq!(spans, vec![0..6, 7..10]);
        assert_eq!(metrics.wrap_spans("a\n", 100.0, 14.0), vec![0..1, 2..2]);
    }

    #[test]
    fn test_colors() {
        assert_eq!(Color::BLACK, Color { r: 0.0, g: 0.0, b: 0.0 });
        assert!((Color::TITLE.r - 0.2).abs() < 1e-6);
        assert!(Color::BORDER.b > Color::BORDER.r);
    }
}
