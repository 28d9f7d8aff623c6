//! admitcard - Batch admit card (准考证) generator
//!
//! This crate reads a candidate roster from an Excel workbook and renders one
//! A4 PDF admit card per candidate, combining each row with a named exam
//! configuration (exam name, location, schedule and notes).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use admitcard::GeneratorBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // config/default.json + fonts/wqy-microhei.ttc -> AdmitCards/
//!     let generator = GeneratorBuilder::new().build()?;
//!
//!     let report = generator.run("students.xlsx", "default")?;
//!     println!("成功生成{}份准考证", report.count());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Roster Contract
//!
//! The first sheet's first row is the header. `A1` must be `姓名` and `B1`
//! must be `身份证号`; every further header cell becomes the label of an extra
//! field printed on the card. Each following row is one candidate.
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use admitcard::{DateFormat, EmptyRowPolicy, GeneratorBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let generator = GeneratorBuilder::new()
//!         .with_config_dir("exams")
//!         .with_output_dir("out/2025-final")
//!         .with_font_path("/usr/share/fonts/truetype/wqy/wqy-microhei.ttc")
//!         .with_date_format(DateFormat::Custom("%Y年%m月%d日".to_string()))
//!         .with_empty_row_policy(EmptyRowPolicy::Skip)
//!         .build()?;
//!
//!     let report = generator.run("students.xlsx", "2025-final")?;
//!     for path in &report.documents {
//!         println!("{}", path.display());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Finding a Generated Card
//!
//! ```rust,no_run
//! use admitcard::find_card;
//!
//! if let Some(path) = find_card("AdmitCards", "110101199001011234", "阿卜杜·热合曼") {
//!     println!("{}", path.display());
//! }
//! ```

mod api;
mod builder;
mod config;
mod error;
mod font;
mod formatter;
mod layout;
mod lookup;
mod output;
mod parser;
mod pdf;
mod security;
mod types;

// 公開API
pub use api::{DateFormat, EmptyRowPolicy};
pub use builder::{
    BatchReport, Generator, GeneratorBuilder, RenderContext, DEFAULT_FONT_PATH,
    DEFAULT_OUTPUT_DIR,
};
pub use config::{ConfigLoader, ExamConfig, ScheduleEntry, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_NAME};
pub use error::AdmitCardError;
pub use font::{FontFace, FontProgram, FontProgramKind, FontResource};
pub use layout::{CardLayout, Color, Page, Primitive, Stroke};
pub use lookup::{find_card, normalize_name};
pub use output::{card_file_name, sanitize_component};
pub use parser::{ID_HEADER, NAME_HEADER};
pub use security::SecurityConfig;
pub use types::{CandidateRecord, ExtraField, Roster};
