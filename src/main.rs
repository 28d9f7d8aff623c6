//! admitcard コマンドラインツール
//!
//! 名簿（Excel）から準考証PDFを一括生成します。
//!
//! # 使用方法
//!
//! ```text
//! admitcard students.xlsx
//! admitcard students.xlsx -c 2025-final -o out
//! admitcard --find 110101199001011234 张三
//! ```
//!
//! ログレベルは`-v`/`-q`で指定します。環境変数`RUST_LOG`が設定されている場合はそちらが優先されます。

use std::path::PathBuf;
use std::process;

use admitcard::{
    find_card, AdmitCardError, DateFormat, EmptyRowPolicy, GeneratorBuilder, DEFAULT_CONFIG_DIR,
    DEFAULT_CONFIG_NAME, DEFAULT_FONT_PATH, DEFAULT_OUTPUT_DIR, ID_HEADER, NAME_HEADER,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// 准考证生成器
#[derive(Parser, Debug)]
#[command(name = "admitcard", version, about = "准考证生成器")]
struct Cli {
    /// 考生信息Excel文件路径
    #[arg(value_name = "EXCEL_FILE", required_unless_present = "find")]
    excel_file: Option<PathBuf>,

    /// 配置文件名（不带.json扩展名）
    #[arg(short, long, default_value = DEFAULT_CONFIG_NAME)]
    config: String,

    /// 配置文件目录
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// 准考证输出目录
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// 嵌入的字体文件（TrueType/OpenType）
    #[arg(long, value_name = "PATH", default_value = DEFAULT_FONT_PATH)]
    font: PathBuf,

    /// 日期单元格格式（chrono格式，默认ISO 8601）
    #[arg(long, value_name = "FMT")]
    date_format: Option<String>,

    /// 将完全空白的行也作为考生记录
    #[arg(long)]
    keep_empty_rows: bool,

    /// 按身份证号和姓名查找已生成的准考证
    #[arg(long, num_args = 2, value_names = ["ID", "NAME"], conflicts_with = "excel_file")]
    find: Option<Vec<String>>,

    /// 输出更详细的日志（可重复）
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// 只输出错误日志
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    if let Some([id, name]) = cli.find.as_deref() {
        match find_card(&cli.output_dir, id, name) {
            Some(path) => println!("{}", path.display()),
            None => {
                eprintln!("未找到{}的准考证，请检查信息是否匹配。", name);
                process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = run(&cli) {
        handle_error(e);
        process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("admitcard={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), AdmitCardError> {
    let Some(input) = &cli.excel_file else {
        return Err(AdmitCardError::Config("Excel file path is required".to_string()));
    };

    let mut builder = GeneratorBuilder::new()
        .with_config_dir(&cli.config_dir)
        .with_output_dir(&cli.output_dir)
        .with_font_path(&cli.font);

    if let Some(format) = &cli.date_format {
        builder = builder.with_date_format(DateFormat::Custom(format.clone()));
    }
    if cli.keep_empty_rows {
        builder = builder.with_empty_row_policy(EmptyRowPolicy::Keep);
    }

    let generator = builder.build()?;
    let report = generator.run(input, &cli.config)?;

    println!(
        "成功生成{}份准考证到{}目录",
        report.count(),
        generator.output_dir().display()
    );
    Ok(())
}

/// エラーの種類ごとにメッセージとヒントを表示
fn handle_error(error: AdmitCardError) {
    match error {
        AdmitCardError::ConfigNotFound { path } => {
            eprintln!("错误: 配置文件{}不存在", path.display());
            eprintln!("请使用 -c 指定配置名，或使用 --config-dir 指定配置目录。");
        }
        AdmitCardError::ConfigParse { path, message } => {
            eprintln!("错误: 配置文件{}无效: {}", path.display(), message);
            eprintln!("配置文件必须包含 exam_name, exam_location, exam_schedule, exam_notes。");
        }
        AdmitCardError::InvalidSchema { expected, found } => {
            eprintln!("错误: Excel表头不符合要求（实际为 {:?}）", found);
            eprintln!(
                "Excel文件第一列应为'{}'，第二列应为'{}'（期望 {:?}）。",
                NAME_HEADER, ID_HEADER, expected
            );
        }
        AdmitCardError::MissingField { column, cell } => {
            eprintln!("错误: 单元格{}缺少{}", cell, column);
            eprintln!("请补全该行数据，或删除该行后重试。未生成任何准考证。");
        }
        AdmitCardError::FontUnavailable { path, reason } => {
            eprintln!("错误: 无法加载字体{}: {}", path.display(), reason);
            eprintln!("请使用 --font 指定一个支持中文的 .ttf/.otf/.ttc 字体文件。");
        }
        AdmitCardError::Render { record, message } => {
            eprintln!("错误: 生成{}的准考证失败: {}", record, message);
            eprintln!("之前已生成的准考证仍保留在输出目录中。请缩短配置中的内容后重试。");
        }
        AdmitCardError::Io(io_err) => {
            eprintln!("错误: 文件读写失败: {}", io_err);
            eprintln!("请检查文件是否存在，以及是否有读写权限。");
        }
        AdmitCardError::Parse(parse_err) => {
            eprintln!("错误: 无法解析Excel文件: {}", parse_err);
            eprintln!("文件可能已损坏，或不是有效的Excel文件。");
        }
        AdmitCardError::Pdf(pdf_err) => {
            eprintln!("错误: PDF生成失败: {}", pdf_err);
        }
        AdmitCardError::Config(msg) => {
            eprintln!("错误: 参数无效: {}", msg);
            eprintln!("请检查 --date-format 等参数。");
        }
        AdmitCardError::SecurityViolation(msg) => {
            eprintln!("错误: 违反安全限制: {}", msg);
            eprintln!("输入文件过大、记录过多，或配置名包含路径。");
        }
    }
}
