//! # 文字卡片导出：命令行入口
//!
//! 本文件仅负责参数解析、日志初始化与调用 `ExportDispatcher`。
//! 卡片由宿主预先渲染为 PNG，通过 `--input` 传入，作为预览区截图目标。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use card_export::error::AppError;
use card_export::export::{
    CopyOutcome, ExportDispatcher, ExportError, SceneSurface, SinkKind, ViewportSignal,
};
use card_export::settings;

#[derive(Debug, Parser)]
#[command(name = "card-export", version, about = "截图、裁剪并导出文字卡片 PNG")]
struct Cli {
    /// JSON 设置文件路径
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 保存为下载文件
    File {
        #[command(flatten)]
        input: InputArgs,

        /// 下载目录（覆盖设置文件）
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// 复制到系统剪贴板（窄屏不可用）
    Copy {
        #[command(flatten)]
        input: InputArgs,
    },
    /// 输出 data:image/png;base64 链接
    DataUrl {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Debug, Args)]
struct InputArgs {
    /// 预先渲染的卡片预览图
    #[arg(long)]
    input: PathBuf,

    /// 按窄屏（移动端）视口导出
    #[arg(long)]
    narrow: bool,

    /// 预览图的设备像素比
    #[arg(long, default_value_t = 1.0)]
    source_scale: f32,
}

impl InputArgs {
    fn viewport(&self) -> ViewportSignal {
        ViewportSignal::from_narrow_flag(self.narrow)
    }

    fn load_surface(&self) -> Result<SceneSurface, AppError> {
        let image = image::open(&self.input)
            .map_err(|e| AppError::Input(format!("{}: {}", self.input.display(), e)))?
            .to_rgba8();
        Ok(SceneSurface::from_image(image, self.source_scale)?)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ 导出失败 [{}]: {}", err.code(), err);
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = match &cli.settings {
        Some(path) => settings::load_config(path)?,
        None => Default::default(),
    };

    match cli.command {
        Command::File { input, out_dir } => {
            if out_dir.is_some() {
                config.output_dir = out_dir;
            }
            let dispatcher = ExportDispatcher::new(config)?;
            let surface = input.load_surface()?;

            let path = dispatcher.export_to_file(&surface, input.viewport()).await?;
            println!("{}", path.display());
        }
        Command::Copy { input } => {
            let dispatcher = ExportDispatcher::new(config)?;
            let clipboard = dispatcher
                .clipboard(input.viewport())
                .ok_or(ExportError::ClipboardUnavailable)?;
            let surface = input.load_surface()?;

            match clipboard.copy(&surface).await {
                CopyOutcome::Copied { width, height } => println!("{}x{}", width, height),
                CopyOutcome::Failed(e) => return Err(e.into()),
                CopyOutcome::Skipped => {}
            }
        }
        Command::DataUrl { input } => {
            let dispatcher = ExportDispatcher::new(config)?;
            let surface = input.load_surface()?;

            let artifact = dispatcher
                .render_artifact(&surface, SinkKind::File, input.viewport())
                .await?;
            println!("{}", artifact.to_data_url());
        }
    }

    Ok(())
}
