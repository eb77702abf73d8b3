// ============================================
// src/logging.rs
// ログ出力 (画面は TUI が使うのでファイルに書く)
// ============================================

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    filter::LevelFilter,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// ログ設定
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub file: PathBuf,
}

impl LogConfig {
    /// -v の回数からレベルを決める (0: info, 1: debug, 2+: trace)
    pub fn from_verbosity(verbosity: u8, file: PathBuf) -> Self {
        let level = match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self { level, file }
    }

    /// RUST_LOG があればそちらを優先
    fn filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(self.level).into())
            .from_env_lossy()
    }
}

/// ファイルに追記するサブスクライバを登録する
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)?;
    init_logging_with_writer(config, Mutex::new(file))
}

pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W) -> io::Result<()>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(config.filter())
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()
        .map_err(io::Error::other)
}
