// ============================================
// src/config.rs
// コマンドライン引数と、データ / ログファイルの置き場所
// ============================================

use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use directories::ProjectDirs;

const WORDS_FILE: &str = "words.json";
const LOG_FILE: &str = "wordflip.log";

/// Vocabulary flashcards in the terminal.
#[derive(Debug, Parser)]
#[command(name = "wordflip", version, about)]
pub struct Cli {
    /// Word data file (JSON object with `level_<N>` keys)
    #[arg(long, value_name = "PATH")]
    pub words: Option<PathBuf>,

    /// Seed for the card shuffle (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Speech synthesizer program (espeak-ng compatible)
    #[arg(long, value_name = "PROG", default_value = "espeak-ng")]
    pub speech_program: String,

    /// Disable pronunciation entirely
    #[arg(long)]
    pub no_speech: bool,

    /// Preferred voice language tag
    #[arg(long, value_name = "TAG", default_value = "en-US")]
    pub voice_lang: String,

    /// Speech rate relative to normal speed
    #[arg(long, default_value_t = 0.9, value_parser = parse_rate)]
    pub rate: f32,

    /// Columns a mouse drag must cover to count as a swipe
    #[arg(long, value_name = "COLS", default_value_t = 6)]
    pub swipe_threshold: u16,

    /// Switch cards without the slide animation
    #[arg(long)]
    pub no_animation: bool,

    /// Log file (defaults to the platform data directory)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

fn parse_rate(text: &str) -> Result<f32, String> {
    let rate: f32 = text.parse().map_err(|_| format!("{text:?} is not a number"))?;
    if (0.1..=3.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("rate must be between 0.1 and 3.0 (got {rate})"))
    }
}

// MARK:保存先ディレクトリ
fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("jp", "Fukumoto0141", "wordflip")
}

impl Cli {
    /// 単語ファイルの場所: 指定 > カレントの words.json > データディレクトリの words.json
    pub fn words_path(&self) -> PathBuf {
        if let Some(path) = &self.words {
            return path.clone();
        }

        let local = PathBuf::from(WORDS_FILE);
        if local.exists() {
            return local;
        }
        if let Some(dirs) = project_dirs() {
            let shared = dirs.data_dir().join(WORDS_FILE);
            if shared.exists() {
                return shared;
            }
        }
        // どれも無ければカレントを返し、読み込みエラーでパスを見せる
        local
    }

    /// ログファイルの場所。ディレクトリが無ければ作る
    pub fn log_path(&self) -> PathBuf {
        if let Some(path) = &self.log_file {
            return path.clone();
        }
        if let Some(dirs) = project_dirs() {
            let data_dir = dirs.data_dir();
            if ensure_dir(data_dir) {
                return data_dir.join(LOG_FILE);
            }
        }
        PathBuf::from(LOG_FILE)
    }
}

fn ensure_dir(dir: &Path) -> bool {
    dir.exists() || fs::create_dir_all(dir).is_ok()
}
