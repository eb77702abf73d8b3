// ============================================
// src/speech.rs
// 単語の読み上げ (外部の音声合成コマンドを使う)
// ============================================

use std::io;
use std::process::{Child, Command, Stdio};

use thiserror::Error;

/// espeak-ng の標準の話速 (words per minute)
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// 音声合成エンジンの声
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

/// 1 回分の発話
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<Voice>,
    pub lang: String,
    pub rate: f32,
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech synthesis is not available on this system")]
    Unsupported,
    #[error("failed to start speech program {program:?}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// 読み上げの実体。端末ごとに差し替えられるようにトレイトにしておく
pub trait SpeechBackend {
    fn is_supported(&self) -> bool;
    /// 再生中の発話を止める (何もなければ何もしない)
    fn cancel(&mut self);
    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError>;
}

/// 言語タグが英語か ("en", "en-GB", "en_us" など)
fn is_english(tag: &str) -> bool {
    let tag = tag.to_ascii_lowercase();
    tag == "en" || tag.starts_with("en-") || tag.starts_with("en_")
}

/// 使う声を選ぶ: 英語で地域まで一致 > 英語なら何でも > なし
pub fn select_preferred_voice(voices: &[Voice], preferred_lang: &str) -> Option<Voice> {
    voices
        .iter()
        .find(|v| is_english(&v.lang) && v.lang.eq_ignore_ascii_case(preferred_lang))
        .or_else(|| voices.iter().find(|v| is_english(&v.lang)))
        .cloned()
}

/// 声の選択をキャッシュしつつ、バックエンドに発話を投げる
pub struct PronunciationService<B> {
    backend: B,
    preferred_voice: Option<Voice>,
    lang: String,
    rate: f32,
}

impl<B: SpeechBackend> PronunciationService<B> {
    pub fn new(backend: B, lang: impl Into<String>, rate: f32) -> Self {
        Self {
            backend,
            preferred_voice: None,
            lang: lang.into(),
            rate,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.backend.is_supported()
    }

    pub fn preferred_voice(&self) -> Option<&Voice> {
        self.preferred_voice.as_ref()
    }

    /// 声の一覧が (遅れて) 届いたら選び直す。何回呼ばれてもよい
    pub fn voices_changed(&mut self, voices: &[Voice]) {
        self.preferred_voice = select_preferred_voice(voices, &self.lang);
        match &self.preferred_voice {
            Some(voice) => tracing::info!(name = %voice.name, lang = %voice.lang, "voice selected"),
            None => tracing::info!(available = voices.len(), "no English voice, using default"),
        }
    }

    /// 読み上げる。前の発話は止めてから (キューには積まない)
    pub fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        if !self.backend.is_supported() {
            return Err(SpeechError::Unsupported);
        }
        if text.is_empty() {
            return Ok(());
        }

        self.backend.cancel();
        let utterance = Utterance {
            text: text.to_string(),
            voice: self.preferred_voice.clone(),
            lang: self.lang.clone(),
            rate: self.rate,
        };
        self.backend.speak(&utterance)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

// --------------------------------------------------
// バックエンド実装
// --------------------------------------------------

/// 読み上げ無効 (--no-speech やコマンドが無いとき)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSpeech;

impl SpeechBackend for NoSpeech {
    fn is_supported(&self) -> bool {
        false
    }

    fn cancel(&mut self) {}

    fn speak(&mut self, _utterance: &Utterance) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported)
    }
}

/// espeak-ng 互換のコマンドを子プロセスで起動する
#[derive(Debug)]
pub struct CommandSpeech {
    program: String,
    supported: bool,
    child: Option<Child>,
}

impl CommandSpeech {
    /// `--version` が通るかどうかで使えるか判定する
    pub fn detect(program: impl Into<String>) -> Self {
        let program = program.into();
        let supported = Command::new(&program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success());
        if !supported {
            tracing::warn!(%program, "speech program not found");
        }
        Self {
            program,
            supported,
            child: None,
        }
    }

    /// 声の一覧を取得する (ブロックするのでバックグラウンドスレッドで呼ぶ)
    pub fn list_voices(program: &str) -> Vec<Voice> {
        match Command::new(program).arg("--voices").output() {
            Ok(output) if output.status.success() => {
                parse_voice_list(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                tracing::warn!(%program, status = %output.status, "voice listing failed");
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(%program, error = %err, "voice listing failed");
                Vec::new()
            }
        }
    }
}

impl SpeechBackend for CommandSpeech {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            // 終了済みならエラーになるだけなので無視
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
        let child = Command::new(&self.program)
            .args(command_args(utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        self.child = Some(child);
        Ok(())
    }
}

/// `-v <声> -s <話速> -- <単語>`。"--" の後ろはオプション扱いされない
fn command_args(utterance: &Utterance) -> Vec<String> {
    let voice = utterance
        .voice
        .as_ref()
        .map_or(utterance.lang.as_str(), |v| v.lang.as_str());
    let words_per_minute = (BASE_WORDS_PER_MINUTE * utterance.rate).round() as u32;
    vec![
        "-v".to_string(),
        voice.to_string(),
        "-s".to_string(),
        words_per_minute.to_string(),
        "--".to_string(),
        utterance.text.clone(),
    ]
}

impl Drop for CommandSpeech {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// `espeak-ng --voices` の出力をパースする
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File          Other Languages
///  2  en-us           --/M      English_(America)  gmw/en-US     (en 10)
/// ```
pub fn parse_voice_list(text: &str) -> Vec<Voice> {
    text.lines()
        .skip(1) // ヘッダ行
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [_pty, lang, _age_gender, name, ..] => Some(Voice {
                    name: name.to_string(),
                    lang: lang.to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}
