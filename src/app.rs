// ============================================
// src/app.rs
// アプリ全体の状態 (単語データ・セッション・読み上げ) をまとめて持つ
// ============================================

use std::error::Error;

use rand::rngs::StdRng;

use crate::gesture::{Gesture, Heading, Transition};
use crate::session::{Mode, Session};
use crate::speech::{PronunciationService, SpeechBackend, SpeechError, Voice};
use crate::words::{DataLoadError, StageId, WordBank};

/// 読み上げ中マークを出しておくフレーム数
const SPEAKING_TICKS: u8 = 10;

/// 単語データの読み込み状況
#[derive(Debug)]
pub enum LoadState {
    Loading,
    Ready(WordBank),
    Failed(String),
}

/// 画面から来る操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    SelectStage(StageId),
    /// 選択画面でハイライト中のステージに入る
    SelectHighlighted,
    /// 選択画面のカーソル移動 (+1 / -1)
    MoveSelection(isize),
    ReturnToSelection,
    Flip,
    Advance,
    Retreat,
    ToggleReviewed,
    SpeakCurrent,
}

impl From<Gesture> for Intent {
    fn from(gesture: Gesture) -> Self {
        match gesture {
            Gesture::Swipe(Heading::Next) => Intent::Advance,
            Gesture::Swipe(Heading::Prev) => Intent::Retreat,
            Gesture::Tap => Intent::Flip,
        }
    }
}

/// 画面へ通知するイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    CardChanged { word: String, reviewed: bool },
    LoadFailed(String),
    SpeechUnsupported,
    SpeechFailed(String),
}

/// バックグラウンドスレッドから届くメッセージ
#[derive(Debug)]
pub enum Background {
    WordsLoaded(Result<WordBank, DataLoadError>),
    VoicesChanged(Vec<Voice>),
}

/// 選択画面の 1 行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRow {
    pub stage: StageId,
    pub words: usize,
    pub reviewed: usize,
}

pub struct App<B> {
    load: LoadState,
    session: Session,
    speech: PronunciationService<B>,
    rng: StdRng,

    /// 裏面 (意味) を表示中か
    flipped: bool,
    transition: Transition,
    animate: bool,
    /// 選択画面のカーソル
    selected: usize,
    speaking_ticks: u8,

    /// ステータス行に出すメッセージ
    notice: Option<String>,
    events: Vec<AppEvent>,
}

impl<B: SpeechBackend> App<B> {
    pub fn new(speech: PronunciationService<B>, rng: StdRng, animate: bool) -> Self {
        Self {
            load: LoadState::Loading,
            session: Session::new(),
            speech,
            rng,
            flipped: false,
            transition: Transition::Idle,
            animate,
            selected: 0,
            speaking_ticks: 0,
            notice: None,
            events: Vec::new(),
        }
    }

    // --------------------------------------------------
    // 参照用
    // --------------------------------------------------

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking_ticks > 0
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn speech(&self) -> &PronunciationService<B> {
        &self.speech
    }

    /// 溜まったイベントを取り出す
    pub fn drain_events(&mut self) -> Vec<AppEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn stage_rows(&self) -> Vec<StageRow> {
        match &self.load {
            LoadState::Ready(bank) => bank
                .stages()
                .map(|(stage, words)| StageRow {
                    stage,
                    words,
                    reviewed: self.session.reviewed_count(stage),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    // --------------------------------------------------
    // バックグラウンドからの通知
    // --------------------------------------------------

    pub fn handle_background(&mut self, message: Background) {
        match message {
            Background::WordsLoaded(result) => self.words_loaded(result),
            Background::VoicesChanged(voices) => self.speech.voices_changed(&voices),
        }
    }

    pub fn words_loaded(&mut self, result: Result<WordBank, DataLoadError>) {
        match result {
            Ok(bank) => {
                if bank.is_empty() {
                    self.notice = Some("word data has no stages".to_string());
                }
                self.load = LoadState::Ready(bank);
            }
            Err(err) => {
                let reason = describe(&err);
                tracing::error!(%reason, "word data could not be loaded");
                self.notice = Some("Failed to load word data. Fix the file and restart.".to_string());
                self.events.push(AppEvent::LoadFailed(reason.clone()));
                self.load = LoadState::Failed(reason);
            }
        }
    }

    // --------------------------------------------------
    // 操作
    // --------------------------------------------------

    pub fn handle(&mut self, intent: Intent) {
        match intent {
            Intent::SelectStage(stage) => self.select_stage(stage),
            Intent::SelectHighlighted => {
                if let Some(row) = self.stage_rows().get(self.selected) {
                    self.select_stage(row.stage);
                }
            }
            Intent::MoveSelection(delta) => self.move_selection(delta),
            Intent::ReturnToSelection => {
                self.session.return_to_selection();
                self.flipped = false;
                self.transition = Transition::Idle;
            }
            Intent::Flip => {
                if self.session.current().is_some() && self.transition.is_idle() {
                    self.flipped = !self.flipped;
                }
            }
            Intent::Advance => self.navigate(Heading::Next),
            Intent::Retreat => self.navigate(Heading::Prev),
            Intent::ToggleReviewed => {
                if self.session.toggle_reviewed().is_some() {
                    self.emit_card_changed();
                }
            }
            Intent::SpeakCurrent => self.speak_current(),
        }
    }

    /// 1 フレーム進める (演出とマーク表示)
    pub fn tick(&mut self) {
        self.speaking_ticks = self.speaking_ticks.saturating_sub(1);
        if let Some(heading) = self.transition.tick() {
            self.apply_navigation(heading);
        }
    }

    fn select_stage(&mut self, stage: StageId) {
        let LoadState::Ready(bank) = &self.load else {
            // 読み込み前 / 失敗時は選べない
            tracing::debug!(stage, "stage selection ignored, word data not ready");
            return;
        };

        let words = match bank.words_for_stage(stage) {
            Ok(words) => words,
            Err(err) => {
                tracing::warn!(%err, "unknown stage requested");
                self.notice = Some(err.to_string());
                return;
            }
        };

        self.session.enter_stage(stage, words, &mut self.rng);
        self.flipped = false;
        self.transition = Transition::Idle;
        self.notice = None;
        if let Some(row) = self.stage_rows().iter().position(|row| row.stage == stage) {
            self.selected = row;
        }
        tracing::info!(stage, "stage started");
        self.emit_card_changed();
    }

    fn move_selection(&mut self, delta: isize) {
        let count = self.stage_rows().len();
        if count == 0 || self.session.mode() != Mode::Selecting {
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(count - 1);
    }

    fn navigate(&mut self, heading: Heading) {
        if self.session.current().is_none() {
            return;
        }
        if !self.animate {
            self.apply_navigation(heading);
        } else if !self.transition.begin(heading) {
            tracing::trace!(?heading, "navigation ignored during transition");
        }
    }

    fn apply_navigation(&mut self, heading: Heading) {
        let moved = match heading {
            Heading::Next => self.session.advance().is_some(),
            Heading::Prev => self.session.retreat().is_some(),
        };
        if moved {
            self.flipped = false;
            self.emit_card_changed();
        }
    }

    fn speak_current(&mut self) {
        if !self.speech.is_supported() {
            self.notice = Some("Speech is not supported on this system.".to_string());
            self.events.push(AppEvent::SpeechUnsupported);
            return;
        }
        let Some(word) = self.session.current_word().map(|record| record.word.clone()) else {
            return;
        };

        match self.speech.speak(&word) {
            Ok(()) => self.speaking_ticks = SPEAKING_TICKS,
            Err(SpeechError::Unsupported) => {
                self.notice = Some("Speech is not supported on this system.".to_string());
                self.events.push(AppEvent::SpeechUnsupported);
            }
            Err(err) => {
                let reason = describe(&err);
                tracing::warn!(%reason, "speech failed");
                self.notice = Some(reason.clone());
                self.events.push(AppEvent::SpeechFailed(reason));
            }
        }
    }

    fn emit_card_changed(&mut self) {
        if let Some(card) = self.session.current() {
            self.events.push(AppEvent::CardChanged {
                word: card.record.word.clone(),
                reviewed: card.reviewed,
            });
        }
    }
}

/// エラーを source までつなげて 1 行にする
fn describe(err: &dyn Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
