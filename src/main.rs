// ============================================
// src/main.rs (メインファイル)
// ============================================

use std::io::{Result, stdout};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use wordflip::app::{App, AppEvent, Background, Intent};
use wordflip::config::Cli;
use wordflip::gesture::SwipeTracker;
use wordflip::logging::{self, LogConfig};
use wordflip::session::Mode;
use wordflip::speech::{CommandSpeech, NoSpeech, PronunciationService, SpeechBackend};
use wordflip::ui;
use wordflip::words::WordBank;

use clap::Parser;
use crossterm::{
    ExecutableCommand,
    cursor::{Hide, Show},
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        MouseButton, MouseEventKind,
    },
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::prelude::*;

/// 演出 1 フレームの長さ
const TICK: Duration = Duration::from_millis(50);

// --------------------------------------------------
// メイン関数 (TUIセットアップと実行ループ)
// --------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose, cli.log_path());
    if let Err(err) = logging::init_logging(&log_config) {
        eprintln!("logging disabled: {err}");
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let animate = !cli.no_animation;

    // 単語データと声の一覧は別スレッドで取りに行く
    let (tx, rx) = mpsc::channel();
    spawn_word_loader(cli.words_path(), tx.clone());

    let mut terminal = setup_terminal()?;
    let result = if cli.no_speech {
        let speech = PronunciationService::new(NoSpeech, cli.voice_lang.clone(), cli.rate);
        run_app(&mut terminal, App::new(speech, rng, animate), &rx, cli.swipe_threshold)
    } else {
        let backend = CommandSpeech::detect(cli.speech_program.clone());
        if backend.is_supported() {
            spawn_voice_lookup(cli.speech_program.clone(), tx);
        }
        let speech = PronunciationService::new(backend, cli.voice_lang.clone(), cli.rate);
        run_app(&mut terminal, App::new(speech, rng, animate), &rx, cli.swipe_threshold)
    };
    // 実行ループが失敗しても端末は元に戻す
    restore_terminal(&mut terminal)?;
    tracing::info!("exiting");
    result
}

fn setup_terminal() -> Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?; // 代替スクリーンを使用
    stdout().execute(EnableMouseCapture)?; // スワイプ用
    stdout().execute(Hide)?; // カーソルを非表示
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

fn restore_terminal(_terminal: &mut Terminal<impl Backend>) -> Result<()> {
    stdout().execute(Show)?; // カーソルを再表示
    stdout().execute(DisableMouseCapture)?;
    stdout().execute(LeaveAlternateScreen)?; // 代替スクリーンを終了
    disable_raw_mode()?;
    Ok(())
}

fn spawn_word_loader(path: PathBuf, tx: Sender<Background>) {
    thread::spawn(move || {
        let result = WordBank::load(&path);
        // 受け手が先に終わっていたら捨てる
        let _ = tx.send(Background::WordsLoaded(result));
    });
}

fn spawn_voice_lookup(program: String, tx: Sender<Background>) {
    thread::spawn(move || {
        let voices = CommandSpeech::list_voices(&program);
        let _ = tx.send(Background::VoicesChanged(voices));
    });
}

fn run_app<S: SpeechBackend>(
    terminal: &mut Terminal<impl Backend>,
    mut app: App<S>,
    rx: &Receiver<Background>,
    swipe_threshold: u16,
) -> Result<()> {
    let mut swipe = SwipeTracker::new(swipe_threshold);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(message) = rx.try_recv() {
            app.handle_background(message);
        }
        for event in app.drain_events() {
            log_event(&event);
        }

        let mut screen = Rect::default();
        terminal.draw(|f| {
            screen = f.area();
            ui::draw(f, &app);
        })?;
        let card = ui::card_rect(screen);

        let timeout = TICK.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    match key_action(app.session().mode(), key.code) {
                        Some(Action::Quit) => break,
                        Some(Action::Run(intent)) => app.handle(intent),
                        None => {}
                    }
                }
                Event::Mouse(mouse) if app.session().mode() == Mode::Reviewing => {
                    let on_card = card.contains(Position::new(mouse.column, mouse.row));
                    match mouse.kind {
                        MouseEventKind::Down(MouseButton::Left) => {
                            swipe.press_at(mouse.column, on_card);
                        }
                        MouseEventKind::Up(MouseButton::Left) => {
                            if let Some(gesture) = swipe.release_at(mouse.column, on_card) {
                                app.handle(gesture.into());
                            }
                        }
                        _ => {}
                    }
                }
                Event::FocusLost => swipe.cancel(),
                _ => {}
            }
        }

        if last_tick.elapsed() >= TICK {
            app.tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

fn log_event(event: &AppEvent) {
    match event {
        AppEvent::CardChanged { word, reviewed } => {
            tracing::debug!(%word, reviewed, "card changed");
        }
        AppEvent::LoadFailed(reason) => tracing::debug!(%reason, "load failure shown"),
        AppEvent::SpeechUnsupported => tracing::info!("speech requested but unsupported"),
        AppEvent::SpeechFailed(reason) => tracing::debug!(%reason, "speech failure shown"),
    }
}

// --------------------------------------------------
// キー入力
// --------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    Run(Intent),
}

fn key_action(mode: Mode, code: KeyCode) -> Option<Action> {
    let intent = match (mode, code) {
        (_, KeyCode::Char('q')) => return Some(Action::Quit),

        (Mode::Selecting, KeyCode::Esc) => return Some(Action::Quit),
        (Mode::Selecting, KeyCode::Up | KeyCode::Char('k')) => Intent::MoveSelection(-1),
        (Mode::Selecting, KeyCode::Down | KeyCode::Char('j')) => Intent::MoveSelection(1),
        (Mode::Selecting, KeyCode::Enter) => Intent::SelectHighlighted,
        (Mode::Selecting, KeyCode::Char(c)) => {
            let stage = c.to_digit(10).filter(|n| *n >= 1)?;
            Intent::SelectStage(stage)
        }

        (Mode::Reviewing, KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b')) => {
            Intent::ReturnToSelection
        }
        (Mode::Reviewing, KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Up | KeyCode::Down) => {
            Intent::Flip
        }
        (Mode::Reviewing, KeyCode::Right | KeyCode::Char('l')) => Intent::Advance,
        (Mode::Reviewing, KeyCode::Left | KeyCode::Char('h')) => Intent::Retreat,
        (Mode::Reviewing, KeyCode::Char('c')) => Intent::ToggleReviewed,
        (Mode::Reviewing, KeyCode::Char('s')) => Intent::SpeakCurrent,

        _ => return None,
    };
    Some(Action::Run(intent))
}
