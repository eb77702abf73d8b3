// ============================================
// src/ui.rs
// 画面描画 (ステージ選択画面 / カード画面)
// ============================================

use std::rc::Rc;

use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::{App, LoadState};
use crate::session::{CardView, Mode};
use crate::speech::SpeechBackend;

const CARD_WIDTH: u16 = 44;
const CARD_HEIGHT: u16 = 9;

pub fn draw<B: SpeechBackend>(f: &mut Frame, app: &App<B>) {
    let size = f.area();
    // 枠線を描画
    let block = Block::default().borders(Borders::ALL).title("Word Flip !");
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    match app.session().mode() {
        Mode::Selecting => draw_selection(f, app, inner_area),
        Mode::Reviewing => draw_cards(f, app, inner_area),
    }
}

// --------------------------------------------------
// ステージ選択
// --------------------------------------------------

fn draw_selection<B: SpeechBackend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // [0] 見出し
            Constraint::Min(1),    // [1] ステージ一覧
            Constraint::Length(1), // [2] お知らせ
            Constraint::Length(1), // [3] 操作説明
        ])
        .split(area);

    f.render_widget(
        Paragraph::new("Choose a stage")
            .style(Style::default().fg(Color::White).bold())
            .centered(),
        chunks[0],
    );

    let lines: Vec<Line> = match app.load_state() {
        LoadState::Loading => vec![Line::from("Loading word data...").fg(Color::Gray)],
        LoadState::Failed(reason) => vec![
            Line::from("Word data is unavailable.").fg(Color::Red),
            Line::from(reason.as_str()).fg(Color::Gray),
        ],
        LoadState::Ready(_) => app
            .stage_rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let text = format!(
                    "Stage {:<3} {:>4} words   {:>4} reviewed",
                    row.stage, row.words, row.reviewed
                );
                if i == app.selected() {
                    Line::from(format!("> {text}")).style(Style::default().fg(Color::Black).bg(Color::White))
                } else {
                    Line::from(format!("  {text}")).style(Style::default().fg(Color::Gray))
                }
            })
            .collect(),
    };
    f.render_widget(Paragraph::new(lines).centered(), chunks[1]);

    draw_notice(f, app, chunks[2]);
    f.render_widget(
        Paragraph::new("↑/↓ move  Enter/1-9 start  q quit")
            .style(Style::default().fg(Color::DarkGray))
            .centered(),
        chunks[3],
    );
}

// --------------------------------------------------
// カード画面
// --------------------------------------------------

fn card_chunks(area: Rect) -> Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] ステージ / 進み具合
            Constraint::Length(1), // [1] 空白
            Constraint::Min(CARD_HEIGHT), // [2] カード
            Constraint::Length(1), // [3] お知らせ
            Constraint::Length(1), // [4] 操作説明
        ])
        .split(area)
}

/// 止まっているときのカードの位置 (マウス判定用)
pub fn card_rect(screen: Rect) -> Rect {
    let inner = Block::default().borders(Borders::ALL).inner(screen);
    centered(card_chunks(inner)[2], CARD_WIDTH, CARD_HEIGHT)
}

fn draw_cards<B: SpeechBackend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let chunks = card_chunks(area);

    let Some(card) = app.session().current() else {
        f.render_widget(
            Paragraph::new("This stage has no words.  (b: back)")
                .style(Style::default().fg(Color::Yellow))
                .centered(),
            chunks[2],
        );
        return;
    };

    f.render_widget(status_line(&card, app.is_speaking()), chunks[0]);

    let card_area = shifted(
        centered(chunks[2], CARD_WIDTH, CARD_HEIGHT),
        app.transition().offset(),
        chunks[2],
    );
    f.render_widget(card_widget(&card, app.is_flipped()), card_area);

    draw_notice(f, app, chunks[3]);
    f.render_widget(
        Paragraph::new("Space flip  ←/→ move  c check  s speak  b back  q quit")
            .style(Style::default().fg(Color::DarkGray))
            .centered(),
        chunks[4],
    );
}

fn status_line(card: &CardView<'_>, speaking: bool) -> Paragraph<'static> {
    let check = if card.reviewed {
        Span::styled("[✔] reviewed", Style::default().fg(Color::Green))
    } else {
        Span::styled("[ ] reviewed", Style::default().fg(Color::DarkGray))
    };
    let mut spans = vec![
        Span::styled(format!("Stage {}", card.stage), Style::default().fg(Color::Magenta).bold()),
        Span::raw(format!("   {} / {}   ", card.position + 1, card.len)),
        check,
    ];
    if speaking {
        spans.push(Span::styled("   ♪", Style::default().fg(Color::Yellow)));
    }
    Paragraph::new(Line::from(spans)).centered()
}

/// 表: 単語 / 裏: 2 種類の意味
fn card_widget<'a>(card: &CardView<'a>, flipped: bool) -> Paragraph<'a> {
    let border_color = if card.reviewed { Color::Green } else { Color::White };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let lines = if flipped {
        vec![
            Line::from(""),
            Line::from(Span::styled("Programming", Style::default().fg(Color::Cyan))),
            Line::from(card.record.prog.as_str()),
            Line::from(""),
            Line::from(Span::styled("Dictionary", Style::default().fg(Color::Cyan))),
            Line::from(card.record.dict.as_str()),
        ]
    } else {
        vec![
            Line::from(""),
            Line::from(""),
            Line::from(""),
            Line::from(card.record.word.as_str()).style(Style::default().fg(Color::White).bold()),
        ]
    };

    Paragraph::new(lines)
        .block(block)
        .centered()
        .wrap(Wrap { trim: true })
}

fn draw_notice<B: SpeechBackend>(f: &mut Frame, app: &App<B>, area: Rect) {
    if let Some(notice) = app.notice() {
        f.render_widget(
            Paragraph::new(notice)
                .style(Style::default().fg(Color::Yellow))
                .centered(),
            area,
        );
    }
}

/// area の中央に width x height の矩形を取る
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// 横にずらす (bounds からははみ出さない)
fn shifted(rect: Rect, offset: i32, bounds: Rect) -> Rect {
    let min_x = i32::from(bounds.x);
    let max_x = i32::from(bounds.x + bounds.width - rect.width);
    let x = (i32::from(rect.x) + offset).clamp(min_x, max_x);
    Rect {
        x: u16::try_from(x).unwrap_or(rect.x),
        ..rect
    }
}
