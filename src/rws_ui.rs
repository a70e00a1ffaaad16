use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Span, Spans, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::{Frame, Terminal};
use std::io;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use unicode_width::UnicodeWidthStr;

use crate::rws_board::Board;
use crate::rws_color::{Depth, Palette};
use crate::rws_config::{Config, save_config};
use crate::rws_session::{GameSession, HudView, Outcome, SessionInput, SessionState};

/// Terminal columns taken by one board cell
const TILE_COLS: i32 = 2;
/// Upper bound on one frame's wait for input
const FRAME: Duration = Duration::from_millis(16);

const EXIT_HINT: &str = "Space: Restart   Esc: Exit";

pub fn run(cfg: &mut Config) -> Result<()> {
    let params = cfg.board_params().context("invalid board configuration")?;
    let palette = Palette::new(Depth::detect(), cfg.ascii_icons);
    let mut session = GameSession::new(
        params,
        cfg.flag_cooldown(),
        StdRng::from_entropy(),
        Instant::now(),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnableMouseCapture, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut session, cfg, &palette);

    // Always restore the terminal, even when the loop or one of these steps failed
    let raw = disable_raw_mode();
    let screen = execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        terminal::LeaveAlternateScreen
    );
    let cursor = terminal.show_cursor();
    settle(result, [raw, screen, cursor])
}

/// The loop's own error wins; otherwise the first failed teardown step
fn settle(result: Result<()>, teardown: [io::Result<()>; 3]) -> Result<()> {
    result?;
    for step in teardown {
        step.context("restoring the terminal")?;
    }
    Ok(())
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    session: &mut GameSession<StdRng>,
    cfg: &mut Config,
    palette: &Palette,
) -> Result<()> {
    let mut board_rect: Option<Rect> = None;

    loop {
        let hud = session.hud(Instant::now());
        let best = cfg.get_record(session.params()).map(|r| r.millis);
        terminal.draw(|f| board_rect = draw(f, session.board(), &hud, best, palette))?;

        // at most one input per frame
        let mut input = None;
        if event::poll(FRAME)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if should_quit(&key) {
                        info!("quit");
                        return Ok(());
                    }
                    if matches!(key.code, KeyCode::Char(' ') | KeyCode::F(2))
                        && session.state() != SessionState::Playing
                    {
                        input = Some(SessionInput::RestartRequested);
                    }
                }
                Event::Mouse(me) => input = board_rect.and_then(|r| mouse_input(me, r)),
                _ => {}
            }
        }

        if let Some(Outcome::Won { time }) = session.frame(Instant::now(), input) {
            if cfg.set_record(session.params(), time) {
                if let Err(e) = save_config(cfg) {
                    warn!("{:#}", e);
                }
            }
        }
    }
}

fn should_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Board cell under a screen position; positions off the board map to cells off the board
fn cell_at(column: u16, row: u16, board: Rect) -> (isize, isize) {
    let dx = column as i32 - (board.x as i32 + 1);
    let dy = row as i32 - (board.y as i32 + 1);
    (dx.div_euclid(TILE_COLS) as isize, dy as isize)
}

fn mouse_input(me: MouseEvent, board: Rect) -> Option<SessionInput> {
    let (x, y) = cell_at(me.column, me.row, board);
    match me.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(SessionInput::PrimaryClick { x, y }),
        MouseEventKind::Down(MouseButton::Right) => Some(SessionInput::SecondaryClick { x, y }),
        _ => None,
    }
}

/// Left-hand HUD text for the current state
fn status_text(hud: &HudView, best_millis: Option<u64>) -> String {
    match hud.state {
        SessionState::Playing => format!(
            " time: {:.3}   flags: {} ",
            hud.seconds, hud.flags_remaining
        ),
        SessionState::Lost => " BOMB!!! PRESS SPACE TO RESTART ".to_string(),
        SessionState::Won => {
            let best = best_millis
                .map(|ms| format!("   best: {:.3}", ms as f64 / 1000.0))
                .unwrap_or_default();
            format!(" YOU WIN! time is {:.3}{} ", hud.seconds, best)
        }
    }
}

/// Draw one frame; returns the board rectangle used for mouse mapping
fn draw<B: Backend>(
    f: &mut Frame<B>,
    board: &Board,
    hud: &HudView,
    best_millis: Option<u64>,
    palette: &Palette,
) -> Option<Rect> {
    let size = f.size();
    let board_w = board.width() as u16 * TILE_COLS as u16 + 3;
    let board_h = board.height() as u16 + 2;
    // If terminal too small, render a centered warning and skip the board
    if size.width < board_w || size.height < board_h + 3 {
        let warn_lines = vec![
            Spans::from(Span::raw("Terminal size too small.")),
            Spans::from(Span::raw(format!(
                "Minimum required: {} x {}",
                board_w,
                board_h + 3
            ))),
        ];
        let warn = Paragraph::new(Text::from(warn_lines))
            .block(Block::default().borders(Borders::ALL).title("Resize Terminal"))
            .alignment(Alignment::Center);
        f.render_widget(Clear, size);
        let area = center_rect(
            40u16.min(size.width.saturating_sub(2)),
            5u16.min(size.height.saturating_sub(2)),
            size,
        );
        f.render_widget(warn, area);
        return None;
    }

    // layout: board on top, status row below
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([Constraint::Min(board_h), Constraint::Length(3)].as_ref())
        .split(size);

    let board_area = center_rect(board_w, board_h, chunks[0]);
    let cell_bg = Style::default().bg(palette.board_bg);
    let mut lines = Vec::with_capacity(board.height());
    let mut spans = Vec::with_capacity(board.width() + 1);
    for tile in board.tiles() {
        let (glyph, fg) = palette.glyph(tile.kind);
        spans.push(Span::styled(format!(" {}", glyph), cell_bg.fg(fg)));
        if tile.x + 1 == board.width() {
            debug_assert_eq!(tile.y, lines.len());
            // right padding column in the board background
            spans.push(Span::styled(" ", cell_bg));
            lines.push(Spans::from(std::mem::take(&mut spans)));
        }
    }
    let title = format!("{}x{} / {} mines", board.width(), board.height(), board.mines());
    let paragraph = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_alignment(Alignment::Center),
    );
    f.render_widget(paragraph, board_area);

    // status row: state text on the left, key hints on the right
    let left = status_text(hud, best_millis);
    let left_style = match hud.state {
        SessionState::Playing => Style::default(),
        SessionState::Lost => Style::default().fg(palette.lost).add_modifier(Modifier::BOLD),
        SessionState::Won => Style::default().fg(palette.won).add_modifier(Modifier::BOLD),
    };
    let inner_w = chunks[1].width.saturating_sub(2) as usize;
    let used = left.as_str().width() + EXIT_HINT.width() + 1;
    let mid_spaces = inner_w.saturating_sub(used).max(1);
    let status = Paragraph::new(Spans::from(vec![
        Span::styled(left, left_style),
        Span::raw(" ".repeat(mid_spaces)),
        Span::raw(EXIT_HINT),
        Span::raw(" "),
    ]))
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Left);
    f.render_widget(status, chunks[1]);

    Some(board_area)
}

fn center_rect(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
