// Game session: owns the live board, its timer and the flag cooldown
// The presentation layer feeds it one frame at a time

use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use crate::rws_board::{Board, BoardParams, RevealResult};

/// Default cooldown between accepted flag toggles
pub const FLAG_COOLDOWN: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Playing,
    Lost,
    Won,
}

/// Discrete input from the presentation layer, already mapped to board cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInput {
    PrimaryClick { x: isize, y: isize },
    SecondaryClick { x: isize, y: isize },
    RestartRequested,
}

/// A transition out of Playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won { time: Duration },
    Lost,
}

/// Session-level render descriptor for the HUD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HudView {
    pub state: SessionState,
    pub seconds: f64,          // Running time while playing, frozen afterwards
    pub flags_remaining: isize,
}

pub struct GameSession<R: Rng> {
    params: BoardParams,
    flag_cooldown: Duration,
    rng: R,
    board: Board,
    state: SessionState,
    start: Instant,
    final_time: Option<Duration>,
    last_flag_at: Option<Instant>,
}

impl<R: Rng> GameSession<R> {
    /// Generate the first board and start playing at `now`
    pub fn new(params: BoardParams, flag_cooldown: Duration, mut rng: R, now: Instant) -> Self {
        let board = Board::generate(&params, &mut rng);
        info!(
            width = params.width(),
            height = params.height(),
            mines = params.mines(),
            "session started"
        );
        GameSession {
            params,
            flag_cooldown,
            rng,
            board,
            state: SessionState::Playing,
            start: now,
            final_time: None,
            last_flag_at: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn params(&self) -> &BoardParams {
        &self.params
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Time on the clock: live while playing, frozen once the game ends
    pub fn elapsed(&self, now: Instant) -> Duration {
        self.final_time
            .unwrap_or_else(|| now.saturating_duration_since(self.start))
    }

    pub fn hud(&self, now: Instant) -> HudView {
        HudView {
            state: self.state,
            seconds: self.elapsed(now).as_secs_f64(),
            flags_remaining: self.board.flags_remaining(),
        }
    }

    /// One frame: the win check runs before the frame's input
    pub fn frame(&mut self, now: Instant, input: Option<SessionInput>) -> Option<Outcome> {
        if let Some(outcome) = self.tick(now) {
            return Some(outcome);
        }
        match input? {
            SessionInput::PrimaryClick { x, y } => self.on_primary_action(x, y, now),
            SessionInput::SecondaryClick { x, y } => {
                self.on_secondary_action(x, y, now);
                None
            }
            SessionInput::RestartRequested => {
                self.on_restart_requested(now);
                None
            }
        }
    }

    /// Promote a playing session to Won once the board satisfies the win rule
    pub fn tick(&mut self, now: Instant) -> Option<Outcome> {
        if self.state != SessionState::Playing || !self.board.check_win() {
            return None;
        }
        let time = self.finish(SessionState::Won, now);
        info!(
            seconds = time.as_secs_f64(),
            flags = self.board.flagged_count(),
            "won"
        );
        Some(Outcome::Won { time })
    }

    /// Reveal; hitting a mine loses the game
    pub fn on_primary_action(&mut self, x: isize, y: isize, now: Instant) -> Option<Outcome> {
        if self.state != SessionState::Playing {
            trace!(x, y, state = ?self.state, "reveal ignored");
            return None;
        }
        match self.board.reveal(x, y, &mut self.rng) {
            RevealResult::Mine => {
                self.finish(SessionState::Lost, now);
                info!(x, y, revealed = self.board.revealed_count(), "stepped on a mine");
                Some(Outcome::Lost)
            }
            RevealResult::Safe { opened } => {
                debug!(x, y, opened, "cascade");
                None
            }
            RevealResult::Ignored => None,
        }
    }

    /// Toggle a flag unless the previous toggle is still cooling down
    pub fn on_secondary_action(&mut self, x: isize, y: isize, now: Instant) -> bool {
        if self.state != SessionState::Playing {
            trace!(x, y, state = ?self.state, "flag ignored");
            return false;
        }
        if let Some(last) = self.last_flag_at {
            if now.saturating_duration_since(last) < self.flag_cooldown {
                trace!(x, y, "flag cooling down");
                return false;
            }
        }
        // only an accepted toggle starts the cooldown
        if !self.board.toggle_flag(x, y) {
            return false;
        }
        self.last_flag_at = Some(now);
        true
    }

    /// Discard a finished board and start over
    pub fn on_restart_requested(&mut self, now: Instant) -> bool {
        if self.state == SessionState::Playing {
            return false;
        }
        self.board = Board::generate(&self.params, &mut self.rng);
        self.state = SessionState::Playing;
        self.start = now;
        self.final_time = None;
        self.last_flag_at = None;
        info!("session restarted");
        true
    }

    fn finish(&mut self, state: SessionState, now: Instant) -> Duration {
        let time = now.saturating_duration_since(self.start);
        self.state = state;
        self.final_time = Some(time);
        time
    }
}
