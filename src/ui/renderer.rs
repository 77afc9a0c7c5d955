/// Terminal presentation: double-buffered, diff-flushed.
///
/// Each frame:
///   1. Compose the active scene (the track, when a course is running)
///   2. Compose the one visible UI panel on top, sized by its pop-in scale
///   3. Compose notification toasts along the bottom edge
///   4. Diff against the previous frame and emit only changed cells
///
/// Panels that are not attached simply draw nothing.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::classification::SceneKind;
use crate::domain::track::Tile;
use crate::sim::course::{Course, LevelManager};
use crate::sim::session::Session;
use super::panel::text;
use super::state::UiState;

// ── Cell ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Same RGB for clears and every cell, so row gaps never show through.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 24, b: 30 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Never produced by composing; forces a cell to be re-emitted.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn invalidate(&mut self) {
        self.cells.fill(Cell::INVALID);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for row in y..y + h {
            for col in x..x + w {
                self.set(col, row, Cell::new(' ', Color::White, bg));
            }
        }
    }

    /// Single-line frame around a filled box.
    fn frame(&mut self, x: usize, y: usize, w: usize, h: usize, fg: Color, bg: Color) {
        if w < 2 || h < 2 {
            return;
        }
        self.fill_rect(x, y, w, h, bg);
        for col in x + 1..x + w - 1 {
            self.set(col, y, Cell::new('─', fg, bg));
            self.set(col, y + h - 1, Cell::new('─', fg, bg));
        }
        for row in y + 1..y + h - 1 {
            self.set(x, row, Cell::new('│', fg, bg));
            self.set(x + w - 1, row, Cell::new('│', fg, bg));
        }
        self.set(x, y, Cell::new('┌', fg, bg));
        self.set(x + w - 1, y, Cell::new('┐', fg, bg));
        self.set(x, y + h - 1, Cell::new('└', fg, bg));
        self.set(x + w - 1, y + h - 1, Cell::new('┘', fg, bg));
    }

    /// Text centred in `[x, x + w)`, clipped to that span.
    fn put_centered(&mut self, x: usize, w: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        let clipped: String = s.chars().take(w).collect();
        let cx = x + w.saturating_sub(len) / 2;
        self.put_str(cx, y, &clipped, fg, bg);
    }
}

// ── Layout ──

/// Each track cell is two terminal columns.
const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const TRACK_ROW: usize = 4;

const GOLD: Color = Color::Rgb { r: 255, g: 200, b: 60 };
const GREEN: Color = Color::Rgb { r: 90, g: 230, b: 120 };
const SKY: Color = Color::Rgb { r: 110, g: 190, b: 255 };
const RED: Color = Color::Rgb { r: 240, g: 80, b: 80 };
const PANEL_BG: Color = Color::Rgb { r: 36, g: 44, b: 56 };
const TOAST_BG: Color = Color::Rgb { r: 200, g: 180, b: 60 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_state: Option<UiState>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_state: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        self.sync_size(true)?;
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn sync_size(&mut self, force: bool) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if force || tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.invalidate();
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }
        Ok(())
    }

    pub fn render(&mut self, session: &Session) -> io::Result<()> {
        self.sync_size(false)?;

        let ui = session.ui();
        if self.last_state != Some(ui.state()) {
            self.back.invalidate();
            self.last_state = Some(ui.state());
        }

        self.front.clear();

        if let Some(course) = session.course() {
            if ui.state() != UiState::MainMenu {
                self.compose_track(course);
            }
        }

        match ui.panels().visible() {
            Some(UiState::MainMenu) => self.compose_main_menu(session),
            Some(UiState::GamePlay) => self.compose_hud(session),
            Some(UiState::PauseMenu) => self.compose_pause(session),
            Some(UiState::LevelComplete) => self.compose_level_complete(session),
            None => {}
        }

        self.compose_notifications(session);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Scene ──

    fn compose_track(&mut self, course: &Course) {
        let track = course.track();
        let view_cells = (self.front.width / CELL_W).max(1);

        // Keep the ball in the middle third once the track is wider than the view.
        let first = if track.width() <= view_cells {
            0
        } else {
            let max_first = track.width() - view_cells;
            course.ball_x().saturating_sub(view_cells / 3).min(max_first)
        };
        let last = (first + view_cells).min(track.width());

        for (col, x) in (first..last).enumerate() {
            let sx = col * CELL_W;
            let (glyph, fg) = if x == course.ball_x() {
                ("●", Color::White)
            } else {
                match track.at(x) {
                    Tile::Empty => ("·", Color::DarkGrey),
                    Tile::Pickup => ("◆", GOLD),
                    Tile::Goal if course.goal_open() => ("▶", GREEN),
                    Tile::Goal => ("■", RED),
                }
            };
            self.front.put_str(sx, TRACK_ROW, glyph, fg, Color::Reset);
            for dx in 0..CELL_W {
                self.front.set(sx + dx, TRACK_ROW + 1, Cell::new('▔', Color::DarkGrey, Color::Reset));
            }
        }
    }

    // ── Panels ──

    fn compose_main_menu(&mut self, session: &Session) {
        let title = [
            r"  _         _ _          _ _ ",
            r" | |__  ___| | |_ _ ___ | | |",
            r" | '_ \/ _` | | | '_/ _ \| | |",
            r" |_.__/\__,_|_|_|_| \___/|_|_|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 1 + i, line, GOLD, Color::Reset);
        }

        let menu = 7;
        self.front.put_str(6, menu, "ENTER   New Game", GREEN, Color::Reset);
        self.front.put_str(6, menu + 1, "  Q     Quit", Color::White, Color::Reset);

        self.front.put_str(6, menu + 3, "Levels", GOLD, Color::Reset);
        let classifier = session.classifier();
        for (i, entry) in session.progression().entries().iter().enumerate() {
            let kind = match classifier.classify(&entry.scene_name) {
                SceneKind::Procedural => "procedural",
                SceneKind::Static => "",
                SceneKind::Unknown => "?",
            };
            let best = session
                .best_score(&entry.scene_name)
                .map(|s| format!("best {s}"))
                .unwrap_or_default();
            let line = format!("  {:<16} {:<11} {}", entry.label(), kind, best);
            self.front.put_str(6, menu + 4 + i, &line, Color::White, Color::Reset);
        }

        let help = menu + 5 + session.progression().len();
        self.front.put_str(6, help, "Controls", GOLD, Color::Reset);
        self.front.put_str(6, help + 1, "  ←→ / AD   Roll        P / ESC  Pause", Color::White, Color::Reset);
        self.front.put_str(6, help + 2, "  R         Retry       F        Finish level", Color::White, Color::Reset);
    }

    fn compose_hud(&mut self, session: &Session) {
        let Some(course) = session.course() else {
            return;
        };
        let ui = session.ui();
        let collected = text(&ui.labels().collected).unwrap_or("");
        let goal = if course.goal_open() { "GOAL OPEN" } else { "" };
        let hud = format!(
            " {}  Score:{:<6} {}  {} ",
            course.current_level().label(),
            course.score(),
            collected,
            goal
        );
        let w = self.front.width;
        self.front.fill_rect(0, HUD_ROW, w, 1, PANEL_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, PANEL_BG);
        if course.kind() == SceneKind::Procedural {
            let tag = format!(" ~ round layout ~ {} ", session.scene());
            self.front.put_str(0, HUD_ROW + 1, &tag, SKY, Color::Reset);
        }
    }

    fn compose_pause(&mut self, session: &Session) {
        let Some((x, y, w, h)) = self.scaled_box(session, UiState::PauseMenu, 32, 9) else {
            return;
        };
        self.front.frame(x, y, w, h, GOLD, PANEL_BG);
        self.front.put_centered(x, w, y + 1, "PAUSED", GOLD, PANEL_BG);
        let rows = ["P / ESC  Resume", "R        Retry level", "Q        Main menu"];
        for (i, row) in rows.iter().enumerate() {
            if y + 3 + i < y + h - 1 {
                self.front.put_centered(x, w, y + 3 + i, row, SKY, PANEL_BG);
            }
        }
    }

    fn compose_level_complete(&mut self, session: &Session) {
        let Some((x, y, w, h)) = self.scaled_box(session, UiState::LevelComplete, 44, 9) else {
            return;
        };
        let ui = session.ui();
        self.front.frame(x, y, w, h, GREEN, PANEL_BG);

        if let Some(message) = text(&ui.labels().completion) {
            self.front.put_centered(x, w, y + 2, message, GREEN, PANEL_BG);
        }
        if let Some(collected) = text(&ui.labels().collected) {
            self.front.put_centered(x, w, y + 4, collected, Color::White, PANEL_BG);
        }
        if let Some(hint) = text(&ui.labels().next_hint) {
            if h > 7 {
                self.front.put_centered(x, w, y + 6, hint, SKY, PANEL_BG);
            }
        }
    }

    /// Box of `full_w × full_h` centred under the track, shrunk by the
    /// panel's current scale.
    fn scaled_box(
        &self,
        session: &Session,
        state: UiState,
        full_w: usize,
        full_h: usize,
    ) -> Option<(usize, usize, usize, usize)> {
        let scale = session.ui().panels().get(state)?.scale();
        let w = ((full_w as f32 * scale).round() as usize).clamp(2, self.front.width.max(2));
        let h = ((full_h as f32 * scale).round() as usize).clamp(2, full_h);
        let x = self.front.width.saturating_sub(w) / 2;
        let y = TRACK_ROW + 3 + (full_h - h) / 2;
        Some((x, y, w, h))
    }

    fn compose_notifications(&mut self, session: &Session) {
        let ui = session.ui();
        let now = ui.now();
        let bottom = self.front.height;
        for (i, n) in ui.notifications().iter().rev().enumerate() {
            let Some(row) = bottom.checked_sub(1 + i) else {
                break;
            };
            if row <= TRACK_ROW + 1 {
                break;
            }
            let full = format!(" ◈ {} ", n.message);
            let shown = (full.chars().count() as f32 * n.scale(now)).ceil() as usize;
            let clipped: String = full.chars().take(shown).collect();
            self.front.fill_rect(0, row, clipped.chars().count(), 1, TOAST_BG);
            self.front.put_str(0, row, &clipped, Color::Black, TOAST_BG);
        }
    }
}
