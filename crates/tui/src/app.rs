use std::{cmp, io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use seatbook_core::{
    booking::{BookingError, BookingSession, Notice, PendingBooking},
    catalog::{find_movie, list_movies, Movie, MovieId},
    seat::{SeatIndex, COLS, ROWS},
    storage::Storage,
    view::{project, BookingView, SeatCell, SeatStatus},
};
use tokio::sync::mpsc;
use tracing::{error, info};

const TICK_RATE: Duration = Duration::from_millis(250);
const SEAT_WIDTH: u16 = 4;
const SEAT_GAP: u16 = 1;
const ROW_LABEL_WIDTH: u16 = 2;
const BOOK_BUTTON: &str = "[ Book ]";

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    success: Color,
    warning: Color,
    on_accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            on_accent: Color::Black,
        }
    }
}

impl Theme {
    fn movie_color(&self, movie: &Movie) -> Color {
        parse_hex_color(movie.accent).unwrap_or(self.accent)
    }

    fn seat_style(&self, status: SeatStatus) -> Style {
        match status {
            SeatStatus::Available => Style::default().fg(self.primary_fg),
            SeatStatus::Selected => Style::default()
                .fg(self.on_accent)
                .bg(self.accent)
                .add_modifier(Modifier::BOLD),
            SeatStatus::Occupied => Style::default()
                .fg(self.muted)
                .add_modifier(Modifier::CROSSED_OUT),
        }
    }
}

fn parse_hex_color(input: &str) -> Option<Color> {
    let hex = input.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

enum AppEvent {
    Input(Event),
    Tick,
}

#[derive(Debug, Clone)]
enum Modal {
    Confirm(PendingBooking),
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Seat(SeatIndex),
    Movie(MovieId),
    Book,
}

/// Terminal frontend for a [`BookingSession`].
pub struct SeatbookApp<S> {
    session: BookingSession<S>,
    state: UiState,
    modal: Option<Modal>,
    theme: Theme,
}

impl<S: Storage> SeatbookApp<S> {
    pub fn new(session: BookingSession<S>) -> Self {
        Self {
            session,
            state: UiState::default(),
            modal: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let booked = self
            .session
            .state()
            .occupancy()
            .count(self.session.state().selected_movie().id);
        self.state.set_status(format!(
            "Loaded {} movies, {booked} seats already booked for {}",
            list_movies().len(),
            self.session.state().selected_movie().title
        ));

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) || self.state.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        info!("Seatbook closed");
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    error!(?err, "Input handling failed");
                    self.state.set_status(format!("Error: {err:#}"));
                }
                true
            }
            Some(AppEvent::Tick) => true,
            None => false,
        }
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                if self.modal.is_some() {
                    self.handle_modal_key(key)
                } else {
                    self.handle_key(key)
                }
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => Ok(()),
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.modal.take() {
            Some(Modal::Confirm(pending)) => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.finish_booking(pending)?;
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.state.set_status("Booking cancelled".to_string());
                }
                _ => self.modal = Some(Modal::Confirm(pending)),
            },
            Some(Modal::Notice(_)) | None => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.state.should_quit = true;
            }
            KeyCode::Left | KeyCode::Char('h') => self.state.move_cursor(0, -1),
            KeyCode::Right | KeyCode::Char('l') => self.state.move_cursor(0, 1),
            KeyCode::Up | KeyCode::Char('k') => self.state.move_cursor(-1, 0),
            KeyCode::Down | KeyCode::Char('j') => self.state.move_cursor(1, 0),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_seat(self.state.cursor),
            KeyCode::Tab => self.cycle_movie(1),
            KeyCode::BackTab => self.cycle_movie(-1),
            KeyCode::Char('b') | KeyCode::Char('B') => self.start_booking(),
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                let position = ch.to_digit(10).unwrap_or(0) as usize;
                if let Some(movie) = position.checked_sub(1).and_then(|idx| list_movies().get(idx)) {
                    self.select_movie(movie.id);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return Ok(());
        }
        match self.modal {
            Some(Modal::Notice(_)) => {
                self.modal = None;
                return Ok(());
            }
            Some(Modal::Confirm(_)) => return Ok(()),
            None => {}
        }
        match self.state.target_at(mouse.column, mouse.row) {
            Some(Target::Seat(seat)) => {
                self.state.cursor = seat;
                self.toggle_seat(seat);
            }
            Some(Target::Movie(id)) => self.select_movie(id),
            Some(Target::Book) => self.start_booking(),
            None => {}
        }
        Ok(())
    }

    fn select_movie(&mut self, id: MovieId) {
        if self.session.select_movie(id) {
            let movie = self.session.state().selected_movie();
            self.state.set_status(format!("Now showing {}", movie.title));
        }
    }

    fn cycle_movie(&mut self, delta: isize) {
        let movies = list_movies();
        let current = self.session.state().selected_movie().id;
        let position = movies
            .iter()
            .position(|movie| movie.id == current)
            .unwrap_or(0) as isize;
        let next = (position + delta).rem_euclid(movies.len() as isize) as usize;
        self.select_movie(movies[next].id);
    }

    fn toggle_seat(&mut self, seat: SeatIndex) {
        if self.session.state().is_occupied(seat) {
            self.state
                .set_status(format!("Seat {seat} is already booked"));
            return;
        }
        let selected = self.session.toggle_seat(seat);
        let verb = if selected { "Selected" } else { "Released" };
        self.state.set_status(format!("{verb} seat {seat}"));
    }

    fn start_booking(&mut self) {
        match self.session.begin_booking() {
            Ok(pending) => self.modal = Some(Modal::Confirm(pending)),
            Err(err) => {
                self.state.set_status(err.to_string());
                self.modal = Some(Modal::Notice(Notice::Warning(err.to_string())));
            }
        }
    }

    fn finish_booking(&mut self, pending: PendingBooking) -> Result<()> {
        match self.session.complete_booking(pending) {
            Ok(receipt) => {
                let message = receipt.message(self.session.currency());
                self.state.set_status(message.clone());
                self.modal = Some(Modal::Notice(Notice::Success(message)));
                Ok(())
            }
            Err(err @ BookingError::StaleBooking) => {
                self.modal = Some(Modal::Notice(Notice::Warning(err.to_string())));
                Ok(())
            }
            Err(err) => {
                let err = anyhow::Error::new(err);
                self.modal = Some(Modal::Notice(Notice::Warning(format!("{err:#}"))));
                Err(err)
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let view = project(self.session.state(), self.session.currency());
        self.state.hits.clear();

        let area = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(view.options.len() as u16 + 2),
                Constraint::Length(3),
                Constraint::Min(ROWS as u16 + 4),
                Constraint::Length(3),
                Constraint::Length(4),
            ])
            .split(area);

        self.render_header(frame, layout[0], &view);
        self.render_selector(frame, layout[1], &view);
        self.render_legend(frame, layout[2], &view);
        self.render_theater(frame, layout[3], &view);
        self.render_summary(frame, layout[4], &view);
        self.render_status(frame, layout[5]);

        match &self.modal {
            Some(Modal::Confirm(pending)) => self.render_confirm(frame, pending),
            Some(Modal::Notice(notice)) => self.render_notice(frame, notice),
            None => {}
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, view: &BookingView) {
        let line = Line::from(vec![
            Span::styled(
                "Seatbook",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" · Now showing: "),
            Span::styled(
                view.movie.title,
                Style::default()
                    .fg(self.theme.movie_color(view.movie))
                    .add_modifier(Modifier::BOLD),
            ),
        ]);
        let paragraph = Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_selector(&mut self, frame: &mut Frame, area: Rect, view: &BookingView) {
        let block = Block::default().borders(Borders::ALL).title("Movie");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        for (idx, option) in view.options.iter().enumerate() {
            let y = inner.y + idx as u16;
            if y >= inner.y + inner.height {
                break;
            }
            let marker = if option.selected { "▶ " } else { "  " };
            let mut style = Style::default().fg(self.theme.primary_fg);
            if option.selected {
                if let Some(movie) = find_movie(option.id) {
                    style = style
                        .fg(self.theme.movie_color(movie))
                        .add_modifier(Modifier::BOLD);
                }
            }
            let line = Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{}. ", idx + 1), Style::default().fg(self.theme.muted)),
                Span::styled(option.label.clone(), style),
            ]);
            let row = Rect::new(inner.x, y, inner.width, 1);
            frame.render_widget(Paragraph::new(line), row);
            self.state.hits.push((row, Target::Movie(option.id)));
        }
    }

    fn render_legend(&self, frame: &mut Frame, area: Rect, view: &BookingView) {
        let mut spans = Vec::new();
        for status in view.legend {
            if !spans.is_empty() {
                spans.push(Span::raw("    "));
            }
            spans.push(Span::styled("[  ]", self.theme.seat_style(status)));
            spans.push(Span::raw(format!(" {}", status.label())));
        }
        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("Legend"))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_theater(&mut self, frame: &mut Frame, area: Rect, view: &BookingView) {
        let block = Block::default().borders(Borders::ALL).title("Theater");
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let grid_width =
            ROW_LABEL_WIDTH + COLS as u16 * SEAT_WIDTH + (COLS as u16 - 1) * SEAT_GAP;
        let screen_width = cmp::min(grid_width, inner.width);
        let screen_x = inner.x + inner.width.saturating_sub(screen_width) / 2;
        let screen = Paragraph::new(Span::styled(
            "SCREEN",
            Style::default()
                .fg(self.theme.on_accent)
                .bg(self.theme.muted)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .style(Style::default().bg(self.theme.muted));
        frame.render_widget(screen, Rect::new(screen_x, inner.y, screen_width, 1));

        let x0 = inner.x + inner.width.saturating_sub(grid_width) / 2;
        let right = inner.x + inner.width;
        let bottom = inner.y + inner.height;
        for (row_idx, row) in view.rows().enumerate() {
            let y = inner.y + 2 + row_idx as u16;
            if y >= bottom {
                break;
            }
            let label = char::from(b'A' + row_idx as u8).to_string();
            frame.render_widget(
                Paragraph::new(Span::styled(label, Style::default().fg(self.theme.muted))),
                Rect::new(x0, y, 1, 1),
            );
            for cell in row {
                let x = x0 + ROW_LABEL_WIDTH + cell.seat.col() as u16 * (SEAT_WIDTH + SEAT_GAP);
                if x + SEAT_WIDTH > right {
                    break;
                }
                let rect = Rect::new(x, y, SEAT_WIDTH, 1);
                self.render_seat(frame, rect, cell);
                if cell.clickable {
                    self.state.hits.push((rect, Target::Seat(cell.seat)));
                }
            }
        }
    }

    fn render_seat(&self, frame: &mut Frame, rect: Rect, cell: &SeatCell) {
        let mut style = self.theme.seat_style(cell.status);
        if cell.seat == self.state.cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let text = format!("{:^width$}", cell.seat.label(), width = SEAT_WIDTH as usize);
        frame.render_widget(Paragraph::new(Span::styled(text, style)), rect);
    }

    fn render_summary(&mut self, frame: &mut Frame, area: Rect, view: &BookingView) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Min(10),
                Constraint::Length(BOOK_BUTTON.len() as u16 + 2),
            ])
            .split(area);

        let summary = Paragraph::new(view.summary.text())
            .block(Block::default().borders(Borders::ALL).title("Summary"))
            .wrap(Wrap { trim: true });
        frame.render_widget(summary, chunks[0]);

        let button_style = if view.summary.seat_count > 0 {
            Style::default()
                .fg(self.theme.on_accent)
                .bg(self.theme.success)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.theme.muted)
        };
        let button = Paragraph::new(Span::styled(BOOK_BUTTON, button_style))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        frame.render_widget(button, chunks[1]);
        self.state.hits.push((chunks[1], Target::Book));
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let help = Line::from(vec![
            Span::styled("←↑↓→", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" move  "),
            Span::styled("Space", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" toggle  "),
            Span::styled("Tab/1-3", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" movie  "),
            Span::styled("b", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" book  "),
            Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" quit"),
        ]);
        let paragraph = Paragraph::new(vec![Line::from(self.state.status.clone()), help])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_confirm(&self, frame: &mut Frame, pending: &PendingBooking) {
        let mut lines: Vec<Line> = pending
            .prompt(self.session.currency())
            .lines()
            .map(|line| Line::from(line.to_string()))
            .collect();
        let seats: Vec<String> = pending.seats().iter().map(|seat| seat.label()).collect();
        lines.push(Line::from(Span::styled(
            format!("Seats: {}", seats.join(", ")),
            Style::default().fg(self.theme.muted),
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" confirm  "),
            Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]));
        self.render_modal(frame, "Confirm booking", self.theme.accent, lines);
    }

    fn render_notice(&self, frame: &mut Frame, notice: &Notice) {
        let (title, color) = match notice {
            Notice::Warning(_) => ("Notice", self.theme.warning),
            Notice::Success(_) => ("Booked", self.theme.success),
        };
        let lines = vec![
            Line::from(Span::styled(
                notice.message().to_string(),
                Style::default().fg(color),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press any key",
                Style::default().fg(self.theme.muted),
            )),
        ];
        self.render_modal(frame, title, color, lines);
    }

    fn render_modal(&self, frame: &mut Frame, title: &str, color: Color, lines: Vec<Line>) {
        let frame_area = frame.size();
        let mut width = cmp::min(60_u16, frame_area.width.saturating_sub(4));
        width = cmp::max(width, 24_u16).min(frame_area.width);
        let height = (lines.len() as u16 + 2).min(frame_area.height);
        let x = frame_area.x + (frame_area.width.saturating_sub(width)) / 2;
        let y = frame_area.y + (frame_area.height.saturating_sub(height)) / 2;
        let area = Rect::new(x, y, width, height);

        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .title(title.to_string()),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    cursor: SeatIndex,
    status: String,
    should_quit: bool,
    hits: Vec<(Rect, Target)>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            cursor: SeatIndex::FIRST,
            status: "Ready".to_string(),
            should_quit: false,
            hits: Vec::new(),
        }
    }
}

impl UiState {
    fn move_cursor(&mut self, delta_row: isize, delta_col: isize) {
        let row = (self.cursor.row() as isize + delta_row).clamp(0, ROWS as isize - 1);
        let col = (self.cursor.col() as isize + delta_col).clamp(0, COLS as isize - 1);
        if let Some(seat) = SeatIndex::from_position(row as usize, col as usize) {
            self.cursor = seat;
        }
    }

    fn set_status(&mut self, message: String) {
        self.status = format!("[{}] {message}", Local::now().format("%H:%M:%S"));
    }

    fn target_at(&self, column: u16, row: u16) -> Option<Target> {
        self.hits
            .iter()
            .find(|(rect, _)| {
                column >= rect.x
                    && column < rect.x + rect.width
                    && row >= rect.y
                    && row < rect.y + rect.height
            })
            .map(|(_, target)| *target)
    }
}
