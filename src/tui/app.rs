//! Main application logic for the terminal user interface.
//!
//! This module contains the `App` struct which owns the session, handles
//! user input, renders the interface, and folds finished completion
//! workflows into the list on every tick.

use std::io;
use std::time::Duration;

use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use crate::fields::{FollowUpSource, Status};
use crate::session::{AppliedFollowUps, Session};
use crate::store::{format_age, format_status};
use crate::task::Task;
use crate::tui::{
    colors::{pastel_for, PINK, PURPLE, SLATE},
    enums::{AppState, InputMode},
    input::InputField,
    task_form::{TaskForm, DESCRIPTION_FIELD},
    utils::centered_rect,
};

/// Main application state for the terminal user interface.
pub struct App {
    state: AppState,
    session: Session,
    task_list_state: TableState,
    visible_tasks: Vec<u64>,
    selected_task: Option<u64>,
    task_form: TaskForm,
    input_mode: InputMode,
    status_message: String,
    show_completed: bool,
}

impl App {
    /// Create a new App around a session.
    pub fn new(session: Session) -> Self {
        let mut app = App {
            state: AppState::TaskList,
            session,
            task_list_state: TableState::default(),
            visible_tasks: Vec::new(),
            selected_task: None,
            task_form: TaskForm::new(),
            input_mode: InputMode::None,
            status_message: String::new(),
            show_completed: true,
        };
        app.update_visible_tasks();
        app
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Recompute which tasks the list shows, keeping the selection where possible.
    fn update_visible_tasks(&mut self) {
        let old_idx = self.task_list_state.selected();
        let old_id = old_idx.and_then(|idx| self.visible_tasks.get(idx)).copied();

        self.visible_tasks = self
            .session
            .store()
            .tasks()
            .iter()
            .filter(|t| self.show_completed || t.status != Status::Completed)
            .map(|t| t.id)
            .collect();

        let new_idx = if self.visible_tasks.is_empty() {
            None
        } else if let Some(pos) =
            old_id.and_then(|id| self.visible_tasks.iter().position(|&v| v == id))
        {
            Some(pos)
        } else {
            Some(old_idx.unwrap_or(0).min(self.visible_tasks.len() - 1))
        };
        self.task_list_state.select(new_idx);
    }

    fn highlighted_id(&self) -> Option<u64> {
        self.task_list_state
            .selected()
            .and_then(|idx| self.visible_tasks.get(idx))
            .copied()
    }

    /// Get a reference to the task shown in the detail view.
    fn get_selected_task(&self) -> Option<&Task> {
        self.selected_task.and_then(|id| self.session.store().get(id))
    }

    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
    }

    /// Complete a task and report what happened in the status bar.
    fn complete_task(&mut self, id: u64) {
        if self.session.complete_task(id) {
            self.set_status_message(format!(
                "Task {} completed. Its replacements are on their way...",
                id
            ));
        } else {
            self.set_status_message(format!("Task {} is already done", id));
        }
        self.update_visible_tasks();
    }

    /// Apply any follow-ups that arrived since the last tick.
    pub fn tick(&mut self) {
        let applied = self.session.apply_finished();
        if applied.is_empty() {
            return;
        }
        self.update_visible_tasks();
        self.set_status_message(describe_follow_ups(&applied));
    }

    fn select_offset(&mut self, delta: isize) {
        if self.visible_tasks.is_empty() {
            return;
        }
        let last = self.visible_tasks.len() - 1;
        let current = self.task_list_state.selected().unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(last);
        self.task_list_state.select(Some(next));
    }

    /// Handle keyboard input when in the task list view.
    ///
    /// Returns true if the application should quit.
    fn handle_task_list_input(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> io::Result<bool> {
        match key {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Up | KeyCode::Char('k') => self.select_offset(-1),
            KeyCode::Down | KeyCode::Char('j') => self.select_offset(1),
            KeyCode::Home => self.select_offset(isize::MIN),
            KeyCode::End => self.select_offset(isize::MAX),
            KeyCode::Enter => {
                if let Some(id) = self.highlighted_id() {
                    self.selected_task = Some(id);
                    self.state = AppState::TaskDetail;
                }
            }
            KeyCode::Char('a') => {
                self.task_form.reset();
                self.input_mode = InputMode::Text;
                self.state = AppState::AddTask;
            }
            KeyCode::Char('c') | KeyCode::Char(' ') => match self.highlighted_id() {
                Some(id) => self.complete_task(id),
                None => self.set_status_message("No task selected".to_string()),
            },
            KeyCode::Char('t') => {
                self.show_completed = !self.show_completed;
                self.update_visible_tasks();
                self.set_status_message(if self.show_completed {
                    "Showing completed tasks".to_string()
                } else {
                    "Hiding completed tasks".to_string()
                });
            }
            KeyCode::Char('h') | KeyCode::F(1) => self.state = AppState::Help,
            _ => {}
        }
        Ok(false)
    }

    fn handle_detail_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> io::Result<bool> {
        match key {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Backspace => {
                self.state = AppState::TaskList;
            }
            KeyCode::Char('c') | KeyCode::Char(' ') => {
                if let Some(id) = self.selected_task {
                    self.complete_task(id);
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_form_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> io::Result<bool> {
        match key {
            KeyCode::Esc => {
                self.input_mode = InputMode::None;
                self.state = AppState::TaskList;
                self.set_status_message("Cancelled".to_string());
            }
            KeyCode::Enter => self.create_task(),
            KeyCode::Tab | KeyCode::Down => self.task_form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.task_form.previous_field(),
            KeyCode::Left => self.task_form.active_input().move_cursor_left(),
            KeyCode::Right => self.task_form.active_input().move_cursor_right(),
            KeyCode::Home => self.task_form.active_input().move_cursor_home(),
            KeyCode::End => self.task_form.active_input().move_cursor_end(),
            KeyCode::Backspace => self.task_form.active_input().handle_backspace(),
            KeyCode::Delete => self.task_form.active_input().handle_delete(),
            KeyCode::Char(c) => self.task_form.active_input().handle_char(c),
            _ => {}
        }
        Ok(false)
    }

    /// Add the task described by the form and return to the list with it selected.
    fn create_task(&mut self) {
        let id = self.session.add_task(
            self.task_form.text.submitted(),
            self.task_form.description.submitted(),
        );
        self.task_form.reset();
        self.input_mode = InputMode::None;
        self.state = AppState::TaskList;
        self.update_visible_tasks();
        if let Some(pos) = self.visible_tasks.iter().position(|&v| v == id) {
            self.task_list_state.select(Some(pos));
        }
        self.set_status_message(format!("Added task {}", id));
    }

    fn handle_help_input(&mut self, _key: KeyCode, _modifiers: KeyModifiers) -> io::Result<bool> {
        self.state = AppState::TaskList;
        Ok(false)
    }

    /// Dispatch a key press to the handler for the current screen.
    ///
    /// Returns true if the application should quit.
    pub(crate) fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> io::Result<bool> {
        self.clear_status_message();
        match self.state {
            AppState::TaskList => self.handle_task_list_input(key, modifiers),
            AppState::TaskDetail => self.handle_detail_input(key, modifiers),
            AppState::AddTask => self.handle_form_input(key, modifiers),
            AppState::Help => self.handle_help_input(key, modifiers),
        }
    }

    /// Poll for and handle keyboard events.
    ///
    /// Returns true if the application should quit.
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return self.handle_key(key.code, key.modifiers);
                }
            }
        }
        Ok(false)
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let header = Paragraph::new(vec![
            Line::from(Span::styled(
                "THE SISYPHUS TASK-LIST",
                Style::default().fg(PURPLE).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Finish one, and two take its place",
                Style::default().fg(PINK).add_modifier(Modifier::ITALIC),
            )),
        ])
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    /// Render the main task list view.
    fn render_task_list(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0)])
            .split(area);
        self.render_header(f, chunks[0]);

        let header = Row::new(["ID", "Status", "From", "Task"].map(|h| {
            Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))
        }))
        .style(Style::default().bg(PURPLE).fg(SLATE))
        .height(1);

        let store = self.session.store();
        let rows: Vec<Row> = self
            .visible_tasks
            .iter()
            .filter_map(|&id| store.get(id))
            .map(|task| {
                let style = match task.status {
                    Status::Completed => Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT),
                    Status::Todo => Style::default().fg(pastel_for(task.id)),
                };
                let parent = task.parent.map(|p| format!("#{}", p)).unwrap_or_default();
                Row::new(vec![
                    Cell::from(task.id.to_string()),
                    Cell::from(format_status(task.status)),
                    Cell::from(parent),
                    Cell::from(task.text.clone()),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Length(5),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Min(20),
        ];

        let title = format!(
            "Tasks ({}/{}) - Press 'h' for help",
            self.visible_tasks.len(),
            store.len()
        );
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, chunks[1], &mut self.task_list_state);
    }

    /// Render the detailed view of a single task.
    fn render_task_detail(&mut self, f: &mut Frame, area: Rect) {
        let Some(task) = self.get_selected_task() else {
            let empty = Paragraph::new("Task not found. Press Esc to go back.")
                .block(Block::default().borders(Borders::ALL).title("Task Details"));
            f.render_widget(empty, area);
            return;
        };

        let label = Style::default().add_modifier(Modifier::BOLD);
        let store = self.session.store();
        let mut lines = vec![
            Line::from(Span::styled(
                task.text.clone(),
                Style::default().fg(PURPLE).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("Status:  ", label),
                Span::raw(format_status(task.status)),
            ]),
        ];
        if let Some(parent) = task.parent {
            let origin = match store.get(parent) {
                Some(p) => format!("follow-up to #{} \"{}\"", parent, p.text),
                None => format!("follow-up to #{}", parent),
            };
            lines.push(Line::from(vec![Span::styled("Origin:  ", label), Span::raw(origin)]));
        }
        lines.push(Line::from(vec![
            Span::styled("Created: ", label),
            Span::raw(format_age(task.created_at_utc, Utc::now())),
        ]));
        lines.push(Line::from(""));
        if let Some(desc) = task.description.as_deref() {
            lines.push(Line::from(Span::styled("Description", label)));
            lines.push(Line::from(desc.to_string()));
        }

        let hint = if task.is_completed() {
            "Esc: Back"
        } else {
            "c/Space: Complete  Esc: Back"
        };
        let detail = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Task {} - {}", task.id, hint)),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(detail, area);
    }

    /// Render the add-task form as a popup over the list.
    fn render_task_form(&mut self, f: &mut Frame, area: Rect) {
        self.render_task_list(f, area);

        let popup = centered_rect(70, 50, area);
        f.render_widget(Clear, popup);
        let block = Block::default().borders(Borders::ALL).title("Add Task");
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(inner);

        let field = |input: &InputField, title: &'static str, chunk: Rect| {
            let style = if input.active {
                Style::default().fg(PINK)
            } else {
                Style::default()
            };
            let (scroll, _) = input.viewport(chunk.width.saturating_sub(2));
            Paragraph::new(input.value.clone()).scroll((0, scroll)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(style),
            )
        };
        f.render_widget(field(&self.task_form.text, "Task", chunks[0]), chunks[0]);
        f.render_widget(
            field(&self.task_form.description, "Description", chunks[1]),
            chunks[1],
        );

        let instructions = Paragraph::new(
            "Tab/↑↓: Switch field  Enter: Add  Esc: Cancel  Leave blank for a surprise",
        )
        .wrap(Wrap { trim: true });
        f.render_widget(instructions, chunks[2]);

        if self.input_mode == InputMode::Text {
            let (chunk, input) = match self.task_form.current_field {
                DESCRIPTION_FIELD => (chunks[1], &self.task_form.description),
                _ => (chunks[0], &self.task_form.text),
            };
            let (_, column) = input.viewport(chunk.width.saturating_sub(2));
            f.set_cursor_position((chunk.x + 1 + column, chunk.y + 1));
        }
    }

    /// Render the help screen.
    fn render_help(&mut self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let help_text = vec![
            Line::from(Span::styled("Sisyphus Help", bold)),
            Line::from(""),
            Line::from(Span::styled("Task List:", bold)),
            Line::from("  ↑/k, ↓/j     Navigate tasks"),
            Line::from("  Enter        View task details"),
            Line::from("  a            Add new task"),
            Line::from("  c/Space      Complete selected task (two more will appear)"),
            Line::from("  t            Toggle show/hide completed tasks"),
            Line::from("  h/F1         Show this help"),
            Line::from("  q/Esc/Ctrl+C Quit"),
            Line::from(""),
            Line::from(Span::styled("Task Detail:", bold)),
            Line::from("  c/Space      Complete task"),
            Line::from("  Esc/q        Back to task list"),
            Line::from(""),
            Line::from(Span::styled("Add Task:", bold)),
            Line::from("  Tab/↑↓       Switch between task and description"),
            Line::from("  Enter        Add task"),
            Line::from("  Esc          Cancel"),
        ];

        let paragraph = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Help - Press any key to return"),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    /// Render the status bar at the bottom of the screen.
    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            let store = self.session.store();
            let pending = match self.session.pending() {
                0 => String::new(),
                n => format!(" | Brewing: {}", n),
            };
            format!(
                "Todo: {} | Done: {}{} | Press 'h' for help",
                store.count_by_status(Status::Todo),
                store.count_by_status(Status::Completed),
                pending
            )
        };

        let status = Paragraph::new(status_text)
            .style(Style::default().bg(PINK).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    /// Main render function that dispatches to the view renderers.
    pub(crate) fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        match self.state {
            AppState::TaskList => self.render_task_list(f, chunks[0]),
            AppState::TaskDetail => self.render_task_detail(f, chunks[0]),
            AppState::AddTask => self.render_task_form(f, chunks[0]),
            AppState::Help => self.render_help(f, chunks[0]),
        }

        self.render_status_bar(f, chunks[1]);
    }

    /// Main event loop for the TUI application.
    ///
    /// Handles rendering, finished workflows and input until the user exits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            self.tick();
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

/// Status bar text for follow-ups that just landed.
fn describe_follow_ups(applied: &[AppliedFollowUps]) -> String {
    let added: usize = applied.iter().map(|a| a.new_ids.len()).sum();
    let from: Vec<String> = applied.iter().map(|a| format!("#{}", a.completed_id)).collect();
    let flavour = match applied.last().map(|a| a.source) {
        Some(FollowUpSource::Generated) => "freshly generated",
        _ => "as foretold",
    };
    format!("{} new tasks for {} ({})", added, from.join(", "), flavour)
}
