use crate::client::{SchedulerClient, DEFAULT_BASE_URL};
use crate::drag::{DragGesture, MoveProposal};
use crate::layout::{layout, LayoutConfig};
use crate::model::{
    format_time, generate_id, parse_time, FixedIntensity, FlexIntensity, Plan, PlanError,
    ScheduleEntry, Task,
};
use crate::storage::{save_plan, PlanLocation, PlanScope};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const TIME_LABEL_WIDTH: u16 = 6;

pub fn run(plan: Plan, location: PlanLocation) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(plan, location);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    plan: Plan,
    location: PlanLocation,
    /// Owned by this view from the moment the scheduler responds; immutable
    /// except for start/end replacements proposed by a finished gesture.
    schedule: Vec<ScheduleEntry>,
    cfg: LayoutConfig,
    focus: Focus,
    selected_task: usize,
    selected_entry: usize,
    task_offset: usize,
    timeline_scroll: i32,
    drag: Option<DragGesture>,
    drag_anchor: Option<i32>,
    /// Screen rectangles of the entries drawn on the last frame, for mouse
    /// hit-testing.
    hitboxes: Vec<(Rect, usize)>,
    last_save: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Creating(TaskForm),
    ConfirmDelete { task_id: String },
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Focus {
    Tasks,
    Timeline,
}

struct TaskForm {
    name: FieldValue,
    start: FieldValue,
    length: FieldValue,
    location: FieldValue,
    flexible: bool,
    intensity: usize,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Name,
    Flexible,
    Start,
    Length,
    Location,
    Intensity,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl TaskForm {
    fn new() -> Self {
        TaskForm {
            name: FieldValue::new(""),
            start: FieldValue::new(""),
            length: FieldValue::new("1.0"),
            location: FieldValue::new(""),
            flexible: true,
            intensity: 1,
            field: FormField::Name,
        }
    }

    fn intensity_options(&self) -> &'static [&'static str] {
        if self.flexible {
            &["Light", "Medium"]
        } else {
            &["Medium", "Deep"]
        }
    }

    fn intensity_label(&self) -> &'static str {
        let options = self.intensity_options();
        options[self.intensity.min(options.len() - 1)]
    }

    fn toggle_flexible(&mut self) {
        self.flexible = !self.flexible;
        self.intensity = self.intensity.min(self.intensity_options().len() - 1);
    }

    fn cycle_intensity(&mut self, delta: isize) {
        let len = self.intensity_options().len() as isize;
        let current = self.intensity as isize;
        self.intensity = (current + delta).rem_euclid(len) as usize;
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Name => FormField::Flexible,
            FormField::Flexible => {
                if self.flexible {
                    FormField::Length
                } else {
                    FormField::Start
                }
            }
            FormField::Start => FormField::Length,
            FormField::Length => FormField::Location,
            FormField::Location => FormField::Intensity,
            FormField::Intensity => FormField::Name,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Name => FormField::Intensity,
            FormField::Flexible => FormField::Name,
            FormField::Start => FormField::Flexible,
            FormField::Length => {
                if self.flexible {
                    FormField::Flexible
                } else {
                    FormField::Start
                }
            }
            FormField::Location => FormField::Length,
            FormField::Intensity => FormField::Location,
        };
    }

    fn active_field_mut(&mut self) -> Option<&mut FieldValue> {
        match self.field {
            FormField::Name => Some(&mut self.name),
            FormField::Start => Some(&mut self.start),
            FormField::Length => Some(&mut self.length),
            FormField::Location => Some(&mut self.location),
            FormField::Flexible | FormField::Intensity => None,
        }
    }
}

impl App {
    fn new(plan: Plan, location: PlanLocation) -> Self {
        let status = format!("Loaded plan from {}", location.path.display());
        App {
            plan,
            location,
            schedule: Vec::new(),
            cfg: LayoutConfig::default(),
            focus: Focus::Tasks,
            selected_task: 0,
            selected_entry: 0,
            task_offset: 0,
            timeline_scroll: 0,
            drag: None,
            drag_anchor: None,
            hitboxes: Vec::new(),
            last_save: Instant::now(),
            status,
            mode: Mode::Normal,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                match event::read()? {
                    Event::Key(key) => {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Creating(_) => self.handle_form_key(key),
            Mode::ConfirmDelete { .. } => self.handle_confirm_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        if self.drag.is_some() {
            self.handle_move_key(key);
            return Ok(false);
        }
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Tasks => Focus::Timeline,
                    Focus::Timeline => Focus::Tasks,
                };
            }
            KeyCode::Char('n') => {
                self.mode = Mode::Creating(TaskForm::new());
                self.status =
                    "Adding task (Tab/Shift-Tab move, Space toggles, Enter save, Esc cancel)"
                        .into();
            }
            KeyCode::Char('d') => {
                if self.focus == Focus::Tasks {
                    if let Some(task) = self.plan.tasks.get(self.selected_task) {
                        let task_id = task.id.clone();
                        self.status =
                            format!("Delete {}? (y to confirm, n/Esc to cancel)", task_id);
                        self.mode = Mode::ConfirmDelete { task_id };
                    } else {
                        self.status = "No task selected to delete".into();
                    }
                }
            }
            KeyCode::Char('g') | KeyCode::Char('G') => self.submit(),
            _ => match self.focus {
                Focus::Tasks => self.handle_task_key(key),
                Focus::Timeline => self.handle_timeline_key(key),
            },
        }
        self.ensure_bounds();
        Ok(false)
    }

    fn handle_task_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_task = self.selected_task.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected_task + 1 < self.plan.tasks.len() {
                    self.selected_task += 1;
                }
            }
            _ => {}
        }
    }

    fn handle_timeline_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_entry = self.selected_entry.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected_entry + 1 < self.schedule.len() {
                    self.selected_entry += 1;
                }
            }
            KeyCode::PageUp | KeyCode::Char('[') => {
                self.timeline_scroll = (self.timeline_scroll - 4).max(0);
            }
            KeyCode::PageDown | KeyCode::Char(']') => {
                self.timeline_scroll += 4;
            }
            KeyCode::Char('m') | KeyCode::Enter => self.begin_move(self.selected_entry),
            _ => {}
        }
    }

    fn handle_move_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(gesture) = self.drag.as_mut() {
                    gesture.nudge(-1);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(gesture) = self.drag.as_mut() {
                    gesture.nudge(1);
                }
            }
            KeyCode::Enter => self.commit_move(),
            KeyCode::Esc => {
                self.drag = None;
                self.drag_anchor = None;
                self.status = "Move canceled".into();
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(self.mode, Mode::Normal) {
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let position = (mouse.column, mouse.row);
                if let Some(index) = self.hit_entry(position) {
                    self.focus = Focus::Timeline;
                    self.selected_entry = index;
                    self.begin_move(index);
                    self.drag_anchor = Some(mouse.row as i32);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let (Some(gesture), Some(anchor)) = (self.drag.as_mut(), self.drag_anchor) {
                    gesture.update(mouse.row as i32 - anchor);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.drag_anchor.is_some() {
                    self.commit_move();
                }
            }
            _ => {}
        }
    }

    fn hit_entry(&self, (column, row): (u16, u16)) -> Option<usize> {
        self.hitboxes
            .iter()
            .rev()
            .find(|(rect, _)| {
                column >= rect.x
                    && column < rect.x + rect.width
                    && row >= rect.y
                    && row < rect.y + rect.height
            })
            .map(|&(_, index)| index)
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut close_form = false;
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        if let Mode::Creating(form) = &mut mode {
            close_form = self.process_form_key(form, key);
        }
        self.mode = if close_form { Mode::Normal } else { mode };
        self.ensure_bounds();
        Ok(false)
    }

    fn process_form_key(&mut self, form: &mut TaskForm, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return true;
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Enter => {
                return match self.create_task_from_form(form) {
                    Ok(id) => {
                        self.status = format!("Added task {}", id);
                        true
                    }
                    Err(err) => {
                        self.status = format!("Could not add: {}", err);
                        false
                    }
                };
            }
            KeyCode::Left => match form.field {
                FormField::Flexible => form.toggle_flexible(),
                FormField::Intensity => form.cycle_intensity(-1),
                _ => {
                    if let Some(field) = form.active_field_mut() {
                        field.move_left();
                    }
                }
            },
            KeyCode::Right => match form.field {
                FormField::Flexible => form.toggle_flexible(),
                FormField::Intensity => form.cycle_intensity(1),
                _ => {
                    if let Some(field) = form.active_field_mut() {
                        field.move_right();
                    }
                }
            },
            KeyCode::Backspace => {
                if let Some(field) = form.active_field_mut() {
                    field.backspace();
                }
            }
            KeyCode::Char(' ') if form.field == FormField::Flexible => form.toggle_flexible(),
            KeyCode::Char(c) => {
                if let Some(field) = form.active_field_mut() {
                    field.insert_char(c);
                }
            }
            _ => {}
        }
        false
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<bool> {
        let task_id = match &self.mode {
            Mode::ConfirmDelete { task_id } => task_id.clone(),
            _ => return Ok(false),
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                match self.plan.remove_task(&task_id) {
                    Ok(task) => self.persist(format!("Deleted {} ({})", task_id, task.name))?,
                    Err(err) => self.status = format!("Delete failed: {}", err),
                }
                self.mode = Mode::Normal;
                self.ensure_bounds();
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
        Ok(false)
    }

    /// One outbound exchange per press of `g`; the loop suspends until the
    /// scheduler answers. Any failure resolves to the empty schedule.
    fn submit(&mut self) {
        if self.plan.tasks.is_empty() {
            self.status = "No tasks to schedule; press n to add one".into();
            return;
        }
        let base_url = self
            .plan
            .scheduler_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let client = SchedulerClient::new(base_url);
        self.schedule = client.schedule_or_empty(&self.plan.tasks);
        if self.schedule.is_empty() {
            self.status = "No schedule came back; is the scheduler running?".into();
        } else {
            self.status = format!("Scheduled {} blocks", self.schedule.len());
            self.focus = Focus::Timeline;
        }
        self.selected_entry = 0;
        self.timeline_scroll = 0;
        self.drag = None;
        self.drag_anchor = None;
        self.ensure_bounds();
    }

    fn begin_move(&mut self, index: usize) {
        let boxes = layout(&self.schedule, &self.cfg);
        if let Some(slot) = boxes.get(index) {
            self.drag = Some(DragGesture::grab(slot, &self.cfg));
            self.drag_anchor = None;
            self.status = "Moving (j/k shift, Enter drop, Esc cancel)".into();
        } else {
            self.status = "No block selected to move".into();
        }
    }

    fn commit_move(&mut self) {
        let Some(gesture) = self.drag.take() else {
            return;
        };
        self.drag_anchor = None;
        let index = gesture.index();
        let Some(entry) = self.schedule.get(index) else {
            return;
        };
        let proposal = gesture.release(entry.start, entry.end, &self.cfg);
        self.apply_move(proposal);
    }

    /// The owning collection's update entry point for a finished gesture.
    fn apply_move(&mut self, proposal: MoveProposal) {
        if let Some(entry) = self.schedule.get_mut(proposal.index) {
            entry.start = proposal.start;
            entry.end = proposal.end;
            self.status = format!(
                "Moved {} to {}-{}",
                entry.name,
                format_time(entry.start),
                format_time(entry.end)
            );
        }
    }

    fn create_task_from_form(&mut self, form: &TaskForm) -> Result<String> {
        let name = form.name.value.trim().to_string();
        let length: f64 = form
            .length
            .value
            .trim()
            .parse()
            .map_err(|_| PlanError::LengthTooShort)?;
        let location = form.location.value.trim().to_string();
        let id = generate_id();
        let task = if form.flexible {
            let intensity = match form.intensity_label() {
                "Light" => FlexIntensity::Light,
                _ => FlexIntensity::Medium,
            };
            Task::flexible(id.clone(), name, length, location, intensity)?
        } else {
            let raw = form.start.value.trim();
            if raw.is_empty() {
                return Err(PlanError::MissingStart.into());
            }
            let start = parse_time(raw)?;
            let intensity = match form.intensity_label() {
                "Deep" => FixedIntensity::Deep,
                _ => FixedIntensity::Medium,
            };
            Task::fixed(id.clone(), name, length, location, start, intensity)?
        };
        self.plan.add_task(task);
        self.selected_task = self.plan.tasks.len().saturating_sub(1);
        self.persist(String::new())?;
        Ok(id)
    }

    fn persist(&mut self, message: String) -> Result<()> {
        save_plan(&self.location, &self.plan)?;
        self.last_save = Instant::now();
        if !message.is_empty() {
            self.status = message;
        }
        Ok(())
    }

    fn ensure_bounds(&mut self) {
        if self.plan.tasks.is_empty() {
            self.selected_task = 0;
        } else {
            self.selected_task = self.selected_task.min(self.plan.tasks.len() - 1);
        }
        if self.schedule.is_empty() {
            self.selected_entry = 0;
            self.drag = None;
            self.drag_anchor = None;
        } else {
            self.selected_entry = self.selected_entry.min(self.schedule.len() - 1);
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, rows[0]);

        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);
        self.draw_tasks(f, panes[0]);
        self.draw_timeline(f, panes[1]);

        self.draw_footer(f, rows[2]);

        match &self.mode {
            Mode::Creating(form) => self.draw_form(f, form),
            Mode::ConfirmDelete { task_id } => self.draw_confirm(f, task_id),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let scope = match self.location.scope {
            PlanScope::Project => "project",
            PlanScope::Global => "global",
        };
        let title = Line::from(vec![
            Span::styled(
                "lazyplan ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                self.plan.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(scope, Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_tasks(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let focused = self.focus == Focus::Tasks;
        let items: Vec<ListItem<'static>> = if self.plan.tasks.is_empty() {
            vec![ListItem::new("No tasks yet (press n)")]
        } else {
            self.plan.tasks.iter().map(task_item).collect()
        };

        let mut state = ListState::default();
        let viewport = area.height.saturating_sub(2) as usize / 2;
        let selected = self.selected_task.min(items.len().saturating_sub(1));
        self.task_offset = adjust_offset(
            selected,
            self.task_offset,
            viewport.max(1),
            1,
            items.len(),
        );
        *state.offset_mut() = self.task_offset;
        if focused && !self.plan.tasks.is_empty() {
            state.select(Some(selected));
        }

        let block = Block::default()
            .title(Span::styled(
                format!("Tasks ({})", self.plan.tasks.len()),
                Style::default()
                    .fg(if focused { Color::Cyan } else { Color::Gray })
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused {
                Color::Cyan
            } else {
                Color::DarkGray
            }));
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_timeline(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        self.hitboxes.clear();
        let focused = self.focus == Focus::Timeline;
        let block = Block::default()
            .title(Span::styled(
                format!("Schedule ({} blocks)", self.schedule.len()),
                Style::default()
                    .fg(if focused { Color::Cyan } else { Color::Gray })
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused {
                Color::Cyan
            } else {
                Color::DarkGray
            }));
        let inner = block.inner(area);
        f.render_widget(block, area);

        if self.schedule.is_empty() {
            let placeholder = Paragraph::new("No schedule yet; press g to plan your day")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray))
                .wrap(Wrap { trim: true });
            f.render_widget(placeholder, inner);
            return;
        }
        if inner.width <= TIME_LABEL_WIDTH || inner.height == 0 {
            return;
        }

        let boxes = layout(&self.schedule, &self.cfg);
        let viewport = inner.height as i32;
        let max_scroll = (self.cfg.total_height() - viewport).max(0);
        self.timeline_scroll = self.timeline_scroll.clamp(0, max_scroll);
        if let Some(slot) = boxes.get(self.selected_entry) {
            let offset = self
                .drag
                .as_ref()
                .filter(|g| g.index() == slot.index)
                .map(|g| g.offset())
                .unwrap_or(0);
            self.timeline_scroll = scroll_into_view(
                slot.top + offset,
                slot.height.max(1),
                self.timeline_scroll,
                viewport,
            )
            .clamp(0, max_scroll);
        }

        self.draw_hour_grid(f, inner);
        self.draw_entries(f, inner, &boxes);
    }

    fn draw_hour_grid(&self, f: &mut ratatui::Frame<'_>, inner: Rect) {
        let rows_per_hour = 60 / self.cfg.row_minutes;
        for hour in self.cfg.day_start_hour..=self.cfg.day_end_hour {
            let y = (hour - self.cfg.day_start_hour) * rows_per_hour * self.cfg.row_height
                - self.timeline_scroll;
            if y < 0 || y >= inner.height as i32 {
                continue;
            }
            let rule_width = inner.width.saturating_sub(TIME_LABEL_WIDTH) as usize;
            let line = Line::from(vec![
                Span::styled(
                    format!("{:02}:00 ", hour),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled("╌".repeat(rule_width), Style::default().fg(Color::DarkGray)),
            ]);
            let row = Rect::new(inner.x, inner.y + y as u16, inner.width, 1);
            f.render_widget(Paragraph::new(line), row);
        }
    }

    fn draw_entries(
        &mut self,
        f: &mut ratatui::Frame<'_>,
        inner: Rect,
        boxes: &[crate::layout::EntryBox],
    ) {
        let lane_width = inner.width - TIME_LABEL_WIDTH;
        for slot in boxes {
            if slot.height == 0 {
                continue;
            }
            let entry = &self.schedule[slot.index];
            let drag_offset = self
                .drag
                .as_ref()
                .filter(|g| g.index() == slot.index)
                .map(|g| g.offset())
                .unwrap_or(0);

            let columns = slot.columns.max(1) as u16;
            let column_width = (lane_width / columns).max(1);
            let x = inner.x + TIME_LABEL_WIDTH + slot.column as u16 * column_width;
            if x >= inner.x + inner.width {
                continue;
            }
            let column_width = column_width.min(inner.x + inner.width - x);
            let top = slot.top + drag_offset - self.timeline_scroll;
            let bottom = top + slot.height.max(1);

            let visible_top = top.max(0);
            let visible_bottom = bottom.min(inner.height as i32);
            if visible_bottom <= visible_top {
                continue;
            }
            let rect = Rect::new(
                x,
                inner.y + visible_top as u16,
                column_width,
                (visible_bottom - visible_top) as u16,
            );

            let dragging = self.drag.as_ref().map(|g| g.index()) == Some(slot.index);
            let selected = self.focus == Focus::Timeline && slot.index == self.selected_entry;
            let accent = color_for_index(slot.index);
            let style = if dragging {
                Style::default()
                    .bg(Color::Rgb(252, 214, 112))
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD)
            } else if selected {
                Style::default()
                    .bg(accent)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().bg(accent).fg(Color::Black)
            };

            let shown_start = entry.start
                + drag_offset / self.cfg.row_height * self.cfg.row_minutes;
            let shown_end = shown_start + entry.duration();
            let mut lines = vec![Line::from(Span::styled(
                truncate_text(&entry.name, column_width.saturating_sub(1) as usize),
                Style::default().add_modifier(Modifier::BOLD),
            ))];
            lines.push(Line::from(format!(
                "{}-{}{}",
                format_time(shown_start),
                format_time(shown_end),
                if entry.flexible { "" } else { " ●" }
            )));
            if let (Some(length), Some(intensity)) = (entry.length, entry.intensity) {
                lines.push(Line::from(format!("{:.1}h {}", length, intensity.as_str())));
            }

            let cut_top = (visible_top - top) as u16;
            let paragraph = Paragraph::new(lines).style(style).scroll((cut_top, 0));
            f.render_widget(paragraph, rect);
            self.hitboxes.push((rect, slot.index));
        }
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let (detail, title) = self.detail_content();
        let detail = Paragraph::new(detail).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(title),
        );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let mut spans = vec![
            Span::styled("Tab", Style::default().fg(Color::LightCyan)),
            Span::raw(" focus  "),
        ];
        if self.drag.is_some() {
            spans.extend([
                Span::styled("j/k", Style::default().fg(Color::LightGreen)),
                Span::raw(" shift  "),
                Span::styled("Enter", Style::default().fg(Color::LightYellow)),
                Span::raw(" drop  "),
                Span::styled("Esc", Style::default().fg(Color::LightRed)),
                Span::raw(" cancel"),
            ]);
            return Line::from(spans);
        }
        match self.focus {
            Focus::Tasks => spans.extend([
                Span::styled("↑↓ / j k", Style::default().fg(Color::LightCyan)),
                Span::raw(" browse  "),
                Span::styled("n", Style::default().fg(Color::LightMagenta)),
                Span::raw(" new  "),
                Span::styled("d", Style::default().fg(Color::LightRed)),
                Span::raw(" delete  "),
                Span::styled("g", Style::default().fg(Color::LightGreen)),
                Span::raw(" go  "),
                Span::styled("q", Style::default().fg(Color::LightRed)),
                Span::raw(" quit"),
            ]),
            Focus::Timeline => spans.extend([
                Span::styled("↑↓ / j k", Style::default().fg(Color::LightCyan)),
                Span::raw(" browse  "),
                Span::styled("m / drag", Style::default().fg(Color::LightGreen)),
                Span::raw(" move  "),
                Span::styled("[ ]", Style::default().fg(Color::LightCyan)),
                Span::raw(" scroll  "),
                Span::styled("g", Style::default().fg(Color::LightGreen)),
                Span::raw(" go  "),
                Span::styled("q", Style::default().fg(Color::LightRed)),
                Span::raw(" quit"),
            ]),
        }
        Line::from(spans)
    }

    fn detail_content(&self) -> (Vec<Line<'static>>, String) {
        match self.focus {
            Focus::Tasks => {
                if let Some(task) = self.plan.tasks.get(self.selected_task) {
                    (vec![task_detail(task)], "Selected task".into())
                } else {
                    (vec![Line::from("No task selected")], "Selected task".into())
                }
            }
            Focus::Timeline => {
                if let Some(entry) = self.schedule.get(self.selected_entry) {
                    (vec![entry_detail(entry)], "Selected block".into())
                } else {
                    (
                        vec![Line::from("No block selected")],
                        "Selected block".into(),
                    )
                }
            }
        }
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, form: &TaskForm) {
        let area = centered_rect(70, 60, f.size());
        let mut lines = Vec::new();
        lines.extend(field_lines(
            "Task",
            &form.name,
            form.field == FormField::Name,
        ));
        lines.push(toggle_line(
            "Flexible",
            if form.flexible { "[x]" } else { "[ ]" },
            form.field == FormField::Flexible,
        ));
        if !form.flexible {
            lines.extend(field_lines(
                "Start (HH:MM)",
                &form.start,
                form.field == FormField::Start,
            ));
        }
        lines.extend(field_lines(
            "Length (hours)",
            &form.length,
            form.field == FormField::Length,
        ));
        lines.extend(field_lines(
            "Location",
            &form.location,
            form.field == FormField::Location,
        ));
        lines.push(toggle_line(
            "Intensity",
            &format!("< {} >", form.intensity_label()),
            form.field == FormField::Intensity,
        ));
        lines.push(Line::from(Span::styled(
            "Enter to save • Esc to cancel • Tab/Shift-Tab to move • Space/←→ toggles",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(Span::styled(
                        "New Task",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, task_id: &str) {
        let area = centered_rect(50, 30, f.size());
        let name = self
            .plan
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| task_id.to_string());
        let body = vec![
            Line::from(Span::styled(
                format!("Delete \"{}\"?", name),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Confirm Delete",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

/// Pixel-range variant of the scroll adjustment for the timeline pane.
fn scroll_into_view(top: i32, height: i32, scroll: i32, viewport: i32) -> i32 {
    if viewport <= 0 {
        return 0;
    }
    if top < scroll {
        top
    } else if top + height > scroll + viewport {
        top + height - viewport
    } else {
        scroll
    }
}

fn color_for_index(idx: usize) -> Color {
    let palette = [
        Color::Cyan,
        Color::LightGreen,
        Color::LightMagenta,
        Color::LightBlue,
        Color::LightYellow,
        Color::LightRed,
    ];
    palette[idx % palette.len()]
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    for ch in text.chars() {
        if out.chars().count() >= max.saturating_sub(3) {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    if out.chars().count() > max {
        out.truncate(max);
    }
    out
}

fn task_item(task: &Task) -> ListItem<'static> {
    let shape = match task.start() {
        Some(start) => format!("fixed {}", format_time(start)),
        None => "flexible".to_string(),
    };
    let mut meta = format!("  {:.1}h · {} · {}", task.length, task.intensity_label(), shape);
    if !task.location.is_empty() {
        meta.push_str(&format!(" · {}", task.location));
    }
    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!("[{}] ", task.id),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                truncate_text(&task.name, 40),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(meta, Style::default().fg(Color::Gray))),
    ];
    ListItem::new(lines)
}

fn task_detail(task: &Task) -> Line<'static> {
    let mut spans = vec![Span::styled(
        task.name.clone(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        format!("{:.1}h {}", task.length, task.intensity_label()),
        Style::default().fg(Color::Gray),
    ));
    if let Some(start) = task.start() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("at {}", format_time(start)),
            Style::default().fg(Color::LightRed),
        ));
    }
    if !task.location.is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            task.location.clone(),
            Style::default().fg(Color::LightMagenta),
        ));
    }
    Line::from(spans)
}

fn entry_detail(entry: &ScheduleEntry) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            entry.name.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{}-{}", format_time(entry.start), format_time(entry.end)),
            Style::default().fg(Color::White),
        ),
    ];
    if !entry.flexible {
        spans.push(Span::raw("  "));
        spans.push(Span::styled("fixed", Style::default().fg(Color::LightRed)));
    }
    if let (Some(length), Some(intensity)) = (entry.length, entry.intensity) {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{:.1}h {}", length, intensity.as_str()),
            Style::default().fg(Color::Gray),
        ));
    }
    if let Some(location) = entry.location.as_deref() {
        if !location.is_empty() {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                location.to_string(),
                Style::default().fg(Color::LightMagenta),
            ));
        }
    }
    Line::from(spans)
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    vec![Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])]
}

fn toggle_line(label: &str, value: &str, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(value.to_string(), value_style),
    ])
}

fn prev_char(cursor: usize, text: &str) -> usize {
    let mut prev = 0;
    for (idx, _) in text.char_indices() {
        if idx >= cursor {
            break;
        }
        prev = idx;
    }
    prev
}

fn next_char(cursor: usize, text: &str) -> usize {
    for (idx, ch) in text.char_indices() {
        if idx > cursor {
            return idx;
        }
        if idx == cursor {
            return cursor + ch.len_utf8();
        }
    }
    text.len()
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
