use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use crossterm::{event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind}, execute, terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen}};
use ratatui::{backend::CrosstermBackend, Terminal, widgets::{Block, Borders, List, ListItem, Paragraph, ListState}, layout::{Layout, Constraint, Direction}, style::{Style, Modifier, Color}};

use livetodo::{
    application::{
        actions::{ActionError, TodoActions, TodoForm},
        auth::{AuthActions, CredentialsForm, SIGN_UP_MESSAGE},
        live_list::{ListState as LiveState, LiveTodos},
        view::{is_due_soon, is_overdue, TodoQuery, TodoView},
    },
    config::Config,
    domain::todo::{Priority, Todo, TodoId},
    http::routing::NOT_CONFIGURED_NOTICE,
    infrastructure::Backend,
};

type Term = Terminal<CrosstermBackend<std::io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;
    let backend = Backend::from_config(&config).await?;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let res = if backend.is_configured() {
        run_app(&mut terminal, backend, config.sign_up_redirect()).await
    } else {
        show_notice(&mut terminal)
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res
}

fn show_notice(terminal: &mut Term) -> Result<()> {
    loop {
        terminal.draw(|f| {
            let notice = Paragraph::new(format!("{NOT_CONFIGURED_NOTICE}\n\nSet TODO_BACKEND_URL and TODO_BACKEND_KEY.\n\nq: quit"))
                .block(Block::default().borders(Borders::ALL).title("livetodo"));
            f.render_widget(notice, f.size());
        })?;
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && key.code == KeyCode::Char('q') { return Ok(()); }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode { Login, View, Create, Edit, Search }

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field { Title, Description, Due, Priority }

impl Field {
    fn next(self) -> Self {
        match self { Field::Title => Field::Description, Field::Description => Field::Due, Field::Due => Field::Priority, Field::Priority => Field::Title }
    }
    fn label(self) -> &'static str {
        match self { Field::Title => "Title", Field::Description => "Desc", Field::Due => "Due (YYYY-MM-DD)", Field::Priority => "Priority" }
    }
}

#[derive(Default)]
struct Draft { title: String, description: String, due: String, priority: String }

impl Draft {
    fn from_todo(todo: &Todo) -> Self {
        Self {
            title: todo.title.clone(),
            description: todo.description.clone().unwrap_or_default(),
            due: todo.due_date.map(|d| d.to_string()).unwrap_or_default(),
            priority: todo.priority.to_string(),
        }
    }
    fn field(&self, field: Field) -> &str {
        match field { Field::Title => &self.title, Field::Description => &self.description, Field::Due => &self.due, Field::Priority => &self.priority }
    }
    fn field_mut(&mut self, field: Field) -> &mut String {
        match field { Field::Title => &mut self.title, Field::Description => &mut self.description, Field::Due => &mut self.due, Field::Priority => &mut self.priority }
    }
    fn into_form(self, todo_id: Option<TodoId>) -> TodoForm {
        TodoForm {
            todo_id: todo_id.map(|id| id.to_string()),
            title: Some(self.title),
            description: Some(self.description),
            due_date: Some(self.due),
            priority: Some(self.priority),
            completed: None,
        }
    }
}

struct App {
    backend: Backend,
    todos: TodoActions,
    auth: AuthActions,
    mode: Mode,
    token: Option<String>,
    email: String,
    password: String,
    login_field_password: bool,
    live: Option<LiveTodos>,
    query: TodoQuery,
    visible: Vec<TodoId>,
    selected: usize,
    list_state: ListState,
    field: Field,
    draft: Draft,
    editing: Option<TodoId>,
    status: String,
}

impl App {
    fn new(backend: Backend, sign_up_redirect: String) -> Self {
        Self {
            todos: TodoActions::new(backend.auth.clone(), backend.todos.clone()),
            auth: AuthActions::new(backend.auth.clone(), sign_up_redirect),
            backend,
            mode: Mode::Login,
            token: None,
            email: String::new(),
            password: String::new(),
            login_field_password: false,
            live: None,
            query: TodoQuery::default(),
            visible: Vec::new(),
            selected: 0,
            list_state: ListState::default(),
            field: Field::Title,
            draft: Draft::default(),
            editing: None,
            status: "Enter: sign in  F2: sign up  Tab: switch field  Esc: quit".into(),
        }
    }

    fn all_todos(&self) -> &[Todo] { self.live.as_ref().map(|l| l.todos()).unwrap_or(&[]) }

    fn selected_todo(&self) -> Option<&Todo> {
        let id = self.visible.get(self.selected)?;
        self.all_todos().iter().find(|t| t.id == *id)
    }

    /// Pulls pending feed events into the local list and re-derives the visible rows.
    fn refresh(&mut self) {
        if let Some(live) = self.live.as_mut() { live.drain(); }
        let now = Utc::now();
        self.visible = TodoView::compute(self.all_todos(), &self.query, now).visible.iter().map(|t| t.id).collect();
        let len = self.visible.len();
        if len == 0 { self.selected = 0; self.list_state.select(None); }
        else { if self.selected >= len { self.selected = len - 1; } self.list_state.select(Some(self.selected)); }
    }

    fn report(&mut self, result: Result<String, ActionError>) {
        self.status = match result { Ok(message) => message, Err(err) => format!("Error: {err}") };
    }

    async fn sign_in(&mut self) {
        let form = CredentialsForm { email: Some(self.email.clone()), password: Some(self.password.clone()) };
        match self.auth.sign_in(form).await {
            Ok(session) => {
                let live = LiveTodos::open(self.backend.todos.as_ref(), self.backend.feed.as_ref(), session.user.id).await;
                self.status = format!("Signed in as {}", session.user.email);
                self.token = Some(session.token);
                self.live = Some(live);
                self.password.clear();
                self.mode = Mode::View;
            }
            Err(err) => self.status = format!("Error: {err}"),
        }
    }

    async fn sign_up(&mut self) {
        let form = CredentialsForm { email: Some(self.email.clone()), password: Some(self.password.clone()) };
        let result = self.auth.sign_up(form).await.map(|_| SIGN_UP_MESSAGE.to_string());
        self.report(result);
    }

    async fn sign_out(&mut self) {
        let result = self.auth.sign_out(self.token.as_deref()).await.map(|_| "Signed out".to_string());
        self.report(result);
        self.token = None;
        if let Some(mut live) = self.live.take() { live.close(); }
        self.mode = Mode::Login;
    }

    async fn toggle_selected(&mut self) {
        let Some(todo) = self.selected_todo() else { return };
        let form = TodoForm { todo_id: Some(todo.id.to_string()), completed: Some((!todo.completed).to_string()), ..Default::default() };
        let result = self.todos.toggle(self.token.as_deref(), form).await.map(|o| o.message);
        self.report(result);
    }

    async fn delete_selected(&mut self) {
        let Some(todo) = self.selected_todo() else { return };
        let form = TodoForm { todo_id: Some(todo.id.to_string()), ..Default::default() };
        let result = self.todos.delete(self.token.as_deref(), form).await.map(|o| o.message);
        if self.selected > 0 { self.selected -= 1; }
        self.report(result);
    }

    async fn save_draft(&mut self) {
        let draft = std::mem::take(&mut self.draft);
        let result = match self.editing.take() {
            Some(id) => self.todos.update(self.token.as_deref(), draft.into_form(Some(id))).await,
            None => self.todos.create(self.token.as_deref(), draft.into_form(None)).await,
        };
        self.report(result.map(|o| o.message));
        self.mode = Mode::View;
    }
}

async fn run_app(terminal: &mut Term, backend: Backend, sign_up_redirect: String) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut app = App::new(backend, sign_up_redirect);

    loop {
        app.refresh();
        draw(terminal, &mut app)?;

        if !event::poll(tick_rate)? { continue; }
        let Event::Key(key) = event::read()? else { continue };
        // Only act on key presses; ignore repeats and releases to prevent duplicate input
        if key.kind != KeyEventKind::Press { continue; }

        match app.mode {
            Mode::Login => match key.code {
                KeyCode::Esc => break,
                KeyCode::Enter => app.sign_in().await,
                KeyCode::F(2) => app.sign_up().await,
                KeyCode::Tab => app.login_field_password = !app.login_field_password,
                KeyCode::Backspace => { if app.login_field_password { app.password.pop(); } else { app.email.pop(); } }
                KeyCode::Char(c) => { if app.login_field_password { app.password.push(c) } else { app.email.push(c) } }
                _ => {}
            },
            Mode::View => match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Up => { if app.selected > 0 { app.selected -= 1; } }
                KeyCode::Down => { if app.selected + 1 < app.visible.len() { app.selected += 1; } }
                KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selected().await,
                KeyCode::Char('n') => {
                    app.mode = Mode::Create;
                    app.field = Field::Title;
                    app.editing = None;
                    app.draft = Draft { priority: Priority::default().to_string(), ..Default::default() };
                }
                KeyCode::Char('e') => {
                    if let Some(todo) = app.selected_todo() {
                        let (id, draft) = (todo.id, Draft::from_todo(todo));
                        app.editing = Some(id);
                        app.draft = draft;
                        app.field = Field::Title;
                        app.mode = Mode::Edit;
                    }
                }
                KeyCode::Char('d') => app.delete_selected().await,
                KeyCode::Char('f') => app.query.status = app.query.status.next(),
                KeyCode::Char('p') => {
                    app.query.priority = match app.query.priority {
                        None => Some(Priority::Low),
                        Some(Priority::Low) => Some(Priority::Medium),
                        Some(Priority::Medium) => Some(Priority::High),
                        Some(Priority::High) => None,
                    };
                }
                KeyCode::Char('o') => app.query.overdue_only = !app.query.overdue_only,
                KeyCode::Char('/') => app.mode = Mode::Search,
                KeyCode::Char('x') => app.sign_out().await,
                _ => {}
            },
            Mode::Search => match key.code {
                KeyCode::Esc => { app.query.search.clear(); app.mode = Mode::View; }
                KeyCode::Enter => app.mode = Mode::View,
                KeyCode::Backspace => { app.query.search.pop(); }
                KeyCode::Char(c) => app.query.search.push(c),
                _ => {}
            },
            Mode::Create | Mode::Edit => match key.code {
                KeyCode::Esc => { app.mode = Mode::View; app.draft = Draft::default(); app.editing = None; }
                KeyCode::Enter => app.save_draft().await,
                KeyCode::Tab => app.field = app.field.next(),
                KeyCode::Backspace => { app.draft.field_mut(app.field).pop(); }
                KeyCode::Char(c) => app.draft.field_mut(app.field).push(c),
                _ => {}
            },
        }
    }
    Ok(())
}

fn draw(terminal: &mut Term, app: &mut App) -> Result<()> {
    let now = Utc::now();
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(3)])
            .split(f.size());

        if app.mode == Mode::Login {
            let masked = "*".repeat(app.password.chars().count());
            let (email_cursor, password_cursor) = if app.login_field_password { ("", "_") } else { ("_", "") };
            let form = Paragraph::new(format!("Email:    {}{email_cursor}\nPassword: {masked}{password_cursor}", app.email))
                .block(Block::default().borders(Borders::ALL).title("sign in"));
            f.render_widget(Paragraph::new("Real-time Todo App").block(Block::default().borders(Borders::ALL).title("livetodo")), chunks[0]);
            f.render_widget(form, chunks[1]);
            f.render_widget(Paragraph::new(app.status.as_str()).block(Block::default().borders(Borders::ALL).title("info")), chunks[2]);
            return;
        }

        let todos = app.all_todos();
        let view = TodoView::compute(todos, &app.query, now);
        let stats = view.stats;
        let live = match app.live.as_ref() { Some(l) if l.is_live() => "LIVE", _ => "offline" };
        let header = Paragraph::new(format!(
            "Total {} | Pending {} | Completed {} | Overdue {}   [{live}]   (Enter: toggle, n: new, e: edit, d: delete, f/p/o: filters, /: search, x: sign out, q: quit)",
            stats.total, stats.pending, stats.completed, stats.overdue
        ))
        .block(Block::default().borders(Borders::ALL).title("My Todos"));
        f.render_widget(header, chunks[0]);

        let middle = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        let title = format!(
            "items [{}] [{}]{}{}",
            app.query.status.label(),
            app.query.priority.map_or("any priority", |p| p.as_str()),
            if app.query.overdue_only { " [overdue]" } else { "" },
            if app.query.search.is_empty() { String::new() } else { format!(" /{}", app.query.search) },
        );
        let body: Vec<ListItem> = match app.live.as_ref().map(|l| l.store().state()) {
            Some(LiveState::Error(message)) => vec![ListItem::new(format!("Error loading todos: {message}"))],
            Some(LiveState::Loading) | None => vec![ListItem::new("Loading todos...")],
            Some(LiveState::Ready(_)) => match view.empty_message() {
                Some(message) => vec![ListItem::new(message)],
                None => view.visible.iter().map(|t| {
                    let mark = if t.completed { "[x]" } else { "[ ]" };
                    let style = if is_overdue(t, now) { Style::default().fg(Color::Red) } else { Style::default() };
                    ListItem::new(format!("{mark} {} ({})", t.title, t.priority)).style(style)
                }).collect(),
            },
        };
        let detail = app.visible.get(app.selected).and_then(|id| todos.iter().find(|t| t.id == *id)).map(|t| {
            let due = match t.due_date {
                Some(d) if is_overdue(t, now) => format!("{d} (Overdue)"),
                Some(d) if is_due_soon(t, now) => format!("{d} (Due Soon)"),
                Some(d) => d.to_string(),
                None => "-".into(),
            };
            format!(
                "Title:\n{}\n\nStatus: {}\nPriority: {}\nDue: {due}\nCreated: {}\n\nDescription:\n{}",
                t.title,
                if t.completed { "Completed" } else { "Pending" },
                t.priority,
                t.created_at.format("%Y-%m-%d"),
                t.description.as_deref().unwrap_or("(no description)"),
            )
        }).unwrap_or_default();
        f.render_widget(Paragraph::new(detail).block(Block::default().borders(Borders::ALL).title("details")), middle[1]);

        let (footer_title, footer_text) = match app.mode {
            Mode::Create | Mode::Edit => (
                if app.mode == Mode::Create { "create" } else { "edit" },
                format!("{}: {}_  |  (Tab: next field, Enter: save, Esc: cancel)", app.field.label(), app.draft.field(app.field)),
            ),
            Mode::Search => ("search", format!("/{}_  |  (Enter: apply, Esc: clear)", app.query.search)),
            _ => ("info", app.status.clone()),
        };
        f.render_widget(Paragraph::new(footer_text).block(Block::default().borders(Borders::ALL).title(footer_title)), chunks[2]);

        let list = List::new(body)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED))
            .highlight_symbol(">> ");
        f.render_stateful_widget(list, middle[0], &mut app.list_state);
    })?;
    Ok(())
}
