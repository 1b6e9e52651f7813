use anyhow::Result;
use barangay_distribution::{format_pesos, DistributionRegistry, Household};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Households,
    Resources,
    Allocations,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Households => Page::Resources,
            Page::Resources => Page::Allocations,
            Page::Allocations => Page::Households,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Households => Page::Allocations,
            Page::Resources => Page::Households,
            Page::Allocations => Page::Resources,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Households => "Households",
            Page::Resources => "Resources",
            Page::Allocations => "Allocations",
        }
    }
}

pub struct App {
    pub registry: DistributionRegistry,
    pub current_page: Page,
    pub household_state: TableState,
    pub resource_state: TableState,
    pub allocation_state: TableState,
    pub show_detail: bool,
    /// Last action result, shown in the status bar
    pub message: Option<String>,
    /// Set once the registry has been changed from the UI
    pub dirty: bool,
}

impl App {
    pub fn new(registry: DistributionRegistry) -> Self {
        let mut household_state = TableState::default();
        if !registry.households.is_empty() {
            household_state.select(Some(0));
        }

        let mut resource_state = TableState::default();
        resource_state.select(Some(0));

        let mut allocation_state = TableState::default();
        if registry.has_plan() {
            allocation_state.select(Some(0));
        }

        Self {
            registry,
            current_page: Page::Households,
            household_state,
            resource_state,
            allocation_state,
            show_detail: false,
            message: None,
            dirty: false,
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    /// Households in priority order, as listed on the Households page
    pub fn ranked_households(&self) -> Vec<&Household> {
        self.registry.households_by_priority()
    }

    /// Households with a grant, in priority order
    pub fn allocated_households(&self) -> Vec<&Household> {
        self.registry
            .households_by_priority()
            .into_iter()
            .filter(|h| self.registry.allocation_for(h.id).is_some_and(|a| !a.is_empty()))
            .collect()
    }

    pub fn selected_household(&self) -> Option<&Household> {
        match self.current_page {
            Page::Households => self
                .household_state
                .selected()
                .and_then(|i| self.ranked_households().get(i).copied()),
            Page::Allocations => self
                .allocation_state
                .selected()
                .and_then(|i| self.allocated_households().get(i).copied()),
            Page::Resources => None,
        }
    }

    fn page_len(&self) -> usize {
        match self.current_page {
            Page::Households => self.registry.households.len(),
            Page::Resources => self.registry.catalog.len(),
            Page::Allocations => self.allocated_households().len(),
        }
    }

    fn page_state(&mut self) -> &mut TableState {
        match self.current_page {
            Page::Households => &mut self.household_state,
            Page::Resources => &mut self.resource_state,
            Page::Allocations => &mut self.allocation_state,
        }
    }

    pub fn next(&mut self) {
        let len = self.page_len();
        if len == 0 {
            return;
        }
        let state = self.page_state();
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.page_len();
        if len == 0 {
            return;
        }
        let state = self.page_state();
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    /// Run the allocation engine and report the outcome in the status bar
    pub fn allocate(&mut self) {
        match self.registry.allocate() {
            Ok(outcome) => {
                self.message = Some(format!(
                    "Allocated to {} households, cost ₱{}, remaining ₱{}",
                    outcome.served_count(),
                    format_pesos(outcome.total_cost),
                    format_pesos(outcome.remaining_budget),
                ));
                self.allocation_state.select(if outcome.served_count() > 0 { Some(0) } else { None });
                self.dirty = true;
            }
            Err(e) => self.message = Some(format!("Allocation failed: {}", e)),
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('a') => app.allocate(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page != Page::Resources {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_page(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_page(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_page(f: &mut Frame, area: Rect, app: &mut App) {
    match app.current_page {
        Page::Households => render_households(f, area, app),
        Page::Resources => render_resources(f, area, app),
        Page::Allocations => render_allocations(f, area, app),
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in [Page::Households, Page::Resources, Page::Allocations].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    let remaining = app.registry.remaining_budget();
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Households: {}", app.registry.households.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Budget: ₱{}", format_pesos(app.registry.budget)),
        Style::default().fg(Color::Cyan),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Remaining: ₱{}", format_pesos(remaining)),
        Style::default().fg(if remaining > 0 { Color::Green } else { Color::Red }),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn page_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn highlight() -> Style {
    Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
}

fn render_households(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .ranked_households()
        .into_iter()
        .map(|h| {
            let vulnerable = h.profile().vulnerable();
            let color = if vulnerable > 0 { Color::Red } else { Color::White };
            Row::new(vec![
                Cell::from(h.id.to_string()),
                Cell::from(truncate(&h.name, 28)),
                Cell::from(h.members.to_string()),
                Cell::from(truncate(&h.ages_display(), 24)),
                Cell::from(h.priority_score.to_string()).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(30),
            Constraint::Length(9),
            Constraint::Length(26),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&["ID", "Household Head", "Members", "Ages", "Priority"]))
    .block(page_block(" Households - by priority "))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.household_state);
}

fn render_resources(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .registry
        .catalog
        .iter()
        .map(|r| {
            let color = if r.available == 0 { Color::Red } else { Color::Green };
            Row::new(vec![
                Cell::from(r.name.clone()),
                Cell::from(format!("₱{}", format_pesos(r.cost))),
                Cell::from(r.available.to_string()).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Length(20), Constraint::Length(14), Constraint::Length(12)],
    )
    .header(header_row(&["Resource", "Unit Cost", "Available"]))
    .block(page_block(" Resources - current stock "))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.resource_state);
}

fn render_allocations(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .allocated_households()
        .into_iter()
        .map(|h| {
            let cost = app
                .registry
                .household_details(h.id)
                .map(|d| d.total_cost)
                .unwrap_or(0);
            let items = app
                .registry
                .allocation_for(h.id)
                .map(|a| {
                    a.iter()
                        .map(|(name, qty)| format!("{} x{}", name, qty))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            Row::new(vec![
                Cell::from(h.id.to_string()),
                Cell::from(truncate(&h.name, 24)),
                Cell::from(truncate(&items, 50)),
                Cell::from(format!("₱{}", format_pesos(cost))).style(Style::default().fg(Color::Green)),
            ])
        })
        .collect();

    let title = if app.registry.has_plan() {
        format!(" Allocations - total ₱{} ", format_pesos(app.registry.total_cost()))
    } else {
        " Allocations - press 'a' to allocate ".to_string()
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(26),
            Constraint::Length(52),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["ID", "Household Head", "Resources", "Cost"]))
    .block(page_block(&title))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.allocation_state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Household Details ");

    let details = match app
        .selected_household()
        .and_then(|h| app.registry.household_details(h.id).ok())
    {
        Some(d) => d,
        None => {
            f.render_widget(Paragraph::new("No household selected").block(block), area);
            return;
        }
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut content = vec![
        Line::from(""),
        Line::from(vec![Span::styled("  Head: ", label), Span::raw(details.household.name.clone())]),
        Line::from(vec![
            Span::styled("  Members: ", label),
            Span::raw(details.household.members.to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Max Age: ", label),
            Span::raw(details.max_age.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string())),
        ]),
        Line::from(vec![
            Span::styled("  Priority: ", label),
            Span::raw(details.household.priority_score.to_string()),
        ]),
        Line::from(""),
        Line::from(Span::styled("  Age Groups", label)),
    ];

    for (bracket, ages) in &details.age_groups {
        content.push(Line::from(format!(
            "    {}: {}",
            bracket.label(),
            ages.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ")
        )));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled("  Allocation", label)));
    if details.allocations.is_empty() {
        content.push(Line::from(Span::styled(
            "    Nothing allocated",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }
    for line in &details.allocations {
        content.push(Line::from(format!(
            "    {} x{}  ₱{}",
            line.resource,
            line.quantity,
            format_pesos(line.cost)
        )));
    }
    content.push(Line::from(vec![
        Span::styled("  Total: ", label),
        Span::styled(format!("₱{}", format_pesos(details.total_cost)), Style::default().fg(Color::Green)),
    ]));

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if let Some(message) = &app.message {
        status_spans.push(Span::styled(format!(" {} ", message), Style::default().fg(Color::Green)));
        status_spans.push(Span::raw(" | "));
    }

    for (key, action, color) in [
        ("Enter", " Details | ", Color::Yellow),
        ("Tab", " Page | ", Color::Yellow),
        ("↑/↓", " Nav | ", Color::Yellow),
        ("a", " Allocate | ", Color::Yellow),
        ("q", " Quit", Color::Red),
    ] {
        status_spans.push(Span::styled(key, Style::default().fg(color)));
        status_spans.push(Span::raw(action));
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
