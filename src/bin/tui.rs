mod tui_app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, TableState, Tabs},
    Frame, Terminal,
};

use bse_announcements::config::{Config, DATE_COLUMN};
use bse_announcements::dates::parse_news_datetime;
use bse_announcements::fetcher::AnnouncementFetcher;
use bse_announcements::report::build_report;
use bse_announcements::session::HttpSession;
use bse_announcements::types::{field_text, CATEGORY_COLUMNS};
use tui_app::{format_date, truncate, AppState, DateField, FetchStatus, Tab};

/// Columns shown on the All tab, out of the full table.
const ALL_TAB_COLUMNS: [&str; 4] = ["SCRIP_CD", "SLONGNAME", "HEADLINE", DATE_COLUMN];

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let cfg = Config::from_env().map_err(io::Error::other)?;
    let session = HttpSession::new(&cfg.portal).map_err(io::Error::other)?;
    let fetcher = AnnouncementFetcher::new(session, cfg.portal.clone());

    let today = chrono::Local::now().date_naive();
    let mut app = AppState::new(cfg.default_start_date.min(today), today);

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &fetcher).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    fetcher: &AnnouncementFetcher<HttpSession>,
) -> io::Result<()> {
    let poll_interval = Duration::from_millis(250);

    loop {
        terminal.draw(|f| render(f, app))?;

        if !event::poll(poll_interval)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if app.editing.is_some() {
            match key.code {
                KeyCode::Enter => app.commit_edit(),
                KeyCode::Esc => app.cancel_edit(),
                KeyCode::Backspace => app.pop_char(),
                KeyCode::Char(c) => app.push_char(c),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
            KeyCode::Char('f') | KeyCode::Char('F') => {
                app.begin_fetch();
                // Show the busy status before the fetch blocks the loop.
                terminal.draw(|f| render(f, app))?;
                let (from, to) = app.api_range();
                let result = build_report(fetcher, &from, &to).await;
                app.finish_fetch(result);
            }
            KeyCode::Char('s') => app.begin_edit(DateField::Start),
            KeyCode::Char('e') => app.begin_edit(DateField::End),
            KeyCode::Char('l') => app.show_log = !app.show_log,
            KeyCode::Char('1') => app.select_tab(Tab::Orders),
            KeyCode::Char('2') => app.select_tab(Tab::Capex),
            KeyCode::Char('3') => app.select_tab(Tab::All),
            KeyCode::Tab | KeyCode::Right => app.select_tab(app.tab.next()),
            KeyCode::BackTab | KeyCode::Left => app.select_tab(app.tab.prev()),
            KeyCode::Down | KeyCode::Char('j') => app.scroll_down(),
            KeyCode::Up | KeyCode::Char('k') => app.scroll_up(),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState) {
    let area = f.area();

    // Outer vertical split: header | dates | tabs | body | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(2), // dates + message
            Constraint::Length(3), // tabs
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_dates(f, app, chunks[1]);
    render_tabs(f, app, chunks[2]);
    render_body(f, app, chunks[3]);
    render_footer(f, app, chunks[4]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        FetchStatus::Idle => ("○ idle".to_string(), Color::DarkGray),
        FetchStatus::Fetching => ("◌ fetching…".to_string(), Color::Yellow),
        FetchStatus::Done => ("● ready".to_string(), Color::Green),
        FetchStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };
    let (total, orders, capex) = app.metrics();

    let title_spans = vec![
        Span::styled(
            " BSE Announcements  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(format!("Total {total}"), Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(format!("Orders {orders}"), Style::default().fg(Color::Green)),
        Span::raw("  │  "),
        Span::styled(format!("Capex {capex}"), Style::default().fg(Color::Magenta)),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans))
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn render_dates(f: &mut Frame, app: &AppState, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
    let editing = Style::default().fg(Color::Black).bg(Color::Yellow);

    let field = |which: DateField, date: chrono::NaiveDate| match &app.editing {
        Some(edit) if edit.field == which => Span::styled(format!("{}▏", edit.buffer), editing),
        _ => Span::styled(date.format("%Y-%m-%d").to_string(), value),
    };

    let dates = Line::from(vec![
        Span::styled(" Start ", label),
        field(DateField::Start, app.start),
        Span::styled("   End ", label),
        field(DateField::End, app.end),
    ]);
    let message = Line::from(Span::styled(
        format!(" {}", app.message.as_deref().unwrap_or("")),
        Style::default().fg(Color::Yellow),
    ));

    f.render_widget(Paragraph::new(vec![dates, message]), area);
}

fn render_tabs(f: &mut Frame, app: &AppState, area: Rect) {
    let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()))
        .select(app.tab.index())
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(tabs, area);
}

fn render_body(f: &mut Frame, app: &AppState, area: Rect) {
    if !app.show_log {
        render_table(f, app, area);
        return;
    }

    // Vertical split: table (70%) | fetch log (30%)
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    render_table(f, app, halves[0]);
    render_log(f, app, halves[1]);
}

fn render_table(f: &mut Frame, app: &AppState, area: Rect) {
    let header_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let (headers, rows, widths): (Vec<&str>, Vec<Row>, Vec<Constraint>) = match app.current_view() {
        Some(view) => {
            let rows = view
                .rows
                .iter()
                .map(|r| {
                    Row::new(vec![
                        Cell::from(truncate(&r.company, 30)),
                        Cell::from(r.announcement.clone()),
                        Cell::from(format_date(r.date)).style(Style::default().fg(Color::DarkGray)),
                        Cell::from(r.link.clone()).style(Style::default().fg(Color::Blue)),
                    ])
                })
                .collect();
            let widths = vec![
                Constraint::Length(30),
                Constraint::Min(20),
                Constraint::Length(16),
                Constraint::Percentage(25),
            ];
            (CATEGORY_COLUMNS.to_vec(), rows, widths)
        }
        None => {
            let rows = app
                .report
                .iter()
                .flat_map(|r| r.all.rows.iter())
                .map(|rec| {
                    let date = parse_news_datetime(&field_text(rec, DATE_COLUMN));
                    Row::new(vec![
                        Cell::from(field_text(rec, "SCRIP_CD").into_owned())
                            .style(Style::default().fg(Color::DarkGray)),
                        Cell::from(truncate(&field_text(rec, "SLONGNAME"), 30)),
                        Cell::from(field_text(rec, "HEADLINE").into_owned()),
                        Cell::from(format_date(date)).style(Style::default().fg(Color::DarkGray)),
                    ])
                })
                .collect();
            let widths = vec![
                Constraint::Length(8),
                Constraint::Length(30),
                Constraint::Min(20),
                Constraint::Length(16),
            ];
            (ALL_TAB_COLUMNS.to_vec(), rows, widths)
        }
    };

    let header = Row::new(
        headers
            .into_iter()
            .map(|h| Cell::from(h).style(header_style)),
    )
    .height(1);

    let title = format!(" {} ({}) ", app.tab.title().to_uppercase(), app.row_count());
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    title,
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        )
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = TableState::default();
    state.select(app.selected);
    f.render_stateful_widget(table, area, &mut state);
}

fn render_log(f: &mut Frame, app: &AppState, area: Rect) {
    let entries = app.log_entries();
    // Keep the tail visible.
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = entries
        .iter()
        .skip(entries.len().saturating_sub(visible))
        .map(|e| {
            let color = if e.starts_with("Blocked") { Color::Red } else { Color::Gray };
            ListItem::new(Line::from(Span::styled(e.as_str(), Style::default().fg(color))))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                format!(" FETCH LOG ({}) ", entries.len()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(list, area);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let key = Style::default().fg(Color::Yellow);
    let line = if app.editing.is_some() {
        Line::from(vec![
            Span::styled(" [Enter] ", key),
            Span::raw("apply  "),
            Span::styled("[Esc] ", key),
            Span::raw("cancel  "),
            Span::styled("YYYY-MM-DD or YYYYMMDD", Style::default().fg(Color::DarkGray)),
        ])
    } else {
        Line::from(vec![
            Span::styled(" [q] ", key),
            Span::raw("quit  "),
            Span::styled("[f] ", key),
            Span::raw("fetch  "),
            Span::styled("[s/e] ", key),
            Span::raw("start/end  "),
            Span::styled("[Tab / 1-3] ", key),
            Span::raw("tabs  "),
            Span::styled("[↑↓ / j k] ", key),
            Span::raw("scroll  "),
            Span::styled("[l] ", key),
            Span::raw("log"),
        ])
    };
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
