mod clipboard;
mod help;
mod state;

use crate::cli::{build_config, Cli};
use crate::fetch::RunFetcher;
use crate::model::{CycleEvent, MonitorConfig, SummaryCounts, Trigger};
use crate::orchestrator::{self, UiCommand};
use crate::render::{
    self, Listing, ReportCell, RunRow, StatusBadge, TimeFormat, ViewOptions, COLUMNS,
    NOT_AVAILABLE,
};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Terminal,
};
use state::UiState;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const COLUMN_WIDTHS: [Constraint; 7] = [
    Constraint::Length(12),
    Constraint::Length(14),
    Constraint::Length(11),
    Constraint::Length(12),
    Constraint::Length(19),
    Constraint::Length(19),
    Constraint::Min(11),
];

fn push_wrapped_kv(out: &mut Vec<Line<'static>>, label: &str, value: &str, area_width: u16) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = remaining.len().min(usize::from(line_width));
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}

pub async fn run(args: Cli, time: TimeFormat) -> Result<()> {
    let cfg = build_config(&args);
    let fetcher = Arc::new(RunFetcher::new(&cfg)?);
    let opts = ViewOptions::new(&cfg, time);

    let (event_tx, event_rx) = mpsc::unbounded_channel::<CycleEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_cfg = cfg.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_cfg, opts, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&cfg, fetcher, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    cfg: MonitorConfig,
    opts: ViewOptions,
    mut event_rx: UnboundedReceiver<CycleEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(&cfg);
    if !cfg.fetch_on_launch {
        state.info = "Press r to load test runs".into();
    }

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, &opts, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('r')) => {
                        let _ = cmd_tx.send(UiCommand::Refresh);
                    }
                    (_, KeyCode::Tab) => {
                        state.tab = (state.tab + 1) % 2;
                    }
                    (_, KeyCode::Char('?')) => {
                        state.tab = 1;
                    }
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.select_prev(),
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.select_next(),
                    (_, KeyCode::Char('y')) => clipboard::copy_selected_report(&mut state),
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn apply_event(state: &mut UiState, opts: &ViewOptions, ev: CycleEvent) {
    match ev {
        CycleEvent::CycleStarted { cycle, trigger } => {
            state.in_flight = true;
            state.info = match trigger {
                Trigger::Launch => "Loading test runs…".into(),
                Trigger::Manual => format!("Refreshing (cycle {cycle})…"),
                Trigger::Poll => format!("Polling (cycle {cycle})…"),
            };
        }
        CycleEvent::CycleCompleted { outcome, .. } => {
            render::render(&outcome, opts, state);
            state.in_flight = false;
            state.last_refresh = Some(opts.time.format(OffsetDateTime::now_utc()));
            state.info = match &outcome {
                Ok(runs) => format!("Loaded {} run(s)", runs.len()),
                Err(e) => format!("Refresh failed: {e}"),
            };
        }
        CycleEvent::CycleAborted { reason, .. } => {
            render::render_aborted(&reason, state);
            state.in_flight = false;
            state.info = format!("Refresh aborted: {reason}");
        }
        CycleEvent::TriggerIgnored {
            trigger: Trigger::Manual,
        } => {
            state.info = "Refresh already in progress".into();
        }
        CycleEvent::TriggerIgnored { .. } => {}
        CycleEvent::Info(info) => {
            state.info = info.to_message().into();
        }
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Dashboard"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("testrun-monitor"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_dashboard(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Summary cards
                Constraint::Min(5),    // Run listing
                Constraint::Length(8), // Selected run details
                Constraint::Length(3), // Status line
            ]
            .as_ref(),
        )
        .split(area);

    draw_summary(main[0], f, &state.view.summary);
    draw_listing(main[1], f, state);
    draw_detail(main[2], f, state);
    draw_status(main[3], f, state);
}

fn draw_summary(area: Rect, f: &mut ratatui::Frame, summary: &SummaryCounts) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4].as_ref())
        .split(area);

    let values = [
        ("Total", summary.total, Color::White),
        ("Completed", summary.completed, Color::Green),
        ("Failed", summary.failed, Color::Red),
        ("Running", summary.running, Color::Yellow),
    ];
    for ((title, value, color), card) in values.into_iter().zip(cards.iter()) {
        let p = Paragraph::new(Line::from(Span::styled(
            value.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )))
        .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(p, *card);
    }
}

fn status_color(badge: &StatusBadge) -> Color {
    if !badge.known {
        return Color::Magenta;
    }
    match badge.class.as_str() {
        "status-completed" => Color::Green,
        "status-failed" => Color::Red,
        "status-running" => Color::Yellow,
        _ => Color::Cyan,
    }
}

fn table_row(row: &RunRow) -> Row<'static> {
    let [id, environment, status, failed, start, end, report] = row.cells();
    let report_style = match row.report {
        ReportCell::Link { .. } => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::UNDERLINED),
        ReportCell::NotAvailable => Style::default().fg(Color::DarkGray),
    };
    Row::new(vec![
        Cell::from(id),
        Cell::from(environment),
        Cell::from(status).style(Style::default().fg(status_color(&row.status))),
        Cell::from(failed),
        Cell::from(start),
        Cell::from(end),
        Cell::from(report).style(report_style),
    ])
}

fn draw_listing(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = state.view.rows();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Test runs ({})", rows.len()));
    let header = Row::new(COLUMNS).style(
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::BOLD),
    );

    match state.view.listing.message() {
        Some(message) => {
            // Message states span the whole listing below the header row.
            let inner = block.inner(area);
            f.render_widget(block, area);
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(0)].as_ref())
                .split(inner);
            f.render_widget(
                Table::new(Vec::<Row>::new(), COLUMN_WIDTHS).header(header),
                parts[0],
            );
            let style = match state.view.listing {
                Listing::Error { .. } => Style::default().fg(Color::Red),
                _ => Style::default().fg(Color::Gray),
            };
            f.render_widget(
                Paragraph::new(message).style(style).wrap(Wrap { trim: true }),
                parts[1],
            );
        }
        None => {
            let table = Table::new(rows.iter().map(table_row), COLUMN_WIDTHS)
                .header(header)
                .block(block)
                .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                .highlight_symbol("> ");
            let mut table_state = TableState::default().with_selected(Some(state.selected));
            f.render_stateful_widget(table, area, &mut table_state);
        }
    }
}

fn draw_detail(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines = Vec::new();
    match state.selected_row() {
        Some(row) => {
            push_wrapped_kv(&mut lines, "Run", &row.id, area.width);
            push_wrapped_kv(
                &mut lines,
                "Report",
                row.report.target().unwrap_or(NOT_AVAILABLE),
                area.width,
            );
            for (label, value) in [
                ("Tags", &row.tags),
                ("Error", &row.error_message),
                ("Details", &row.error_details),
                ("Screenshot", &row.screenshot_path),
            ] {
                if let Some(value) = value {
                    push_wrapped_kv(&mut lines, label, value, area.width);
                }
            }
        }
        None => lines.push(Line::from(Span::styled(
            "No run selected",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Details"));
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let polling = match state.poll_interval {
        Some(d) => format!("every {}", humantime::format_duration(d)),
        None => "off".into(),
    };
    let mut spans = vec![
        Span::styled("Endpoint: ", Style::default().fg(Color::Gray)),
        Span::raw(state.endpoint_url.clone()),
        Span::styled("  Polling: ", Style::default().fg(Color::Gray)),
        Span::raw(polling),
        Span::styled("  Last refresh: ", Style::default().fg(Color::Gray)),
        Span::raw(
            state
                .last_refresh
                .clone()
                .unwrap_or_else(|| "never".into()),
        ),
    ];
    if state.in_flight {
        spans.push(Span::styled("  ⟳", Style::default().fg(Color::Yellow)));
    }
    if !state.info.is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::raw(state.info.clone()));
    }

    let p = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Status (r refresh, y copy report URL, ? help, q quit)"),
    );
    f.render_widget(p, area);
}
