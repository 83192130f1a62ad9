//! Temple TUI - Live staff dashboard for the crowd-safety service
//!
//! Polls the backend REST API and displays:
//! - Peace-of-mind gauge and crowd summary (count, comfort, wait estimate)
//! - Facility intensity table (live vs estimated counts, severity)
//! - SOS alert queue with raise/acknowledge/resolve actions
//! - Recent crowd history sparkline and hourly forecast

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
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Row, Sparkline, Table},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use temple_watch::domain::alert::{AlertStatus, EmergencyAlert};
use temple_watch::domain::classify::{classify, prescriptive, Severity};
use temple_watch::domain::types::{AlertId, FacilityPoint, OccupancySample};
use temple_watch::infra::Config;
use temple_watch::io::api::Prediction;
use temple_watch::io::{SosCreateRequest, TempleApi};
use temple_watch::services::{facility_intensity, AlertFeed};
use tokio::sync::Mutex;

/// Maximum history points kept for the sparkline
const MAX_HISTORY: usize = 60;

/// Dashboard state shared between the poll task and the UI
#[derive(Default)]
struct DashboardState {
    sample: Option<OccupancySample>,
    history: Vec<u64>,
    predictions: Vec<Prediction>,
    selected_alert: usize,
    inline_message: Option<String>,
    connected: bool,
    last_poll: Option<Instant>,
}

type SharedState = Arc<Mutex<DashboardState>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let config = Config::load_from_path(&Config::resolve_config_path(&args));
    let api = TempleApi::new(&config);
    let feed = Arc::new(AlertFeed::new());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let state = Arc::new(Mutex::new(DashboardState::default()));

    let poll_state = state.clone();
    let poll_api = api.clone();
    let poll_feed = feed.clone();
    let poll_interval = config.poll_interval();
    let poll_handle = tokio::spawn(async move {
        run_poller(poll_api, poll_feed, poll_state, poll_interval).await;
    });

    let result = run_ui(&mut terminal, state, api, feed, &config).await;

    poll_handle.abort();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

async fn run_poller(api: TempleApi, feed: Arc<AlertFeed>, state: SharedState, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let live = api.live_data().await;
        let alerts = api.sos_alerts().await;
        let history = api.crowd_history(MAX_HISTORY).await;
        let predictions = api.prediction_data().await;

        let mut s = state.lock().await;
        match live {
            Ok(sample) => {
                s.connected = true;
                s.sample = Some(sample);
            }
            Err(_) => s.connected = false,
        }
        if let Ok(remote) = alerts {
            feed.merge_remote(remote);
        }
        if let Ok(entries) = history {
            s.history = entries.iter().map(|e| e.person_count as u64).collect();
            s.history.truncate(MAX_HISTORY);
            s.history.reverse();
        }
        if let Ok(forecast) = predictions {
            s.predictions = forecast.predictions;
        }
        s.last_poll = Some(Instant::now());
    }
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: SharedState,
    api: TempleApi,
    feed: Arc<AlertFeed>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        let alerts = feed.active();
        {
            let mut s = state.lock().await;
            if s.selected_alert >= alerts.len() && !alerts.is_empty() {
                s.selected_alert = alerts.len() - 1;
            }
            terminal.draw(|f| draw_ui(f, &s, &alerts, config.facilities()))?;
        }

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Up | KeyCode::Char('k') => {
                            let mut s = state.lock().await;
                            s.selected_alert = s.selected_alert.saturating_sub(1);
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let mut s = state.lock().await;
                            if s.selected_alert + 1 < alerts.len() {
                                s.selected_alert += 1;
                            }
                        }
                        KeyCode::Char('a') => {
                            let selected = state.lock().await.selected_alert;
                            if let Some(alert) = alerts.get(selected) {
                                transition(&api, &feed, &state, alert.id, AlertStatus::Acknowledged);
                            }
                        }
                        KeyCode::Char('r') => {
                            let selected = state.lock().await.selected_alert;
                            if let Some(alert) = alerts.get(selected) {
                                transition(&api, &feed, &state, alert.id, AlertStatus::Resolved);
                            }
                        }
                        KeyCode::Char('s') => {
                            let (lat, lon) = config.map_center();
                            raise_sos(&api, &feed, &state, lat, lon);
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

/// Raise an SOS at the given position via POST /sos; the created alert
/// enters the local feed with status `new`
fn raise_sos(api: &TempleApi, feed: &Arc<AlertFeed>, state: &SharedState, lat: f64, lon: f64) {
    let api = api.clone();
    let feed = feed.clone();
    let state = state.clone();
    tokio::spawn(async move {
        let request = SosCreateRequest {
            location_lat: lat,
            location_lon: lon,
            description: Some("Raised from staff console".to_string()),
        };
        let result = api.create_sos(&request).await;
        let mut s = state.lock().await;
        match result {
            Ok(alert) => {
                s.inline_message = Some(format!("SOS #{} raised", alert.id));
                feed.insert(alert);
            }
            Err(e) => s.inline_message = Some(format!("SOS failed: {}", e)),
        }
    });
}

/// Push a status transition to the backend; on success mirror it into the
/// local feed, on failure surface the error inline without changing state
fn transition(
    api: &TempleApi,
    feed: &Arc<AlertFeed>,
    state: &SharedState,
    id: AlertId,
    to: AlertStatus,
) {
    let api = api.clone();
    let feed = feed.clone();
    let state = state.clone();
    tokio::spawn(async move {
        let result = match to {
            AlertStatus::Resolved => api.resolve_alert(id).await,
            _ => api.acknowledge_alert(id).await,
        };
        let mut s = state.lock().await;
        match result {
            Ok(alert) => {
                feed.merge_remote(vec![alert]);
                s.inline_message = None;
            }
            Err(e) => s.inline_message = Some(format!("Alert #{}: {}", id, e)),
        }
    });
}

fn draw_ui(f: &mut Frame, state: &DashboardState, alerts: &[EmergencyAlert], facilities: &[FacilityPoint]) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(5), // Gauge + summary
            Constraint::Min(0),    // Facilities + alerts
            Constraint::Length(4), // History sparkline
        ])
        .split(f.area());

    draw_header(f, main_chunks[0], state, alerts);
    draw_summary(f, main_chunks[1], state);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(main_chunks[2]);

    draw_facility_panel(f, middle[0], state, facilities);
    draw_alert_panel(f, middle[1], state, alerts);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(main_chunks[3]);

    draw_history(f, bottom[0], state);
    draw_forecast(f, bottom[1], state);
}

fn draw_header(f: &mut Frame, area: Rect, state: &DashboardState, alerts: &[EmergencyAlert]) {
    let status_color = if state.connected { Color::Green } else { Color::Red };
    let status_text = if state.connected { "CONNECTED" } else { "DISCONNECTED" };

    let last_poll = state
        .last_poll
        .map(|t| format!("{}s ago", t.elapsed().as_secs()))
        .unwrap_or_else(|| "never".to_string());

    let mut spans = vec![
        Span::styled("Temple Watch ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("| "),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw(" | Poll: "),
        Span::raw(last_poll),
        Span::raw(" | Active SOS: "),
        Span::styled(format!("{}", alerts.len()), Style::default().fg(Color::Red)),
        Span::raw(" | 'a' ack, 'r' resolve, 's' sos, 'q' quit"),
    ];

    if let Some(msg) = &state.inline_message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(msg.clone(), Style::default().fg(Color::Yellow)));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_summary(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    match &state.sample {
        Some(sample) => {
            let classification = classify(sample.count);
            let advice = prescriptive(sample.count);

            let gauge = Gauge::default()
                .block(Block::default().title(" Peace of Mind ").borders(Borders::ALL))
                .gauge_style(Style::default().fg(severity_color(classification.severity)))
                .percent(classification.score as u16)
                .label(format!("{} ({}%)", classification.comfort.as_str(), classification.score));
            f.render_widget(gauge, chunks[0]);

            let summary = Paragraph::new(vec![
                Line::from(vec![
                    Span::raw("Pilgrims: "),
                    Span::styled(
                        format!("{}", sample.count),
                        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  Wait: "),
                    Span::styled(classification.wait_estimate, Style::default().fg(Color::Yellow)),
                ]),
                Line::from(Span::raw(advice.message)),
                Line::from(Span::styled(advice.suggestion, Style::default().fg(Color::DarkGray))),
            ])
            .block(Block::default().title(" Crowd Summary ").borders(Borders::ALL));
            f.render_widget(summary, chunks[1]);
        }
        None => {
            let waiting = Paragraph::new("Waiting for first sample...")
                .block(Block::default().title(" Crowd Summary ").borders(Borders::ALL));
            f.render_widget(waiting, chunks[1]);
        }
    }
}

fn draw_facility_panel(f: &mut Frame, area: Rect, state: &DashboardState, facilities: &[FacilityPoint]) {
    let mut rows: Vec<Row> = Vec::new();

    if let Some(sample) = &state.sample {
        for facility in facilities {
            let (intensity, is_observed) = facility_intensity(facility, sample);
            let classification = classify(intensity);

            rows.push(
                Row::new(vec![
                    facility.name.clone(),
                    format!("{}", intensity),
                    classification.severity.as_str().to_string(),
                    if is_observed { "live".to_string() } else { "est.".to_string() },
                ])
                .style(Style::default().fg(severity_color(classification.severity))),
            );
        }
    }

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(6),
        ],
    )
    .header(
        Row::new(vec!["Facility", "Count", "Severity", "Src"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .title(" Facility Intensity ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );

    f.render_widget(table, area);
}

fn draw_alert_panel(f: &mut Frame, area: Rect, state: &DashboardState, alerts: &[EmergencyAlert]) {
    let items: Vec<ListItem> = alerts
        .iter()
        .enumerate()
        .map(|(i, alert)| {
            let color = match alert.status {
                AlertStatus::New => Color::Red,
                AlertStatus::Acknowledged => Color::Yellow,
                AlertStatus::Resolved => Color::Green,
            };

            let mut style = Style::default();
            if i == state.selected_alert {
                style = style.add_modifier(Modifier::REVERSED);
            }

            ListItem::new(Line::from(vec![
                Span::styled(format!("#{:<4}", alert.id), Style::default().fg(color)),
                Span::raw(format!(" {:<12} ", alert.status.as_str())),
                Span::raw(alert.created_at.format("%H:%M:%S").to_string()),
                Span::styled(
                    alert
                        .description
                        .as_deref()
                        .map(|d| format!("  {}", d))
                        .unwrap_or_default(),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
            .style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" SOS Alerts ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    );

    f.render_widget(list, area);
}

fn draw_history(f: &mut Frame, area: Rect, state: &DashboardState) {
    let sparkline = Sparkline::default()
        .block(Block::default().title(" Crowd History ").borders(Borders::ALL))
        .data(&state.history)
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(sparkline, area);
}

fn draw_forecast(f: &mut Frame, area: Rect, state: &DashboardState) {
    let line: Vec<Span> = state
        .predictions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            Span::styled(
                format!("+{}h {} ({:.0}%)  ", i + 1, p.predicted_count, p.confidence * 100.0),
                Style::default().fg(severity_color(classify(p.predicted_count).severity)),
            )
        })
        .collect();

    let forecast = Paragraph::new(Line::from(line))
        .block(Block::default().title(" Forecast ").borders(Borders::ALL));
    f.render_widget(forecast, area);
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Normal => Color::Green,
        Severity::Moderate => Color::Yellow,
        Severity::High | Severity::Critical => Color::Red,
        Severity::Extreme => Color::Magenta,
    }
}
