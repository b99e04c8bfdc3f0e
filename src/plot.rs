//! Terminal chart of a scored SAT series.
//!
//! `AnomalyPlot` is plain data built from the scored readings: point sets
//! for the two labels plus axis bounds. Building it and rendering it into a
//! `Frame` have no side effects, so both are tested headlessly. Only `show`
//! touches the real terminal; it blocks until the viewer is dismissed.

use chrono::DateTime;
use crossterm::cursor::Show;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, LegendPosition};
use std::io::{self, Write};

use crate::model::ScoredReading;

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyPlot {
    pub title: String,
    /// `(unix seconds, max)` for normal readings, in time order.
    pub normal: Vec<(f64, f64)>,
    /// `(unix seconds, max)` for anomalous readings, in time order.
    pub anomalies: Vec<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl AnomalyPlot {
    /// Split the scored series by label.
    pub fn from_scored(scored: &[ScoredReading], title: impl Into<String>) -> Self {
        let mut normal = Vec::new();
        let mut anomalies = Vec::new();
        for s in scored {
            let point = (s.time.timestamp() as f64, s.max);
            if s.label.is_anomaly() {
                anomalies.push(point);
            } else {
                normal.push(point);
            }
        }

        let x_bounds = padded_bounds(scored.iter().map(|s| s.time.timestamp() as f64), 0.0);
        let y_bounds = padded_bounds(scored.iter().map(|s| s.max), 0.05);

        Self {
            title: title.into(),
            normal,
            anomalies,
            x_bounds,
            y_bounds,
        }
    }

    pub fn chart(&self) -> Chart<'_> {
        let datasets = vec![
            Dataset::default()
                .name("Normal")
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Blue))
                .data(&self.normal),
            // unnamed, so it stays out of the legend
            Dataset::default()
                .marker(Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(Color::Blue))
                .data(&self.normal),
            Dataset::default()
                .name("Anomaly")
                .marker(Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(Color::Red))
                .data(&self.anomalies),
        ];

        let [x_min, x_max] = self.x_bounds;
        let [y_min, y_max] = self.y_bounds;

        Chart::new(datasets)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", self.title))
                    .title_bottom(" q / Esc to close "),
            )
            .legend_position(Some(LegendPosition::TopRight))
            .x_axis(
                Axis::default()
                    .title("Time")
                    .style(Style::default().fg(Color::Gray))
                    .bounds(self.x_bounds)
                    .labels(vec![
                        Span::raw(time_label(x_min)),
                        Span::raw(time_label((x_min + x_max) / 2.0)),
                        Span::raw(time_label(x_max)),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("Max Value")
                    .style(Style::default().fg(Color::Gray))
                    .bounds(self.y_bounds)
                    .labels(vec![
                        Span::raw(format!("{:.1}", y_min)),
                        Span::raw(format!("{:.1}", (y_min + y_max) / 2.0)),
                        Span::raw(format!("{:.1}", y_max)),
                    ]),
            )
    }

    pub fn render(&self, frame: &mut Frame) {
        frame.render_widget(self.chart(), frame.area());
    }
}

/// Min/max of `values` widened by `pad` of the range. Degenerate ranges are
/// widened by one unit each side so the chart still has an extent.
fn padded_bounds(values: impl Iterator<Item = f64>, pad: f64) -> [f64; 2] {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }
    if max <= min {
        return [min - 1.0, max + 1.0];
    }
    let margin = (max - min) * pad;
    [min - margin, max + margin]
}

fn time_label(unix_seconds: f64) -> String {
    DateTime::from_timestamp(unix_seconds as i64, 0)
        .map(|t| t.format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Keys that close the viewer.
pub fn is_dismiss_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Draw the chart full-screen and block until the viewer is dismissed.
///
/// The terminal is restored on every exit path, including a failed setup.
pub fn show(plot: &AnomalyPlot) -> io::Result<()> {
    enable_raw_mode()?;
    let result = open_viewer(plot);
    let restored = restore_terminal(&mut io::stdout());
    result.and(restored)
}

fn open_viewer(plot: &AnomalyPlot) -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    run_viewer(&mut terminal, plot)
}

/// Leave raw mode and the alternate screen. Both steps always run.
fn restore_terminal<W: Write>(out: &mut W) -> io::Result<()> {
    let raw = disable_raw_mode();
    let screen = execute!(out, LeaveAlternateScreen, Show);
    raw.and(screen)
}

fn run_viewer<B: Backend>(terminal: &mut Terminal<B>, plot: &AnomalyPlot) -> io::Result<()> {
    loop {
        terminal.draw(|frame| plot.render(frame))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && is_dismiss_key(&key) {
                return Ok(());
            }
        }
    }
}
