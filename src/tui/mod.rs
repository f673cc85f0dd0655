//! Ratatui-based terminal UI.
//!
//! The dashboard shows a year list on the left (toggle years to filter the
//! KPIs), four KPI cards on top, a tabbed Plotters chart and a detail table.

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table},
    Terminal,
};
use tracing::info;

use crate::app::pipeline::Session;
use crate::error::AppError;
use crate::io::ingest::LoadedTable;
use crate::metrics::Dashboard;
use crate::report::{fmt_thousands, fmt_year_list, kpi_cards, NO_DATA};

mod plotters_chart;
mod series;

use plotters_chart::DashboardChart;
use series::{chart_data, ChartData, ChartTab};

/// Start the TUI for `source`.
///
/// The first load happens before the terminal is taken over, so a bad source is
/// reported as a normal error.
pub fn run(source: PathBuf, requested: Option<BTreeSet<i32>>) -> Result<(), AppError> {
    let mut app = App::new(Session::new(source), requested)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// The year list: available years, which are selected, and the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct YearSelection {
    years: Vec<i32>,
    selected: BTreeSet<i32>,
    cursor: usize,
}

impl YearSelection {
    /// Start with `requested` (or every year when `None`).
    fn new(years: Vec<i32>, requested: Option<&BTreeSet<i32>>) -> Self {
        let selected = match requested {
            Some(req) => req.clone(),
            None => years.iter().copied().collect(),
        };
        Self {
            years,
            selected,
            cursor: 0,
        }
    }

    fn current(&self) -> Option<i32> {
        self.years.get(self.cursor).copied()
    }

    fn up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn down(&mut self) {
        if self.cursor + 1 < self.years.len() {
            self.cursor += 1;
        }
    }

    fn toggle_current(&mut self) {
        let Some(year) = self.current() else { return };
        if !self.selected.remove(&year) {
            self.selected.insert(year);
        }
    }

    fn select_all(&mut self) {
        self.selected = self.years.iter().copied().collect();
    }

    fn clear(&mut self) {
        self.selected.clear();
    }

    fn is_all(&self) -> bool {
        self.years.iter().all(|y| self.selected.contains(y))
    }

    /// Adopt the year list of a reloaded table.
    ///
    /// A full selection stays full (new years join it); otherwise the selection
    /// keeps only years that still exist.
    fn refresh(&mut self, years: Vec<i32>) {
        let was_all = !self.years.is_empty() && self.is_all();
        let kept: BTreeSet<i32> = years
            .iter()
            .copied()
            .filter(|y| self.selected.contains(y))
            .collect();
        self.selected = if was_all { years.iter().copied().collect() } else { kept };
        self.years = years;
        self.cursor = self.cursor.min(self.years.len().saturating_sub(1));
    }
}

struct App {
    session: Session,
    table: Option<Arc<LoadedTable>>,
    years: YearSelection,
    dashboard: Option<Dashboard>,
    tab: ChartTab,
    status: String,
}

impl App {
    fn new(mut session: Session, requested: Option<BTreeSet<i32>>) -> Result<Self, AppError> {
        let table = session.table()?;
        let years = YearSelection::new(table.years(), requested.as_ref());
        let status = format!(
            "Loaded {} year(s) from {}",
            table.records.len(),
            session.source().display()
        );

        let mut app = Self {
            session,
            table: Some(table),
            years,
            dashboard: None,
            tab: ChartTab::default(),
            status,
        };
        app.recompute();
        Ok(app)
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up | KeyCode::Char('k') => self.years.up(),
            KeyCode::Down | KeyCode::Char('j') => self.years.down(),
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.years.toggle_current();
                self.recompute();
            }
            KeyCode::Char('a') => {
                self.years.select_all();
                self.recompute();
            }
            KeyCode::Char('c') => {
                self.years.clear();
                self.recompute();
            }
            KeyCode::Tab | KeyCode::Right => self.tab = self.tab.next(),
            KeyCode::BackTab | KeyCode::Left => self.tab = self.tab.prev(),
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        false
    }

    fn reload(&mut self) {
        match self.session.reload() {
            Ok(table) => {
                self.years.refresh(table.years());
                self.status = format!(
                    "Reloaded {} year(s), {} skipped row(s)",
                    table.records.len(),
                    table.row_issues.len()
                );
                info!(source = %self.session.source().display(), "reloaded");
                self.table = Some(table);
            }
            Err(err) => {
                // No stale data after a failed reload.
                self.table = None;
                self.status = format!("Reload failed: {err}");
            }
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        self.dashboard = self
            .table
            .as_ref()
            .map(|table| self.session.dashboard(table, &self.years.selected));
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(5),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_kpis(frame, chunks[1]);
        self.draw_body(frame, chunks[2]);
        self.draw_footer(frame, chunks[3]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let info = match &self.table {
            Some(table) => format!(
                "{} | years: {} | skipped rows: {}",
                table.source.display(),
                fmt_year_list(&self.years.selected.iter().copied().collect::<Vec<_>>()),
                table.row_issues.len()
            ),
            None => format!("{} | (not loaded)", self.session.source().display()),
        };
        let line = Line::from(vec![
            Span::styled("procure", Style::default().fg(Color::Cyan)),
            Span::raw(" 구매현황 대시보드  "),
            Span::styled(info, Style::default().fg(Color::Gray)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_kpis(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(area);

        let Some(dashboard) = &self.dashboard else {
            for col in cols.iter() {
                let p = Paragraph::new(NO_DATA).block(Block::default().borders(Borders::ALL));
                frame.render_widget(p, *col);
            }
            return;
        };

        for (card, col) in kpi_cards(&dashboard.kpis).into_iter().zip(cols.iter()) {
            let mut value = vec![Span::styled(
                card.value,
                Style::default().add_modifier(Modifier::BOLD),
            )];
            if let Some(delta) = card.delta {
                let color = if delta.starts_with('-') { Color::Red } else { Color::Green };
                value.push(Span::raw("  "));
                value.push(Span::styled(delta, Style::default().fg(color)));
            }
            let mut lines = vec![Line::from(value)];
            if let Some(note) = card.note {
                lines.push(Line::from(Span::styled(note, Style::default().fg(Color::DarkGray))));
            }

            let p = Paragraph::new(Text::from(lines))
                .block(Block::default().title(card.label).borders(Borders::ALL));
            frame.render_widget(p, *col);
        }
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(16), Constraint::Min(0)])
            .split(area);
        self.draw_years(frame, cols[0]);

        let rows = self.dashboard.as_ref().map(|d| d.filtered.len()).unwrap_or(0) as u16;
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length((rows + 3).min(12))])
            .split(cols[1]);
        self.draw_chart(frame, right[0]);
        self.draw_table(frame, right[1]);
    }

    fn draw_years(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .years
            .years
            .iter()
            .map(|y| {
                let mark = if self.years.selected.contains(y) { "[x]" } else { "[ ]" };
                ListItem::new(format!("{mark} {y}"))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("연도").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        if !self.years.years.is_empty() {
            state.select(Some(self.years.cursor));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let titles: Vec<Span> = ChartTab::ALL
            .iter()
            .map(|&t| {
                if t == self.tab {
                    Span::styled(format!(" {} ", t.title()), Style::default().fg(Color::Black).bg(Color::Cyan))
                } else {
                    Span::styled(format!(" {} ", t.title()), Style::default().fg(Color::Gray))
                }
            })
            .collect();
        let block = Block::default().title(Line::from(titles)).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(data) = self.dashboard.as_ref().and_then(|d| chart_data(d, self.tab)) else {
            let msg = Paragraph::new("No data for the current selection.")
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center);
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = DashboardChart {
            series: &data.series,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, &data);
        }
    }

    fn draw_table(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("상세 데이터").borders(Borders::ALL);
        let (Some(dashboard), Some(table)) = (&self.dashboard, &self.table) else {
            frame.render_widget(Paragraph::new(NO_DATA).block(block), area);
            return;
        };

        let mut header = vec![Cell::from("연"), Cell::from("전체 구매금액")];
        header.extend(table.categories.iter().map(|c| Cell::from(c.column_name())));

        let rows: Vec<Row> = dashboard
            .filtered
            .iter()
            .map(|r| {
                let mut cells = vec![Cell::from(r.year.to_string()), Cell::from(fmt_thousands(r.total_amount))];
                cells.extend(table.categories.iter().map(|&c| {
                    Cell::from(r.category_amount(c).map(fmt_thousands).unwrap_or_else(|| NO_DATA.to_string()))
                }));
                Row::new(cells)
            })
            .collect();

        let mut widths = vec![Constraint::Length(6), Constraint::Length(14)];
        widths.extend(table.categories.iter().map(|_| Constraint::Length(12)));

        let t = Table::new(rows, widths)
            .header(Row::new(header).style(Style::default().fg(Color::Cyan)))
            .block(block);
        frame.render_widget(t, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ move  space toggle  a all  c clear  tab chart  r reload  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 1,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 4
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

/// Column of `v` within `chart` for bounds `[lo, hi]`.
fn x_to_col(chart: Rect, bounds: [f64; 2], v: f64) -> u16 {
    let u = ((v - bounds[0]) / (bounds[1] - bounds[0])).clamp(0.0, 1.0);
    chart.x + ((chart.width.saturating_sub(1)) as f64 * u).round() as u16
}

/// Row of `v` within `chart` (top row is the upper bound).
fn y_to_row(chart: Rect, bounds: [f64; 2], v: f64) -> u16 {
    let u = ((v - bounds[0]) / (bounds[1] - bounds[0])).clamp(0.0, 1.0);
    let span = chart.height.saturating_sub(1);
    chart.y + span - (span as f64 * u).round() as u16
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    data: &ChartData,
) {
    let style = Style::default().fg(Color::Gray);

    let y = chart.y + chart.height;
    if y < inner.y + inner.height {
        for (v, label) in &data.x_ticks {
            let x = x_to_col(chart, data.x_bounds, *v);
            let label_len = Span::raw(label.as_str()).width() as u16;
            let start = x.saturating_sub(label_len / 2).max(inner.x);
            let width = label_len.min((inner.x + inner.width).saturating_sub(start));
            frame.render_widget(
                Paragraph::new(label.as_str()).style(style),
                Rect {
                    x: start,
                    y,
                    width,
                    height: 1,
                },
            );
        }
    }

    for (v, label) in &data.y_ticks {
        let y = y_to_row(chart, data.y_bounds, *v);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label.as_str()).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    // Legend for multi-series charts, top right.
    if data.series.len() > 1 {
        let spans: Vec<Span> = data
            .series
            .iter()
            .flat_map(|s| {
                let plotters::style::RGBColor(r, g, b) = s.color;
                [
                    Span::styled("■ ", Style::default().fg(Color::Rgb(r, g, b))),
                    Span::raw(format!("{}  ", s.label)),
                ]
            })
            .collect();
        let legend = Paragraph::new(Line::from(spans)).alignment(Alignment::Right);
        frame.render_widget(
            legend,
            Rect {
                x: inner.x,
                y: inner.y,
                width: inner.width,
                height: 1,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(years: &[i32]) -> BTreeSet<i32> {
        years.iter().copied().collect()
    }

    #[test]
    fn toggles_and_bulk_selection() {
        let mut sel = YearSelection::new(vec![2020, 2021, 2022], None);
        assert_eq!(sel.selected, set(&[2020, 2021, 2022]));

        sel.down();
        sel.toggle_current();
        assert_eq!(sel.selected, set(&[2020, 2022]));
        sel.toggle_current();
        assert_eq!(sel.selected, set(&[2020, 2021, 2022]));

        sel.clear();
        assert!(sel.selected.is_empty());
        sel.select_all();
        assert!(sel.is_all());
    }

    #[test]
    fn cursor_stays_in_range() {
        let mut sel = YearSelection::new(vec![2020, 2021], None);
        sel.up();
        assert_eq!(sel.current(), Some(2020));
        sel.down();
        sel.down();
        assert_eq!(sel.current(), Some(2021));

        let mut empty = YearSelection::new(Vec::new(), None);
        empty.toggle_current();
        assert!(empty.selected.is_empty());
    }

    #[test]
    fn requested_years_seed_the_selection() {
        let requested = set(&[2021]);
        let sel = YearSelection::new(vec![2020, 2021], Some(&requested));
        assert_eq!(sel.selected, requested);
    }

    #[test]
    fn refresh_keeps_full_selection_full() {
        let mut sel = YearSelection::new(vec![2020, 2021], None);
        sel.refresh(vec![2020, 2021, 2022]);
        assert_eq!(sel.selected, set(&[2020, 2021, 2022]));

        let mut partial = YearSelection::new(vec![2020, 2021, 2022], Some(&set(&[2021, 2022])));
        partial.cursor = 2;
        partial.refresh(vec![2020, 2021]);
        assert_eq!(partial.selected, set(&[2021]));
        assert_eq!(partial.cursor, 1);
    }

    #[test]
    fn chart_layout_reserves_tick_space() {
        let inner = Rect::new(0, 0, 80, 20);
        let (rect, insets) = chart_layout(inner);
        assert!(insets.is_some());
        assert_eq!(rect, Rect::new(8, 1, 70, 18));

        let (rect, insets) = chart_layout(Rect::new(0, 0, 15, 5));
        assert!(insets.is_none());
        assert_eq!(rect, Rect::new(0, 0, 15, 5));
    }

    #[test]
    fn value_to_cell_mapping() {
        let chart = Rect::new(10, 2, 11, 5);
        assert_eq!(x_to_col(chart, [0.0, 10.0], 0.0), 10);
        assert_eq!(x_to_col(chart, [0.0, 10.0], 10.0), 20);
        assert_eq!(x_to_col(chart, [0.0, 10.0], 99.0), 20);
        assert_eq!(y_to_row(chart, [0.0, 1.0], 1.0), 2);
        assert_eq!(y_to_row(chart, [0.0, 1.0], 0.0), 6);
    }
}
