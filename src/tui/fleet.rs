use crate::ops::config::Server;
use crate::tui::picker::{PickerOutcome, PickerState};
use crate::tui::TerminalGuard;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

const HEADERS: [&str; 4] = ["Name", "Host", "User", "Containers"];

/// One display row per server: name, `host:port`, user, container count.
pub fn fleet_rows(servers: &[Server]) -> Vec<[String; 4]> {
    servers
        .iter()
        .map(|s| {
            [
                s.name.clone(),
                format!("{}:{}", s.host, s.effective_port()),
                s.username.clone(),
                s.containers.len().to_string(),
            ]
        })
        .collect()
}

/// Column-aligned text version of the fleet table.
pub fn plain_table(servers: &[Server]) -> String {
    let rows = fleet_rows(servers);
    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &widths, HEADERS);
    for row in &rows {
        push_row(
            &mut out,
            &widths,
            [row[0].as_str(), row[1].as_str(), row[2].as_str(), row[3].as_str()],
        );
    }
    out
}

fn push_row(out: &mut String, widths: &[usize; 4], cells: [&str; 4]) {
    let line = cells
        .iter()
        .zip(widths.iter())
        .map(|(c, &w)| format!("{c:<w$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Scrollable fleet table. Returns when the operator quits.
pub fn show_fleet(servers: &[Server]) -> Result<()> {
    let rows = fleet_rows(servers);
    let mut guard = TerminalGuard::enter()?;
    let mut state = PickerState::new(rows.len());

    loop {
        guard.terminal().draw(|f| render(f, &rows, &state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            // Enter has nothing to open here, so it is ignored like any other key.
            if state.handle_key(key.code, key.modifiers) == PickerOutcome::Cancelled {
                return Ok(());
            }
        }
    }
}

fn render(f: &mut Frame, rows: &[[String; 4]], state: &PickerState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    let header = Row::new(HEADERS.iter().map(|h| Cell::from(*h))).style(
        Style::default()
            .fg(Color::White)
            .bg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    );
    let body = rows
        .iter()
        .map(|r| Row::new(r.iter().map(|c| Cell::from(c.as_str()))));
    let table = Table::new(
        body,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(30),
            Constraint::Percentage(25),
            Constraint::Percentage(15),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Servers ")
            .border_style(Style::default().fg(Color::Cyan)),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▶ ");

    let mut table_state = TableState::default();
    if !rows.is_empty() {
        table_state.select(Some(state.selected()));
    }
    f.render_stateful_widget(table, chunks[0], &mut table_state);

    let help = Paragraph::new("↑/↓: navigate • q: quit").style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, chunks[1]);
}
