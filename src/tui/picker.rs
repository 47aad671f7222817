use crate::tui::TerminalGuard;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

/// Cursor over a fixed number of entries.
#[derive(Debug, Default, Clone)]
pub struct PickerState {
    len: usize,
    selected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerOutcome {
    Pending,
    Chosen(usize),
    Cancelled,
}

impl PickerState {
    pub fn new(len: usize) -> Self {
        Self { len, selected: 0 }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> PickerOutcome {
        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                PickerOutcome::Cancelled
            }
            KeyCode::Esc | KeyCode::Char('q') => PickerOutcome::Cancelled,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                PickerOutcome::Pending
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.len {
                    self.selected += 1;
                }
                PickerOutcome::Pending
            }
            KeyCode::Home => {
                self.selected = 0;
                PickerOutcome::Pending
            }
            KeyCode::End => {
                self.selected = self.len.saturating_sub(1);
                PickerOutcome::Pending
            }
            KeyCode::Enter if self.len > 0 => PickerOutcome::Chosen(self.selected),
            _ => PickerOutcome::Pending,
        }
    }
}

/// Let the operator choose one of `items`. `Ok(None)` means they backed out.
pub fn pick(title: &str, description: &str, items: &[String]) -> Result<Option<usize>> {
    if items.is_empty() {
        return Ok(None);
    }

    let mut guard = TerminalGuard::enter()?;
    let mut state = PickerState::new(items.len());

    loop {
        guard
            .terminal()
            .draw(|f| render(f, title, description, items, &state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match state.handle_key(key.code, key.modifiers) {
                PickerOutcome::Pending => {}
                PickerOutcome::Chosen(idx) => return Ok(Some(idx)),
                PickerOutcome::Cancelled => return Ok(None),
            }
        }
    }
}

fn render(f: &mut Frame, title: &str, description: &str, items: &[String], state: &PickerState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(description, Style::default().fg(Color::Gray))),
    ]);
    f.render_widget(header, chunks[0]);

    let list_items: Vec<ListItem> = items
        .iter()
        .map(|label| ListItem::new(Line::from(label.as_str())))
        .collect();
    let list = List::new(list_items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");
    let mut list_state = ListState::default().with_selected(Some(state.selected()));
    f.render_stateful_widget(list, chunks[1], &mut list_state);

    let help = Paragraph::new("↑/↓: navigate • enter: select • esc/q: cancel")
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, chunks[2]);
}
