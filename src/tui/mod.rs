pub mod fleet;
pub mod form;
pub mod picker;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, BufRead, Stdout, Write};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Raw-mode alternate screen that is restored when dropped, including on
/// early returns and errors.
pub struct TerminalGuard {
    terminal: Tui,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }

    pub fn terminal(&mut self) -> &mut Tui {
        &mut self.terminal
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Ask for one line on stdin. `None` when the operator sends EOF.
/// An empty answer falls back to `default` when one is given.
pub fn prompt_line(label: &str, default: Option<&str>) -> Result<Option<String>> {
    let stdin = io::stdin();
    prompt_line_from(&mut stdin.lock(), &mut io::stdout(), label, default)
}

pub fn prompt_line_from<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: Option<&str>,
) -> Result<Option<String>> {
    match default {
        Some(d) => write!(output, "{label} [{d}]: ")?,
        None => write!(output, "{label}: ")?,
    }
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let answer = line.trim();
    if answer.is_empty() {
        return Ok(default.map(str::to_string).or_else(|| Some(String::new())));
    }
    Ok(Some(answer.to_string()))
}

/// y/N question on stdin. Anything but an explicit yes is a no.
pub fn confirm(question: &str) -> Result<bool> {
    let answer = prompt_line(&format!("{question} (y/N)"), None)?;
    Ok(matches!(
        answer.as_deref().map(str::to_lowercase).as_deref(),
        Some("y") | Some("yes")
    ))
}
