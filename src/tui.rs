use crossterm::{
    cursor::MoveToPreviousLine,
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};
use std::time::Duration;

/// Single updating status line for the scroll loop.
pub struct CaptureTUI {
    out: Box<dyn Write + Send>,
    idle_timeout: Duration,
    ticks: usize,
    status_line_printed: bool,
}

impl CaptureTUI {
    pub fn new(idle_timeout: Duration) -> Self {
        Self::with_writer(idle_timeout, Box::new(io::stdout()))
    }

    pub fn with_writer(idle_timeout: Duration, out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            idle_timeout,
            ticks: 0,
            status_line_printed: false,
        }
    }

    pub fn start_capture(&mut self, url: &str) -> io::Result<()> {
        execute!(
            self.out,
            SetForegroundColor(Color::White),
            Print(format!("🌐 Opening {}\n", url)),
            ResetColor
        )?;
        Ok(())
    }

    pub fn update_progress(&mut self, captured: usize, idle: Duration) -> io::Result<()> {
        self.ticks += 1;

        if self.status_line_printed {
            execute!(
                self.out,
                MoveToPreviousLine(1),
                Clear(ClearType::CurrentLine),
            )?;
        }

        let spinner = match self.ticks % 4 {
            0 => "⠋",
            1 => "⠙",
            2 => "⠹",
            _ => "⠸",
        };

        execute!(
            self.out,
            SetForegroundColor(Color::White),
            Print(format!(
                "{} Scrolling - {} responses captured (idle {}s/{}s)\n",
                spinner,
                captured,
                idle.as_secs(),
                self.idle_timeout.as_secs()
            )),
            ResetColor
        )?;
        self.status_line_printed = true;

        Ok(())
    }

    pub fn finish_capture(&mut self, captured: usize) -> io::Result<()> {
        if self.status_line_printed {
            execute!(
                self.out,
                MoveToPreviousLine(1),
                Clear(ClearType::CurrentLine),
            )?;
            self.status_line_printed = false;
        }

        let color = if captured == 0 { Color::Yellow } else { Color::Green };
        execute!(
            self.out,
            SetForegroundColor(color),
            Print(format!("✓ Scrolling finished: {} responses captured\n", captured)),
            ResetColor
        )?;

        Ok(())
    }
}
