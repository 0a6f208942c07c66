use crate::config::Config;
use crate::events::TuiEvent;
use crate::llm::CompletionClient;
use crate::session::{ChatSession, SessionEffect};
use crate::streaming::{TurnDriver, TurnRenderer};
use crate::ui::conversation::ConversationView;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tracing::{debug, info};

type Backend = CrosstermBackend<Stdout>;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Owns the terminal for the lifetime of the UI and restores it on drop,
/// including when a turn aborts with an error.
pub struct TerminalGuard {
    terminal: Terminal<Backend>,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
            .context("Failed to enter alternate screen")?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")?;
        Ok(Self { terminal })
    }
}

impl Deref for TerminalGuard {
    type Target = Terminal<Backend>;

    fn deref(&self) -> &Self::Target {
        &self.terminal
    }
}

impl DerefMut for TerminalGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.terminal
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste);
        let _ = self.terminal.show_cursor();
    }
}

/// Draws every streamed fragment straight to the terminal
struct TerminalRenderer<'a> {
    terminal: &'a mut TerminalGuard,
    view: &'a ConversationView,
}

impl TurnRenderer for TerminalRenderer<'_> {
    fn render(&mut self, session: &ChatSession, partial: Option<&str>) -> Result<()> {
        self.terminal
            .draw(|frame| self.view.draw(frame, session, partial))
            .context("Failed to draw frame")?;
        Ok(())
    }
}

fn read_event(timeout: Duration) -> Result<Option<TuiEvent>> {
    if !event::poll(timeout).context("Failed to poll terminal events")? {
        return Ok(None);
    }
    let event = match event::read().context("Failed to read terminal event")? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(TuiEvent::Key(key)),
        Event::Paste(text) => Some(TuiEvent::Paste(text)),
        Event::Resize(..) => Some(TuiEvent::Resize),
        _ => None,
    };
    Ok(event)
}

/// The chat application: one session, one view, one client
pub struct App<C> {
    session: ChatSession,
    view: ConversationView,
    client: C,
    frame_delay: Duration,
}

impl<C: CompletionClient> App<C> {
    pub fn new(config: &Config, client: C) -> Self {
        Self {
            session: ChatSession::new(config),
            view: ConversationView::new(config.provider.clone(), config.model.clone()),
            client,
            frame_delay: Duration::from_millis(config.ui.frame_delay_ms),
        }
    }

    /// Run until the user quits. A turn is streamed to completion before the
    /// next terminal event is read.
    pub async fn run(mut self) -> Result<()> {
        let mut terminal = TerminalGuard::enter()?;

        loop {
            terminal
                .draw(|frame| self.view.draw(frame, &self.session, None))
                .context("Failed to draw frame")?;

            let Some(event) = read_event(POLL_INTERVAL)? else {
                continue;
            };

            for session_event in self.view.handle_event(event, &self.session) {
                debug!(event = ?session_event, "applying session event");
                match self.session.apply(session_event) {
                    SessionEffect::Quit => {
                        info!(session = %self.session.id(), messages = self.session.conversation().len(), "session ended");
                        return Ok(());
                    }
                    SessionEffect::Send(request) => {
                        let mut renderer = TerminalRenderer { terminal: &mut terminal, view: &self.view };
                        TurnDriver::new(&self.client, self.frame_delay)
                            .stream(&mut self.session, &mut renderer, request)
                            .await?;
                    }
                    SessionEffect::None => {}
                }
                self.view.after_apply(&self.session);
            }
        }
    }
}
