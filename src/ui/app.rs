use crate::api::ChatBackend;
use crate::events::AppEvent;
use crate::profile::{current_greeting, ProfileStore, DEFAULT_NAME};
use crate::tui::{self, EventHandler, Tui};
use crate::ui::conversation::{ConversationAction, ConversationManager, Submission};
use crate::ui::markdown::{GfmRenderer, MarkdownRenderer};
use crate::ui::onboarding::{OnboardingAction, OnboardingDialog};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::sync::Arc;
use tokio::sync::mpsc;

const HINTS: &str = "PgUp/PgDn scroll · Shift+Enter newline · Esc quit";

/// Which top-level view has the keyboard
#[derive(Debug)]
pub enum Screen {
    Onboarding(OnboardingDialog),
    Chat,
}

pub struct App {
    pub should_quit: bool,
    screen: Screen,
    conversation: ConversationManager,
    greeting: &'static str,
    profile: Box<dyn ProfileStore>,
    backend: Arc<dyn ChatBackend>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        profile: Box<dyn ProfileStore>,
        backend: Arc<dyn ChatBackend>,
        renderer: Arc<dyn MarkdownRenderer>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let stored = profile.display_name().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read profile");
            None
        });

        let screen = match stored {
            Some(_) => Screen::Chat,
            None => Screen::Onboarding(OnboardingDialog::new()),
        };
        let name = stored.unwrap_or_else(|| DEFAULT_NAME.to_string());

        let mut conversation = ConversationManager::new(name, renderer);
        conversation.set_focus(matches!(screen, Screen::Chat));

        Self {
            should_quit: false,
            screen,
            conversation,
            greeting: current_greeting(),
            profile,
            backend,
            events,
        }
    }

    #[cfg(test)]
    fn screen(&self) -> &Screen {
        &self.screen
    }

    #[cfg(test)]
    fn conversation(&self) -> &ConversationManager {
        &self.conversation
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Paste(text) => match &mut self.screen {
                Screen::Onboarding(dialog) => dialog.handle_paste(&text),
                Screen::Chat => self.conversation.handle_paste(&text),
            },
            AppEvent::Resize => {}
            AppEvent::Tick => self.conversation.tick(),
            AppEvent::ReplyReceived { seq, result } => {
                self.conversation.complete(seq, result);
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match &mut self.screen {
            Screen::Onboarding(dialog) => {
                if let OnboardingAction::Done(name) = dialog.handle_key(key) {
                    self.finish_onboarding(name);
                }
            }
            Screen::Chat => {
                if key.code == KeyCode::Esc {
                    self.should_quit = true;
                    return;
                }
                if let ConversationAction::Send(submission) = self.conversation.handle_key(key) {
                    self.dispatch(submission);
                }
            }
        }
    }

    fn finish_onboarding(&mut self, name: String) {
        if let Err(e) = self.profile.set_display_name(&name) {
            tracing::warn!(error = %e, "could not save display name");
        }
        tracing::info!(name = %name, "onboarding complete");

        self.conversation.set_user_name(name);
        self.conversation.set_focus(true);
        self.screen = Screen::Chat;
    }

    /// Send in the background; the result comes back as [`AppEvent::ReplyReceived`]
    fn dispatch(&self, submission: Submission) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        tokio::spawn(async move {
            let result = backend.send(&submission.text).await;
            if events
                .send(AppEvent::ReplyReceived {
                    seq: submission.seq,
                    result,
                })
                .is_err()
            {
                tracing::debug!(seq = submission.seq, "UI closed before reply arrived");
            }
        });
    }

    fn header(&self) -> Line<'static> {
        Line::from(vec![
            Span::styled("✦ ", Style::default().fg(Color::LightRed)),
            Span::styled(
                format!("{}, {}", self.greeting, self.conversation.user_name()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ])
    }

    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(area);

        frame.render_widget(Paragraph::new(self.header()), chunks[0]);
        frame.render_widget(&self.conversation, chunks[1]);
        frame.render_widget(
            Paragraph::new(Span::styled(HINTS, Style::default().fg(Color::DarkGray))),
            chunks[2],
        );

        let (x, y) = match &self.screen {
            Screen::Onboarding(dialog) => {
                frame.render_widget(dialog, area);
                dialog.cursor(area)
            }
            Screen::Chat => self.conversation.cursor(chunks[1]),
        };
        frame.set_cursor(x, y);
    }
}

/// Run the chat client until the user quits
pub async fn run(
    profile: Box<dyn ProfileStore>,
    backend: Arc<dyn ChatBackend>,
) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let mut app = App::new(profile, backend, Arc::new(GfmRenderer), events.sender());

    let result = event_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| app.draw(frame))?;

        match events.next().await {
            Some(event) => app.handle_event(event),
            None => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientError;
    use crate::profile::MemoryProfileStore;
    use async_trait::async_trait;
    use ratatui::{backend::TestBackend, Terminal};

    struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn send(&self, message: &str) -> Result<String, ClientError> {
            Ok(format!("echo: {message}"))
        }
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer.get(x, y).symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn missing_name_starts_onboarding_and_saves_choice() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(
            Box::new(MemoryProfileStore::default()),
            Arc::new(EchoBackend),
            Arc::new(GfmRenderer),
            tx,
        );
        assert!(matches!(app.screen(), Screen::Onboarding(_)));
        assert!(screen_text(&app).contains("What should I call you?"));

        app.handle_event(AppEvent::Paste("ada".to_string()));
        app.handle_event(key(KeyCode::Enter));

        assert!(matches!(app.screen(), Screen::Chat));
        assert_eq!(app.conversation().user_name(), "ada");
        assert_eq!(app.profile.display_name().unwrap().as_deref(), Some("ada"));
        assert!(screen_text(&app).contains(", ada"));
    }

    #[tokio::test]
    async fn stored_name_skips_onboarding() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let app = App::new(
            Box::new(MemoryProfileStore::with_name("Grace")),
            Arc::new(EchoBackend),
            Arc::new(GfmRenderer),
            tx,
        );

        assert!(matches!(app.screen(), Screen::Chat));
        let text = screen_text(&app);
        assert!(text.contains(&format!("{}, Grace", current_greeting())));
        assert!(text.contains("How can I help you today?"));
    }

    #[tokio::test]
    async fn submitted_message_round_trips_through_event_queue() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(
            Box::new(MemoryProfileStore::with_name("Grace")),
            Arc::new(EchoBackend),
            Arc::new(GfmRenderer),
            tx,
        );

        app.handle_event(AppEvent::Paste("ping".to_string()));
        app.handle_event(key(KeyCode::Enter));
        assert!(app.conversation().is_loading());
        assert_eq!(app.conversation().messages().len(), 1);

        let event = rx.recv().await.unwrap();
        app.handle_event(event);

        let messages = app.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "echo: ping");
        assert!(!app.conversation().is_loading());
    }

    #[tokio::test]
    async fn escape_and_ctrl_c_quit() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(
            Box::new(MemoryProfileStore::with_name("Grace")),
            Arc::new(EchoBackend),
            Arc::new(GfmRenderer),
            tx.clone(),
        );
        app.handle_event(key(KeyCode::Esc));
        assert!(app.should_quit);

        let mut app = App::new(
            Box::new(MemoryProfileStore::default()),
            Arc::new(EchoBackend),
            Arc::new(GfmRenderer),
            tx,
        );
        app.handle_event(AppEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )));
        assert!(app.should_quit);
    }
}
