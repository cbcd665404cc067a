//! Application state and the main event loop.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Constraint, Direction, Layout},
};
use tracing::{debug, info, warn};

use crate::agent::AgentClient;
use crate::commands::{self, SlashCommand};
use crate::config::Config;
use crate::conversation::Conversation;
use crate::events::{AppEvent, EventHandler};
use crate::markup::RenderOptions;
use crate::ui::composer::{Composer, ComposerResult};
use crate::ui::history::{History, HistoryState};

const INPUT_PLACEHOLDER: &str = "Type a subreddit to search (e.g. AI_agents), or /help";

/// Lines moved per keyboard scroll step.
const KEY_SCROLL_STEP: usize = 5;
/// Lines moved per mouse wheel notch.
const WHEEL_SCROLL_STEP: usize = 3;

pub struct App {
    config: Config,
    conversation: Conversation,
    composer: Composer,
    history_state: HistoryState,
    client: AgentClient,
    events: Option<EventHandler>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let client = AgentClient::new(&config.endpoint, config.request_timeout())?;
        let events = EventHandler::new(config.tick_rate());
        Ok(Self {
            conversation: Conversation::new(config.ui.show_steps),
            composer: Composer::new(INPUT_PLACEHOLDER),
            history_state: HistoryState::default(),
            client,
            events: Some(events),
            config,
            should_quit: false,
        })
    }

    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut events = match self.events.take() {
            Some(events) => events,
            None => EventHandler::new(self.config.tick_rate()),
        };
        info!("chat session started against {}", self.client.base_url());

        while !self.should_quit {
            terminal.draw(|frame| self.draw(frame))?;
            let Some(event) = events.next().await else {
                break;
            };
            self.handle_event(event, &events);
        }

        info!("chat session closed");
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(10),   // transcript
                Constraint::Length(3), // composer
            ])
            .split(frame.size());

        let options = RenderOptions {
            sanitize: self.config.ui.sanitize_replies,
        };
        frame.render_stateful_widget(
            History::new(&self.conversation, options),
            chunks[0],
            &mut self.history_state,
        );
        frame.render_widget(&self.composer, chunks[1]);
    }

    fn handle_event(&mut self, event: AppEvent, events: &EventHandler) {
        match event {
            AppEvent::Key(key) => self.handle_key(key, events),
            AppEvent::Mouse(mouse) => self.handle_mouse(mouse),
            AppEvent::Paste(text) => self.composer.insert_text(&text),
            // Redraw happens on the next loop pass either way.
            AppEvent::Resize | AppEvent::Tick => {}
            AppEvent::AgentReply(reply) => {
                debug!("agent reply received");
                self.conversation.settle_success(&reply);
                self.composer.set_waiting(false);
                self.history_state.follow();
            }
            AppEvent::AgentFailed(cause) => {
                warn!("search request failed: {cause}");
                self.conversation.settle_failure();
                self.composer.set_waiting(false);
                self.history_state.follow();
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent, events: &EventHandler) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::PageUp => self.history_state.scroll_up(KEY_SCROLL_STEP),
            KeyCode::PageDown => self.history_state.scroll_down(KEY_SCROLL_STEP),
            _ => {
                if let ComposerResult::Submitted(text) = self.composer.handle_key(key) {
                    self.submit(text, events);
                }
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.history_state.scroll_up(WHEEL_SCROLL_STEP),
            MouseEventKind::ScrollDown => self.history_state.scroll_down(WHEEL_SCROLL_STEP),
            _ => {}
        }
    }

    fn submit(&mut self, text: String, events: &EventHandler) {
        if text.trim_start().starts_with('/') {
            self.handle_command(&text);
            self.history_state.follow();
            return;
        }

        let Some(query) = self.conversation.submit(&text) else {
            return;
        };
        self.composer.set_waiting(true);
        self.history_state.follow();
        info!("searching for {query:?}");

        let client = self.client.clone();
        let sender = events.sender();
        tokio::spawn(async move {
            match client.search(&query).await {
                Ok(reply) => {
                    let _ = sender.send(AppEvent::AgentReply(reply));
                }
                Err(error) => {
                    let _ = sender.send(AppEvent::AgentFailed(format!("{error:#}")));
                }
            }
        });
    }

    fn handle_command(&mut self, input: &str) {
        self.conversation.append_user(input.trim());
        match commands::parse_slash_command(input) {
            Some(SlashCommand::Help) => {
                self.conversation.append_bot(commands::get_help_text());
            }
            Some(SlashCommand::Endpoint) => {
                let reply = format!("Agent endpoint: {}", self.client.base_url());
                self.conversation.append_bot(reply);
            }
            Some(SlashCommand::Quit) => self.should_quit = true,
            None => {
                self.conversation
                    .append_bot("Unknown command. Try /help for the list.");
            }
        }
    }
}
