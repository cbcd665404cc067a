use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, MouseEvent};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::agent::SearchReply;

/// Everything the application loop reacts to: terminal input, the
/// animation tick, and results posted back by the request task.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Key press event
    Key(KeyEvent),

    /// Mouse event (wheel scrolling)
    Mouse(MouseEvent),

    /// Bracketed paste
    Paste(String),

    /// Terminal resize; the next draw pass picks up the new size
    Resize,

    /// Periodic tick driving the typing indicator animation
    Tick,

    /// The in-flight search came back with a reply
    AgentReply(SearchReply),

    /// The in-flight search failed; the cause is for the log, not the
    /// transcript
    AgentFailed(String),
}

/// Polls the terminal on a dedicated thread and forwards its events,
/// plus ticks, into an unbounded channel the async loop awaits on. The
/// cloneable sender lets the request task inject events of its own.
pub struct EventHandler {
    sender: mpsc::UnboundedSender<AppEvent>,
    receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let tx = sender.clone();

        std::thread::spawn(move || {
            loop {
                if event::poll(tick_rate).unwrap_or(false) {
                    let forwarded = match event::read() {
                        Ok(CrosstermEvent::Key(key)) => tx.send(AppEvent::Key(key)),
                        Ok(CrosstermEvent::Mouse(mouse)) => tx.send(AppEvent::Mouse(mouse)),
                        Ok(CrosstermEvent::Paste(text)) => tx.send(AppEvent::Paste(text)),
                        Ok(CrosstermEvent::Resize(..)) => tx.send(AppEvent::Resize),
                        Ok(_) => Ok(()),
                        Err(_) => break,
                    };
                    if forwarded.is_err() {
                        break;
                    }
                } else if tx.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self { sender, receiver }
    }

    /// A sender clone for background tasks.
    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.sender.clone()
    }

    /// The next event; `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<AppEvent> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_events_come_through_the_channel() {
        let mut events = EventHandler::new(Duration::from_millis(10));
        events.sender().send(AppEvent::Resize).expect("send");
        // Ticks from the poll thread may be queued ahead of the
        // injected event; order within the channel is preserved.
        loop {
            match events.next().await {
                Some(AppEvent::Resize) => break,
                Some(_) => continue,
                None => panic!("event channel closed"),
            }
        }
    }
}
