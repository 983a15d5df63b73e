use crossterm::event::{Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::app::AppEvent;

/// How long the input thread blocks before checking for shutdown
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Events consumed by the UI loop
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Keyboard input event
    Key(KeyEvent),

    /// Terminal resize event
    Resize(u16, u16),

    /// Periodic tick event
    Tick,

    /// Event raised by the catalog browser
    App(AppEvent),

    /// Termination requested by a signal
    Quit,
}

/// Merges terminal input, ticks, application events and signals into one
/// stream
pub struct EventHandler {
    receiver: mpsc::UnboundedReceiver<Event>,
    app_sender: mpsc::UnboundedSender<AppEvent>,
}

impl EventHandler {
    /// Create a new event handler and start its producers
    pub fn new(tick_interval: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (app_sender, app_receiver) = mpsc::unbounded_channel();

        spawn_input_reader(sender.clone());
        spawn_ticker(sender.clone(), tick_interval);
        spawn_app_forwarder(sender.clone(), app_receiver);
        spawn_signal_listener(sender);

        Self {
            receiver,
            app_sender,
        }
    }

    /// Get the next event
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Sender for events raised by the catalog browser
    pub fn app_sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.app_sender.clone()
    }
}

/// Convert crossterm events to application events
fn convert_crossterm_event(event: CrosstermEvent) -> Option<Event> {
    match event {
        CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => Some(Event::Key(key)),
        CrosstermEvent::Resize(width, height) => Some(Event::Resize(width, height)),
        _ => None,
    }
}

/// Blocking crossterm reads run on their own thread; the thread exits once
/// the handler is dropped
fn spawn_input_reader(sender: mpsc::UnboundedSender<Event>) {
    tokio::task::spawn_blocking(move || {
        while !sender.is_closed() {
            match crossterm::event::poll(INPUT_POLL) {
                Ok(true) => match crossterm::event::read() {
                    Ok(event) => {
                        if let Some(event) = convert_crossterm_event(event) {
                            if sender.send(event).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read terminal event: {}", e);
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to poll terminal events: {}", e);
                    break;
                }
            }
        }
        debug!("Input reader stopped");
    });
}

fn spawn_ticker(sender: mpsc::UnboundedSender<Event>, tick_interval: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if sender.send(Event::Tick).is_err() {
                break;
            }
        }
    });
}

fn spawn_app_forwarder(
    sender: mpsc::UnboundedSender<Event>,
    mut app_receiver: mpsc::UnboundedReceiver<AppEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = app_receiver.recv().await {
            if sender.send(Event::App(event)).is_err() {
                break;
            }
        }
    });
}

/// Raw mode swallows Ctrl+C as a key press; this catches external
/// termination requests
fn spawn_signal_listener(sender: mpsc::UnboundedSender<Event>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let (mut sigterm, mut sighup) =
                match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
                    (Ok(sigterm), Ok(sighup)) => (sigterm, sighup),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("Failed to install signal handlers: {}", e);
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => debug!("Received SIGTERM, shutting down gracefully"),
                _ = sighup.recv() => debug!("Received SIGHUP, shutting down gracefully"),
                _ = sender.closed() => return,
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!("Failed to listen for Ctrl+C: {}", e);
                        return;
                    }
                }
                _ = sender.closed() => return,
            }
        }

        let _ = sender.send(Event::Quit);
    });
}
