//! User-facing notifications.
//!
//! The workflow reports terminal outcomes through [Notifier]; it never looks
//! at a return value. [ConsoleNotifier] prints to the terminal,
//! [RecordingNotifier] keeps events in memory for tests, and
//! [webhook::WebhookNotifier] is the third-party chat channel.

pub mod webhook;

pub use webhook::WebhookNotifier;

use std::cell::RefCell;

use crate::ui::formatter;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Warning,
    Error,
}

/// One delivered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub body: String,
}

/// Fire-and-forget sink for workflow events
pub trait Notifier {
    fn notify_success(&self, title: &str, body: &str);
    fn notify_warning(&self, title: &str, body: &str);
    fn notify_error(&self, title: &str, body: &str);
}

/// Prints notifications to the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify_success(&self, title: &str, body: &str) {
        formatter::display_success(&format!("{}: {}", title, body));
    }

    fn notify_warning(&self, title: &str, body: &str) {
        formatter::display_warning(&format!("{}: {}", title, body));
    }

    fn notify_error(&self, title: &str, body: &str) {
        formatter::display_error(&format!("{}: {}", title, body));
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: RefCell<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Notification> {
        self.events.borrow().clone()
    }

    /// Events of one level only
    pub fn of_level(&self, level: Level) -> Vec<Notification> {
        self.events
            .borrow()
            .iter()
            .filter(|n| n.level == level)
            .cloned()
            .collect()
    }

    fn push(&self, level: Level, title: &str, body: &str) {
        self.events.borrow_mut().push(Notification {
            level,
            title: title.to_string(),
            body: body.to_string(),
        });
    }
}

impl Notifier for RecordingNotifier {
    fn notify_success(&self, title: &str, body: &str) {
        self.push(Level::Success, title, body);
    }

    fn notify_warning(&self, title: &str, body: &str) {
        self.push(Level::Warning, title, body);
    }

    fn notify_error(&self, title: &str, body: &str) {
        self.push(Level::Error, title, body);
    }
}
