use std::fmt;
use std::sync::Mutex;

use crate::core::error::StepError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

/// Fire-and-forget transient messages for the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, title: &str, description: &str);

    fn info(&self, title: &str, description: &str) {
        self.notify(Severity::Info, title, description);
    }

    fn error(&self, err: &StepError) {
        self.notify(Severity::Error, err.title(), &err.to_string());
    }
}

/// Routes notifications to the `log` facade.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, severity: Severity, title: &str, description: &str) {
        match severity {
            Severity::Info => log::info!("{}: {}", title, description),
            Severity::Error => log::warn!("{}: {}", title, description),
        }
    }
}

/// Prints notifications to the terminal; used by the interactive front end.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, severity: Severity, title: &str, description: &str) {
        log::debug!("notify[{}] {}: {}", severity, title, description);
        match severity {
            Severity::Info => println!("ℹ {}: {}", title, description),
            Severity::Error => eprintln!("✖ {}: {}", title, description),
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        match self.seen.lock() {
            Ok(mut seen) => std::mem::take(&mut *seen),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        match self.seen.lock() {
            Ok(seen) => seen.iter().filter(|n| n.severity == severity).count(),
            Err(_) => 0,
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, title: &str, description: &str) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(Notification {
                severity,
                title: title.to_string(),
                description: description.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.info("生成成功", "AI 文案已生成");
        notifier.error(&StepError::EmptyTheme);

        assert_eq!(notifier.count(Severity::Error), 1);
        let seen = notifier.take();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].severity, Severity::Info);
        assert_eq!(seen[1].title, "錯誤");
        assert_eq!(seen[1].description, "請輸入影片主題");
        assert!(notifier.take().is_empty());
    }
}
