use colored::Colorize;

/// User-facing notices: the blocking dialogs of a desktop front-end.
pub trait Notifier: Send + Sync {
    fn error(&self, title: &str, message: &str);

    fn notice(&self, title: &str, message: &str);
}

/// Prints notices to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn error(&self, title: &str, message: &str) {
        eprintln!("{} {}", format!("{title}:").red().bold(), message);
    }

    fn notice(&self, title: &str, message: &str) {
        eprintln!("{} {}", format!("{title}:").yellow().bold(), message);
    }
}
