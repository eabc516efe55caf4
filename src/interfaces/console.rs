use crate::domain::host::Host;
use crate::domain::message::ErrorMessage;
use crate::domain::ports::Notifier;

/// Terminal stand-in for the UI: toasts and progress go to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn is_alive(&self) -> bool {
        true
    }

    fn show_error(&self, message: &ErrorMessage) {
        eprintln!("{message}");
    }

    fn show_host(&self, host: &Host) {
        eprintln!("Connecting to {} ({})", host.display_name, host.hostname);
    }

    fn dismiss_progress(&self) {}
}
