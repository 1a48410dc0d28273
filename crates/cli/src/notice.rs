use std::io::Write;

use crate::core::{Notice, NoticeLevel, Notifier};

/// Prints notices to stderr so stdout stays reserved for command output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let marker = match notice.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        let stderr = std::io::stderr();
        let mut handle = stderr.lock();
        let _ = writeln!(handle, "[{}] {}", marker, notice);
    }
}
