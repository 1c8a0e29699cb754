#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

/// Diagnostics of a single entry, held back until every worker is done
///
/// Workers never log directly, so lines of different repositories cannot
/// interleave; the caller flushes each log in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryLog {
    lines: Vec<LogLine>,
}

impl EntryLog {
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message);
    }

    fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        self.lines.push(LogLine {
            level,
            message: message.into(),
        });
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Emit every line through `tracing`, tagged with the repository name
    pub fn flush(&self, repo: &str) {
        for line in &self.lines {
            match line.level {
                LogLevel::Info => tracing::info!(repo, "{}", line.message),
                LogLevel::Warn => tracing::warn!(repo, "{}", line.message),
            }
        }
    }
}
