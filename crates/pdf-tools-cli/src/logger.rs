use chrono::{DateTime, Local};
use log::{LevelFilter, Metadata, Record};
use std::io::Write;

/// Writes timestamped log records to stderr, keeping stdout for results
pub struct StderrLogger {
    level: LevelFilter,
}

impl StderrLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    pub fn init(self) -> Result<(), log::SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }

    fn format(timestamp: DateTime<Local>, record: &Record) -> String {
        format!(
            "{} {:<5} {}",
            timestamp.format("%H:%M:%S%.3f"),
            record.level(),
            record.args()
        )
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = Self::format(Local::now(), record);
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use log::{Level, Log};

    #[test]
    fn test_format_line() {
        let timestamp = Local.with_ymd_and_hms(2024, 5, 1, 9, 8, 7).unwrap();
        let line = StderrLogger::format(
            timestamp,
            &Record::builder()
                .args(format_args!("[Task] chunk-0: done"))
                .level(Level::Info)
                .build(),
        );
        assert_eq!(line, "09:08:07.000 INFO  [Task] chunk-0: done");
    }

    #[test]
    fn test_level_filter() {
        let logger = StderrLogger::new(LevelFilter::Warn);
        let info = Metadata::builder().level(Level::Info).build();
        let error = Metadata::builder().level(Level::Error).build();
        assert!(!logger.enabled(&info));
        assert!(logger.enabled(&error));
    }
}
