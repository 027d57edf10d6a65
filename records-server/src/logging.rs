use crate::config::LoggingConfig;
use log::LevelFilter;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

/// Writer duplicating every log line to the console and, when configured, a
/// file. A failing sink never keeps the other one from being written.
struct TeeWriter<C> {
    console: C,
    file: Option<File>,
}

impl<C: Write> Write for TeeWriter<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let console = self.console.write_all(buf);
        let file = match self.file.as_mut() {
            Some(file) => file.write_all(buf),
            None => Ok(()),
        };
        console.and(file)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let console = self.console.flush();
        let file = match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        };
        console.and(file)
    }
}

fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level).unwrap_or_else(|_| {
        eprintln!("Unknown log level '{level}', falling back to info");
        LevelFilter::Info
    })
}

fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Build the logger described by `config`. `RUST_LOG`, when set, is applied
/// last and wins over the configured levels.
pub fn builder(config: &LoggingConfig) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(parse_level(&config.level));
    for (namespace, level) in &config.overrides {
        builder.filter_module(namespace, parse_level(level));
    }
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    let file = config.file.as_deref().and_then(|path| match open_log_file(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Failed to open log file {path}: {e}, logging to console only");
            None
        }
    });
    builder.target(env_logger::Target::Pipe(Box::new(TeeWriter {
        console: io::stderr(),
        file,
    })));
    builder
}

/// Install the process-wide logger. Must be called once, before anything logs.
pub fn init(config: &LoggingConfig) {
    if let Err(e) = builder(config).try_init() {
        eprintln!("Logger already initialized: {e}");
    }
}

/// Flush buffered log output; called right before the process exits
pub fn flush() {
    log::logger().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
        assert_eq!(parse_level("nonsense"), LevelFilter::Info);
    }

    #[test]
    fn test_tee_writer_appends_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("server.txt");
        let path_str = path.display().to_string();

        let mut writer = TeeWriter {
            console: io::sink(),
            file: Some(open_log_file(&path_str).unwrap()),
        };
        writer.write_all(b"first line\n").unwrap();
        writer.flush().unwrap();

        // reopening appends instead of truncating
        let mut writer = TeeWriter {
            console: io::sink(),
            file: Some(open_log_file(&path_str).unwrap()),
        };
        writer.write_all(b"second line\n").unwrap();
        writer.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first line\nsecond line\n");
    }

    struct ClosedConsole;

    impl Write for ClosedConsole {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "console closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "console closed"))
        }
    }

    #[test]
    fn test_tee_writer_keeps_file_when_console_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.txt");

        let mut writer = TeeWriter {
            console: ClosedConsole,
            file: Some(open_log_file(&path.display().to_string()).unwrap()),
        };
        let err = writer.write(b"still logged\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(writer.flush().is_err());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "still logged\n");
    }

    #[test]
    fn test_builder_accepts_overrides() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            overrides: BTreeMap::from([("hyper".to_string(), "warn".to_string())]),
            file: None,
        };
        let logger = builder(&config).build();
        assert!(logger.filter() >= LevelFilter::Debug);
    }
}
