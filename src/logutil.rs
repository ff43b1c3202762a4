//! Logger setup and helpers for keeping narration single-line in logs.

use std::io::Write;

use crate::config::LoggingConfig;

fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Level from the config file's `logging.level`, falling back to info.
pub fn configured_level(config: Option<&LoggingConfig>) -> log::LevelFilter {
    config
        .and_then(|c| c.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info)
}

/// Install the global logger.
///
/// `-v`/`-vv` override the configured level. With a log file configured, every
/// line goes to the file and is echoed to the console only when stdout is a
/// terminal. Repeated calls are ignored.
pub fn init_logging(config: Option<&LoggingConfig>, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    let level = match verbosity {
        0 => configured_level(config),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);

    let file = config
        .and_then(|c| c.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
    match file {
        Some(f) => {
            let sink = std::sync::Mutex::new(f);
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let line = format!("{} [{}] {}", timestamp(), record.level(), record.args());
                if let Ok(mut guard) = sink.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                writeln!(fmt, "{} [{}] {}", timestamp(), record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}

/// Longest narration preview written to the log, in characters.
const MAX_PREVIEW: usize = 240;

/// Flatten a narration line for the log. The lines of a multi-line
/// announcement are joined with ` | `, tabs become spaces and other control
/// characters are dropped. Past [`MAX_PREVIEW`] characters the text is cut at
/// the last word boundary and marked with an ellipsis.
pub fn one_line(s: &str) -> String {
    let joined = s
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");
    let flat: String = joined
        .chars()
        .filter_map(|c| match c {
            '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();
    if flat.chars().count() <= MAX_PREVIEW {
        return flat;
    }
    let cut: String = flat.chars().take(MAX_PREVIEW).collect();
    let kept = match cut.rfind(' ') {
        Some(space) if space > 0 => &cut[..space],
        _ => cut.as_str(),
    };
    format!("{}…", kept.trim_end_matches([' ', '|']))
}
