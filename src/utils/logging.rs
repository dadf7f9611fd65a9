use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};
use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Mutex;

/// Initialize logging: console output plus an optional session log file.
///
/// `RUST_LOG` overrides `level` when set. The log file, if given, is
/// truncated on every start so it only ever holds the current session.
pub fn init_logging(level: &str, log_file: Option<&Path>) {
    let enable_backtrace = env::var("RUST_BACKTRACE").unwrap_or_else(|_| "0".to_string()) == "1";

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(level);
        if let Ok(directive) = "slv_avatar_sync=debug".parse() {
            filter = filter.add_directive(directive);
        }
        filter
    });

    let file_layer = log_file.and_then(|path| {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                eprintln!("Warning: Failed to remove existing {}: {}", path.display(), e);
            }
        }
        match fs::File::create(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false) // No ANSI codes in file
                    .boxed(),
            ),
            Err(e) => {
                eprintln!("Warning: Failed to create {}: {}", path.display(), e);
                None
            }
        }
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
        )
        .with(file_layer);

    // A second init (tests, embedding) keeps the first subscriber
    if subscriber.try_init().is_err() {
        return;
    }

    std::panic::set_hook(Box::new(move |panic_info| {
        tracing::error!("Panic occurred: {}", panic_info);

        if let Some(location) = panic_info.location() {
            tracing::error!(
                "Panic location: {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }

        if enable_backtrace {
            tracing::error!("Backtrace:\n{:?}", std::backtrace::Backtrace::capture());
        }
    }));

    tracing::info!("Logging initialized with level: {}", level);
    if let Some(path) = log_file {
        tracing::info!("File logging enabled: {}", path.display());
    }
}
