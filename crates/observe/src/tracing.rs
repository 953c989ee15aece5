use {
    std::{io::IsTerminal, sync::Once},
    time::macros::format_description,
    tracing_subscriber::{
        EnvFilter,
        fmt::time::UtcTime,
        prelude::*,
        util::SubscriberInitExt,
    },
};

/// Initializes the tracing setup shared between binaries and tests.
/// `env_filter` has similar syntax to env_logger. It is documented at
/// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
pub fn initialize(env_filter: &str) {
    set_tracing_subscriber(env_filter);
    std::panic::set_hook(Box::new(tracing_panic_hook));
}

/// Like [`initialize`], but can be called multiple times in a row. Later
/// calls are ignored.
///
/// Useful for tests.
pub fn initialize_reentrant(env_filter: &str) {
    // The tracing subscriber is a global object so initializing it again in
    // the same process by a different thread would fail.
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        set_tracing_subscriber(env_filter);
        std::panic::set_hook(Box::new(tracing_panic_hook));
    });
}

fn set_tracing_subscriber(env_filter: &str) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(UtcTime::new(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        )))
        .with_ansi(std::io::stdout().is_terminal())
        .with_filter(EnvFilter::new(env_filter));

    tracing_subscriber::registry().with(fmt_layer).init();
}

/// Panic hook that routes panic messages through tracing so they carry the
/// same timestamp and formatting as regular logs.
fn tracing_panic_hook(panic: &std::panic::PanicHookInfo) {
    let location = panic
        .location()
        .map(|location| format!("{}:{}", location.file(), location.line()));
    tracing::error!(?location, "thread panicked: {panic}");
}
