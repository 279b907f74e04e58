use time::format_description::{self, OwnedFormatItem};
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::LogConfig;

const DEFAULT_TIME_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

/// 初始化日志, 需持有返回的guard直到程序结束
pub fn init_logger(config: &LogConfig) -> Vec<WorkerGuard> {
    let max_level = config.max_level.as_tracing_level();

    let (time_format, format_err) = match format_description::parse_owned::<2>(&config.time_format) {
        Ok(f) => (f, None),
        Err(e) => (default_time_format(), Some(e)),
    };

    let (offset, offset_err) = match time::UtcOffset::current_local_offset() {
        Ok(ofs) => (ofs, None),
        Err(e) => (time::UtcOffset::UTC, Some(e)),
    };
    let timer = OffsetTime::new(offset, time_format);

    let mut guards = Vec::with_capacity(3);

    let (s, s_guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(s_guard);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_timer(timer.clone())
        .with_writer(s.with_max_level(max_level));

    let file_layers = config.directory.as_ref().map(|dir| {
        let file_writer = tracing_appender::rolling::daily(dir, "gbridge.log");
        let (f, f_guard) = tracing_appender::non_blocking(file_writer);

        let file_error_writer = tracing_appender::rolling::daily(dir.join("error"), "gbridge.err");
        let (f_err, f_err_guard) = tracing_appender::non_blocking(file_error_writer);

        guards.push(f_guard);
        guards.push(f_err_guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_timer(timer.clone())
            .with_writer(f.with_max_level(max_level));

        let file_error_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_timer(timer.clone())
            .with_writer(f_err.with_max_level(tracing::Level::ERROR));

        file_layer.and_then(file_error_layer)
    });

    if tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layers)
        .try_init()
        .is_err()
    {
        return guards;
    }

    if let Some(e) = format_err {
        warn!("日志时间格式({})无效: {}, 使用默认格式", config.time_format, e);
    }

    if let Some(e) = offset_err {
        warn!("初始化日志时间错误: {}, 使用默认时区UTC", e);
    }

    guards
}

fn default_time_format() -> OwnedFormatItem {
    match format_description::parse_owned::<2>(DEFAULT_TIME_FORMAT) {
        Ok(f) => f,
        Err(_) => OwnedFormatItem::Compound(Box::new([])),
    }
}
