use env_logger::Builder;
use std::io::Write;

/// Install the process-wide logger. Safe to call more than once; only the
/// first call takes effect.
pub fn init_log() {
    let _ = Builder::from_default_env()
        .format_timestamp_secs()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} - {}] [{}:{}] {}",
                record.level(),
                record.target(),
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .is_test(cfg!(test))
        .try_init();
}
