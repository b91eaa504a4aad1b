/// Version Module
///
/// Build metadata captured by `build.rs` and the crash report printed when
/// the process panics.
use std::backtrace::Backtrace;
use std::fmt::Write;
use std::panic::PanicHookInfo;

pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SLURP_GIT_COMMIT"), ")");
pub const GIT_COMMIT: &str = env!("SLURP_GIT_COMMIT");
pub const BUILD_DATE: &str = env!("SLURP_BUILD_DATE");
pub const RUSTC_VERSION: &str = env!("SLURP_RUSTC_VERSION");

/// Replace the default panic output with a crash report and exit with status 1
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let message = panic_message(info);
        tracing::error!("{}", message);
        let report = crash_report(&message, &Backtrace::force_capture().to_string());
        eprintln!("{}", report);
        std::process::exit(1);
    }));
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "unknown location".to_string());

    let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic payload".to_string()
    };

    format!("panic at {}: {}", location, message)
}

fn crash_report(message: &str, backtrace: &str) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "slurp crashed");
    let _ = writeln!(report, "version:    {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(report, "build date: {}", BUILD_DATE);
    let _ = writeln!(report, "commit:     {}", GIT_COMMIT);
    let _ = writeln!(report, "rustc:      {}", RUSTC_VERSION);
    let _ = writeln!(report, "platform:   {}/{}", std::env::consts::OS, std::env::consts::ARCH);
    let _ = writeln!(report, "{}", message);
    let _ = writeln!(report);
    let _ = write!(report, "{}", backtrace);
    report
}
