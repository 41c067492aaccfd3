//! Shell commands with predictable output for process tests.

/// Prints `0`, `1`, `2`, ... one line every `interval_ms`, forever.
pub fn counter_command(interval_ms: u64) -> String {
    let secs = interval_ms as f64 / 1000.0;
    format!("sh -c 'i=0; while true; do echo $i; i=$((i+1)); sleep {secs}; done'")
}

/// Prints `line` and exits.
pub fn echo_command(line: &str) -> String {
    format!("echo {line}")
}

/// Prints `before`, sleeps for `sleep_ms`, then prints `after`.
pub fn slow_echo_command(before: &str, sleep_ms: u64, after: &str) -> String {
    let secs = sleep_ms as f64 / 1000.0;
    format!("sh -c 'echo {before}; sleep {secs}; echo {after}'")
}

/// Ignores SIGINT and sleeps, so only a hard kill stops it.
pub fn stubborn_command(sleep_secs: u64) -> String {
    format!("sh -c 'trap \"\" INT; sleep {sleep_secs}'")
}
