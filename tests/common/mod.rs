// Shared helpers for the typing tests: tracing setup and operator prompts.
// The interactive tests inject keystrokes into whatever window has focus,
// so each one describes itself and asks before touching the keyboard.

use std::io::{self, BufRead, Write};
use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a fmt subscriber once per test binary. RUST_LOG overrides the
/// default level.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .init();
    });
}

/// Describe the test and ask the operator whether to run it. Anything other
/// than "y" skips the test body.
pub fn operator_accepts(description: &[&str]) -> bool {
    println!();
    for line in description {
        println!("  {}", line);
    }
    print!("Run this test? [y/N] ");
    io::stdout().flush().unwrap();

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer).unwrap();
    answer.trim().eq_ignore_ascii_case("y")
}

/// Block until the operator confirms the input focus is where it should be.
pub fn wait_for_focus(prompt: &str) {
    print!("{} Press Enter when ready. ", prompt);
    io::stdout().flush().unwrap();

    let mut sink = String::new();
    io::stdin().lock().read_line(&mut sink).unwrap();
}
