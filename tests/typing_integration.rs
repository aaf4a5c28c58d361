mod common;

#[cfg(test)]
mod tests {
    use crate::common::{init_tracing, operator_accepts, wait_for_focus};
    use serial_test::serial;
    use synthkey::{Backend, BackendState, Config, InjectionEngine, InjectionReport};

    fn uinput_engine() -> InjectionEngine {
        let mut config = Config::default();
        config.backend.order = vec!["uinput".to_string()];
        InjectionEngine::new(&config)
    }

    fn print_report(report: &InjectionReport) {
        if report.fatal {
            println!(
                "Injection failed ({} characters typed before the fault)",
                report.chars_typed
            );
        } else {
            println!(
                "Typed {} characters, skipped {}",
                report.chars_typed, report.chars_skipped
            );
        }
    }

    #[test]
    #[serial]
    #[ignore = "Requires /dev/uinput access and an active window"]
    fn test_uinput_typing_simple() {
        init_tracing();
        if !operator_accepts(&[
            "Types a short message through /dev/uinput.",
            "Needs write access to /dev/uinput (root or the 'input' group)",
            "and a focused text input to receive the keystrokes.",
        ]) {
            return;
        }

        let mut engine = uinput_engine();
        let text = "Hello from synthkey! 0123456789";

        println!("About to type: '{}'", text);
        wait_for_focus("Focus the window that should receive the text.");

        let report = engine.inject_str(text);
        print_report(&report);
        if !report.fatal {
            println!("Verify the text appeared in the focused window.");
        }
    }

    #[test]
    #[serial]
    #[ignore = "Requires /dev/uinput access and an active window"]
    fn test_uinput_typing_full_character_set() {
        init_tracing();
        if !operator_accepts(&[
            "Types shifted punctuation and accented words through /dev/uinput.",
            "Accents should come out folded to plain letters.",
        ]) {
            return;
        }

        let mut engine = uinput_engine();
        let text = "Test: @#$%^&*()_+-=[]{}|\\:;\"'<>,.?/ café naïve";

        println!("About to type: '{}'", text);
        wait_for_focus("Focus the window that should receive the text.");

        let report = engine.inject_str(text);
        print_report(&report);
        if !report.fatal {
            println!("Expected on screen: 'cafe naive' at the end, accents folded.");
        }
    }

    #[test]
    #[serial]
    #[ignore = "Requires a running EIS server (e.g. gnome-remote-desktop)"]
    fn test_eis_session_probe() {
        init_tracing();
        if !operator_accepts(&[
            "Connects to the compositor's EIS socket and runs the session",
            "handshake up to a keyboard-capable device.",
            "Needs an EIS server listening under $XDG_RUNTIME_DIR.",
        ]) {
            return;
        }

        let config = Config::default();
        let mut backend = synthkey::backend::eis::EisBackend::new(&config);

        match backend.probe() {
            BackendState::Ready => {
                println!("EIS session established with a keyboard-capable device");
            }
            BackendState::Unavailable => {
                println!("EIS session unavailable; is an EIS server running?");
            }
        }
    }

    // The remaining tests run unattended.

    #[test]
    fn test_engine_with_no_backends_reports_fatal() {
        init_tracing();
        let mut engine = InjectionEngine::with_backends(Vec::new());

        let report = engine.inject_str("anything");

        assert!(report.fatal);
        assert_eq!(report.chars_typed, 0);
        assert_eq!(report.chars_skipped, 0);
    }

    #[test]
    fn test_engine_from_config_with_unknown_backends_reports_fatal() {
        init_tracing();
        let mut config = Config::default();
        config.backend.order = vec!["xdotool".to_string()];
        let mut engine = InjectionEngine::new(&config);

        let report = engine.inject_str("anything");

        assert!(report.fatal);
        assert_eq!(report.chars_typed, 0);
    }
}
