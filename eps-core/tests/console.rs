use eps_core::channel::ChannelCode;
use eps_core::console::completion::CompletionEngine;
use eps_core::console::executor::{ConsoleError, ConsoleExecutor, ConsoleOutcome};
use eps_core::console::grammar::{ParseError, SwitchAction};
use eps_core::console::status::StatusFormatter;
use eps_core::eps::{Eps, EpsConfig};
use eps_core::events::NoopEventSink;

fn console() -> ConsoleExecutor<NoopEventSink> {
    ConsoleExecutor::new(Eps::new(EpsConfig::default())).with_tick(1_000)
}

fn response(console: &mut ConsoleExecutor<NoopEventSink>, line: &str) -> String {
    match console.execute(line).expect("command should run") {
        ConsoleOutcome::Exchange(exchange) => exchange.to_string(),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn watchdog_session_through_the_console() {
    let mut console = console();
    assert_eq!(response(&mut console, "cmd set-wdt-period 1"), "NO RESPONSE");
    assert_eq!(response(&mut console, "cmd get-wdt-period"), "0x0001");

    console.execute("tick 60s").expect("tick");
    assert!(console.eps().is_reset());
    assert_eq!(response(&mut console, "cmd get-checksum"), "NO RESPONSE");

    console.execute("tick 500ms").expect("tick");
    assert_eq!(response(&mut console, "cmd get-num-wdt-resets"), "0x0001");
    assert_eq!(response(&mut console, "cmd get-last-error"), "0x0013");
}

#[test]
fn switch_edits_show_up_on_the_wire() {
    let mut console = console();
    match console.execute("switch 2 on").expect("switch") {
        ConsoleOutcome::Switch(command) => {
            assert_eq!(command.number, 2);
            assert_eq!(command.action, SwitchAction::On);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    console.execute("switch 5 initial-on").expect("switch");

    assert_eq!(
        response(&mut console, "cmd get-pdm-all-actual-state"),
        "0x00000004"
    );
    assert_eq!(
        response(&mut console, "cmd get-pdm-all-initial-state"),
        "0x00000020"
    );
}

#[test]
fn telemetry_edits_and_queries() {
    let mut console = console();
    match console.execute("tlm VPCM3V3 3.3").expect("set") {
        ConsoleOutcome::TelemetrySet { code, value } => {
            assert_eq!(code, ChannelCode::VPCM3V3);
            assert!((value - 3.3).abs() < f64::EPSILON);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    match console.execute("tlm vpcm3v3").expect("show") {
        ConsoleOutcome::Telemetry { reading, .. } => assert_eq!(reading.raw, 3),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(matches!(
        console.execute("tlm"),
        Ok(ConsoleOutcome::TelemetryList)
    ));
}

#[test]
fn raw_frames_reach_the_dispatcher() {
    let mut console = console();
    assert_eq!(response(&mut console, "write 0x02 0x00"), "0xffff");
    assert_eq!(response(&mut console, "write 0x03 0"), "0x0001");
    assert_eq!(response(&mut console, "read"), "0x0001");
    assert_eq!(response(&mut console, "write 0x05"), "0xffff");
}

#[test]
fn parse_errors_do_not_touch_the_board() {
    let mut console = console();
    match console.execute("cmd") {
        Err(ConsoleError::Parse(ParseError::Grammar(_))) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    match console.execute("reboot now") {
        Err(ConsoleError::Parse(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(console.eps().status().bits(), 0);
    assert_eq!(console.eps().wdt_elapsed(), 0);
}

#[test]
fn status_snapshot_renders_after_activity() {
    let mut console = console();
    console.execute("switch 1 on").expect("switch");
    console.execute("tick 3").expect("tick");

    let ConsoleOutcome::Status(snapshot) = console.execute("status").expect("status") else {
        panic!("status should produce a snapshot");
    };
    let formatter = StatusFormatter::new(&snapshot);
    let mut time = String::new();
    formatter.write_time_line(&mut time).expect("render");
    assert_eq!(time, "time 3000ms reset=no pcm=0x0f wdt=3000/240000ms");

    let mut switch = String::new();
    formatter.write_switch_line(&mut switch, 0).expect("render");
    assert_eq!(switch, "switch 1 on commanded=on initial=off timer=0/255");
}

#[test]
fn completion_follows_the_console_grammar() {
    let engine = CompletionEngine::new();
    let result = engine.complete("cmd set-pdm-t", 13);
    let replacement = result.replacement.expect("unique opcode");
    assert_eq!(replacement.value, "set-pdm-timer-limit");
    assert_eq!(replacement.start, 4);

    let result = engine.complete("switch 3 of", 11);
    assert_eq!(result.options.as_slice(), ["off"]);
}
