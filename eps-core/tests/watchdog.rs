use eps_core::eps::{DEFAULT_WDT_TIMEOUT_MS, Eps, EpsConfig};
use eps_core::events::{EpsEvent, EventRecorder, EventSink};
use eps_core::protocol::{Opcode, response_value};
use eps_core::status::{ResetType, StatusBit};

fn send<S: EventSink>(eps: &mut Eps<S>, opcode: Opcode, param: u32) -> u32 {
    let response = eps.transfer(&opcode.frame(param, false));
    response_value(response, false)
}

#[test]
fn watchdog_trips_after_default_timeout_and_recovers() {
    let mut eps = Eps::with_sink(EpsConfig::default(), EventRecorder::<32>::new());

    eps.set_time(DEFAULT_WDT_TIMEOUT_MS - 1);
    assert!(!eps.is_reset());

    eps.set_time(DEFAULT_WDT_TIMEOUT_MS);
    assert!(eps.is_reset());
    assert!(eps.status().is_set(StatusBit::ResetWatchdog));
    assert!(eps.sink().contains(|event| *event == EpsEvent::WatchdogExpired));

    // The board ignores traffic while it is held in reset.
    assert!(eps.transfer(&Opcode::GetChecksum.frame(0, false)).is_empty());

    eps.set_time(DEFAULT_WDT_TIMEOUT_MS + 499);
    assert!(eps.is_reset());
    eps.set_time(DEFAULT_WDT_TIMEOUT_MS + 500);
    assert!(!eps.is_reset());
    assert!(
        eps.sink()
            .contains(|event| *event == EpsEvent::BusResetReleased("BCR_BUS"))
    );

    assert_eq!(send(&mut eps, Opcode::GetNumWdtResets, 0), 1);
    assert_eq!(eps.status().reset_count(ResetType::Watchdog), 1);
}

#[test]
fn watchdog_period_is_configurable_in_minutes() {
    let mut eps = Eps::new(EpsConfig::default());
    assert_eq!(send(&mut eps, Opcode::GetWdtPeriod, 0), 4);

    send(&mut eps, Opcode::SetWdtPeriod, 10);
    assert_eq!(send(&mut eps, Opcode::GetWdtPeriod, 0), 10);
    assert_eq!(eps.wdt_timeout(), 600_000);

    eps.set_time(599_999);
    assert!(!eps.is_reset());
    eps.set_time(600_000);
    assert!(eps.is_reset());
}

#[test]
fn watchdog_period_range_is_enforced() {
    let mut eps = Eps::new(EpsConfig::default());

    for period in [0, 91, 0xff] {
        let verdict = eps
            .write(&Opcode::SetWdtPeriod.frame(period, false))
            .expect("validated");
        assert!(verdict.invalid_data, "period {period} should be rejected");
        assert_eq!(eps.read(), [0xff, 0xff]);
    }
    assert_eq!(eps.wdt_timeout(), DEFAULT_WDT_TIMEOUT_MS);

    for period in [1, 90] {
        let verdict = eps
            .write(&Opcode::SetWdtPeriod.frame(period, false))
            .expect("validated");
        assert!(verdict.is_valid());
        assert!(eps.read().is_empty());
    }
    assert_eq!(send(&mut eps, Opcode::GetWdtPeriod, 0), 90);
}

#[test]
fn reset_wdt_postpones_expiry() {
    let mut eps = Eps::new(EpsConfig::default());
    eps.set_time(200_000);
    send(&mut eps, Opcode::ResetWdt, 0);
    assert_eq!(eps.wdt_elapsed(), 0);

    eps.set_time(400_000);
    assert!(!eps.is_reset());
    assert_eq!(eps.wdt_elapsed(), 200_000);
}

#[test]
fn only_valid_commands_feed_the_watchdog() {
    let mut eps = Eps::new(EpsConfig::default());
    eps.set_time(100_000);

    eps.write(&[0x02, 0x00]);
    eps.write(&[0x04]);
    assert_eq!(eps.wdt_elapsed(), 100_000);

    send(&mut eps, Opcode::GetVersion, 0);
    assert_eq!(eps.wdt_elapsed(), 0);
}

#[test]
fn time_moving_backwards_does_not_feed_the_accumulator() {
    let mut eps = Eps::new(EpsConfig::default());
    eps.set_time(10_000);
    eps.set_time(5_000);
    assert_eq!(eps.wdt_elapsed(), 10_000);
    eps.set_time(6_000);
    assert_eq!(eps.wdt_elapsed(), 11_000);
}

#[test]
fn reset_node_counts_manual_resets_and_keeps_last_error() {
    let mut eps = Eps::new(EpsConfig::default());
    eps.write(&[0x02, 0x00]);
    let before = eps.status().last_error();

    send(&mut eps, Opcode::ResetNode, 0);
    assert!(eps.is_reset());
    assert_eq!(eps.status().last_error(), before);
    assert!(eps.status().is_reset_set(ResetType::Manual));

    eps.advance(500);
    assert!(!eps.is_reset());
    assert_eq!(send(&mut eps, Opcode::GetNumManualResets, 0), 1);
}

#[test]
fn reset_counters_report_each_cause() {
    let mut eps = Eps::new(EpsConfig::default());
    let counters = [
        Opcode::GetNumBrownOutResets,
        Opcode::GetNumAutoSwResets,
        Opcode::GetNumManualResets,
        Opcode::GetNumWdtResets,
    ];
    for opcode in counters {
        assert_eq!(send(&mut eps, opcode, 0), 0, "{opcode} should start at zero");
    }

    for round in 1..=3u32 {
        send(&mut eps, Opcode::ResetNode, 0);
        eps.advance(500);
        assert_eq!(send(&mut eps, Opcode::GetNumManualResets, 0), round);
    }
    assert_eq!(send(&mut eps, Opcode::GetNumAutoSwResets, 0), 0);
    assert_eq!(send(&mut eps, Opcode::GetNumWdtResets, 0), 0);
}
