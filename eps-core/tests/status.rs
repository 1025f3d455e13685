use eps_core::eps::{Eps, EpsConfig};
use eps_core::protocol::{Opcode, response_value};
use eps_core::status::{ErrorCode, ResetType, Status, StatusBit};
use eps_core::version::Version;

fn send<S: eps_core::events::EventSink>(eps: &mut Eps<S>, opcode: Opcode, param: u32) -> u32 {
    let response = eps.transfer(&opcode.frame(param, false));
    response_value(response, false)
}

#[test]
fn last_error_tracks_most_recent_fault() {
    let mut eps = Eps::new(EpsConfig::default());
    assert_eq!(send(&mut eps, Opcode::GetLastError, 0), 0);

    eps.write(&[0x02, 0x00]);
    assert_eq!(send(&mut eps, Opcode::GetLastError, 0), 1);

    send(&mut eps, Opcode::SetPdmOn, 0);
    assert_eq!(send(&mut eps, Opcode::GetLastError, 0), 3);
    assert_eq!(eps.status().last_error(), ErrorCode::InvalidChannel);
}

#[test]
fn board_status_reports_then_clears_validation_bits() {
    let mut eps = Eps::new(EpsConfig::default());
    send(&mut eps, Opcode::SetWdtPeriod, 0);
    assert!(eps.status().is_set(StatusBit::InvalidData));

    assert_eq!(
        send(&mut eps, Opcode::GetBoardStatus, 0),
        u32::from(StatusBit::InvalidData.mask())
    );
    assert_eq!(send(&mut eps, Opcode::GetBoardStatus, 0), 0);
}

#[test]
fn version_is_reported_raw() {
    let mut eps = Eps::new(EpsConfig::default());
    eps.set_version(Version::from_raw(0xabcd));
    let response = eps.transfer(&Opcode::GetVersion.frame(0, false));
    assert_eq!(response, [0xab, 0xcd]);
}

#[test]
fn checksum_is_fixed() {
    let mut eps = Eps::new(EpsConfig::default());
    assert_eq!(send(&mut eps, Opcode::GetChecksum, 0), 0xdead);
}

#[test]
fn daughterboard_widens_status_queries() {
    let config = EpsConfig {
        daughterboard: true,
        ..EpsConfig::default()
    };
    let mut eps = Eps::new(config);
    eps.set_version(Version::from_raw(0x1001));
    eps.set_daughterboard_version(Version::from_raw(0x2002));
    eps.set_daughterboard_status(Status::from_bits(StatusBit::ResetPowerOn.mask()));

    let response = eps.transfer(&Opcode::GetVersion.frame(0, false));
    assert_eq!(response, [0x20, 0x02, 0x10, 0x01]);

    assert_eq!(send(&mut eps, Opcode::GetBoardStatus, 0), 0x0020_0000);
    assert_eq!(send(&mut eps, Opcode::GetChecksum, 0), 0xdead_dead);
}

#[test]
fn telemetry_sentinel_stays_one_word_with_daughterboard() {
    let config = EpsConfig {
        daughterboard: true,
        ..EpsConfig::default()
    };
    let mut eps = Eps::new(config);
    let response = eps.transfer(&Opcode::GetTelemetry.frame(0x1234, false));
    assert_eq!(response, [0xff, 0xff]);
}

#[test]
fn reset_flags_are_exclusive() {
    let mut status = Status::new();
    status.set_reset(ResetType::PowerOn);
    status.set_reset(ResetType::BrownOut);
    assert!(!status.is_reset_set(ResetType::PowerOn));
    assert!(status.is_reset_set(ResetType::BrownOut));
    assert_eq!(status.reset_count(ResetType::PowerOn), 1);
    assert_eq!(status.reset_count(ResetType::BrownOut), 1);
    assert_eq!(status.last_error(), ErrorCode::Reset);

    status.set_reset(ResetType::Manual);
    assert!(status.is_reset_set(ResetType::BrownOut));
    assert!(status.is_reset_set(ResetType::Manual));
}
