use eps_core::bus::PcmRail;
use eps_core::channel::ChannelCode;
use eps_core::eps::{BUS_RESET_TIME_MS, Eps, EpsConfig};
use eps_core::events::{EpsEvent, EventRecorder, EventSink};
use eps_core::protocol::{Opcode, response_value};

fn telemetry<S: EventSink>(eps: &mut Eps<S>, code: ChannelCode) -> u32 {
    let response = eps.transfer(&Opcode::GetTelemetry.frame(u32::from(code.raw()), false));
    response_value(response, false)
}

fn powered_board() -> Eps<EventRecorder<64>> {
    let mut eps = Eps::with_sink(EpsConfig::default(), EventRecorder::new());
    for code in [
        ChannelCode::VPCMBATV,
        ChannelCode::VPCM5V,
        ChannelCode::VPCM3V3,
        ChannelCode::VPCM12V,
    ] {
        eps.set_telemetry(code, 5.0).expect("rail channel exists");
    }
    eps
}

#[test]
fn pcm_reset_zeroes_telemetry_until_release() {
    let mut eps = powered_board();
    assert_eq!(telemetry(&mut eps, ChannelCode::VPCM5V), 5);

    let mask = u32::from(PcmRail::Rail5V.mask() | PcmRail::Rail12V.mask());
    let verdict = eps
        .write(&Opcode::SetPcmReset.frame(mask, false))
        .expect("validated");
    assert!(verdict.is_valid());
    assert_eq!(eps.pcm_state(), PcmRail::Battery.mask() | PcmRail::Rail3V3.mask());

    eps.set_time(BUS_RESET_TIME_MS - 1);
    assert_eq!(telemetry(&mut eps, ChannelCode::VPCM5V), 0);
    assert_eq!(telemetry(&mut eps, ChannelCode::VPCM12V), 0);
    assert_eq!(telemetry(&mut eps, ChannelCode::VPCM3V3), 5);

    eps.set_time(BUS_RESET_TIME_MS + 1);
    assert_eq!(telemetry(&mut eps, ChannelCode::VPCM5V), 5);
    assert_eq!(telemetry(&mut eps, ChannelCode::VPCM12V), 5);
    assert_eq!(eps.pcm_state(), 0x0f);
}

#[test]
fn pcm_reset_mask_is_range_checked() {
    let mut eps = powered_board();
    for mask in [0x00, 0x10] {
        let verdict = eps
            .write(&Opcode::SetPcmReset.frame(mask, false))
            .expect("validated");
        assert!(verdict.invalid_data, "mask {mask:#x} should be rejected");
    }
    assert_eq!(eps.pcm_state(), 0x0f);
}

#[test]
fn reset_rail_drops_downstream_switch_channels() {
    let mut eps = powered_board();
    // Switch 3 hangs off the 5V rail.
    eps.set_switch_state(2, true).expect("switch exists");
    let code = ChannelCode::new(0xe430);
    eps.set_telemetry(code, 3.0).expect("switch channel exists");
    assert_eq!(telemetry(&mut eps, code), 3);

    eps.write(&Opcode::SetPcmReset.frame(u32::from(PcmRail::Rail5V.mask()), false));
    assert_eq!(telemetry(&mut eps, code), 0);
    assert_eq!(eps.switch_state(2), Ok(true));

    eps.advance(BUS_RESET_TIME_MS);
    assert_eq!(telemetry(&mut eps, code), 3);
}

#[test]
fn resetting_a_reset_bus_keeps_the_original_release() {
    let mut eps = powered_board();
    let frame = Opcode::SetPcmReset.frame(u32::from(PcmRail::Rail3V3.mask()), false);

    eps.write(&frame);
    eps.set_time(300);
    eps.write(&frame);
    assert!(
        eps.sink()
            .contains(|event| *event == EpsEvent::BusAlreadyReset("PCM_BUS_3.3V"))
    );

    eps.set_time(BUS_RESET_TIME_MS);
    assert_eq!(eps.pcm_state(), 0x0f);
}

#[test]
fn node_reset_takes_down_every_rail() {
    let mut eps = powered_board();
    eps.set_telemetry(ChannelCode::VBCR1, 8.0).expect("bcr channel");
    eps.write(&Opcode::ResetNode.frame(0, false));
    assert!(eps.is_reset());
    assert_eq!(eps.pcm_state(), 0);
    assert_eq!(
        eps.telemetry(ChannelCode::VBCR1).map(|reading| reading.raw),
        Ok(0)
    );

    eps.advance(BUS_RESET_TIME_MS);
    assert!(!eps.is_reset());
    assert_eq!(eps.pcm_state(), 0x0f);
    assert_eq!(telemetry(&mut eps, ChannelCode::VPCMBATV), 5);
    assert_eq!(telemetry(&mut eps, ChannelCode::VBCR1), 8);
}

#[test]
fn board_channels_survive_node_reset() {
    let mut eps = powered_board();
    eps.set_telemetry(ChannelCode::TBRD, 25.0).expect("board channel");
    eps.write(&Opcode::ResetNode.frame(0, false));
    assert_eq!(
        eps.telemetry(ChannelCode::TBRD).map(|reading| reading.raw),
        Ok(25)
    );
}

#[test]
fn rail_release_waits_for_node_reset() {
    let mut eps = powered_board();
    eps.write(&Opcode::SetPcmReset.frame(u32::from(PcmRail::Rail5V.mask()), false));
    eps.set_time(100);
    eps.write(&Opcode::ResetNode.frame(0, false));

    eps.set_time(BUS_RESET_TIME_MS);
    assert_eq!(eps.pcm_state() & PcmRail::Rail5V.mask(), 0);
    assert!(
        !eps.sink()
            .contains(|event| *event == EpsEvent::BusResetReleased("PCM_BUS_5V"))
    );

    eps.set_time(100 + BUS_RESET_TIME_MS);
    assert_eq!(eps.pcm_state(), 0x0f);
    assert_eq!(telemetry(&mut eps, ChannelCode::VPCM5V), 5);
}

#[test]
fn reset_near_end_of_time_does_not_overflow() {
    let mut eps = powered_board();
    eps.set_time(u64::MAX - 1);
    assert!(eps.is_reset(), "watchdog should trip");

    eps.set_time(u64::MAX);
    assert!(!eps.is_reset());
    assert_eq!(eps.pcm_state(), 0x0f);

    eps.advance(u64::MAX);
    assert_eq!(eps.time(), u64::MAX);
}
