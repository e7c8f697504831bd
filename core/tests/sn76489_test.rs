use mastersys_core::device::sn76489::Sn76489;

// ============================================================
// Command decoding
// ============================================================

#[test]
fn test_latch_tone_low_bits() {
    let mut psg = Sn76489::new();
    psg.write(0x8A); // latch ch0 tone, data 0xA
    assert_eq!(psg.get_state().tones[0].period, 0x00A);
    assert_eq!(psg.get_state().latched_register, 0);
}

#[test]
fn test_data_byte_fills_high_bits() {
    let mut psg = Sn76489::new();
    psg.write(0x8A); // latch ch0 tone, low 4 bits = 0xA
    psg.write(0x3F); // data: high 6 bits = 0x3F
    assert_eq!(psg.get_state().tones[0].period, 0x3FA);
}

#[test]
fn test_data_byte_after_volume_latch_is_ignored() {
    let mut psg = Sn76489::new();
    psg.write(0x8A); // tone latch
    psg.write(0x90 | 0x05); // latch ch0 volume = 5
    psg.write(0x3F); // data byte: dropped
    assert_eq!(psg.get_state().tones[0].period, 0x00A, "period untouched");
    assert_eq!(psg.get_state().tones[0].attenuation, 5);
}

#[test]
fn test_channel_select_bits() {
    let mut psg = Sn76489::new();
    psg.write(0x80 | 0x01); // ch0 tone
    psg.write(0xA0 | 0x02); // ch1 tone
    psg.write(0xC0 | 0x03); // ch2 tone
    let state = psg.get_state();
    assert_eq!(state.tones[0].period, 1);
    assert_eq!(state.tones[1].period, 2);
    assert_eq!(state.tones[2].period, 3);
}

#[test]
fn test_volume_latch() {
    let mut psg = Sn76489::new();
    psg.write(0x90); // ch0 volume 0 (loudest)
    psg.write(0xBF); // ch1 volume 15 (silent)
    let state = psg.get_state();
    assert_eq!(state.tones[0].attenuation, 0);
    assert_eq!(state.tones[1].attenuation, 15);
}

#[test]
fn test_noise_control() {
    let mut psg = Sn76489::new();
    psg.write(0xE0 | 0x04 | 0x01); // white noise, rate select 1
    let state = psg.get_state();
    assert!(state.noise.white);
    assert_eq!(state.noise.shift_rate, 1);
    assert_eq!(state.noise.lfsr, 0x4000, "control write reloads the LFSR");
}

// ============================================================
// Oscillator advance
// ============================================================

#[test]
fn test_tone_program_produces_output() {
    // Spec scenario: tone0 period 10, volume 0; after 16*10 cycles the
    // divider has toggled once and the mixed sample is nonzero.
    let mut psg = Sn76489::new();
    psg.write(0x8A); // tone0 low = 0xA (period 10)
    psg.write(0x00); // high bits = 0
    psg.write(0x90); // volume 0 (loudest)

    psg.tick_cycles(16 * 10);
    assert!(psg.get_state().tones[0].output, "polarity flipped once");
    assert_ne!(psg.get_sample(), 0, "audible output");
}

#[test]
fn test_period_zero_never_toggles() {
    let mut psg = Sn76489::new();
    psg.write(0x80); // tone0 period 0
    psg.write(0x00);
    psg.write(0x90);

    let before = psg.get_state().tones[0].output;
    psg.tick_cycles(16 * 1000);
    assert_eq!(psg.get_state().tones[0].output, before, "period 0 is DC");
}

#[test]
fn test_period_one_toggles_every_step() {
    let mut psg = Sn76489::new();
    psg.write(0x81); // tone0 period 1
    psg.write(0x00);

    let start = psg.get_state().tones[0].output;
    psg.tick_cycles(16);
    assert_ne!(psg.get_state().tones[0].output, start);
    psg.tick_cycles(16);
    assert_eq!(psg.get_state().tones[0].output, start, "toggles every ÷16 step");
}

#[test]
fn test_tick_accumulates_partial_steps() {
    let mut psg = Sn76489::new();
    psg.write(0x81); // period 1
    psg.write(0x00);

    let start = psg.get_state().tones[0].output;
    psg.tick_cycles(10);
    assert_eq!(psg.get_state().tones[0].output, start, "not enough for a step");
    psg.tick_cycles(6);
    assert_ne!(psg.get_state().tones[0].output, start, "16 accumulated cycles step once");
}

#[test]
fn test_tick_zero_and_negative_are_noops() {
    let mut psg = Sn76489::new();
    psg.write(0x81);
    psg.write(0x00);
    psg.tick_cycles(100);
    let before = psg.get_state();
    psg.tick_cycles(0);
    assert_eq!(psg.get_state(), before);
    psg.tick_cycles(-64);
    assert_eq!(psg.get_state(), before);
}

// ============================================================
// Noise
// ============================================================

#[test]
fn test_white_noise_advances_lfsr() {
    let mut psg = Sn76489::new();
    psg.write(0xE4); // white noise, fastest rate (0x10 steps)
    psg.write(0xF0); // noise volume 0

    let before = psg.get_state().noise.lfsr;
    psg.tick_cycles(16 * 0x10 * 4);
    assert_ne!(psg.get_state().noise.lfsr, before, "LFSR shifted");
}

#[test]
fn test_periodic_noise_recirculates() {
    let mut psg = Sn76489::new();
    psg.write(0xE0); // periodic, rate 0
    // Reset value 0x4000: the single set bit walks down to bit 0 and then
    // recirculates to bit 14. 15 shifts returns the register to its start.
    let start = psg.get_state().noise.lfsr;
    for _ in 0..15 {
        psg.tick_cycles(16 * 0x10);
    }
    assert_eq!(psg.get_state().noise.lfsr, start, "periodic pattern repeats");
}

#[test]
fn test_noise_follows_tone2_when_selected() {
    let mut psg = Sn76489::new();
    psg.write(0xC5); // tone2 period low = 5
    psg.write(0x00);
    psg.write(0xE3); // noise rate select 3: driven by tone 2
    psg.write(0xF0);

    let before = psg.get_state().noise.lfsr;
    psg.tick_cycles(16 * 5 * 2);
    assert_ne!(psg.get_state().noise.lfsr, before);
}

// ============================================================
// Mixing
// ============================================================

#[test]
fn test_all_silent_at_reset() {
    let psg = Sn76489::new();
    // All attenuations are 15 at reset: the mix is exactly zero
    assert_eq!(psg.get_sample(), 0);
}

#[test]
fn test_sample_range_within_14_bits() {
    let mut psg = Sn76489::new();
    // Everything at full volume
    psg.write(0x90);
    psg.write(0xB0);
    psg.write(0xD0);
    psg.write(0xF0);
    let sample = psg.get_sample();
    assert!((-8192..=8191).contains(&(sample as i32)), "sample {sample} inside ±8192");
}

#[test]
fn test_attenuation_monotonic() {
    let mut psg = Sn76489::new();
    psg.write(0x81); // tone0 period 1
    psg.write(0x00);
    psg.tick_cycles(16); // force output high

    let mut last = i16::MAX;
    for att in 0..16u8 {
        psg.write(0x90 | att);
        let mag = psg.get_sample().abs();
        assert!(mag < last, "attenuation {att} quieter than {}", att as i32 - 1);
        last = mag;
    }
    psg.write(0x9F);
    assert_eq!(psg.get_sample(), 0, "slot 15 fully silent");
}

#[test]
fn test_reset_and_state_round_trip() {
    let mut psg = Sn76489::new();
    psg.write(0x8A);
    psg.write(0x21);
    psg.write(0x93);
    psg.tick_cycles(1000);

    let snapshot = psg.get_state();
    let mut other = Sn76489::new();
    other.set_state(&snapshot);
    assert_eq!(other.get_state(), snapshot);

    psg.reset();
    assert_eq!(psg.get_sample(), 0);
    assert_eq!(psg.get_state().tones[0].period, 0);
}
