//! End-to-end burst loopback through the audio domain

use hamburst_modem::prelude::*;

struct Loopback {
    statuses: Vec<Status>,
    flips: i32,
    payload: [u8; 170],
    staged: StagedInfo,
}

fn run_loopback(config: &ModemConfig, text: &[u8], call_sign: &str) -> Loopback {
    let mut encoder = Encoder::new(config).unwrap();
    encoder.configure(
        text,
        call_sign,
        config.carrier_hz,
        config.noise_symbols,
        config.fancy_header,
    );
    let extended = encoder.extended_length();
    let mut wave = Vec::new();
    let mut block = vec![0i16; extended];
    while encoder.produce(&mut block) {
        wave.extend_from_slice(&block);
    }
    // trailing silence flushes the decoder pipeline
    wave.resize(wave.len() + 8 * extended, 0);

    let mut decoder = Decoder::new(config).unwrap();
    let mut result = Loopback {
        statuses: Vec::new(),
        flips: i32::MIN,
        payload: [0; 170],
        staged: StagedInfo::default(),
    };
    for chunk in wave.chunks(extended) {
        if decoder.feed(chunk) {
            let status = decoder.process();
            if status != Status::Ok {
                result.statuses.push(status);
            }
            match status {
                Status::Done => {
                    result.flips = decoder.fetch(&mut result.payload);
                    result.staged = decoder.staged();
                }
                Status::Sync | Status::Ping => {
                    result.staged = decoder.staged();
                }
                _ => {}
            }
        }
    }
    result
}

fn text_of(payload: &[u8; 170]) -> &str {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(170);
    std::str::from_utf8(&payload[..end]).unwrap()
}

#[test]
fn hello_roundtrip() {
    let config = ModemConfig::default();
    let result = run_loopback(&config, b"HELLO", "TEST");
    assert_eq!(result.statuses, vec![Status::Sync, Status::Done]);
    assert_eq!(result.flips, 0);
    assert_eq!(text_of(&result.payload), "HELLO");
    assert!(result.staged.call_sign.starts_with("TEST"));
    assert_eq!(result.staged.mode, 16);
}

#[test]
fn cq_text_roundtrip() {
    let config = ModemConfig::default();
    let result = run_loopback(&config, b"CQ CQ CQ DE W1AW W1AW K", "W1AW");
    assert_eq!(text_of(&result.payload), "CQ CQ CQ DE W1AW W1AW K");
    assert_eq!(result.staged.call_sign.trim_end(), "W1AW");
}

#[test]
fn mode_16_at_80_bytes() {
    let config = ModemConfig::default();
    let text = [b'A'; 80];
    let result = run_loopback(&config, &text, "N0CALL");
    assert_eq!(result.staged.mode, 16);
    assert_eq!(result.flips, 0);
    assert_eq!(text_of(&result.payload).as_bytes(), &text);
}

#[test]
fn mode_15_at_120_bytes() {
    let config = ModemConfig::default();
    let text = [b'B'; 120];
    let result = run_loopback(&config, &text, "K1ABC");
    assert_eq!(result.staged.mode, 15);
    assert_eq!(result.flips, 0);
    assert_eq!(text_of(&result.payload).as_bytes(), &text);
}

#[test]
fn empty_payload_pings() {
    let config = ModemConfig::default();
    let result = run_loopback(&config, b"", "TEST");
    assert_eq!(result.statuses, vec![Status::Ping]);
    assert_eq!(result.staged.mode, 0);
    assert_eq!(result.staged.call_sign.trim_end(), "TEST");
}

#[test]
fn noise_leader_still_decodes() {
    let config = ModemConfig {
        noise_symbols: 2,
        ..ModemConfig::default()
    };
    let result = run_loopback(&config, b"LEADER", "TEST");
    assert_eq!(result.statuses, vec![Status::Sync, Status::Done]);
    assert_eq!(text_of(&result.payload), "LEADER");
}

#[test]
fn fancy_header_does_not_disturb_decode() {
    let config = ModemConfig {
        fancy_header: true,
        ..ModemConfig::default()
    };
    let result = run_loopback(&config, b"BANNER", "W1AW");
    assert_eq!(result.statuses, vec![Status::Sync, Status::Done]);
    assert_eq!(text_of(&result.payload), "BANNER");
}

#[test]
fn off_grid_carrier_frequency() {
    // 1506.25 Hz lands on an odd bin at 8 kHz
    let config = ModemConfig {
        carrier_hz: 1506.25,
        ..ModemConfig::default()
    };
    let result = run_loopback(&config, b"HELLO", "TEST");
    assert_eq!(result.statuses, vec![Status::Sync, Status::Done]);
    assert_eq!(text_of(&result.payload), "HELLO");
}

#[test]
fn silence_keeps_decoder_idle() {
    let config = ModemConfig::default();
    let mut decoder = Decoder::new(&config).unwrap();
    let extended = decoder.extended_length();
    let block = vec![0i16; extended];
    let seconds = 2 * config.sample_rate as usize;
    let mut fed = 0;
    while fed < seconds {
        if decoder.feed(&block) {
            assert_eq!(decoder.process(), Status::Ok);
        }
        fed += extended;
    }
}

#[test]
fn white_noise_never_completes() {
    let config = ModemConfig::default();
    let mut decoder = Decoder::new(&config).unwrap();
    let extended = decoder.extended_length();
    let mut rng = 0x2545_f491u32;
    let mut next = move || {
        rng ^= rng << 13;
        rng ^= rng >> 17;
        rng ^= rng << 5;
        (rng % 2001) as i16 - 1000
    };
    for _ in 0..24 {
        let block: Vec<i16> = (0..extended).map(|_| next()).collect();
        if decoder.feed(&block) {
            let status = decoder.process();
            assert!(
                matches!(status, Status::Ok | Status::Fail | Status::Nope),
                "unexpected status {status:?}"
            );
        }
    }
}

#[test]
fn high_rate_roundtrip() {
    let config = ModemConfig {
        sample_rate: 48000,
        ..ModemConfig::default()
    };
    let encoder = Encoder::new(&config).unwrap();
    assert_eq!(encoder.extended_length(), 8640);
    let result = run_loopback(&config, b"FORTY EIGHT", "TEST");
    assert_eq!(result.statuses, vec![Status::Sync, Status::Done]);
    assert_eq!(result.flips, 0);
    assert_eq!(text_of(&result.payload), "FORTY EIGHT");
}

#[test]
fn stereo_left_channel() {
    let config = ModemConfig::default();
    let mut encoder = Encoder::new(&config).unwrap();
    encoder.configure(b"STEREO", "TEST", config.carrier_hz, 0, false);
    let extended = encoder.extended_length();
    let mut wave = Vec::new();
    let mut block = vec![0i16; extended];
    while encoder.produce(&mut block) {
        for &s in block.iter() {
            wave.push(s); // left
            wave.push(0); // right
        }
    }
    wave.resize(wave.len() + 16 * extended, 0);

    let stereo = ModemConfig {
        channel: Channel::Left,
        ..ModemConfig::default()
    };
    let mut decoder = Decoder::new(&stereo).unwrap();
    let mut done = false;
    let mut payload = [0u8; 170];
    for chunk in wave.chunks(2 * extended) {
        if decoder.feed(chunk) && decoder.process() == Status::Done {
            assert!(decoder.fetch(&mut payload) >= 0);
            done = true;
        }
    }
    assert!(done);
    assert_eq!(text_of(&payload), "STEREO");
}
