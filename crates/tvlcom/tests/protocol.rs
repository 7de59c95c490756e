use tvlcom::frame::{
    build_frame, crc16, crc16_bitwise, decode_tlvs, FrameError, FrameReceiver, ReceiverState,
    TlvBuilder, TlvTypes, MAX_DATA_LENGTH,
};

fn sample_payload(seed: u8) -> Vec<u8> {
    let mut builder = TlvBuilder::new();
    builder.control(seed).unwrap();
    builder.integer(u32::from(seed) * 1000).unwrap();
    builder.string("tvlcom").unwrap();
    builder.scaled(0x41, 3.3).unwrap();
    builder.as_bytes().to_vec()
}

fn feed_all(receiver: &mut FrameReceiver, bytes: &[u8]) -> (Vec<u8>, Vec<FrameError>) {
    let mut ids = Vec::new();
    let mut errors = Vec::new();
    receiver.feed(bytes, |event| match event {
        Ok(frame) => ids.push(frame.id),
        Err(err) => errors.push(err),
    });
    (ids, errors)
}

#[test]
fn crc_reference_values() {
    assert_eq!(crc16(b"123456789"), 0x29B1);
    assert_eq!(crc16(b""), 0xFFFF);
    let data: Vec<u8> = (0..=255).collect();
    assert_eq!(crc16(&data), crc16_bitwise(&data, 0xFFFF));
}

#[test]
fn byte_by_byte_roundtrip_preserves_records() {
    for id in [0u8, 1, 0x7F, 0xF0, 0xFF] {
        let payload = sample_payload(id);
        let wire = build_frame(id, &payload).unwrap();

        let mut receiver = FrameReceiver::new();
        let mut frames = Vec::new();
        for &byte in wire.iter() {
            if let Some(event) = receiver.process_byte(byte) {
                frames.push(event.unwrap());
            }
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, id);
        assert_eq!(frames[0].records, decode_tlvs(payload).unwrap());
    }
}

#[test]
fn crc_bit_flips_drop_frame_and_recover() {
    let good = build_frame(0x22, &sample_payload(2)).unwrap();
    let crc_offset = good.len() - 4;

    for bit in 0..16 {
        let mut corrupted = good.to_vec();
        corrupted[crc_offset + bit / 8] ^= 1 << (bit % 8);
        corrupted.extend_from_slice(&good);

        let mut receiver = FrameReceiver::new();
        let (ids, errors) = feed_all(&mut receiver, &corrupted);
        assert_eq!(ids, vec![0x22], "bit {bit}");
        assert_eq!(errors.len(), 1, "bit {bit}");
        assert!(matches!(errors[0], FrameError::ChecksumMismatch { .. }));
        assert_eq!(receiver.state(), ReceiverState::Sync);
    }
}

#[test]
fn spurious_header_byte_before_frame() {
    let mut stream = vec![0xF0, 0x55, 0x00, 0xF0];
    stream.extend_from_slice(&build_frame(9, &sample_payload(9)).unwrap());

    let mut receiver = FrameReceiver::new();
    let (ids, errors) = feed_all(&mut receiver, &stream);
    assert_eq!(ids, vec![9]);
    assert!(errors.is_empty());
}

#[test]
fn truncated_tlv_is_malformed() {
    let err = decode_tlvs(vec![0x01, 0x03, 0xAA, 0xBB]).unwrap_err();
    assert!(matches!(err, FrameError::MalformedTlv { .. }));
}

#[test]
fn largest_frame_survives_noise() {
    let mut builder = TlvBuilder::new();
    while builder.len() + 2 + 10 <= MAX_DATA_LENGTH {
        builder.raw(0x50, &[0xE0; 10]).unwrap();
    }
    let payload = builder.finish();

    let mut stream = vec![0x00; 7];
    stream.extend_from_slice(&build_frame(0x33, &payload).unwrap());
    stream.extend_from_slice(&[0xE0, 0x0D, 0x0F]);
    stream.extend_from_slice(&build_frame(0x34, &[]).unwrap());

    let mut receiver = FrameReceiver::new();
    let frames = receiver.feed_frames(&stream);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].records.len(), payload.len() / 12);
    assert!(frames[1].records.is_empty());
    assert_eq!(receiver.stats().frames, 2);
    assert_eq!(receiver.stats().errors(), 0);
}

#[test]
fn firmware_profile_frames_decode_the_same() {
    let types = TlvTypes::FIRMWARE;
    let mut builder = TlvBuilder::with_types(types);
    builder.control(0x05).unwrap();
    builder.string("ok").unwrap();
    let wire = build_frame(1, builder.as_bytes()).unwrap();

    let frames = FrameReceiver::new().feed_frames(&wire);
    assert_eq!(frames[0].records[0].tlv_type, types.control);
    assert_eq!(frames[0].records[1].tlv_type, types.string);
    assert_eq!(frames[0].records[1].as_str(), Some("ok"));
}
