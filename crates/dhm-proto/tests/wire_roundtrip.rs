//! Encode/decode round trips over a chunked async stream.

use bytes::BytesMut;
use dhm_core::{ConfigItem, DhmError, FrameField, ImageBuffer};
use dhm_proto::{Command, Payload, Request, Response, WireReader, WireType};
use tokio_test::io::Builder;

fn encode(payload: &Payload) -> Vec<u8> {
    let mut buf = BytesMut::new();
    payload.encode(&mut buf);
    buf.to_vec()
}

async fn decode(bytes: &[u8], ty: WireType) -> Payload {
    // Deliver the bytes in 3-byte chunks so decoders must reassemble fields.
    let mut builder = Builder::new();
    for chunk in bytes.chunks(3) {
        builder.read(chunk);
    }
    let mut reader = WireReader::new(builder.build());
    reader.read_payload(ty).await.unwrap()
}

#[tokio::test]
async fn scalars_round_trip_bit_exact() {
    for value in [0, -1, i32::MIN, i32::MAX, 27182] {
        let p = Payload::Int32(value);
        assert_eq!(decode(&encode(&p), WireType::Int32).await, p);
    }

    for value in [0.0f32, -0.0, 1.25e-7, f32::MAX, 682.5] {
        match decode(&encode(&Payload::Float32(value)), WireType::Float32).await {
            Payload::Float32(back) => assert_eq!(back.to_bits(), value.to_bits()),
            other => panic!("unexpected {:?}", other),
        }
    }

    for value in [0.0f64, 6.825e-7, -1e300, f64::MIN_POSITIVE] {
        match decode(&encode(&Payload::Float64(value)), WireType::Float64).await {
            Payload::Float64(back) => assert_eq!(back.to_bits(), value.to_bits()),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[tokio::test]
async fn nan_payload_survives_bit_for_bit() {
    let nan = f32::from_bits(0x7fc0_0123);
    match decode(&encode(&Payload::Float32(nan)), WireType::Float32).await {
        Payload::Float32(back) => assert_eq!(back.to_bits(), 0x7fc0_0123),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn strings_round_trip() {
    for value in ["", "µm", "Mach-Zehnder 10x / 0.3", "ダイ"] {
        let p = Payload::String(value.to_string());
        assert_eq!(decode(&encode(&p), WireType::String).await, p);
    }
}

#[tokio::test]
async fn config_list_round_trips() {
    let p = Payload::ConfigList(vec![
        ConfigItem::new(137, "10x reflection"),
        ConfigItem::new(138, ""),
        ConfigItem::new(-4, "20x transmission"),
    ]);
    assert_eq!(decode(&encode(&p), WireType::ConfigList).await, p);
    assert_eq!(
        decode(&encode(&Payload::ConfigList(vec![])), WireType::ConfigList).await,
        Payload::ConfigList(vec![])
    );
}

#[tokio::test]
async fn padded_sixteen_bit_image_round_trips() {
    // 3 rows of 5 pixels at 2 bytes, padded to 12-byte rows
    let data: Vec<u8> = (0..36).map(|i| i as u8).collect();
    let image = ImageBuffer::new(3, 5, 12, data).unwrap();
    let p = Payload::Image(image);
    assert_eq!(decode(&encode(&p), WireType::Image).await, p);
}

#[tokio::test]
async fn request_then_response_share_the_stream() {
    let mut bytes = Request::with_arg(Command::SetCameraShutterUs, Payload::Float32(250.0))
        .encode()
        .to_vec();
    bytes.extend_from_slice(&Response::ack(Command::SetCameraShutterUs).encode());

    let mut reader = WireReader::new(bytes.as_slice());
    assert_eq!(
        reader.read_command().await.unwrap(),
        Some(Command::SetCameraShutterUs.code())
    );
    assert_eq!(reader.read_f32().await.unwrap(), 250.0);
    assert_eq!(
        reader.read_response(Command::SetCameraShutterUs).await.unwrap(),
        Ok(Payload::Empty)
    );
    assert!(reader.read_command().await.unwrap().is_none());
}

#[tokio::test]
async fn truncated_image_body_is_a_framing_error() {
    let image = ImageBuffer::new(2, 2, 2, vec![9; 4]).unwrap();
    let bytes = encode(&Payload::Image(image));
    let mut reader = WireReader::new(&bytes[..bytes.len() - 1]);
    assert!(matches!(
        reader.read_image().await,
        Err(DhmError::ShortRead(FrameField::Bytes))
    ));
}
