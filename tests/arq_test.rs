//! ARQ session tests over an in-memory transport: retries,
//! acknowledgments, duplicate suppression, and sequence allocation

mod common;

use bytes::Bytes;
use common::{linked_pair, mock_endpoint};
use crclink::crc::GeneratorPoly;
use crclink::frame::{self, FrameType};
use crclink::{LinkConfig, LinkError, SendOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn poly(s: &str) -> GeneratorPoly {
    GeneratorPoly::parse(s).unwrap()
}

// ---------------------------------------------------------------------------
// Retry loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn silent_peer_exhausts_exactly_max_retries() {
    let mut ep = mock_endpoint(LinkConfig::testing());
    let mut sent_rx = ep.sent_rx.take().unwrap();

    let outcome = ep.session.send(Bytes::from_static(b"nobody answers")).await.unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Exhausted {
            seq: 0,
            attempts: 3
        }
    );

    // exactly three identical transmissions on the wire
    let g = poly(&LinkConfig::testing().generator);
    let mut frames = Vec::new();
    while let Ok(f) = sent_rx.try_recv() {
        frames.push(f);
    }
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], frames[1]);
    assert_eq!(frames[1], frames[2]);
    let parsed = frame::parse(frames[0].clone(), &g).unwrap();
    assert_eq!(parsed.header.frame_type, FrameType::Data);
    assert_eq!(parsed.header.seq, 0);

    let snap = ep.session.metrics().snapshot();
    assert_eq!(snap.data_frames_sent, 3);
    assert_eq!(snap.retransmissions, 2);
    assert_eq!(snap.sends_exhausted, 1);
}

#[tokio::test]
async fn transport_failure_aborts_without_retrying() {
    let ep = mock_endpoint(LinkConfig::testing());
    ep.transport.fail_sends(true);

    let err = ep.session.send(Bytes::from_static(b"wire is down")).await.unwrap_err();
    assert!(matches!(err, LinkError::Io(_)), "expected Io, got {:?}", err);

    // no transmission was counted and the wait slot is gone: a late ACK
    // for that sequence is now stale
    let g = poly(&LinkConfig::testing().generator);
    ep.session
        .handle_frame(frame::build_reply(0, true, &g).unwrap())
        .await
        .unwrap();
    let snap = ep.session.metrics().snapshot();
    assert_eq!(snap.data_frames_sent, 0);
    assert_eq!(snap.stale_replies, 1);
}

#[tokio::test]
async fn nack_then_ack_succeeds_on_second_attempt() {
    let mut ep = mock_endpoint(LinkConfig::testing());
    let mut sent_rx = ep.sent_rx.take().unwrap();
    let g = poly(&LinkConfig::testing().generator);

    // scripted receiver: NACK the first transmission, ACK the second
    let session = ep.session.clone();
    let responder_poly = g.clone();
    tokio::spawn(async move {
        let mut first = true;
        while let Some(bytes) = sent_rx.recv().await {
            let data = frame::parse(bytes, &responder_poly).unwrap();
            let reply =
                frame::build_reply(data.header.seq, !first, &responder_poly).unwrap();
            first = false;
            let _ = session.handle_frame(reply).await;
        }
    });

    let outcome = ep.session.send(Bytes::from_static(b"try again")).await.unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Acked {
            seq: 0,
            attempts: 2
        }
    );

    let snap = ep.session.metrics().snapshot();
    assert_eq!(snap.nacks_received, 1);
    assert_eq!(snap.acks_received, 1);
}

#[tokio::test]
async fn sequence_numbers_wrap_after_256_sends() {
    let mut ep = mock_endpoint(LinkConfig::testing());
    let mut sent_rx = ep.sent_rx.take().unwrap();
    let g = poly(&LinkConfig::testing().generator);

    // auto-ACK every transmission
    let session = ep.session.clone();
    let responder_poly = g.clone();
    tokio::spawn(async move {
        while let Some(bytes) = sent_rx.recv().await {
            let data = frame::parse(bytes, &responder_poly).unwrap();
            let ack = frame::build_reply(data.header.seq, true, &responder_poly).unwrap();
            let _ = session.handle_frame(ack).await;
        }
    });

    for i in 0..=256u32 {
        let outcome = ep
            .session
            .send(Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert!(outcome.is_acked(), "send {} must succeed", i);
        assert_eq!(outcome.seq(), (i % 256) as u8, "send {} sequence", i);
    }
}

// ---------------------------------------------------------------------------
// Receive path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_data_is_acked_twice_but_delivered_once() {
    let mut ep = mock_endpoint(LinkConfig::testing());
    let mut sent_rx = ep.sent_rx.take().unwrap();
    let g = poly(&LinkConfig::testing().generator);

    let data = frame::build_data(b"solo una vez", &g, 9).unwrap();
    ep.session.handle_frame(data.clone()).await.unwrap();
    ep.session.handle_frame(data).await.unwrap();

    // one delivery
    let delivery = ep.deliveries.try_recv().unwrap();
    assert_eq!(delivery.seq, 9);
    assert_eq!(&delivery.payload[..], b"solo una vez");
    assert!(ep.deliveries.try_recv().is_err());

    // two ACKs on the wire
    for _ in 0..2 {
        let reply = frame::parse(sent_rx.try_recv().unwrap(), &g).unwrap();
        assert_eq!(reply.header.frame_type, FrameType::Ack);
        assert_eq!(reply.header.seq, 9);
    }
    assert!(sent_rx.try_recv().is_err());

    let snap = ep.session.metrics().snapshot();
    assert_eq!(snap.deliveries, 1);
    assert_eq!(snap.duplicates_suppressed, 1);
    assert_eq!(snap.acks_sent, 2);
}

#[tokio::test]
async fn corrupt_data_is_nacked_and_not_delivered() {
    let mut ep = mock_endpoint(LinkConfig::testing());
    let mut sent_rx = ep.sent_rx.take().unwrap();
    let g = poly(&LinkConfig::testing().generator);

    let mut corrupted = frame::build_data(b"ruido", &g, 4).unwrap().to_vec();
    corrupted[crclink::frame::FrameHeader::SIZE] ^= 0x01;
    ep.session
        .handle_frame(Bytes::from(corrupted))
        .await
        .unwrap();

    assert!(ep.deliveries.try_recv().is_err(), "corrupt payload must not surface");
    let reply = frame::parse(sent_rx.try_recv().unwrap(), &g).unwrap();
    assert_eq!(reply.header.frame_type, FrameType::Nack);
    assert_eq!(reply.header.seq, 4);

    let snap = ep.session.metrics().snapshot();
    assert_eq!(snap.checksum_failures, 1);
    assert_eq!(snap.nacks_sent, 1);
    assert_eq!(snap.deliveries, 0);
}

#[tokio::test]
async fn stale_reply_is_discarded_silently() {
    let ep = mock_endpoint(LinkConfig::testing());
    let g = poly(&LinkConfig::testing().generator);

    ep.session
        .handle_frame(frame::build_reply(42, true, &g).unwrap())
        .await
        .unwrap();
    ep.session
        .handle_frame(frame::build_reply(43, false, &g).unwrap())
        .await
        .unwrap();

    let snap = ep.session.metrics().snapshot();
    assert_eq!(snap.stale_replies, 2);
}

#[tokio::test]
async fn unparsable_frame_takes_no_protocol_action() {
    let mut ep = mock_endpoint(LinkConfig::testing());
    let mut sent_rx = ep.sent_rx.take().unwrap();

    let err = ep
        .session
        .handle_frame(Bytes::from_static(&[1, 0, 3]))
        .await
        .unwrap_err();
    assert!(err.is_frame_error());

    // no ACK, no NACK, no delivery
    assert!(sent_rx.try_recv().is_err());
    assert!(ep.deliveries.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Wired pairs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn linked_sessions_deliver_and_ack_first_try() {
    let (a, mut b) = linked_pair(LinkConfig::testing(), LinkConfig::testing());

    let outcome = a.session.send_text("hola enlace").await.unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Acked {
            seq: 0,
            attempts: 1
        }
    );

    let delivery = timeout(Duration::from_secs(1), b.deliveries.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&delivery.payload[..], b"hola enlace");
}

#[tokio::test]
async fn bit_string_payload_is_packed_before_sending() {
    let (a, mut b) = linked_pair(LinkConfig::testing(), LinkConfig::testing());

    a.session.send_text("0100 0001").await.unwrap();
    let delivery = timeout(Duration::from_secs(1), b.deliveries.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&delivery.payload[..], &[0x41]);
}

#[tokio::test]
async fn injected_bit_errors_draw_nacks_until_exhaustion() {
    let config_a = LinkConfig::testing().inject_bit_error(true);
    let (a, b) = linked_pair(config_a, LinkConfig::testing());

    let outcome = a.session.send_text("se corrompe").await.unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Exhausted {
            seq: 0,
            attempts: 3
        }
    );

    let a_snap = a.session.metrics().snapshot();
    assert_eq!(a_snap.nacks_received, 3);
    assert_eq!(a_snap.sends_exhausted, 1);

    let b_snap = b.session.metrics().snapshot();
    assert_eq!(b_snap.checksum_failures, 3);
    assert_eq!(b_snap.nacks_sent, 3);
    assert_eq!(b_snap.deliveries, 0);
}

#[tokio::test]
async fn concurrent_receivers_share_one_session() {
    // several inbound workers may call handle_frame at once; the mutex
    // keeps delivery exactly-once
    let mut ep = mock_endpoint(LinkConfig::testing());
    let g = poly(&LinkConfig::testing().generator);
    let data = frame::build_data(b"carrera", &g, 33).unwrap();

    let session: Arc<_> = ep.session.clone();
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let session = session.clone();
        let data = data.clone();
        tasks.push(tokio::spawn(async move {
            session.handle_frame(data).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let delivery = ep.deliveries.try_recv().unwrap();
    assert_eq!(delivery.seq, 33);
    assert!(ep.deliveries.try_recv().is_err());

    let snap = ep.session.metrics().snapshot();
    assert_eq!(snap.deliveries, 1);
    assert_eq!(snap.duplicates_suppressed, 7);
    assert_eq!(snap.acks_sent, 8);
}
