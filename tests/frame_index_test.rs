// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! End-to-end decoding tests over synthetic in-memory captures.

use edgefirst_hdlreader::{
    calibration::CalibrationRecord,
    packet::{BlockId, DataPacketBuilder, FIRINGS_PER_PACKET},
    packet_source::{PacketSource, TestSource},
    CalibrationTable, FrameIndex, FrameSegmenter, HdlReader, IndexerConfig, Point, PositionToken,
};

const TICKS_PER_BLOCK: u32 = 173;

/// Simulated rotating sensor: `packets` consecutive data packets starting at
/// `start` ticks, alternating lower/upper blocks, with every seventh return
/// empty.
fn rotating_capture(packets: usize, start: u32) -> Vec<Vec<u8>> {
    let mut azimuth = start;
    (0..packets)
        .map(|p| {
            let mut builder = DataPacketBuilder::new().timestamp(1000 + 553 * p as u32);
            for block in 0..FIRINGS_PER_PACKET {
                let id = if block % 2 == 0 {
                    BlockId::Lower
                } else {
                    BlockId::Upper
                };
                builder = builder.block(block, id, (azimuth % 36000) as u16);
                for laser in 0..32 {
                    let n = p * 384 + block * 32 + laser;
                    let distance = if n % 7 == 0 { 0 } else { 500 + (n % 3000) as u16 };
                    builder = builder.laser_return(block, laser, distance, (n % 256) as u8);
                }
                if block % 2 == 1 {
                    azimuth += TICKS_PER_BLOCK;
                }
            }
            builder.build()
        })
        .collect()
}

fn sequential_points(packets: &[Vec<u8>], table: &CalibrationTable) -> Vec<Vec<Point>> {
    let mut segmenter = FrameSegmenter::new();
    let mut frames = Vec::new();
    for data in packets {
        for frame in segmenter.process_packet(table, data).unwrap() {
            frames.push(frame.into_points());
        }
    }
    frames.push(segmenter.flush().into_points());
    frames
}

#[test]
fn test_round_trip_random_access() {
    let packets = rotating_capture(120, 30_000);
    let table = CalibrationTable::new();
    let sequential = sequential_points(&packets, &table);
    assert!(sequential.len() >= 3);

    let mut source = TestSource::new(packets);
    let index = FrameIndex::build(&mut source, &IndexerConfig::default()).unwrap();
    assert_eq!(index.len(), sequential.len());

    let mut random: Vec<Point> = Vec::new();
    for n in (0..index.len()).rev() {
        let mut frame = index.read_frame(&mut source, &table, n).unwrap().into_points();
        frame.extend(random);
        random = frame;
    }
    let flat: Vec<Point> = sequential.into_iter().flatten().collect();
    assert_eq!(random, flat);
}

#[test]
fn test_round_trip_with_calibration_profile() {
    let packets = rotating_capture(90, 35_500);
    let mut table = CalibrationTable::new();
    let records: Vec<CalibrationRecord> = (0..64)
        .map(|id| CalibrationRecord {
            id: Some(id),
            rot_correction: (id % 5) as f64 * 0.01,
            vert_correction: -20.0 + id as f64 * 0.5,
            dist_correction: 1.5,
            vert_offset_correction: 20.0,
            horiz_offset_correction: if id % 2 == 0 { 2.6 } else { -2.6 },
        })
        .collect();
    table.load_profile(&records).unwrap();

    let mut reader = HdlReader::new(TestSource::new(packets));
    reader.set_calibration(table);
    let sequential = reader.read_all_frames().unwrap();
    reader.build_index().unwrap();

    assert_eq!(reader.number_of_frames(), sequential.len());
    for (n, expected) in sequential.iter().enumerate() {
        assert_eq!(reader.frame(n).unwrap(), expected, "frame {}", n);
    }
}

#[test]
fn test_frames_hold_one_revolution() {
    let packets = rotating_capture(200, 0);
    let frames = sequential_points(&packets, &CalibrationTable::new());

    // every frame but the last partial one is a whole revolution
    for frame in &frames[1..frames.len() - 1] {
        let first = frame.first().unwrap().azimuth;
        let last = frame.last().unwrap().azimuth;
        assert!(first < TICKS_PER_BLOCK as u16);
        assert!(last >= 36000 - TICKS_PER_BLOCK as u16);
    }
    for frame in &frames {
        assert!(frame.windows(2).all(|w| w[0].azimuth <= w[1].azimuth));
    }
}

#[test]
fn test_zero_distance_never_emitted() {
    let packets = rotating_capture(40, 1000);
    let total: usize = sequential_points(&packets, &CalibrationTable::new())
        .iter()
        .map(Vec::len)
        .sum();
    let empty = (0..40 * 384).filter(|n| n % 7 == 0).count();
    assert_eq!(total, 40 * 384 - empty);
}

#[test]
fn test_decode_is_deterministic() {
    let packets = rotating_capture(50, 20_000);
    let table = CalibrationTable::new();
    assert_eq!(
        sequential_points(&packets, &table),
        sequential_points(&packets, &table)
    );
}

#[test]
fn test_three_packet_index() {
    let packet = |start: u16, timestamp: u32| {
        let mut rotations = [0u16; FIRINGS_PER_PACKET];
        for (i, r) in rotations.iter_mut().enumerate() {
            *r = start + 10 * i as u16;
        }
        DataPacketBuilder::new()
            .timestamp(timestamp)
            .rotations(rotations)
            .fill_returns(100, 1)
            .build()
    };

    let mut source = TestSource::new(vec![
        packet(20000, 553),
        packet(100, 1106),
        packet(300, 1659),
    ]);
    let index = FrameIndex::build(&mut source, &IndexerConfig::default()).unwrap();

    assert_eq!(index.len(), 2);
    assert_eq!(index.get(1).unwrap().position, PositionToken::new(1));
    assert_eq!(index.get(1).unwrap().skip, 0);
}

#[test]
fn test_indexing_resumes_from_source_position() {
    let packets = rotating_capture(150, 0);
    let mut source = TestSource::new(packets);
    for _ in 0..30 {
        source.next_packet().unwrap();
    }

    let index = FrameIndex::build(&mut source, &IndexerConfig::default()).unwrap();
    assert_eq!(index.get(0).unwrap().position, PositionToken::new(30));
    assert!(index.packet_gaps().is_empty());
}

#[test]
fn test_dropped_packets_are_reported() {
    let mut packets = rotating_capture(60, 0);
    packets.drain(20..25);

    let mut source = TestSource::new(packets);
    let index = FrameIndex::build(&mut source, &IndexerConfig::default()).unwrap();

    assert_eq!(index.packet_gaps().len(), 1);
    let gap = index.packet_gaps()[0];
    assert_eq!(gap.position, PositionToken::new(20));
    assert_eq!(gap.timestamp_gap, 6 * 553);
    assert_eq!(gap.estimated_lost, 6);
}
