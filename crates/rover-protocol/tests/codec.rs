// crates/rover-protocol/tests/codec.rs
use rover_core::{
    GridModel, Heading, Orientation, OutboundCommand, PlotEntry, Primitive, ProtocolEvent,
};
use rover_protocol::{decode, encode, encode_obstacle_report, DecodeError, Framer, FramingMode};

fn encoded(cmd: &OutboundCommand) -> String {
    let mut out = Vec::new();
    encode(cmd, &mut out);
    String::from_utf8(out).unwrap()
}

// -----------------------------------------------------------------------------
// Inbound
// -----------------------------------------------------------------------------

#[test]
fn robot_pose_is_mirrored() {
    assert_eq!(
        decode("ROBOT,<5>,<12>,<E>").unwrap(),
        ProtocolEvent::vehicle_pose(5, 7, Heading::East)
    );
}

#[test]
fn robot_fields_are_positional() {
    // Extra text between and after the bracketed fields is ignored.
    assert_eq!(
        decode("ROBOT,x=<3>,y=<0>,h=<NW>,<extra>").unwrap(),
        ProtocolEvent::vehicle_pose(3, 19, Heading::NorthWest)
    );
}

#[test]
fn robot_unknown_heading_reads_as_north() {
    assert_eq!(
        decode("ROBOT,<1>,<1>,<up>").unwrap(),
        ProtocolEvent::vehicle_pose(1, 18, Heading::North)
    );
}

#[test]
fn robot_errors() {
    assert_eq!(
        decode("ROBOT,<1>,<2>"),
        Err(DecodeError::MalformedField("robot fields"))
    );
    assert_eq!(
        decode("ROBOT,<a>,<2>,<N>"),
        Err(DecodeError::MalformedField("robot x"))
    );
    assert_eq!(
        decode("ROBOT,<1>,<99999999999>,<N>"),
        Err(DecodeError::OutOfRange("robot y"))
    );
}

#[test]
fn robot_y_too_far_below_the_grid_to_mirror() {
    assert_eq!(
        decode("ROBOT,<0>,<-2147483648>,<N>"),
        Err(DecodeError::OutOfRange("robot y"))
    );
    assert_eq!(
        decode("ROBOT,<0>,<-2147483629>,<N>"),
        Err(DecodeError::OutOfRange("robot y"))
    );
    // Mirrors without overflow; the grid model rejects it later.
    assert_eq!(
        decode("ROBOT,<0>,<-2147483628>,<N>"),
        Ok(ProtocolEvent::vehicle_pose(0, i32::MAX, Heading::North))
    );
}

#[test]
fn target_carries_the_slot_index() {
    assert_eq!(
        decode("TARGET,3,7").unwrap(),
        ProtocolEvent::TargetRecognized {
            obstacle_id: 3,
            recognized_id: 7
        }
    );
    assert_eq!(
        decode("TARGET,0,0").unwrap(),
        ProtocolEvent::TargetRecognized {
            obstacle_id: 0,
            recognized_id: 0
        }
    );
}

#[test]
fn target_falls_back_to_fixed_columns() {
    assert_eq!(
        decode("TARGET,3:12").unwrap(),
        ProtocolEvent::TargetRecognized {
            obstacle_id: 3,
            recognized_id: 12
        }
    );
    assert_eq!(
        decode("TARGET,3"),
        Err(DecodeError::MalformedField("target id"))
    );
    assert_eq!(
        decode("TARGET,x,12"),
        Err(DecodeError::MalformedField("target obstacle"))
    );
}

#[test]
fn status_stops_at_newline() {
    assert_eq!(
        decode("STATUS,IR STOPPED\nignored").unwrap(),
        ProtocolEvent::status("IR STOPPED", true)
    );
    assert_eq!(
        decode("STATUS,looking for target 2\r\n").unwrap(),
        ProtocolEvent::status("looking for target 2", false)
    );
}

#[test]
fn plot_entries_in_slot_order() {
    assert_eq!(
        decode("PLOT,1,2,N;3,4,E;").unwrap(),
        ProtocolEvent::ObstaclePlot(vec![
            PlotEntry::new(1, 2, Orientation::North),
            PlotEntry::new(3, 4, Orientation::East),
        ])
    );
    assert_eq!(
        decode("PLOT,1,2,X"),
        Err(DecodeError::MalformedField("plot orientation"))
    );
    assert_eq!(
        decode("PLOT,1,2"),
        Err(DecodeError::MalformedField("plot entry"))
    );
}

#[test]
fn command_distance_is_in_tenths_of_a_cell() {
    assert_eq!(
        decode("COMMAND,SF050").unwrap(),
        ProtocolEvent::drive(Primitive::StraightForward, 5)
    );
    assert_eq!(
        decode("COMMAND,SB120").unwrap(),
        ProtocolEvent::drive(Primitive::StraightReverse, 12)
    );
}

#[test]
fn command_fixed_geometry_does_not_need_a_distance() {
    assert!(matches!(
        decode("COMMAND,RF"),
        Ok(ProtocolEvent::DriveCommand {
            primitive: Primitive::ArcRightForward,
            ..
        })
    ));
    assert_eq!(
        decode("COMMAND,SF"),
        Err(DecodeError::MalformedField("distance"))
    );
    assert_eq!(
        decode("COMMAND,QQ010"),
        Err(DecodeError::MalformedField("movement code"))
    );
}

#[test]
fn unknown_or_empty_messages() {
    assert_eq!(decode("   "), Err(DecodeError::Empty));
    assert_eq!(
        decode("HELLO,1"),
        Err(DecodeError::UnknownPrefix("HELLO".to_string()))
    );
    assert_eq!(decode("ROBOT"), Err(DecodeError::MalformedField("body")));
}

// -----------------------------------------------------------------------------
// Outbound
// -----------------------------------------------------------------------------

#[test]
fn fixed_tokens() {
    assert_eq!(encoded(&OutboundCommand::AlgorithmStart), "ALG:START");
    assert_eq!(encoded(&OutboundCommand::ShortestPathStart), "STM:sp");
    assert_eq!(encoded(&OutboundCommand::Text("hello".into())), "hello");
}

#[test]
fn raw_drive_is_zero_padded() {
    assert_eq!(
        encoded(&OutboundCommand::RawDrive {
            primitive: Primitive::StraightForward,
            magnitude: 50
        }),
        "SF050"
    );
    assert_eq!(
        encoded(&OutboundCommand::RawDrive {
            primitive: Primitive::ArcLeftForward,
            magnitude: 90
        }),
        "LF090"
    );
}

#[test]
fn obstacle_report_from_model() {
    let mut model = GridModel::new();
    model.set_obstacle_manual(1, 1, 2, Orientation::North).unwrap();
    model.set_obstacle_manual(3, 5, 6, Orientation::South).unwrap();

    let cmd = OutboundCommand::report_from(model.obstacles());
    assert_eq!(encoded(&cmd), "ALG:1,17,N,0;1;5,13,S,2;3;4;5;6;7;");

    let OutboundCommand::ObstacleReport(entries) = cmd else {
        panic!("expected a report");
    };
    let mut out = Vec::new();
    assert_eq!(encode_obstacle_report(&entries, &mut out), 2);
}

#[test]
fn empty_report_lists_every_slot() {
    let mut out = Vec::new();

    let reported = encode_obstacle_report(&[None; 8], &mut out);

    assert_eq!(reported, 0);
    assert_eq!(String::from_utf8(out).unwrap(), "ALG:0;1;2;3;4;5;6;7;");
}

// -----------------------------------------------------------------------------
// Framing
// -----------------------------------------------------------------------------

#[test]
fn line_framer_joins_split_reads() {
    let mut framer = Framer::new(FramingMode::Line, 4096);

    assert!(framer.push(b"ROBOT,<5>,").is_empty());
    assert_eq!(framer.pending(), 10);
    assert_eq!(framer.push(b"<12>,<E>\n"), vec!["ROBOT,<5>,<12>,<E>"]);
    assert_eq!(framer.pending(), 0);
}

#[test]
fn line_framer_splits_coalesced_reads() {
    let mut framer = Framer::new(FramingMode::Line, 4096);

    let frames = framer.push(b"TARGET,0,11\r\n\nSTATUS,ok\nPLOT,1");

    assert_eq!(frames, vec!["TARGET,0,11", "STATUS,ok"]);
    assert_eq!(framer.pending(), 6);
}

#[test]
fn line_framer_discards_oversized_partial() {
    let mut framer = Framer::new(FramingMode::Line, 8);

    assert!(framer.push(b"0123456789").is_empty());
    assert_eq!(framer.overflows(), 1);
    assert_eq!(framer.pending(), 0);

    // Still the same line; nothing comes out until it ends.
    assert!(framer.push(b"abc").is_empty());
    assert_eq!(framer.push(b"def\nSTATUS\n"), vec!["STATUS"]);
    assert_eq!(framer.overflows(), 1);
}

#[test]
fn line_framer_drops_the_tail_of_an_oversized_line() {
    let mut framer = Framer::new(FramingMode::Line, 16);

    assert!(framer.push(b"STATUS,aaaaaaaaaaaaaaaaaaaaaaaa").is_empty());
    assert!(framer.push(b"ROBOT,<3>,<4>,<E>\n").is_empty());
    assert_eq!(framer.pending(), 0);

    assert_eq!(framer.push(b"ROBOT,<5>,<12>,<E>\n"), vec!["ROBOT,<5>,<12>,<E>"]);
}

#[test]
fn framer_reset_ends_discarding() {
    let mut framer = Framer::new(FramingMode::Line, 8);
    framer.push(b"0123456789");

    framer.reset();

    assert_eq!(framer.push(b"STATUS\n"), vec!["STATUS"]);
}

#[test]
fn framer_reset_drops_partial_message() {
    let mut framer = Framer::new(FramingMode::Line, 4096);
    framer.push(b"STATUS,half");

    framer.reset();

    assert_eq!(framer.push(b"STATUS,new\n"), vec!["STATUS,new"]);
}

#[test]
fn chunk_framer_treats_each_read_as_a_message() {
    let mut framer = Framer::new(FramingMode::Chunk, 4096);

    assert_eq!(framer.push(b"STATUS,a\nb"), vec!["STATUS,a\nb"]);
    assert!(framer.push(b"  ").is_empty());
    assert_eq!(framer.pending(), 0);
}

#[test]
fn framing_mode_parsing_and_terminators() {
    assert_eq!(FramingMode::parse("Chunk"), Some(FramingMode::Chunk));
    assert_eq!(FramingMode::parse(" line "), Some(FramingMode::Line));
    assert_eq!(FramingMode::parse("crlf"), None);
    assert_eq!(FramingMode::default(), FramingMode::Line);
    assert_eq!(FramingMode::Line.terminator(), b"\n");
    assert!(FramingMode::Chunk.terminator().is_empty());
}
