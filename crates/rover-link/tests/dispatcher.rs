// crates/rover-link/tests/dispatcher.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{expect_text, TestConnector, WAIT};
use rover_core::{
    Heading, ObstacleId, Orientation, Pose, PresetEntry, Primitive, RunKind, RunPhase, Turn,
};
use rover_link::{
    ConnectionState, DispatchError, Dispatcher, DriveConfig, LinkConfig, Notification,
    NotificationRx,
};
use rover_protocol::FramingMode;
use tokio::io::{AsyncWriteExt, DuplexStream};

fn id(n: u8) -> ObstacleId {
    ObstacleId::new(n).unwrap()
}

fn start(config: LinkConfig) -> (Dispatcher, Arc<TestConnector>) {
    let connector = Arc::new(TestConnector::default());
    let (dispatcher, _handle) = Dispatcher::spawn(connector.clone(), config, DriveConfig::default());
    (dispatcher, connector)
}

/// Next notification that is not a raw `Received` echo.
async fn next(rx: &mut NotificationRx) -> Notification {
    loop {
        let notification = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for a notification")
            .expect("notification channel closed");
        if !matches!(notification, Notification::Received(_)) {
            return notification;
        }
    }
}

/// Connect to a fresh in-memory vehicle and drain the two state changes.
async fn connect(
    dispatcher: &Dispatcher,
    connector: &TestConnector,
    rx: &mut NotificationRx,
) -> DuplexStream {
    let peer = connector.offer("bot");
    dispatcher.request_connect("bot").await.unwrap();

    for expected in [ConnectionState::Connecting, ConnectionState::Connected] {
        assert_eq!(
            next(rx).await,
            Notification::ConnectionStateChanged {
                state: expected,
                remote_id: Some("bot".to_string()),
            }
        );
    }
    peer
}

#[tokio::test]
async fn telemetry_updates_the_pose() {
    let (dispatcher, connector) = start(LinkConfig::default());
    let mut rx = dispatcher.subscribe().await;
    let mut peer = connect(&dispatcher, &connector, &mut rx).await;

    peer.write_all(b"ROBOT,<5>,<12>,<E>\n").await.unwrap();

    let expected = Pose::new(5, 7, Heading::East);
    assert_eq!(next(&mut rx).await, Notification::PoseChanged(expected));
    assert_eq!(dispatcher.pose().await, expected);
}

#[tokio::test]
async fn every_frame_is_echoed_before_it_is_applied() {
    let (dispatcher, connector) = start(LinkConfig::default());
    let mut rx = dispatcher.subscribe().await;
    let mut peer = connect(&dispatcher, &connector, &mut rx).await;

    peer.write_all(b"STATUS,hello\n").await.unwrap();

    let first = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(first, Notification::Received("STATUS,hello".to_string()));
    assert_eq!(
        next(&mut rx).await,
        Notification::StatusText {
            text: "hello".to_string(),
            terminal: false
        }
    );
}

#[tokio::test]
async fn messages_split_across_reads_are_joined() {
    let (dispatcher, connector) = start(LinkConfig::default());
    let mut rx = dispatcher.subscribe().await;
    let mut peer = connect(&dispatcher, &connector, &mut rx).await;

    peer.write_all(b"ROBOT,<5>,").await.unwrap();
    peer.flush().await.unwrap();
    tokio::task::yield_now().await;
    peer.write_all(b"<12>,<E>\nCOMMAND,SF020\n").await.unwrap();

    assert_eq!(
        next(&mut rx).await,
        Notification::PoseChanged(Pose::new(5, 7, Heading::East))
    );
    assert_eq!(
        next(&mut rx).await,
        Notification::PoseChanged(Pose::new(7, 7, Heading::East))
    );
}

#[tokio::test]
async fn bad_messages_are_dropped_and_later_ones_still_apply() {
    let (dispatcher, connector) = start(LinkConfig::default());
    let mut rx = dispatcher.subscribe().await;
    let mut peer = connect(&dispatcher, &connector, &mut rx).await;

    peer.write_all(b"HELLO,1\nROBOT,<25>,<1>,<N>\nCOMMAND,SF020\n")
        .await
        .unwrap();

    assert!(matches!(next(&mut rx).await, Notification::Rejected(_)));
    assert!(matches!(next(&mut rx).await, Notification::Rejected(_)));
    assert_eq!(
        next(&mut rx).await,
        Notification::PoseChanged(Pose::new(0, 15, Heading::North))
    );
}

#[tokio::test]
async fn overflowing_telemetry_is_rejected_and_the_loop_keeps_going() {
    let (dispatcher, connector) = start(LinkConfig::default());
    let mut rx = dispatcher.subscribe().await;
    let mut peer = connect(&dispatcher, &connector, &mut rx).await;

    peer.write_all(b"ROBOT,<0>,<-2147483648>,<N>\nROBOT,<5>,<12>,<E>\n")
        .await
        .unwrap();

    assert!(matches!(next(&mut rx).await, Notification::Rejected(_)));
    assert_eq!(
        next(&mut rx).await,
        Notification::PoseChanged(Pose::new(5, 7, Heading::East))
    );
    assert_eq!(dispatcher.pose().await, Pose::new(5, 7, Heading::East));
    assert_eq!(dispatcher.connection_state(), ConnectionState::Connected);
}

#[tokio::test]
async fn blocked_write_does_not_stall_telemetry() {
    let config = LinkConfig {
        write_timeout_ms: 1_000,
        ..LinkConfig::default()
    };
    let (dispatcher, connector) = start(config);
    let mut rx = dispatcher.subscribe().await;
    let mut peer = connect(&dispatcher, &connector, &mut rx).await;

    // Nobody reads the vehicle's end, so this fills the pipe and parks.
    let filler = {
        let dispatcher = dispatcher.clone();
        let big = "x".repeat(16 * 1024);
        tokio::spawn(async move { dispatcher.send_text(&big).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Queued behind the filler on the link.
    let drive = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            dispatcher
                .request_manual_drive(Primitive::StraightForward)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    peer.write_all(b"ROBOT,<5>,<12>,<E>\n").await.unwrap();

    let quick = Duration::from_millis(300);
    let notification = tokio::time::timeout(quick, next(&mut rx))
        .await
        .expect("telemetry waited for the write");
    assert_eq!(
        notification,
        Notification::PoseChanged(Pose::new(5, 7, Heading::East))
    );
    let pose = tokio::time::timeout(quick, dispatcher.pose()).await.unwrap();
    assert_eq!(pose, Pose::new(5, 7, Heading::East));

    drop(peer);
    let _ = filler.await;
    let _ = drive.await;
}

#[tokio::test]
async fn send_while_disconnected_returns_false() {
    let (dispatcher, _connector) = start(LinkConfig::default());

    assert!(!dispatcher.send_text("hello").await);
    assert!(!dispatcher.request_algorithm_start().await);
    assert!(!dispatcher.request_send_obstacles().await);
    assert_eq!(dispatcher.run_phase().await, RunPhase::Idle);
}

#[tokio::test]
async fn manual_drive_moves_the_model_even_when_disconnected() {
    let (dispatcher, _connector) = start(LinkConfig::default());
    let mut rx = dispatcher.subscribe().await;

    let pose = dispatcher
        .request_manual_drive(Primitive::StraightForward)
        .await
        .unwrap();

    assert_eq!(pose, Pose::new(0, 16, Heading::North));
    assert_eq!(next(&mut rx).await, Notification::PoseChanged(pose));
}

#[tokio::test]
async fn manual_buttons_send_raw_codes() {
    let (dispatcher, connector) = start(LinkConfig::default());
    let mut rx = dispatcher.subscribe().await;
    let mut peer = connect(&dispatcher, &connector, &mut rx).await;

    dispatcher
        .request_manual_drive(Primitive::StraightForward)
        .await
        .unwrap();
    expect_text(&mut peer, "SF050\n").await;

    let pose = dispatcher
        .request_manual_drive(Primitive::ArcRightForward)
        .await
        .unwrap();
    expect_text(&mut peer, "RF090\n").await;
    // Turn in place, not the arc geometry.
    assert_eq!(pose, Pose::new(0, 16, Heading::East));

    dispatcher
        .request_manual_drive(Primitive::StraightForward)
        .await
        .unwrap();
    expect_text(&mut peer, "SF050\n").await;
    assert_eq!(dispatcher.pose().await, Pose::new(1, 16, Heading::East));

    dispatcher
        .request_manual_drive(Primitive::StraightReverse)
        .await
        .unwrap();
    expect_text(&mut peer, "SB050\n").await;
    assert_eq!(dispatcher.pose().await, Pose::new(0, 16, Heading::East));
}

#[tokio::test]
async fn manual_drive_off_the_grid_is_rejected_but_still_sent() {
    let (dispatcher, connector) = start(LinkConfig::default());
    let mut rx = dispatcher.subscribe().await;
    let mut peer = connect(&dispatcher, &connector, &mut rx).await;

    dispatcher
        .request_manual_drive(Primitive::ArcLeftForward)
        .await
        .unwrap();
    expect_text(&mut peer, "LF090\n").await;
    assert_eq!(
        next(&mut rx).await,
        Notification::PoseChanged(Pose::new(0, 17, Heading::West))
    );

    let err = dispatcher
        .request_manual_drive(Primitive::StraightForward)
        .await
        .unwrap_err();
    expect_text(&mut peer, "SF050\n").await;

    assert!(matches!(err, DispatchError::Model(_)));
    assert!(matches!(next(&mut rx).await, Notification::Rejected(_)));
    assert_eq!(dispatcher.pose().await, Pose::new(0, 17, Heading::West));
}

#[tokio::test]
async fn image_recognition_run_completes_after_all_targets() {
    let (dispatcher, connector) = start(LinkConfig::default());
    let mut rx = dispatcher.subscribe().await;

    dispatcher
        .place_obstacle(1, 1, 2, Orientation::North)
        .await
        .unwrap();
    dispatcher
        .place_obstacle(3, 5, 6, Orientation::South)
        .await
        .unwrap();
    next(&mut rx).await;
    next(&mut rx).await;

    let mut peer = connect(&dispatcher, &connector, &mut rx).await;

    assert!(dispatcher.request_send_obstacles().await);
    expect_text(&mut peer, "ALG:1,17,N,0;1;5,13,S,2;3;4;5;6;7;\n").await;

    assert!(dispatcher.request_algorithm_start().await);
    expect_text(&mut peer, "ALG:START\n").await;
    assert_eq!(
        next(&mut rx).await,
        Notification::RunStarted(RunKind::ImageRecognition)
    );

    peer.write_all(b"TARGET,0,11\nTARGET,2,0\nTARGET,2,12\n")
        .await
        .unwrap();

    match next(&mut rx).await {
        Notification::ObstacleChanged { id: got, obstacle } => {
            assert_eq!(got, id(1));
            assert_eq!(obstacle.recognized_id, Some(11));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(next(&mut rx).await, Notification::TargetRetry { id: id(3) });
    match next(&mut rx).await {
        Notification::ObstacleChanged { id: got, obstacle } => {
            assert_eq!(got, id(3));
            assert_eq!(obstacle.recognized_id, Some(12));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        next(&mut rx).await,
        Notification::RunCompleted {
            kind: RunKind::ImageRecognition,
            ..
        }
    ));
    assert_eq!(
        dispatcher.run_phase().await,
        RunPhase::Completed(RunKind::ImageRecognition)
    );
}

#[tokio::test]
async fn terminal_status_ends_a_shortest_path_run() {
    let (dispatcher, connector) = start(LinkConfig::default());
    let mut rx = dispatcher.subscribe().await;
    let mut peer = connect(&dispatcher, &connector, &mut rx).await;

    assert!(dispatcher.request_shortest_path_start().await);
    expect_text(&mut peer, "STM:sp\n").await;
    assert_eq!(next(&mut rx).await, Notification::RunStarted(RunKind::ShortestPath));

    peer.write_all(b"STATUS,SP STOPPED\n").await.unwrap();

    assert_eq!(
        next(&mut rx).await,
        Notification::StatusText {
            text: "SP STOPPED".to_string(),
            terminal: true
        }
    );
    assert!(matches!(
        next(&mut rx).await,
        Notification::RunCompleted {
            kind: RunKind::ShortestPath,
            ..
        }
    ));
}

#[tokio::test]
async fn partial_message_does_not_survive_a_reconnect() {
    let (dispatcher, connector) = start(LinkConfig::default());
    let mut rx = dispatcher.subscribe().await;
    let mut peer = connect(&dispatcher, &connector, &mut rx).await;

    peer.write_all(b"ROBOT,<5>,").await.unwrap();
    drop(peer);
    assert_eq!(
        next(&mut rx).await,
        Notification::ConnectionStateChanged {
            state: ConnectionState::Disconnected,
            remote_id: Some("bot".to_string()),
        }
    );

    let mut peer = connect(&dispatcher, &connector, &mut rx).await;
    peer.write_all(b"<12>,<E>\n").await.unwrap();

    assert!(matches!(next(&mut rx).await, Notification::Rejected(_)));
    assert_eq!(dispatcher.pose().await, Pose::START);
}

#[tokio::test]
async fn chunk_framing_sends_no_terminator() {
    let config = LinkConfig {
        framing: FramingMode::Chunk,
        ..LinkConfig::default()
    };
    let (dispatcher, connector) = start(config);
    let mut rx = dispatcher.subscribe().await;
    let mut peer = connect(&dispatcher, &connector, &mut rx).await;

    assert!(dispatcher.send_text("hello").await);
    expect_text(&mut peer, "hello").await;

    peer.write_all(b"STATUS,ok").await.unwrap();
    assert_eq!(
        next(&mut rx).await,
        Notification::StatusText {
            text: "ok".to_string(),
            terminal: false
        }
    );
}

#[tokio::test]
async fn local_edits_publish_changes() {
    let (dispatcher, _connector) = start(LinkConfig::default());
    let mut rx = dispatcher.subscribe().await;

    let placed = dispatcher
        .place_obstacle(2, 4, 4, Orientation::North)
        .await
        .unwrap();
    assert_eq!(
        next(&mut rx).await,
        Notification::ObstacleChanged {
            id: id(2),
            obstacle: placed
        }
    );

    let rotated = dispatcher.rotate_obstacle(2, Turn::Left).await.unwrap();
    assert_eq!(rotated.orientation, Orientation::West);
    next(&mut rx).await;

    let removed = dispatcher.remove_obstacle(2).await.unwrap();
    assert!(!removed.is_placed());
    next(&mut rx).await;

    let err = dispatcher
        .place_obstacle(9, 1, 1, Orientation::North)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Model(_)));
    assert!(matches!(next(&mut rx).await, Notification::Rejected(_)));
}

#[tokio::test]
async fn presets_and_reset() {
    let (dispatcher, _connector) = start(LinkConfig::default());

    dispatcher
        .place_obstacle(1, 3, 3, Orientation::East)
        .await
        .unwrap();
    let saved = dispatcher.preset_entries().await;
    assert_eq!(
        saved,
        vec![PresetEntry {
            id: id(1),
            x: 3,
            y: 3,
            orientation: Orientation::East
        }]
    );

    dispatcher.reset().await;
    assert!(dispatcher.obstacles().await.iter().all(|o| !o.is_placed()));
    assert_eq!(dispatcher.pose().await, Pose::START);

    dispatcher.load_preset(&saved).await.unwrap();
    let obstacles = dispatcher.obstacles().await;
    assert_eq!(obstacles[0].orientation, Orientation::East);
    assert!(obstacles[0].is_placed());
}

#[tokio::test]
async fn closed_subscribers_do_not_block_others() {
    let (dispatcher, _connector) = start(LinkConfig::default());
    let dropped = dispatcher.subscribe().await;
    let mut kept = dispatcher.subscribe().await;
    drop(dropped);

    dispatcher
        .request_manual_drive(Primitive::StraightForward)
        .await
        .unwrap();
    dispatcher
        .request_manual_drive(Primitive::StraightForward)
        .await
        .unwrap();

    assert!(matches!(next(&mut kept).await, Notification::PoseChanged(_)));
    assert_eq!(
        next(&mut kept).await,
        Notification::PoseChanged(Pose::new(0, 15, Heading::North))
    );
}
