// crates/rover-console/src/app.rs

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local};
use rover_core::{
    Obstacle, Orientation, Pose, PresetStore, Primitive, Turn, GRID_SIZE, OBSTACLE_COUNT,
};
use rover_link::{ConnectionState, Dispatcher, Notification};
use tracing::{error, info, warn};

use crate::presets::TomlPresetStore;

pub const HELP: &str = "\
commands:
  connect [id]               open the link (default: configured remote)
  disconnect                 close the link
  f | b | l | r              manual drive: forward, reverse, turn left, turn right
  place <id> <x> <y> <N|E|S|W>
  rotate <id> [left|right]   turn an obstacle's image face
  remove <id>                put an obstacle back in the tray
  send                       report obstacles to the vehicle
  start                      start image recognition
  sp                         start shortest path
  say <text>                 send raw text
  save <name> | load [name]  presets (bare `load` lists them)
  reset                      vehicle to start, obstacles to the tray
  show                       print the grid
  help | quit";

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect(Option<String>),
    Disconnect,
    Drive(Primitive),
    Place {
        id: u8,
        x: i32,
        y: i32,
        orientation: Orientation,
    },
    Rotate {
        id: u8,
        turn: Turn,
    },
    Remove(u8),
    SendObstacles,
    StartRecognition,
    StartShortestPath,
    Say(String),
    Save(String),
    Load(Option<String>),
    Reset,
    Show,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let cmd = match word.to_ascii_lowercase().as_str() {
            "" => return Ok(None),
            "connect" => Command::Connect(args.first().map(|s| s.to_string())),
            "disconnect" => Command::Disconnect,
            "f" => Command::Drive(Primitive::StraightForward),
            "b" => Command::Drive(Primitive::StraightReverse),
            "l" => Command::Drive(Primitive::ArcLeftForward),
            "r" => Command::Drive(Primitive::ArcRightForward),
            "place" => match args.as_slice() {
                [id, x, y, o] => Command::Place {
                    id: parse_arg(id, "obstacle id")?,
                    x: parse_arg(x, "x")?,
                    y: parse_arg(y, "y")?,
                    orientation: Orientation::from_token(&o.to_ascii_uppercase())
                        .ok_or_else(|| anyhow!("orientation must be one of N, E, S, W"))?,
                },
                _ => bail!("usage: place <id> <x> <y> <N|E|S|W>"),
            },
            "rotate" => match args.as_slice() {
                [id] => Command::Rotate {
                    id: parse_arg(id, "obstacle id")?,
                    turn: Turn::Right,
                },
                [id, dir] => Command::Rotate {
                    id: parse_arg(id, "obstacle id")?,
                    turn: match dir.to_ascii_lowercase().as_str() {
                        "left" | "l" => Turn::Left,
                        "right" | "r" => Turn::Right,
                        other => bail!("unknown direction {:?}", other),
                    },
                },
                _ => bail!("usage: rotate <id> [left|right]"),
            },
            "remove" => match args.as_slice() {
                [id] => Command::Remove(parse_arg(id, "obstacle id")?),
                _ => bail!("usage: remove <id>"),
            },
            "send" => Command::SendObstacles,
            "start" => Command::StartRecognition,
            "sp" => Command::StartShortestPath,
            "say" if !rest.is_empty() => Command::Say(rest.to_string()),
            "say" => bail!("usage: say <text>"),
            "save" => match args.as_slice() {
                [name] => Command::Save(name.to_string()),
                _ => bail!("usage: save <name>"),
            },
            "load" => Command::Load(args.first().map(|s| s.to_string())),
            "reset" => Command::Reset,
            "show" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command {:?} (try `help`)", other),
        };

        Ok(Some(cmd))
    }
}

fn parse_arg<T>(s: &str, what: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    s.parse::<T>()
        .with_context(|| format!("invalid {}: {:?}", what, s))
}

pub struct App {
    pub dispatcher: Dispatcher,
    pub presets: TomlPresetStore,
    pub default_remote: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        dispatcher: Dispatcher,
        presets: TomlPresetStore,
        default_remote: Option<String>,
    ) -> Self {
        Self {
            dispatcher,
            presets,
            default_remote,
            should_quit: false,
        }
    }

    /// Run one command. Errors are for the user; the session carries on.
    pub async fn handle(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Connect(remote) => {
                let remote = remote
                    .or_else(|| self.default_remote.clone())
                    .ok_or_else(|| anyhow!("no remote given and none configured"))?;
                self.spawn_connect(remote);
            }
            Command::Disconnect => self.dispatcher.request_disconnect(),
            Command::Drive(primitive) => {
                self.dispatcher.request_manual_drive(primitive).await?;
            }
            Command::Place {
                id,
                x,
                y,
                orientation,
            } => {
                self.dispatcher.place_obstacle(id, x, y, orientation).await?;
            }
            Command::Rotate { id, turn } => {
                self.dispatcher.rotate_obstacle(id, turn).await?;
            }
            Command::Remove(id) => {
                self.dispatcher.remove_obstacle(id).await?;
            }
            Command::SendObstacles => {
                self.require_sent(self.dispatcher.request_send_obstacles().await)?;
            }
            Command::StartRecognition => {
                self.require_sent(self.dispatcher.request_algorithm_start().await)?;
            }
            Command::StartShortestPath => {
                self.require_sent(self.dispatcher.request_shortest_path_start().await)?;
            }
            Command::Say(text) => {
                self.require_sent(self.dispatcher.send_text(&text).await)?;
            }
            Command::Save(name) => {
                let entries = self.dispatcher.preset_entries().await;
                self.presets.save(&name, &entries)?;
                println!(
                    "saved {:?} ({} obstacles) to {}",
                    name,
                    entries.len(),
                    self.presets.path().display()
                );
            }
            Command::Load(None) => {
                let names = self.presets.names();
                if names.is_empty() {
                    println!("no presets in {}", self.presets.path().display());
                } else {
                    println!("presets: {}", names.join(", "));
                }
            }
            Command::Load(Some(name)) => {
                let entries = self
                    .presets
                    .load(&name)?
                    .ok_or_else(|| anyhow!("no preset named {:?}", name))?;
                self.dispatcher.load_preset(&entries).await?;
            }
            Command::Reset => self.dispatcher.reset().await,
            Command::Show => {
                let pose = self.dispatcher.pose().await;
                let obstacles = self.dispatcher.obstacles().await;
                println!("{}", render_grid(pose, &obstacles));
                println!(
                    "link: {} ({})",
                    self.dispatcher.connection_state(),
                    self.dispatcher.remote_id().as_deref().unwrap_or("-")
                );
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => self.should_quit = true,
        }
        Ok(())
    }

    /// Connect on a separate task so `disconnect` can cancel it.
    fn spawn_connect(&self, remote: String) {
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            info!("Connecting to {}...", remote);
            if let Err(e) = dispatcher.request_connect(&remote).await {
                error!("Connect to {} failed: {}", remote, e);
            }
        });
    }

    fn require_sent(&self, sent: bool) -> Result<()> {
        if sent {
            Ok(())
        } else {
            warn!("Command not sent");
            bail!("not sent: link is {}", self.dispatcher.connection_state())
        }
    }
}

/// Text picture of the arena: obstacles as their id with an arrow for the
/// image face, the vehicle as `@`.
pub fn render_grid(pose: Pose, obstacles: &[Obstacle; OBSTACLE_COUNT]) -> String {
    let size = GRID_SIZE as usize;
    let mut cells = vec![vec![" .".to_string(); size]; size];

    for (slot, obstacle) in obstacles.iter().enumerate() {
        if let Some(cell) = obstacle.cell {
            let face = match obstacle.orientation {
                Orientation::North => '^',
                Orientation::East => '>',
                Orientation::South => 'v',
                Orientation::West => '<',
            };
            cells[cell.y as usize][cell.x as usize] = format!("{}{}", slot + 1, face);
        }
    }
    if pose.cell().in_bounds() {
        cells[pose.y as usize][pose.x as usize] = format!("@{}", pose.heading.orientation().as_char());
    }

    let mut out = String::new();
    for (y, row) in cells.iter().enumerate() {
        out.push_str(&format!("{:2} ", y));
        out.push_str(&row.concat());
        out.push('\n');
    }
    out.push_str(&format!(
        "vehicle ({}, {}) {}",
        pose.x,
        pose.y,
        pose.heading.as_token()
    ));
    out
}

/// One notification as a line of text.
pub fn format_notification(at: DateTime<Local>, notification: &Notification) -> String {
    let body = match notification {
        Notification::PoseChanged(pose) => {
            format!("pose ({}, {}) {}", pose.x, pose.y, pose.heading.as_token())
        }
        Notification::ObstacleChanged { id, obstacle } => match obstacle.cell {
            Some(cell) => format!(
                "obstacle {} at ({}, {}) facing {}{}",
                id,
                cell.x,
                cell.y,
                obstacle.orientation.as_char(),
                obstacle
                    .recognized_id
                    .map(|t| format!(", target {}", t))
                    .unwrap_or_default()
            ),
            None => format!("obstacle {} in the tray", id),
        },
        Notification::ConnectionStateChanged { state, remote_id } => {
            let remote = remote_id.as_deref().unwrap_or("-");
            match state {
                ConnectionState::Disconnected => format!("link disconnected from {}", remote),
                ConnectionState::Connecting => format!("link connecting to {}", remote),
                ConnectionState::Connected => format!("link connected to {}", remote),
            }
        }
        Notification::StatusText { text, terminal } => {
            if *terminal {
                format!("status: {} (run stopped)", text)
            } else {
                format!("status: {}", text)
            }
        }
        Notification::TargetRetry { id } => format!("obstacle {}: not recognized, retrying", id),
        Notification::Received(text) => format!("<< {}", text),
        Notification::RunStarted(kind) => format!("{:?} run started", kind),
        Notification::RunCompleted { kind, elapsed_ms } => format!(
            "{:?} run completed in {}.{:03} s",
            kind,
            elapsed_ms / 1000,
            elapsed_ms % 1000
        ),
        Notification::Rejected(reason) => format!("dropped: {}", reason),
    };

    format!("[{}] {}", at.format("%H:%M:%S%.3f"), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rover_core::{GridModel, Heading, ObstacleId, RunKind};

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(
            Command::parse("f").unwrap(),
            Some(Command::Drive(Primitive::StraightForward))
        );
        assert_eq!(
            Command::parse("place 3 4 5 w").unwrap(),
            Some(Command::Place {
                id: 3,
                x: 4,
                y: 5,
                orientation: Orientation::West
            })
        );
        assert_eq!(
            Command::parse("rotate 2").unwrap(),
            Some(Command::Rotate {
                id: 2,
                turn: Turn::Right
            })
        );
        assert_eq!(
            Command::parse("say  hello there ").unwrap(),
            Some(Command::Say("hello there".to_string()))
        );
        assert_eq!(
            Command::parse("connect 127.0.0.1:7000").unwrap(),
            Some(Command::Connect(Some("127.0.0.1:7000".to_string())))
        );
        assert_eq!(Command::parse("load").unwrap(), Some(Command::Load(None)));
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(Command::parse("place 1 2 3").is_err());
        assert!(Command::parse("place x 2 3 N").is_err());
        assert!(Command::parse("place 1 2 3 Q").is_err());
        assert!(Command::parse("rotate 1 sideways").is_err());
        assert!(Command::parse("say").is_err());
        assert!(Command::parse("jump").is_err());
    }

    #[test]
    fn grid_shows_vehicle_and_obstacles() {
        let mut model = GridModel::new();
        model.set_obstacle_manual(2, 3, 0, Orientation::East).unwrap();

        let text = render_grid(model.pose(), model.obstacles());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 21);
        assert!(lines[0].contains("2>"));
        assert!(lines[17].starts_with("17 @N"));
        assert!(lines[20].contains("(0, 17) N"));
    }

    #[test]
    fn formats_notifications() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap();

        assert_eq!(
            format_notification(at, &Notification::PoseChanged(Pose::new(5, 7, Heading::East))),
            "[12:30:05.000] pose (5, 7) E"
        );
        assert_eq!(
            format_notification(
                at,
                &Notification::RunCompleted {
                    kind: RunKind::ShortestPath,
                    elapsed_ms: 61_042
                }
            ),
            "[12:30:05.000] ShortestPath run completed in 61.042 s"
        );

        let mut obstacle = Obstacle::unplaced();
        obstacle.cell = Some(rover_core::Cell::new(1, 2));
        obstacle.recognized_id = Some(11);
        assert_eq!(
            format_notification(
                at,
                &Notification::ObstacleChanged {
                    id: ObstacleId::new(4).unwrap(),
                    obstacle
                }
            ),
            "[12:30:05.000] obstacle 4 at (1, 2) facing N, target 11"
        );
    }
}
