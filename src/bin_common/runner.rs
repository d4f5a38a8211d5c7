//! Binary runner utilities
//!
//! Banner/shutdown logging shared by the binaries, plus the command
//! vocabulary of the interactive client.

use std::time::Duration;
use tracing::info;
use wingit::domain::{NotificationEvent, Presence, RoomId};

/// Configuration for running a binary application
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    /// Interval between connection status lines
    pub status_interval_secs: u64,
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status_interval_secs: 60,
        }
    }

    pub fn with_status_interval(mut self, secs: u64) -> Self {
        self.status_interval_secs = secs;
        self
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }
}

/// Trait for binary applications
pub trait BinaryRunner {
    /// Run the application until it is asked to stop
    async fn run(&mut self) -> anyhow::Result<()>;

    fn config(&self) -> &RunConfig;

    fn print_banner(&self) {
        let config = self.config();
        info!("");
        info!("========================================");
        info!("Starting {}", config.name);
        info!("Type /help for commands, Ctrl+C to stop");
        info!("========================================");
        info!("");
    }

    fn print_shutdown(&self, stats: Option<&str>) {
        let config = self.config();
        info!("");
        info!("========================================");
        info!("{} stopped gracefully", config.name);
        if let Some(stats) = stats {
            info!("{}", stats);
        }
        info!("========================================");
    }

    /// Execute the binary with proper initialization and cleanup
    async fn execute(&mut self) -> anyhow::Result<()> {
        self.print_banner();
        let result = self.run().await;
        self.print_shutdown(None);
        result
    }
}

/// One line of interactive input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join(RoomId),
    Leave,
    Typing(bool),
    Presence(Presence),
    Online,
    Sound(bool),
    TestSound,
    Help,
    Quit,
    /// Anything not starting with `/` goes to the current room
    Chat(String),
}

pub const HELP: &str = "/join <room> | /leave | /typing on|off | /presence <online|away|busy|offline> | \
/online | /sound on|off | /test-sound | /quit";

/// One log line for a notification; missing fields read as blanks
pub fn describe_notification(n: &NotificationEvent) -> String {
    let kind = n.notification_type.as_deref().unwrap_or("notification");
    let content = n.content.as_deref().unwrap_or("");
    match n.sender.as_deref() {
        Some(sender) => format!("({}) {}: {}", kind, sender, content),
        None => format!("({}) {}", kind, content),
    }
}

fn on_off(arg: Option<&str>) -> Result<bool, String> {
    match arg {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        other => Err(format!("expected on|off, got {:?}", other.unwrap_or(""))),
    }
}

impl Command {
    /// Parse a line; `Ok(None)` for blank input
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Command::Chat(line.to_string())));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();

        let command = match name {
            "join" => {
                let room = arg
                    .ok_or("usage: /join <room>")?
                    .parse::<RoomId>()
                    .map_err(|e| format!("bad room id: {}", e))?;
                Command::Join(room)
            }
            "leave" => Command::Leave,
            "typing" => Command::Typing(on_off(arg)?),
            "presence" => Command::Presence(
                arg.ok_or("usage: /presence <status>")?
                    .parse::<Presence>()
                    .map_err(|e| e.to_string())?,
            ),
            "online" => Command::Online,
            "sound" => Command::Sound(on_off(arg)?),
            "test-sound" => Command::TestSound,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command /{}", other)),
        };
        Ok(Some(command))
    }
}
