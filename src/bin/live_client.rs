//! Interactive terminal client for the realtime service
//!
//! Mounts the session provider, logs incoming events and turns stdin lines
//! into outbound frames.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use wingit::domain::RoomId;
use wingit::infrastructure::audio::WavFileBackend;
use wingit::{
    init_tracing, AudioGate, AudioPlatform, HttpIdentity, KeyValueStore, RealtimeConfig,
    SessionProvider, TokenSource, UnlockPolicy,
};
use wingit_realtime::bin_common::runner::{describe_notification, HELP};
use wingit_realtime::bin_common::{load_config_from_env, BinaryRunner, Command, ConfigType, RunConfig};

struct LiveClient {
    run_config: RunConfig,
    provider: SessionProvider,
    room: Option<RoomId>,
}

impl LiveClient {
    fn new(config: &RealtimeConfig) -> Result<Self> {
        let store = KeyValueStore::with_token_key(config.auth_token_key.clone());
        if let Some(token) = &config.auth_token {
            store.set_token(token.clone());
        }
        let tokens: Arc<dyn TokenSource> = Arc::new(store);

        // No browser autoplay policy to wait on here
        let platform = match &config.notification_tone_path {
            Some(path) => AudioPlatform {
                backend: Arc::new(WavFileBackend::new(path)),
                ..AudioPlatform::headless()
            },
            None => AudioPlatform::headless(),
        };
        let audio = AudioGate::new(
            platform,
            UnlockPolicy::AlwaysUnlocked,
            config.notification_sound,
        );

        let provider = SessionProvider::new(
            config,
            Arc::clone(&tokens),
            Arc::new(HttpIdentity::new(config.api_base_url.clone(), tokens)),
            audio,
        )?;

        Ok(Self {
            run_config: RunConfig::new("Wingit live client"),
            provider,
            room: None,
        })
    }

    fn log_events(&self) {
        let session = self.provider.session();

        session.subscribe_to_notifications(|n| {
            info!("[Notification] {}", describe_notification(n));
            Ok(())
        });
        session.subscribe_to_messages(|m| {
            let room = m.room_id.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
            let author = m.author_id().map(|a| a.to_string()).unwrap_or_else(|| "?".into());
            info!("[Message] #{} <{}> {}", room, author, m.content);
            Ok(())
        });
        session.subscribe_to_typing(|t| {
            if t.is_typing {
                info!("[Typing] {} is typing", t.user.as_deref().unwrap_or("someone"));
            }
            Ok(())
        });
        session.subscribe_to_user_status(|s| {
            info!(user_id = %s.user_id, online = s.is_online, "[Presence] Status update");
            Ok(())
        });
        session.subscribe_to_status_response(|users| {
            info!("[Presence] {} users online", users.len());
            Ok(())
        });
    }

    /// Returns false when the client should stop
    fn handle(&mut self, command: Command) -> bool {
        let session = self.provider.session();
        match command {
            Command::Join(room) => {
                if let Some(previous) = self.room.replace(room) {
                    session.leave_room(previous);
                }
                session.join_room(room);
                info!("Joined room {}", room);
            }
            Command::Leave => match self.room.take() {
                Some(room) => {
                    session.leave_room(room);
                    info!("Left room {}", room);
                }
                None => warn!("Not in a room"),
            },
            Command::Typing(on) => match self.room {
                Some(room) => session.send_typing_indicator(room, on, None),
                None => warn!("Join a room first"),
            },
            Command::Presence(status) => session.update_presence(status),
            Command::Online => {
                let mut users: Vec<_> = self.provider.online_users().into_iter().collect();
                users.sort();
                let list: Vec<String> = users.iter().map(|u| u.to_string()).collect();
                info!("Online ({}): {}", list.len(), list.join(", "));
                self.provider.request_online_users();
            }
            Command::Sound(on) => {
                self.provider.update_notification_settings(on);
                info!("Notification sound {}", if on { "on" } else { "off" });
            }
            Command::TestSound => {
                let outcome = self.provider.test_notification();
                info!(?outcome, "Test sound");
            }
            Command::Help => info!("{}", HELP),
            Command::Quit => return false,
            Command::Chat(text) => match self.room {
                Some(room) => session.send_chat_message(room, text, None),
                None => warn!("Join a room first (/join <room>)"),
            },
        }
        true
    }
}

impl BinaryRunner for LiveClient {
    async fn run(&mut self) -> Result<()> {
        self.log_events();

        if let Err(e) = self.provider.mount().await {
            // Retries continue in the background
            warn!("Initial connect failed: {}", e);
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut status = tokio::time::interval(self.run_config.status_interval());
        status.tick().await;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, disconnecting");
                    break;
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => match Command::parse(&line) {
                            Ok(Some(command)) => {
                                if !self.handle(command) {
                                    break;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => warn!("{}", e),
                        },
                        Ok(None) => break,
                        Err(e) => {
                            error!("stdin read failed: {}", e);
                            break;
                        }
                    }
                }
                _ = status.tick() => {
                    let session = self.provider.session();
                    let metrics = session.metrics();
                    info!(
                        state = %session.connection_state(),
                        online = self.provider.online_users().len(),
                        sent = metrics.messages_sent,
                        received = metrics.messages_received,
                        dropped = metrics.messages_dropped,
                        "Status"
                    );
                }
            }
        }

        self.provider.unmount();
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first (before logging is initialized)
    let config_path = load_config_from_env(ConfigType::Realtime);
    let config = if config_path.exists() {
        RealtimeConfig::load(&config_path)?
    } else {
        RealtimeConfig::from_env()?
    };

    init_tracing(&config.log_level);
    config.log();

    let mut client = LiveClient::new(&config)?;
    client.execute().await
}
