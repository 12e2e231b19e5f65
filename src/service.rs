use crate::prelude::*;
use crate::{
    config::PresencedConfig,
    init,
    models::{marker, Channel, CurrentUser, Id, User},
    registry::{WatchedChannel, WatchedMember, WatcherHub},
    sensor::{self, Sensor},
};
use regex::Regex;
use tokio::{
    sync::{oneshot, watch},
    task::JoinError,
};
use twilight_gateway::{CloseFrame, Event, Intents, Shard, ShardId};
use twilight_http::Client as HttpClient;

const BOT_INTENTS: Intents = Intents::from_bits_truncate(
    Intents::GUILDS.bits()
        | Intents::GUILD_MEMBERS.bits()
        | Intents::GUILD_PRESENCES.bits()
        | Intents::GUILD_MESSAGE_REACTIONS.bits()
        | Intents::GUILD_VOICE_STATES.bits(),
);

lazy_static! {
    static ref SNOWFLAKE: Regex = Regex::new(r"^\d{1,20}$").unwrap();
}

/// Parses a configured id, accepting only strings that look like a
/// Discord snowflake.
fn parse_snowflake<M>(raw: &str) -> Option<Id<M>> {
    if !SNOWFLAKE.is_match(raw) {
        return None;
    }
    raw.parse::<u64>().ok().and_then(Id::new_checked)
}

struct BridgeRef {
    http: HttpClient,
    hub: WatcherHub,
}

/// Shared handle holding the HTTP client and the watcher registry,
/// passed to the lifecycle steps and the event stream task.
#[derive(Clone)]
struct Bridge(Arc<BridgeRef>);

impl Bridge {
    fn hub(&self) -> &WatcherHub {
        &self.0.hub
    }

    fn http(&self) -> &HttpClient {
        &self.0.http
    }

    /// Validates the configured token. A rejected token aborts setup.
    async fn authenticate(&self) -> Result<CurrentUser, Error> {
        Ok(self.http().current_user().await?.model().await?)
    }

    async fn fetch_user(&self, user_id: Id<marker::UserMarker>) -> Result<User, Error> {
        Ok(self.http().user(user_id).await?.model().await?)
    }

    async fn fetch_channel(
        &self,
        channel_id: Id<marker::ChannelMarker>,
    ) -> Result<Channel, Error> {
        Ok(self.http().channel(channel_id).await?.model().await?)
    }

    /// Resolves configured member ids into registry entries. Ids that do
    /// not look like snowflakes or fail to resolve are dropped, not
    /// retried.
    async fn resolve_members(&self, ids: &[String]) {
        for raw in ids {
            let user_id: Id<marker::UserMarker> = match parse_snowflake(raw) {
                Some(id) => id,
                None => {
                    warn!("Ignoring member id {:?}: not a snowflake", raw);
                    continue;
                }
            };
            let user = match self.fetch_user(user_id).await {
                Ok(user) => user,
                Err(err) => {
                    warn!("Dropping unresolvable member {}: {}", user_id, err);
                    continue;
                }
            };
            if let Err(err) = self.hub().register_member(WatchedMember::new(&user)) {
                warn!("Skipping duplicate watch target: {}", err);
            }
        }
    }

    async fn resolve_channels(&self, ids: &[String]) {
        for raw in ids {
            let channel_id: Id<marker::ChannelMarker> = match parse_snowflake(raw) {
                Some(id) => id,
                None => {
                    warn!("Ignoring channel id {:?}: not a snowflake", raw);
                    continue;
                }
            };
            let channel = match self.fetch_channel(channel_id).await {
                Ok(channel) => channel,
                Err(err) => {
                    warn!("Dropping unresolvable channel {}: {}", channel_id, err);
                    continue;
                }
            };
            let name = channel
                .name
                .clone()
                .unwrap_or_else(|| channel_id.to_string());
            if let Err(err) = self.hub().register_channel(WatchedChannel::new(channel_id, name)) {
                warn!("Skipping duplicate watch target: {}", err);
            }
        }
    }

    fn consume_event(&self, event: Event) {
        metrics::counter!(
            "presenced_gateway_events_total",
            1,
            "kind" => format!("{:?}", event.kind())
        );
        self.hub().update(&event);
    }
}

/// Runs the watcher until the gateway stream ends or the process is
/// asked to shut down.
pub async fn run(config: PresencedConfig) -> Result<()> {
    let bridge = Bridge(Arc::new(BridgeRef {
        http: init::http_client(&config),
        hub: WatcherHub::new(config.image_format),
    }));

    let identity = bridge.authenticate().await?;
    info!("Authenticated as {}", identity.name);

    bridge.resolve_members(&config.members).await;
    bridge.resolve_channels(&config.channels).await;
    if bridge.hub().is_empty() {
        return Err(Error::NoWatchTargets.into());
    }

    let shard = Shard::new(
        ShardId::ONE,
        config.discord.bot_token.clone(),
        BOT_INTENTS,
    );
    let (ready_tx, ready_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut stream = tokio::spawn(run_stream(bridge.clone(), shard, ready_rx, shutdown_rx));

    // Expose the entity set to the host before any event can touch it.
    let sensors = sensor::build_sensors(bridge.hub());
    for sensor in &sensors {
        info!("Registered entity {}", sensor.unique_id());
    }
    tokio::spawn(publish_states(bridge.hub().clone(), sensors));
    let _ = ready_tx.send(());

    let interrupted = tokio::select! {
        _ = tokio::signal::ctrl_c() => true,
        res = &mut stream => {
            log_stream_exit(res);
            false
        }
    };
    if interrupted {
        info!("Shutting down gateway...");
        let _ = shutdown_tx.send(true);
        log_stream_exit(stream.await);
    }

    info!("Watcher stopped.");
    Ok(())
}

fn log_stream_exit(result: std::result::Result<(), JoinError>) {
    match result {
        Ok(()) => info!("Gateway event stream stopped."),
        Err(err) if err.is_cancelled() => {}
        Err(err) => error!("Gateway task failed: {} ({:?})", err, err),
    }
}

/// Consumes the gateway event stream. Held back by the start signal
/// until every entity exists, so no event can race entity creation.
async fn run_stream(
    bridge: Bridge,
    mut shard: Shard,
    ready: oneshot::Receiver<()>,
    mut shutdown: watch::Receiver<bool>,
) {
    if ready.await.is_err() {
        return;
    }
    info!("Starting gateway event stream...");
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                // Close exactly once; if the connection already failed
                // the loop is gone before this can run.
                if let Err(err) = shard.close(CloseFrame::NORMAL).await {
                    debug!("Gateway close after disconnect: {}", err);
                }
                break;
            }
            event = shard.next_event() => match event {
                Ok(event) => bridge.consume_event(event),
                Err(source) => {
                    if source.is_fatal() {
                        error!("Fatal gateway error, stopping stream: {}", source);
                        break;
                    }
                    warn!("Error receiving gateway event: {}", source);
                }
            },
        }
    }
}

/// Renders every sensor once per change notification, the way the host
/// consumes push updates.
async fn publish_states(hub: WatcherHub, sensors: Vec<Box<dyn Sensor + Send + Sync>>) {
    let mut changes = hub.subscribe();
    while changes.changed().await.is_ok() {
        for sensor in &sensors {
            match serde_json::to_string(&sensor.state()) {
                Ok(state) => debug!(target: "presenced::state", "{}", state),
                Err(err) => warn!("Failed to render {}: {}", sensor.unique_id(), err),
            }
        }
    }
}
