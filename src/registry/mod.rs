pub mod model;

mod updates;

pub use self::{
    model::{PresenceStatus, WatchedChannel, WatchedMember},
    updates::UpdateWatchers,
};

use crate::{
    config::ImageFormat,
    error::RegistryError,
    models::{marker, member_display_name, Id, Member, Presence, Status, User, UserOrId, VoiceState},
};
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug)]
struct WatcherHubRef {
    image_format: ImageFormat,
    members: DashMap<Id<marker::UserMarker>, WatchedMember>,
    channels: DashMap<Id<marker::ChannelMarker>, WatchedChannel>,
    revision: watch::Sender<u64>,
}

/// A thread-safe, in-memory registry of watched Discord state. It can be
/// cloned and sent to other threads.
///
/// All mutation is funneled through the gateway event task, one event at
/// a time. Reads may happen concurrently from the host's own scheduling
/// context and return owned point-in-time snapshots; two reads taken at
/// different instants may straddle an update, which is accepted.
///
/// # Cloning
///
/// The registry internally wraps its data within an Arc, so the handle
/// can be cloned and passed around tasks and threads cheaply.
#[derive(Clone, Debug)]
pub struct WatcherHub(Arc<WatcherHubRef>);

impl WatcherHub {
    pub fn new(image_format: ImageFormat) -> Self {
        Self(Arc::new(WatcherHubRef {
            image_format,
            members: DashMap::new(),
            channels: DashMap::new(),
            revision: watch::channel(0).0,
        }))
    }

    /// Update the registry with an event from the gateway.
    pub fn update(&self, value: &impl UpdateWatchers) {
        value.update(self);
    }

    /// Starts watching a user. Fails if the user is already watched;
    /// entries are never replaced or removed while the process runs.
    pub fn register_member(&self, member: WatchedMember) -> Result<(), RegistryError> {
        match self.0.members.entry(member.user_id) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateMember(member.user_id)),
            Entry::Vacant(entry) => {
                entry.insert(member);
                Ok(())
            }
        }
    }

    /// Starts watching a channel. Fails if the channel is already watched.
    pub fn register_channel(&self, channel: WatchedChannel) -> Result<(), RegistryError> {
        match self.0.channels.entry(channel.channel_id) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateChannel(channel.channel_id)),
            Entry::Vacant(entry) => {
                entry.insert(channel);
                Ok(())
            }
        }
    }

    /// Gets a point-in-time snapshot of a watched member.
    ///
    /// This is an O(1) operation.
    pub fn member(&self, user_id: Id<marker::UserMarker>) -> Option<WatchedMember> {
        self.0.members.get(&user_id).map(|kv| kv.value().clone())
    }

    /// Gets a point-in-time snapshot of a watched channel.
    ///
    /// This is an O(1) operation.
    pub fn channel(&self, channel_id: Id<marker::ChannelMarker>) -> Option<WatchedChannel> {
        self.0.channels.get(&channel_id).map(|kv| kv.value().clone())
    }

    /// Gets the ids of all watched members.
    pub fn member_ids(&self) -> Vec<Id<marker::UserMarker>> {
        self.0.members.iter().map(|kv| *kv.key()).collect()
    }

    /// Gets the ids of all watched channels.
    pub fn channel_ids(&self) -> Vec<Id<marker::ChannelMarker>> {
        self.0.channels.iter().map(|kv| *kv.key()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.members.is_empty() && self.0.channels.is_empty()
    }

    /// Subscribes to change notifications. The carried value is a
    /// monotonically increasing revision; the host re-reads sensor state
    /// whenever it changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.0.revision.subscribe()
    }

    /// The current change revision.
    pub fn revision(&self) -> u64 {
        *self.0.revision.borrow()
    }

    /// Signals the host that projections must re-render.
    fn publish(&self) {
        self.0.revision.send_modify(|revision| *revision += 1);
    }

    /// Applies a full member snapshot, as delivered when a guild becomes
    /// available. Watched members missing from the snapshot are forced
    /// offline; members without a presence record read as offline too.
    fn apply_member_snapshot(&self, members: &[Member], presences: &[Presence]) {
        for mut kv in self.0.members.iter_mut() {
            let watcher = kv.value_mut();
            let member = members
                .iter()
                .find(|member| member.user.id == watcher.user_id);
            match member {
                Some(member) => {
                    watcher.refresh_member(
                        member.nick.as_deref(),
                        &member.user,
                        self.0.image_format,
                    );
                    let presence = presences
                        .iter()
                        .find(|presence| presence_user_id(presence) == watcher.user_id);
                    match presence {
                        Some(presence) => {
                            watcher.refresh_presence(presence.status, &presence.activities)
                        }
                        None => watcher.refresh_presence(Status::Offline, &[]),
                    }
                }
                None => watcher.status = PresenceStatus::Offline,
            }
        }
        self.publish();
    }

    fn apply_presence(&self, presence: &Presence) {
        let user_id = presence_user_id(presence);
        let updated = match self.0.members.get_mut(&user_id) {
            Some(mut kv) => {
                kv.value_mut()
                    .refresh_presence(presence.status, &presence.activities);
                true
            }
            None => false,
        };
        if updated {
            self.publish();
        }
    }

    fn apply_member_update(&self, nick: Option<&str>, user: &User) {
        let updated = match self.0.members.get_mut(&user.id) {
            Some(mut kv) => {
                kv.value_mut()
                    .refresh_member(nick, user, self.0.image_format);
                true
            }
            None => false,
        };
        if updated {
            self.publish();
        }
    }

    fn apply_reaction(&self, channel_id: Id<marker::ChannelMarker>, member: Option<&Member>) {
        let member = match member {
            Some(member) => member,
            None => return,
        };
        let updated = match self.0.channels.get_mut(&channel_id) {
            Some(mut kv) => {
                kv.value_mut().last_user = Some(member_display_name(member).to_owned());
                true
            }
            None => false,
        };
        if updated {
            self.publish();
        }
    }

    /// A member dropping out of voice only forces a re-render; the
    /// stored status is not voice-derived and stays untouched.
    fn apply_voice_state(&self, state: &VoiceState) {
        if state.channel_id.is_some() {
            return;
        }
        let online = self
            .0
            .members
            .get(&state.user_id)
            .map(|kv| kv.value().status == PresenceStatus::Online)
            .unwrap_or(false);
        if online {
            self.publish();
        }
    }
}

pub fn presence_user_id(presence: &Presence) -> Id<marker::UserMarker> {
    match presence.user {
        UserOrId::User(ref user) => user.id,
        UserOrId::UserId { id } => id,
    }
}
