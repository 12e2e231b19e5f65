use super::WatcherHub;
use std::ops::Deref;
use tracing::info;
use twilight_model::gateway::{
    event::Event,
    payload::incoming::{
        GuildCreate, MemberUpdate, PresenceUpdate, ReactionAdd, Ready, VoiceStateUpdate,
    },
};

/// Implemented for every gateway payload that can affect watcher state.
///
/// Events arrive in any order, possibly duplicated, possibly for
/// entities nobody watches; every impl starts with an existence check
/// and is a no-op on miss.
pub trait UpdateWatchers {
    #[allow(unused_variables)]
    fn update(&self, hub: &WatcherHub) {}
}

impl UpdateWatchers for Event {
    fn update(&self, hub: &WatcherHub) {
        use Event::*;

        match self {
            GuildCreate(v) => hub.update(v.deref()),
            MemberUpdate(v) => hub.update(v.deref()),
            PresenceUpdate(v) => hub.update(v.deref()),
            ReactionAdd(v) => hub.update(v.deref()),
            Ready(v) => hub.update(v.deref()),
            VoiceStateUpdate(v) => hub.update(v.deref()),
            _ => {}
        }
    }
}

/// The gateway's carrier for the member/presence snapshot taken at
/// connect time.
impl UpdateWatchers for GuildCreate {
    fn update(&self, hub: &WatcherHub) {
        hub.apply_member_snapshot(&self.0.members, &self.0.presences);
    }
}

impl UpdateWatchers for MemberUpdate {
    fn update(&self, hub: &WatcherHub) {
        hub.apply_member_update(self.nick.as_deref(), &self.user);
    }
}

impl UpdateWatchers for PresenceUpdate {
    fn update(&self, hub: &WatcherHub) {
        hub.apply_presence(&self.0);
    }
}

impl UpdateWatchers for ReactionAdd {
    fn update(&self, hub: &WatcherHub) {
        hub.apply_reaction(self.0.channel_id, self.0.member.as_ref());
    }
}

impl UpdateWatchers for Ready {
    fn update(&self, hub: &WatcherHub) {
        info!("Connected as {}", self.user.name);
        hub.publish();
    }
}

impl UpdateWatchers for VoiceStateUpdate {
    fn update(&self, hub: &WatcherHub) {
        hub.apply_voice_state(&self.0);
    }
}
