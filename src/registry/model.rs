use crate::{
    config::ImageFormat,
    models::{marker, Activity, ActivityType, Id, Status, User, UserLike},
};

/// Connection status of a watched member, as rendered to the host.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PresenceStatus {
    Online,
    Idle,
    Dnd,
    Offline,
    Unknown,
}

impl PresenceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }
}

impl From<Status> for PresenceStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Online => Self::Online,
            Status::Idle => Self::Idle,
            Status::DoNotDisturb => Self::Dnd,
            Status::Invisible | Status::Offline => Self::Offline,
        }
    }
}

/// Synchronization state for a single watched user.
///
/// Created at startup from a resolved user record and mutated only by
/// gateway events for the matching id. The registry never drops an
/// entry; state is rebuilt from scratch on restart.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WatchedMember {
    pub user_id: Id<marker::UserMarker>,
    pub member_name: String,
    pub user_name: String,
    pub display_name: Option<String>,
    pub status: PresenceStatus,
    pub game: Option<String>,
    pub avatar_url: Option<String>,
}

impl WatchedMember {
    /// Seeds state from the user record resolved at startup. Presence
    /// fields stay unknown until the first snapshot or update arrives.
    pub fn new(user: &User) -> Self {
        Self {
            user_id: user.id,
            member_name: user.name.clone(),
            user_name: user.visible_name().to_owned(),
            display_name: None,
            status: PresenceStatus::Unknown,
            game: None,
            avatar_url: None,
        }
    }

    pub(crate) fn refresh_presence(&mut self, status: Status, activities: &[Activity]) {
        self.status = status.into();
        self.game = first_game(activities);
    }

    pub(crate) fn refresh_profile(&mut self, user: &User, format: ImageFormat) {
        self.member_name = user.name.clone();
        self.user_name = user.visible_name().to_owned();
        self.avatar_url = Some(user.avatar_url(format));
    }

    pub(crate) fn refresh_member(
        &mut self,
        nick: Option<&str>,
        user: &User,
        format: ImageFormat,
    ) {
        self.refresh_profile(user, format);
        self.display_name = Some(
            nick.map(str::to_owned)
                .unwrap_or_else(|| user.visible_name().to_owned()),
        );
    }
}

/// State for a single watched channel: who reacted there last.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WatchedChannel {
    pub channel_id: Id<marker::ChannelMarker>,
    pub name: String,
    pub last_user: Option<String>,
}

impl WatchedChannel {
    pub fn new(channel_id: Id<marker::ChannelMarker>, name: impl Into<String>) -> Self {
        Self {
            channel_id,
            name: name.into(),
            last_user: None,
        }
    }
}

/// The first activity the remote reports as "playing", in remote order.
fn first_game(activities: &[Activity]) -> Option<String> {
    activities
        .iter()
        .find(|activity| activity.kind == ActivityType::Playing)
        .map(|activity| activity.name.clone())
}
