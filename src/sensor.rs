use crate::{
    models::{marker, Id},
    registry::{WatchedMember, WatcherHub},
};
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

pub const MEMBER_ATTRIBUTES: [MemberAttribute; 3] = [
    MemberAttribute::AvatarUrl,
    MemberAttribute::Game,
    MemberAttribute::UserName,
];

fn member_unique_id(user_id: Id<marker::UserMarker>) -> String {
    format!("sensor.discord_user_{}", user_id)
}

fn channel_unique_id(channel_id: Id<marker::ChannelMarker>) -> String {
    format!("sensor.discord_channel_{}", channel_id)
}

/// Host-facing contract of a single sensor entity.
///
/// Sensors never mutate anything; every accessor re-reads the owning
/// registry entry, so a sensor held across updates always renders the
/// current state. Updates are push-driven and the host must not poll.
pub trait Sensor {
    fn unique_id(&self) -> String;
    fn name(&self) -> String;
    fn native_value(&self) -> Option<String>;

    fn should_poll(&self) -> bool {
        false
    }

    fn entity_picture(&self) -> Option<String> {
        None
    }

    fn attributes(&self) -> Value {
        json!({})
    }

    /// Everything the host reads, as one snapshot.
    fn state(&self) -> SensorState {
        SensorState {
            unique_id: self.unique_id(),
            name: self.name(),
            value: self.native_value(),
            entity_picture: self.entity_picture(),
            attributes: self.attributes(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SensorState {
    pub unique_id: String,
    pub name: String,
    pub value: Option<String>,
    pub entity_picture: Option<String>,
    pub attributes: Value,
}

/// The primary sensor for a watched member; its value is the presence
/// status.
pub struct MemberSensor {
    hub: WatcherHub,
    user_id: Id<marker::UserMarker>,
}

impl MemberSensor {
    pub fn new(hub: WatcherHub, user_id: Id<marker::UserMarker>) -> Self {
        Self { hub, user_id }
    }

    fn entry(&self) -> Option<WatchedMember> {
        self.hub.member(self.user_id)
    }
}

impl Sensor for MemberSensor {
    fn unique_id(&self) -> String {
        member_unique_id(self.user_id)
    }

    fn name(&self) -> String {
        self.entry()
            .map(|member| member.member_name)
            .unwrap_or_else(|| self.user_id.to_string())
    }

    fn native_value(&self) -> Option<String> {
        Some(
            self.entry()
                .map(|member| member.status.as_str().to_owned())
                .unwrap_or_else(|| "unknown".to_owned()),
        )
    }

    fn entity_picture(&self) -> Option<String> {
        self.entry().and_then(|member| member.avatar_url)
    }

    fn attributes(&self) -> Value {
        match self.entry() {
            Some(member) => json!({
                "user_id": member.user_id.get(),
                "user_name": member.user_name,
                "display_name": member.display_name,
                "game": member.game,
                "avatar_url": member.avatar_url,
            }),
            None => json!({}),
        }
    }
}

/// One exposed member field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MemberAttribute {
    AvatarUrl,
    Game,
    UserName,
}

impl MemberAttribute {
    pub fn key(self) -> &'static str {
        match self {
            Self::AvatarUrl => "avatar_url",
            Self::Game => "game",
            Self::UserName => "user_name",
        }
    }

    fn value(self, member: &WatchedMember) -> Option<String> {
        match self {
            Self::AvatarUrl => member.avatar_url.clone(),
            Self::Game => member.game.clone(),
            Self::UserName => Some(member.user_name.clone()),
        }
    }
}

/// A read-only view over a single field of a watched member. Bound to
/// its owner at creation and never reassigned.
pub struct MemberAttributeSensor {
    hub: WatcherHub,
    user_id: Id<marker::UserMarker>,
    attribute: MemberAttribute,
}

impl MemberAttributeSensor {
    pub fn new(
        hub: WatcherHub,
        user_id: Id<marker::UserMarker>,
        attribute: MemberAttribute,
    ) -> Self {
        Self {
            hub,
            user_id,
            attribute,
        }
    }
}

impl Sensor for MemberAttributeSensor {
    fn unique_id(&self) -> String {
        format!("{}_{}", member_unique_id(self.user_id), self.attribute.key())
    }

    fn name(&self) -> String {
        let owner = self
            .hub
            .member(self.user_id)
            .map(|member| member.member_name)
            .unwrap_or_else(|| self.user_id.to_string());
        format!("{} {}", owner, self.attribute.key())
    }

    fn native_value(&self) -> Option<String> {
        self.hub
            .member(self.user_id)
            .and_then(|member| self.attribute.value(&member))
    }

    /// Only values that look like fetchable images are exposed as a
    /// picture reference.
    fn entity_picture(&self) -> Option<String> {
        self.native_value().filter(|value| is_displayable_url(value))
    }
}

/// The sensor for a watched channel; its value is the display name of
/// the most recent reactor.
pub struct ChannelSensor {
    hub: WatcherHub,
    channel_id: Id<marker::ChannelMarker>,
}

impl ChannelSensor {
    pub fn new(hub: WatcherHub, channel_id: Id<marker::ChannelMarker>) -> Self {
        Self { hub, channel_id }
    }
}

impl Sensor for ChannelSensor {
    fn unique_id(&self) -> String {
        channel_unique_id(self.channel_id)
    }

    fn name(&self) -> String {
        self.hub
            .channel(self.channel_id)
            .map(|channel| channel.name)
            .unwrap_or_else(|| self.channel_id.to_string())
    }

    fn native_value(&self) -> Option<String> {
        Some(
            self.hub
                .channel(self.channel_id)
                .and_then(|channel| channel.last_user)
                .unwrap_or_else(|| "unknown".to_owned()),
        )
    }

    fn attributes(&self) -> Value {
        json!({
            "last_user": self
                .hub
                .channel(self.channel_id)
                .and_then(|channel| channel.last_user),
        })
    }
}

fn is_displayable_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Builds the full entity set over everything registered in the hub:
/// one primary sensor plus one per exposed attribute for each member,
/// and one sensor per channel.
pub fn build_sensors(hub: &WatcherHub) -> Vec<Box<dyn Sensor + Send + Sync>> {
    let mut sensors: Vec<Box<dyn Sensor + Send + Sync>> = Vec::new();
    for user_id in hub.member_ids() {
        sensors.push(Box::new(MemberSensor::new(hub.clone(), user_id)));
        for attribute in MEMBER_ATTRIBUTES {
            sensors.push(Box::new(MemberAttributeSensor::new(
                hub.clone(),
                user_id,
                attribute,
            )));
        }
    }
    for channel_id in hub.channel_ids() {
        sensors.push(Box::new(ChannelSensor::new(hub.clone(), channel_id)));
    }
    sensors
}

#[cfg(test)]
mod tests {
    use super::{
        build_sensors, is_displayable_url, ChannelSensor, MemberAttribute, MemberAttributeSensor,
        MemberSensor, Sensor,
    };
    use crate::{
        config::ImageFormat,
        registry::{PresenceStatus, WatchedChannel, WatchedMember, WatcherHub},
    };
    use serde_json::json;
    use twilight_model::id::Id;

    fn hub() -> WatcherHub {
        let hub = WatcherHub::new(ImageFormat::Webp);
        hub.register_member(WatchedMember {
            user_id: Id::new(7),
            member_name: "coyote".to_owned(),
            user_name: "Coyote".to_owned(),
            display_name: Some("Yote".to_owned()),
            status: PresenceStatus::Online,
            game: Some("Chess".to_owned()),
            avatar_url: Some("https://example/x.png".to_owned()),
        })
        .unwrap();
        hub.register_channel(WatchedChannel::new(Id::new(42), "general"))
            .unwrap();
        hub
    }

    #[test]
    fn test_member_sensor_reflects_registry_state() {
        let hub = hub();
        let sensor = MemberSensor::new(hub.clone(), Id::new(7));

        assert_eq!(sensor.unique_id(), "sensor.discord_user_7");
        assert_eq!(sensor.name(), "coyote");
        assert!(!sensor.should_poll());
        assert_eq!(sensor.native_value().as_deref(), Some("online"));
        assert_eq!(sensor.entity_picture().as_deref(), Some("https://example/x.png"));
        assert_eq!(
            sensor.attributes(),
            json!({
                "user_id": 7,
                "user_name": "Coyote",
                "display_name": "Yote",
                "game": "Chess",
                "avatar_url": "https://example/x.png",
            })
        );
    }

    #[test]
    fn test_attribute_sensors_read_through_to_their_owner() {
        let hub = hub();
        let game = MemberAttributeSensor::new(hub.clone(), Id::new(7), MemberAttribute::Game);

        assert_eq!(game.unique_id(), "sensor.discord_user_7_game");
        assert_eq!(game.name(), "coyote game");
        assert_eq!(game.native_value().as_deref(), Some("Chess"));

        let user_name =
            MemberAttributeSensor::new(hub.clone(), Id::new(7), MemberAttribute::UserName);
        assert_eq!(user_name.native_value().as_deref(), Some("Coyote"));
    }

    #[test]
    fn test_avatar_projection_only_pictures_well_formed_urls() {
        let hub = WatcherHub::new(ImageFormat::Webp);
        hub.register_member(WatchedMember {
            user_id: Id::new(7),
            member_name: "coyote".to_owned(),
            user_name: "coyote".to_owned(),
            display_name: None,
            status: PresenceStatus::Unknown,
            game: None,
            avatar_url: Some("not a url".to_owned()),
        })
        .unwrap();
        let avatar = MemberAttributeSensor::new(hub.clone(), Id::new(7), MemberAttribute::AvatarUrl);

        assert_eq!(avatar.native_value().as_deref(), Some("not a url"));
        assert!(avatar.entity_picture().is_none());
    }

    #[test]
    fn test_avatar_projection_passes_urls_through_unchanged() {
        let hub = hub();
        let avatar = MemberAttributeSensor::new(hub.clone(), Id::new(7), MemberAttribute::AvatarUrl);

        assert_eq!(
            avatar.entity_picture().as_deref(),
            Some("https://example/x.png")
        );
    }

    #[test]
    fn test_game_projection_never_pictures() {
        let hub = hub();
        let game = MemberAttributeSensor::new(hub.clone(), Id::new(7), MemberAttribute::Game);
        assert!(game.entity_picture().is_none());
    }

    #[test]
    fn test_channel_sensor_defaults_to_unknown() {
        let hub = hub();
        let sensor = ChannelSensor::new(hub.clone(), Id::new(42));

        assert_eq!(sensor.unique_id(), "sensor.discord_channel_42");
        assert_eq!(sensor.name(), "general");
        assert_eq!(sensor.native_value().as_deref(), Some("unknown"));
        assert_eq!(sensor.attributes(), json!({"last_user": null}));
    }

    #[test]
    fn test_build_sensors_fans_out_per_member_and_channel() {
        let hub = hub();
        let sensors = build_sensors(&hub);

        // 1 primary + 3 attributes for the member, 1 for the channel.
        assert_eq!(sensors.len(), 5);

        let mut ids: Vec<String> = sensors.iter().map(|sensor| sensor.unique_id()).collect();
        ids.sort();
        assert_eq!(
            ids,
            vec![
                "sensor.discord_channel_42",
                "sensor.discord_user_7",
                "sensor.discord_user_7_avatar_url",
                "sensor.discord_user_7_game",
                "sensor.discord_user_7_user_name",
            ]
        );
    }

    #[test]
    fn test_state_snapshot_is_serializable() {
        let hub = hub();
        let state = MemberSensor::new(hub.clone(), Id::new(7)).state();
        let rendered = serde_json::to_value(&state).unwrap();

        assert_eq!(rendered["unique_id"], "sensor.discord_user_7");
        assert_eq!(rendered["value"], "online");
    }

    #[test]
    fn test_url_classifier() {
        assert!(is_displayable_url("https://example/x.png"));
        assert!(is_displayable_url("http://example.com/a.webp?size=1024"));
        assert!(!is_displayable_url("not a url"));
        assert!(!is_displayable_url("ftp://example.com/a.png"));
        assert!(!is_displayable_url(""));
    }
}
