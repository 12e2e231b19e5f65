use crate::config::ImageFormat;

pub use twilight_model::{
    channel::Channel,
    gateway::presence::{Activity, ActivityType, Presence, Status, UserOrId},
    guild::Member,
    id::{marker, Id},
    user::{CurrentUser, User},
    util::image_hash::ImageHash,
    voice::VoiceState,
};

const DEFAULT_AVATAR_COUNT: u64 = 5;
const BASE_ASSET_URI: &str = "https://cdn.discordapp.com";

pub trait UserLike {
    fn id(&self) -> Id<marker::UserMarker>;
    fn name(&self) -> &str;
    fn global_name(&self) -> Option<&str>;
    fn avatar_hash(&self) -> Option<ImageHash>;

    /// The platform-wide display name: the global name when one is set,
    /// the account username otherwise.
    fn visible_name(&self) -> &str {
        self.global_name().unwrap_or_else(|| self.name())
    }

    fn avatar_url(&self, format: ImageFormat) -> String {
        self.avatar_url_as(format, 1024)
    }

    fn avatar_url_as(&self, format: ImageFormat, size: u32) -> String {
        if let Some(hash) = self.avatar_hash() {
            format!(
                "{}/avatars/{}/{}.{}?size={}",
                BASE_ASSET_URI,
                self.id(),
                hash,
                format.as_str(),
                size
            )
        } else {
            self.default_avatar_url()
        }
    }

    fn default_avatar_url(&self) -> String {
        let idx = self.id().get() % DEFAULT_AVATAR_COUNT;
        format!("{}/embed/avatars/{}.png", BASE_ASSET_URI, idx)
    }
}

impl UserLike for User {
    fn id(&self) -> Id<marker::UserMarker> {
        self.id
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn global_name(&self) -> Option<&str> {
        self.global_name.as_deref()
    }

    fn avatar_hash(&self) -> Option<ImageHash> {
        self.avatar
    }
}

impl UserLike for Member {
    fn id(&self) -> Id<marker::UserMarker> {
        self.user.id
    }

    fn name(&self) -> &str {
        self.user.name.as_str()
    }

    fn global_name(&self) -> Option<&str> {
        self.user.global_name.as_deref()
    }

    fn avatar_hash(&self) -> Option<ImageHash> {
        self.user.avatar
    }
}

/// The name a member shows up under in its guild: nick, then global
/// name, then username.
pub fn member_display_name(member: &Member) -> &str {
    member
        .nick
        .as_deref()
        .unwrap_or_else(|| member.user.visible_name())
}

#[cfg(test)]
mod tests {
    use super::{member_display_name, UserLike};
    use crate::config::ImageFormat;
    use serde_json::json;
    use twilight_model::{guild::Member, user::User};

    fn user(avatar: Option<&str>, global_name: Option<&str>) -> User {
        serde_json::from_value(json!({
            "id": "302062212076699651",
            "username": "coyote",
            "discriminator": "0001",
            "avatar": avatar,
            "global_name": global_name,
            "bot": false,
        }))
        .unwrap()
    }

    fn member(nick: Option<&str>) -> Member {
        serde_json::from_value(json!({
            "user": {
                "id": "302062212076699651",
                "username": "coyote",
                "discriminator": "0001",
                "avatar": null,
                "global_name": "Coyote",
                "bot": false,
            },
            "nick": nick,
            "roles": [],
            "deaf": false,
            "mute": false,
            "flags": 0,
            "joined_at": "2021-01-01T00:00:00.000000+00:00",
            "pending": false,
        }))
        .unwrap()
    }

    #[test]
    fn test_visible_name_prefers_global_name() {
        assert_eq!(user(None, Some("Coyote")).visible_name(), "Coyote");
        assert_eq!(user(None, None).visible_name(), "coyote");
    }

    #[test]
    fn test_member_display_name_prefers_nick() {
        assert_eq!(member_display_name(&member(Some("Yote"))), "Yote");
        assert_eq!(member_display_name(&member(None)), "Coyote");
    }

    #[test]
    fn test_avatar_url_renders_requested_format_and_size() {
        let user = user(Some("1acefe340fafb4ecefae407f3abdb323"), None);
        assert_eq!(
            user.avatar_url(ImageFormat::Jpg),
            "https://cdn.discordapp.com/avatars/302062212076699651/\
             1acefe340fafb4ecefae407f3abdb323.jpg?size=1024"
        );
    }

    #[test]
    fn test_avatar_url_falls_back_to_default_avatar() {
        let user = user(None, None);
        assert_eq!(
            user.avatar_url(ImageFormat::Webp),
            format!(
                "https://cdn.discordapp.com/embed/avatars/{}.png",
                302062212076699651_u64 % 5
            )
        );
    }
}
