pub use anyhow::Result;
use thiserror::Error as ErrorTrait;
use twilight_model::id::{
    marker::{ChannelMarker, UserMarker},
    Id,
};

/// The sum type of all errors that might result from resolving and
/// watching targets.
#[derive(ErrorTrait, Debug)]
pub enum Error {
    #[error("Discord HTTP error: {:?}", .0)]
    Http(#[from] twilight_http::Error),
    #[error("Malformed Discord response body: {:?}", .0)]
    ResponseBody(#[from] twilight_http::response::DeserializeBodyError),
    #[error("No watchable members or channels resolved from the configuration")]
    NoWatchTargets,
}

#[derive(ErrorTrait, Debug, Eq, PartialEq)]
pub enum RegistryError {
    #[error("Already watching user: {}", .0)]
    DuplicateMember(Id<UserMarker>),
    #[error("Already watching channel: {}", .0)]
    DuplicateChannel(Id<ChannelMarker>),
}
