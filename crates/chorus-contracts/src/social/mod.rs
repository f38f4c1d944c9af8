mod driver;
mod dryrun;
mod publish;
mod react;

pub use driver::BrowserDriver;
pub use dryrun::DryrunDriver;
pub use publish::{
    publish, read_post, PublishReceipt, SocialSelectors, DEFAULT_POST_MAX_CHARS,
};
pub use react::{react, MentionMonitor, Reaction, ReactionReceipt};
