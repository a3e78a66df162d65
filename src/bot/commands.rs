use crate::models::{SubscribeOutcome, UnsubscribeOutcome};
use crate::notify::format_current_listing;
use crate::snapshot_store::SnapshotStore;
use crate::subscribers::SubscriberRegistry;
use crate::Result;

pub const RETRY_REPLY: &str = "Error. Please try again.";

const SUBSCRIBED_REPLY: &str = "Subscribed! You will now receive notifications when the \
    available products change. You can unsubscribe at any time by using the /unsubscribe command.";
const ALREADY_SUBSCRIBED_REPLY: &str = "You are already subscribed! You will receive \
    notifications when the available products change. You can unsubscribe at any time by using \
    the /unsubscribe command.";
const UNSUBSCRIBED_REPLY: &str = "Unsubscribed! You will no longer receive notifications when \
    the available products change. You can subscribe again at any time by using the /subscribe \
    command.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Subscribe,
    Unsubscribe,
    Help,
    Current,
}

impl BotCommand {
    /// Parses `/command` or `/command@botname` from the start of a message.
    ///
    /// Returns `None` for plain text, unknown commands and commands that are
    /// addressed to a different bot.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let word = word.strip_prefix('/')?;

        let command = match word.split_once('@') {
            Some((command, target)) => {
                if let Some(own) = bot_username {
                    if !target.eq_ignore_ascii_case(own) {
                        return None;
                    }
                }
                command
            }
            None => word,
        };

        match command.to_ascii_lowercase().as_str() {
            "start" => Some(BotCommand::Start),
            "subscribe" => Some(BotCommand::Subscribe),
            "unsubscribe" => Some(BotCommand::Unsubscribe),
            "help" => Some(BotCommand::Help),
            "current" => Some(BotCommand::Current),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BotCommand::Start => "start",
            BotCommand::Subscribe => "subscribe",
            BotCommand::Unsubscribe => "unsubscribe",
            BotCommand::Help => "help",
            BotCommand::Current => "current",
        }
    }
}

/// The user a command came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub first_name: String,
}

/// Answers bot commands. Storage failures are logged and answered with a
/// generic retry message.
#[derive(Clone, Debug)]
pub struct CommandHandler {
    subscribers: SubscriberRegistry,
    snapshots: SnapshotStore,
    page_url: String,
}

impl CommandHandler {
    pub fn new(
        subscribers: SubscriberRegistry,
        snapshots: SnapshotStore,
        page_url: impl Into<String>,
    ) -> Self {
        Self {
            subscribers,
            snapshots,
            page_url: page_url.into(),
        }
    }

    pub async fn handle(&self, command: BotCommand, caller: &Caller) -> String {
        tracing::debug!("Handling /{} from {}", command.name(), caller.id);

        match command {
            BotCommand::Start => self.greeting(),
            BotCommand::Help => help_text(),
            BotCommand::Subscribe => match self.subscribe(caller).await {
                Ok(SubscribeOutcome::Subscribed) => SUBSCRIBED_REPLY.to_string(),
                Ok(SubscribeOutcome::AlreadySubscribed) => ALREADY_SUBSCRIBED_REPLY.to_string(),
                Err(e) => {
                    tracing::error!("Failed to subscribe {}: {}", caller.id, e);
                    RETRY_REPLY.to_string()
                }
            },
            BotCommand::Unsubscribe => match self.subscribers.unsubscribe(caller.id).await {
                Ok(UnsubscribeOutcome::Removed | UnsubscribeOutcome::NotSubscribed) => {
                    UNSUBSCRIBED_REPLY.to_string()
                }
                Err(e) => {
                    tracing::error!("Failed to unsubscribe {}: {}", caller.id, e);
                    RETRY_REPLY.to_string()
                }
            },
            BotCommand::Current => match self.snapshots.load().await {
                Ok(snapshot) => format_current_listing(&snapshot, &self.page_url),
                Err(e) => {
                    tracing::error!("Failed to load stored products: {}", e);
                    RETRY_REPLY.to_string()
                }
            },
        }
    }

    async fn subscribe(&self, caller: &Caller) -> Result<SubscribeOutcome> {
        self.subscribers.subscribe(caller.id, &caller.first_name).await
    }

    fn greeting(&self) -> String {
        format!(
            "Hello. I am a stock notifier bot. I will provide notifications when the products \
            listed at {} change. If you want to receive updates when the available products \
            change you can /subscribe and /unsubscribe. You can view all commands with /help.",
            self.page_url
        )
    }
}

fn help_text() -> String {
    [
        "You can issue the following commands:",
        "- /subscribe : Subscribe to updates",
        "- /unsubscribe : Unsubscribe from updates",
        "- /help : List all commands",
        "- /current : Get a list of currently available products",
    ]
    .join("\n")
}
