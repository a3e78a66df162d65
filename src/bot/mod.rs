pub mod commands;

pub use commands::{BotCommand, Caller, CommandHandler};

use futures::FutureExt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};

use crate::telegram::{TelegramClient, Update};

const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Long-polls the bot API and answers commands, each in its own task.
pub struct UpdatePoller {
    client: TelegramClient,
    handler: CommandHandler,
    bot_username: Option<String>,
}

impl UpdatePoller {
    pub fn new(
        client: TelegramClient,
        handler: CommandHandler,
        bot_username: Option<String>,
    ) -> Self {
        Self {
            client,
            handler,
            bot_username,
        }
    }

    /// Runs until `shutdown` flips to `true`, then waits for in-flight
    /// command tasks to finish.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut tasks = JoinSet::new();
        let mut offset = 0;

        tracing::info!("Command poller started");

        while !*shutdown.borrow() {
            tokio::select! {
                _ = shutdown.changed() => break,
                result = self.client.get_updates(offset) => match result {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            self.dispatch(update, &mut tasks);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Polling for updates failed: {}", e);
                        tokio::select! {
                            _ = shutdown.changed() => break,
                            _ = tokio::time::sleep(POLL_ERROR_BACKOFF) => {}
                        }
                    }
                },
            }

            // Finished commands are reaped between polls only
            while let Some(Some(joined)) = tasks.join_next().now_or_never() {
                log_task_failure(joined);
            }
        }

        tracing::info!("Command poller stopping, waiting for {} command(s)", tasks.len());
        while let Some(joined) = tasks.join_next().await {
            log_task_failure(joined);
        }
    }

    fn dispatch(&self, update: Update, tasks: &mut JoinSet<()>) {
        let Some(message) = update.message else {
            return;
        };
        let (Some(text), Some(from)) = (message.text, message.from) else {
            return;
        };
        if from.is_bot {
            return;
        }

        let Some(command) = BotCommand::parse(&text, self.bot_username.as_deref()) else {
            return;
        };

        let caller = Caller {
            id: from.id,
            first_name: from.first_name,
        };
        let chat_id = message.chat.id;
        let client = self.client.clone();
        let handler = self.handler.clone();

        tasks.spawn(async move {
            let reply = handler.handle(command, &caller).await;
            if let Err(e) = client.send_message(chat_id, &reply).await {
                tracing::warn!("Failed to answer /{} for {}: {}", command.name(), caller.id, e);
            }
        });
    }
}

fn log_task_failure(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::error!("Command task failed: {}", e);
    }
}
