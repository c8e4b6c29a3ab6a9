pub mod punishment;
pub mod reward;
pub mod stats;
pub mod sweep;
pub mod task;
pub mod threshold;
pub mod user;

use std::sync::Arc;

use overseer_core::{Config, Database, Notifier, NullNotifier, WebhookNotifier};

pub(crate) type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Shared handles for one command invocation.
pub(crate) struct Context {
    pub db: Arc<Database>,
    pub config: Config,
    pub notifier: Arc<dyn Notifier>,
}

/// Open the store and build the notifier from configuration.
pub(crate) fn context() -> Result<Context, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Arc::new(Database::open()?);
    let notifier: Arc<dyn Notifier> = match config.notifications.webhook_url.as_deref() {
        Some(url) => match WebhookNotifier::new(url) {
            Ok(notifier) => Arc::new(notifier),
            Err(e) => {
                eprintln!("Warning: ignoring invalid webhook URL: {e}");
                Arc::new(NullNotifier)
            }
        },
        None => Arc::new(NullNotifier),
    };
    Ok(Context {
        db,
        config,
        notifier,
    })
}
