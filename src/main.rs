use anyhow::Result;
use std::io::IsTerminal;
use std::sync::Arc;

use lipsync_studio::core::config::Config;
use lipsync_studio::services::backend::create_backend;
use lipsync_studio::services::notify::{ConsoleNotifier, LogNotifier, Notifier};
use lipsync_studio::services::wizard::WizardController;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // 1. Load config; a missing file means defaults
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            eprintln!("Please check '{}'.", Config::default_path().display());
            return Err(e);
        }
    };

    config.ensure_directories()?;

    // 2. Initialize media backend
    let backend = create_backend(&config)?;

    // 3. Notifications go to the terminal, or to the log when piped
    let notifier: Arc<dyn Notifier> = if std::io::stdout().is_terminal() {
        Arc::new(ConsoleNotifier)
    } else {
        Arc::new(LogNotifier)
    };

    // 4. Run the wizard until the user quits
    let mut wizard = WizardController::new(config, backend, notifier);
    lipsync_studio::ui::run(&mut wizard).await?;

    Ok(())
}
