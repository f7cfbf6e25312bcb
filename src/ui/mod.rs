//! Interactive terminal front end: one inquire menu per wizard page.
//!
//! Esc on a page menu goes back one step; Ctrl-C leaves the program.

mod pages;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{InquireError, Select};
use log::{debug, warn};
use std::fmt::Display;
use std::time::Duration;

use crate::core::error::NavError;
use crate::core::state::StepStatus;
use crate::services::wizard::WizardController;
use crate::steps::ActiveStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Stay,
    Next,
    Back,
    Process,
    Download,
    Finish,
    Quit,
}

const BETA_TITLE: &str = "Beta 版本";
const BETA_NOTICE: &str = "感謝您使用 Lip Sync Studio Pro！目前處於測試階段，支援 1 分鐘以內的短影片。";

pub async fn run(wizard: &mut WizardController) -> Result<()> {
    greet(wizard);

    loop {
        print_indicator(wizard);
        debug!("Showing page: {}", wizard.current_step().label());

        let display = wizard.config().display.size();
        let outcome = {
            let (view, ctx) = wizard.split();
            match view {
                ActiveStep::Upload(view) => pages::upload(view, &ctx).await,
                ActiveStep::Character(view) => pages::character(view, &ctx, display).await,
                ActiveStep::Script(view) => pages::script(view, &ctx).await,
                ActiveStep::Voice(view) => pages::voice(view),
                ActiveStep::Preview(view) => pages::preview(view),
            }
        };

        let nav = match outcome {
            Ok(nav) => nav,
            Err(err) => match err.downcast_ref::<InquireError>() {
                Some(InquireError::OperationInterrupted) => Nav::Quit,
                _ => return Err(err),
            },
        };

        if !dispatch(wizard, nav).await? {
            println!("再見！");
            return Ok(());
        }
    }
}

/// Hands a page's request to the controller. `false` once the user quits.
pub async fn dispatch(wizard: &mut WizardController, nav: Nav) -> Result<bool> {
    let moved = match nav {
        Nav::Stay => Ok(()),
        Nav::Quit => return Ok(false),
        Nav::Next => wizard.next().map(|_| ()),
        Nav::Back => wizard.back().map(|_| ()),
        Nav::Process => {
            let pb = spinner("處理中...")?;
            let rendered = wizard.process().await;
            pb.finish_and_clear();
            rendered.map(|output| debug!("Recorded render {}", output.id))
        }
        Nav::Download => wizard
            .download()
            .await
            .map(|path| println!("已匯出: {}", path.display())),
        Nav::Finish => wizard.finish(),
    };
    match moved {
        Ok(()) => {}
        // Already shown to the user by the page.
        Err(NavError::Step(err)) => debug!("Navigation refused: {}", err),
        Err(NavError::Transition(err)) => warn!("Navigation refused: {}", err),
    }
    Ok(true)
}

fn greet(wizard: &WizardController) {
    println!("Lip Sync Studio Pro");
    wizard.notifier().info(BETA_TITLE, BETA_NOTICE);
}

fn print_indicator(wizard: &WizardController) {
    let line: Vec<String> = wizard
        .indicator()
        .into_iter()
        .map(|(step, status)| match status {
            StepStatus::Done => format!("✔ {}", step.title()),
            StepStatus::Current => format!("[{}]", step),
            StepStatus::Pending => format!("{}", step.index()),
        })
        .collect();
    println!();
    println!("{}", line.join("  →  "));
}

/// A menu prompt. Esc yields `None`; Ctrl-C is returned as an error.
pub(crate) fn choose<T: Display>(prompt: &str, options: Vec<T>) -> Result<Option<T>> {
    match Select::new(prompt, options).prompt() {
        Ok(choice) => Ok(Some(choice)),
        Err(InquireError::OperationCanceled) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

pub(crate) fn upload_bar(file_name: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}%")?
            .progress_chars("#>-"),
    );
    pb.set_message(file_name.to_string());
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::state::WizardStep;
    use crate::services::notify::{RecordingNotifier, Severity};
    use crate::steps::testing::{clip, walk_to, StubBackend};
    use crate::utils::geometry::FaceRegion;
    use std::sync::Arc;

    fn wizard_in(dir: &tempfile::TempDir) -> (WizardController, Arc<RecordingNotifier>) {
        let config = Config {
            output_folder: dir.path().join("out").to_string_lossy().to_string(),
            ..Config::default()
        };
        let backend = Arc::new(StubBackend::with_faces(vec![FaceRegion::new(200.0, 100.0, 120.0, 120.0)]));
        let notifier = Arc::new(RecordingNotifier::new());
        (WizardController::new(config, backend, notifier.clone()), notifier)
    }

    #[tokio::test]
    async fn test_process_menu_records_output_in_payload() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = clip(&dir);
        let (mut wizard, notifier) = wizard_in(&dir);
        walk_to(&mut wizard, WizardStep::Preview, &file).await;

        assert!(dispatch(&mut wizard, Nav::Process).await?);
        let output = wizard.payload().output.clone();
        assert!(output.is_some());
        assert!(matches!(wizard.view(), ActiveStep::Preview(v) if v.output() == output.as_ref()));

        assert!(dispatch(&mut wizard, Nav::Download).await?);
        let id = output.map(|o| o.id).unwrap_or_default();
        assert!(dir.path().join("out").join(format!("{}.json", id)).exists());

        assert!(dispatch(&mut wizard, Nav::Finish).await?);
        assert_eq!(wizard.current_step(), WizardStep::Upload);
        assert!(wizard.payload().is_empty());
        assert_eq!(notifier.count(Severity::Error), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_refused_navigation_keeps_running() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (mut wizard, notifier) = wizard_in(&dir);

        assert!(dispatch(&mut wizard, Nav::Next).await?);
        assert!(dispatch(&mut wizard, Nav::Download).await?);
        assert_eq!(wizard.current_step(), WizardStep::Upload);
        assert_eq!(notifier.count(Severity::Error), 1);

        assert!(!dispatch(&mut wizard, Nav::Quit).await?);
        Ok(())
    }

    #[test]
    fn test_greeting_shows_beta_notice() {
        let dir = tempfile::tempdir().unwrap();
        let (wizard, notifier) = wizard_in(&dir);
        greet(&wizard);
        let seen = notifier.take();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].severity, Severity::Info);
        assert_eq!(seen[0].title, "Beta 版本");
        assert!(seen[0].description.contains("1 分鐘"));
    }
}
