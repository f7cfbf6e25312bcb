use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::error::{NavError, StepError, TransitionError};
use crate::core::media::OutputRef;
use crate::core::state::{StepState, StepStatus, WizardPayload, WizardStep, ALL_STEPS};
use crate::services::backend::MediaBackend;
use crate::services::notify::Notifier;
use crate::steps::{ActiveStep, StepContext, UploadStep};

pub struct WizardController {
    config: Config,
    backend: Arc<dyn MediaBackend>,
    notifier: Arc<dyn Notifier>,
    state: StepState,
    view: ActiveStep,
}

impl WizardController {
    pub fn new(config: Config, backend: Arc<dyn MediaBackend>, notifier: Arc<dyn Notifier>) -> Self {
        info!("Wizard ready with backend {}", backend.name());
        Self {
            config,
            backend,
            notifier,
            state: StepState::new(),
            view: ActiveStep::Upload(UploadStep::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn current_step(&self) -> WizardStep {
        self.state.current()
    }

    pub fn payload(&self) -> &WizardPayload {
        self.state.payload()
    }

    pub fn view(&self) -> &ActiveStep {
        &self.view
    }

    pub fn indicator(&self) -> Vec<(WizardStep, StepStatus)> {
        let current = self.state.current();
        ALL_STEPS.iter().map(|s| (*s, s.status(current))).collect()
    }

    pub fn split(&mut self) -> (&mut ActiveStep, StepContext<'_>) {
        let ctx = StepContext::new(&self.config, self.backend.as_ref(), self.notifier.as_ref());
        (&mut self.view, ctx)
    }

    /// The page's "next" action. A page that refuses to complete leaves the
    /// wizard where it is.
    pub fn next(&mut self) -> Result<WizardStep, NavError> {
        let ctx = StepContext::new(&self.config, self.backend.as_ref(), self.notifier.as_ref());
        let result = self.view.complete(&ctx)?.ok_or(TransitionError::AtLastStep)?;
        let next = self.state.advance(result)?;
        self.view = ActiveStep::mount(next, self.state.payload(), &self.config)?;
        Ok(next)
    }

    pub fn back(&mut self) -> Result<WizardStep, NavError> {
        let prev = self.state.retreat()?;
        self.view = ActiveStep::mount(prev, self.state.payload(), &self.config)?;
        Ok(prev)
    }

    /// Renders from the preview page and keeps the output in the payload.
    pub async fn process(&mut self) -> Result<OutputRef, NavError> {
        let current = self.state.current();
        let ctx = StepContext::new(&self.config, self.backend.as_ref(), self.notifier.as_ref());
        let view = match &mut self.view {
            ActiveStep::Preview(view) => view,
            _ => return Err(TransitionError::NotAtPreview { current }.into()),
        };
        let output = view.process(&ctx).await?.clone();
        self.state.record_output(output.clone())?;
        Ok(output)
    }

    pub async fn download(&self) -> Result<PathBuf, NavError> {
        let ctx = StepContext::new(&self.config, self.backend.as_ref(), self.notifier.as_ref());
        match &self.view {
            ActiveStep::Preview(view) => Ok(view.download(&ctx).await?),
            _ => Err(TransitionError::NotAtPreview {
                current: self.state.current(),
            }
            .into()),
        }
    }

    /// The "finish" action: only once a render exists, and it starts over.
    pub fn finish(&mut self) -> Result<(), NavError> {
        let current = self.state.current();
        let output = match &self.view {
            ActiveStep::Preview(view) => view.output().cloned(),
            _ => return Err(TransitionError::NotAtPreview { current }.into()),
        };
        let output = match output {
            Some(output) => output,
            None => {
                let ctx = StepContext::new(&self.config, self.backend.as_ref(), self.notifier.as_ref());
                return ctx.reject(StepError::NoOutput).map_err(NavError::from);
            }
        };

        info!("Finishing with render {}", output.id);
        self.state.record_output(output)?;
        self.state.reset()?;
        self.view = ActiveStep::Upload(UploadStep::new());
        Ok(())
    }
}
