use crate::core::state::WizardStep;

/// Validation failures raised by a step view at the point of user action.
///
/// None of these are fatal: the action that raised one is a no-op apart
/// from the notification, and retrying with corrected input succeeds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    #[error("請上傳 MP4 或 MOV 格式的影片檔 (got {mime})")]
    InvalidFormat { mime: String },

    #[error("請上傳小於 {limit_mib}MB 的影片檔 ({size} bytes)")]
    TooLarge { size: u64, limit_mib: u64 },

    #[error("請先上傳影片")]
    NoMedia,

    #[error("請點擊選擇一個影片中的角色")]
    NoSelection,

    #[error("請輸入影片主題")]
    EmptyTheme,

    #[error("文案內容不能為空")]
    EmptyScript,

    #[error("請選擇一種語音聲音")]
    NoVoice,

    #[error("另一個處理仍在進行中")]
    Busy,

    #[error("請先完成影片處理")]
    NoOutput,

    #[error("{message}")]
    Backend { message: String },
}

impl StepError {
    pub fn title(&self) -> &'static str {
        match self {
            StepError::InvalidFormat { .. } => "檔案格式錯誤",
            StepError::TooLarge { .. } => "檔案過大",
            StepError::NoMedia => "尚未上傳",
            StepError::NoSelection => "未選擇角色",
            StepError::EmptyTheme | StepError::EmptyScript | StepError::NoVoice => "錯誤",
            StepError::Busy => "處理中",
            StepError::NoOutput => "尚未處理",
            StepError::Backend { .. } => "處理失敗",
        }
    }

    pub fn backend(err: anyhow::Error) -> Self {
        StepError::Backend {
            message: format!("{:#}", err),
        }
    }
}

/// Misuse of the step state machine. The view layer never exposes the
/// affordances that would trigger these, so they indicate a bug upstream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot advance past the last step")]
    AtLastStep,

    #[error("cannot go back from the first step")]
    AtFirstStep,

    #[error("step {current:?} cannot accept a result for {got:?}")]
    StepMismatch { current: WizardStep, got: WizardStep },

    #[error("reset is only valid from the preview step (current {current:?})")]
    NotAtPreview { current: WizardStep },

    #[error("step {step:?} is missing upstream data")]
    MissingUpstream { step: WizardStep },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavError {
    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}
