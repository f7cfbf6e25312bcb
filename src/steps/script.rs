use log::info;

use crate::core::error::StepError;
use crate::core::state::StepResult;
use crate::services::backend::{ScriptLength, ScriptRequest, ScriptStyle};
use crate::steps::StepContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptMode {
    #[default]
    Generate,
    Custom,
}

/// Step 3: have a script generated from a theme, or write one by hand.
///
/// Both drafts live side by side; switching modes never discards either.
#[derive(Debug, Default)]
pub struct ScriptStep {
    mode: ScriptMode,
    theme: String,
    keywords: String,
    style: ScriptStyle,
    length: ScriptLength,
    generated: String,
    custom: String,
    generating: bool,
}

impl ScriptStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revisiting the page: the accepted script comes back as the custom draft.
    pub fn with_script(script: String) -> Self {
        Self {
            mode: ScriptMode::Custom,
            custom: script,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> ScriptMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ScriptMode) {
        self.mode = mode;
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.theme = theme.into();
    }

    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    pub fn set_keywords(&mut self, keywords: impl Into<String>) {
        self.keywords = keywords.into();
    }

    pub fn style(&self) -> ScriptStyle {
        self.style
    }

    pub fn set_style(&mut self, style: ScriptStyle) {
        self.style = style;
    }

    pub fn length(&self) -> ScriptLength {
        self.length
    }

    pub fn set_length(&mut self, length: ScriptLength) {
        self.length = length;
    }

    pub fn generated(&self) -> &str {
        &self.generated
    }

    /// The generated text stays editable after generation.
    pub fn edit_generated(&mut self, text: impl Into<String>) {
        self.generated = text.into();
    }

    pub fn set_custom(&mut self, text: impl Into<String>) {
        self.custom = text.into();
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn active_text(&self) -> &str {
        match self.mode {
            ScriptMode::Generate => &self.generated,
            ScriptMode::Custom => &self.custom,
        }
    }

    pub fn can_continue(&self) -> bool {
        !self.active_text().trim().is_empty()
    }

    pub fn begin_generate(&mut self, ctx: &StepContext<'_>) -> Result<ScriptRequest, StepError> {
        if self.generating {
            return ctx.reject(StepError::Busy);
        }
        let theme = self.theme.trim();
        if theme.is_empty() {
            return ctx.reject(StepError::EmptyTheme);
        }

        let keywords = self.keywords.trim();
        let request = ScriptRequest {
            theme: theme.to_string(),
            keywords: (!keywords.is_empty()).then(|| keywords.to_string()),
            style: self.style,
            length: self.length,
        };
        self.generating = true;
        Ok(request)
    }

    pub fn finish_generate(
        &mut self,
        ctx: &StepContext<'_>,
        result: anyhow::Result<String>,
    ) -> Result<&str, StepError> {
        self.generating = false;
        match result {
            Ok(text) => {
                info!("Generated script ({} chars)", text.chars().count());
                self.generated = text;
                ctx.notifier
                    .info("生成成功", "AI 文案已生成，您可以進行編輯或直接使用");
                Ok(self.generated.as_str())
            }
            Err(err) => ctx.reject(StepError::backend(err)),
        }
    }

    pub async fn generate(&mut self, ctx: &StepContext<'_>) -> Result<&str, StepError> {
        let request = self.begin_generate(ctx)?;
        let result = ctx.backend.generate_script(&request).await;
        self.finish_generate(ctx, result)
    }

    pub fn complete(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        let text = self.active_text();
        if text.trim().is_empty() {
            return ctx.reject(StepError::EmptyScript);
        }
        Ok(StepResult::Script(text.to_string()))
    }
}
