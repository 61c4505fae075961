use crate::application::ports::{UpgradeNavigator, UpgradePromptPresenter};
use crate::domain::value_objects::FeatureId;

/// UI を持たない実行環境向けに誘導をログへ出すだけの実装
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingUpgradePrompt;

impl UpgradePromptPresenter for LoggingUpgradePrompt {
    fn show(&self, feature: FeatureId, description: &str, icon: &str) {
        tracing::info!(feature = %feature, icon, "upgrade prompt: {description}");
    }
}

impl UpgradeNavigator for LoggingUpgradePrompt {
    fn navigate(&self) {
        tracing::info!("navigating to upgrade screen");
    }
}
