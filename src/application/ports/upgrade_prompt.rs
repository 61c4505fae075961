use crate::domain::value_objects::FeatureId;

/// アップグレード誘導の表示（呼び出し側の UI が所有する副作用）
pub trait UpgradePromptPresenter: Send + Sync {
    fn show(&self, feature: FeatureId, description: &str, icon: &str);
}

/// アップグレード画面への遷移
pub trait UpgradeNavigator: Send + Sync {
    fn navigate(&self);
}
