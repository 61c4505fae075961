pub mod checkout;
pub mod clock;
pub mod entitlement_authority;
pub mod key_value_store;
pub mod upgrade_prompt;

pub use checkout::{CheckoutFlow, CheckoutOutcome};
pub use clock::Clock;
pub use entitlement_authority::EntitlementAuthority;
pub use key_value_store::KeyValueStore;
pub use upgrade_prompt::{UpgradeNavigator, UpgradePromptPresenter};
