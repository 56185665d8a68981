//! Startup wizard

use crate::config::StartupConfig;

/// Only an explicit `completeStartupWizard: true` triggers the call.
pub fn should_complete_startup_wizard(desired: &StartupConfig) -> bool {
    desired.complete_startup_wizard == Some(true)
}
