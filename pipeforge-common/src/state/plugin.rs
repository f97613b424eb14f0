use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::Error;

/// Lifecycle of one plugin process instance.
/// ---
/// The host owns every transition; a plugin never moves itself.
/// `Stopped` and `Crashed` are terminal for the instance, the host may
/// spawn a fresh instance on next use but never resumes mid-call
/// state.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum PluginProcessState {
    NotStarted,
    Starting,
    Ready,
    Serving,
    Stopped,
    Crashed,
}

impl PluginProcessState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Crashed)
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        use PluginProcessState::*;

        match (self, next) {
            (NotStarted, Starting) => true,
            (Starting, Ready) => true,
            (Ready, Serving) => true,
            // Host-initiated orderly termination from any live state.
            (Starting | Ready | Serving, Stopped) => true,
            (Starting | Ready | Serving, Crashed) => true,
            _ => false,
        }
    }

    pub fn transition_to(&mut self, next: Self) -> Result<(), Error> {
        if !self.can_transition_to(next) {
            return Err(Error::StateTransition(format!(
                "illegal plugin process transition {} -> {}",
                self, next
            )));
        }

        *self = next;
        Ok(())
    }
}
