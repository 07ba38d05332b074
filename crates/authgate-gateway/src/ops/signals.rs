//! Runtime kill switch control via process signals.
//!
//! `SIGUSR1` engages the switch (every request allowed), `SIGUSR2` releases
//! it. The configured `kill_switch` value only sets the position at startup.

use crate::policy::KillSwitch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchCommand {
    Engage,
    Release,
}

impl SwitchCommand {
    /// Apply to `switch`; returns whether the position changed.
    pub fn apply(self, switch: &KillSwitch) -> bool {
        let want = self == SwitchCommand::Engage;
        if switch.is_engaged() == want {
            return false;
        }
        match self {
            SwitchCommand::Engage => switch.engage(),
            SwitchCommand::Release => switch.release(),
        }
        true
    }
}

/// Listen for operator signals until the process exits.
#[cfg(unix)]
pub async fn watch_kill_switch(switch: KillSwitch) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut engage, mut release) =
        match (signal(SignalKind::user_defined1()), signal(SignalKind::user_defined2())) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "failed to install kill switch signal handlers");
                return;
            }
        };
    tracing::info!(engaged = switch.is_engaged(), "kill switch control: SIGUSR1 engages, SIGUSR2 releases");

    loop {
        let cmd = tokio::select! {
            Some(()) = engage.recv() => SwitchCommand::Engage,
            Some(()) = release.recv() => SwitchCommand::Release,
            else => return,
        };
        if !cmd.apply(&switch) {
            tracing::debug!(?cmd, "kill switch already in requested position");
        }
    }
}

#[cfg(not(unix))]
pub async fn watch_kill_switch(_switch: KillSwitch) {
    tracing::warn!("kill switch signals are unavailable on this platform");
}
