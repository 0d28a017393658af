//! Event-stream code mapping.
//!
//! Codes follow Contact ID: a leading `1` is a new event, `3` a restore, and
//! `9` a vendor-specific extension.

use std::fmt;

/// What a stream event code means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Disarmed,
    ArmedHome,
    ArmedAway,
    ExitDelayHome,
    ExitDelayAway,
    Alarm,
    AlarmCanceled,
    Locked,
    Unlocked,
    LockJammed,
    Other(i64),
}

impl EventKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            1400 | 1401 | 1407 => Self::Disarmed,
            3441 | 3491 => Self::ArmedHome,
            3401 | 3407 | 3481 | 3487 => Self::ArmedAway,
            9441 => Self::ExitDelayHome,
            9401 | 9407 => Self::ExitDelayAway,
            1110 | 1120 | 1132 | 1134 | 1154 | 1159 | 1162 => Self::Alarm,
            1406 => Self::AlarmCanceled,
            9701 => Self::Locked,
            9700 => Self::Unlocked,
            9703 => Self::LockJammed,
            other => Self::Other(other),
        }
    }

    /// Whether the event changes the alarm mode.
    pub fn is_alarm_state_change(&self) -> bool {
        matches!(
            self,
            Self::Disarmed
                | Self::ArmedHome
                | Self::ArmedAway
                | Self::ExitDelayHome
                | Self::ExitDelayAway
                | Self::Alarm
                | Self::AlarmCanceled
        )
    }

    pub fn is_lock_change(&self) -> bool {
        matches!(self, Self::Locked | Self::Unlocked | Self::LockJammed)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disarmed => write!(f, "disarmed"),
            Self::ArmedHome => write!(f, "armed home"),
            Self::ArmedAway => write!(f, "armed away"),
            Self::ExitDelayHome => write!(f, "exit delay (home)"),
            Self::ExitDelayAway => write!(f, "exit delay (away)"),
            Self::Alarm => write!(f, "alarm"),
            Self::AlarmCanceled => write!(f, "alarm canceled"),
            Self::Locked => write!(f, "locked"),
            Self::Unlocked => write!(f, "unlocked"),
            Self::LockJammed => write!(f, "lock jammed"),
            Self::Other(code) => write!(f, "event {}", code),
        }
    }
}
