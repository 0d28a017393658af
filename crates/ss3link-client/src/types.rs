//! Alarm and lock states.

use std::fmt;
use std::str::FromStr;

/// Alarm system state as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Off,
    Home,
    HomeCount,
    Away,
    AwayCount,
    Alarm,
    AlarmCount,
    Unknown,
}

impl AlarmState {
    /// Map the API's `alarmState` string.
    pub fn from_api(value: &str) -> Self {
        match value {
            "OFF" => Self::Off,
            "HOME" => Self::Home,
            "HOME_COUNT" => Self::HomeCount,
            "AWAY" => Self::Away,
            "AWAY_COUNT" => Self::AwayCount,
            "ALARM" => Self::Alarm,
            "ALARM_COUNT" => Self::AlarmCount,
            _ => Self::Unknown,
        }
    }

    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Home => "HOME",
            Self::HomeCount => "HOME_COUNT",
            Self::Away => "AWAY",
            Self::AwayCount => "AWAY_COUNT",
            Self::Alarm => "ALARM",
            Self::AlarmCount => "ALARM_COUNT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Off => "off",
            Self::Home => "home",
            Self::HomeCount => "home (exit delay)",
            Self::Away => "away",
            Self::AwayCount => "away (exit delay)",
            Self::Alarm => "alarm",
            Self::AlarmCount => "alarm (entry delay)",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", text)
    }
}

/// Requested alarm mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetAlarmState {
    Off,
    Home,
    Away,
}

impl SetAlarmState {
    /// Path segment of the state endpoint.
    pub fn as_path(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Home => "home",
            Self::Away => "away",
        }
    }
}

impl FromStr for SetAlarmState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "home" => Ok(Self::Home),
            "away" => Ok(Self::Away),
            other => Err(format!("unknown alarm mode '{}' (expected off, home or away)", other)),
        }
    }
}

/// Door lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
    Jammed,
    Unknown,
}

impl LockState {
    /// Map `status.lockState` / `status.lockJamState`.
    pub fn from_status(lock_state: Option<i64>, jam_state: Option<i64>) -> Self {
        if jam_state.is_some_and(|j| j != 0) {
            return Self::Jammed;
        }
        match lock_state {
            Some(0) => Self::Unlocked,
            Some(1) => Self::Locked,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlocked => write!(f, "unlocked"),
            Self::Locked => write!(f, "locked"),
            Self::Jammed => write!(f, "jammed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Requested lock action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetLockState {
    Unlock,
    Lock,
}

impl SetLockState {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Unlock => "unlock",
            Self::Lock => "lock",
        }
    }

    /// The state the lock ends up in once the command is applied.
    pub fn target(&self) -> LockState {
        match self {
            Self::Unlock => LockState::Unlocked,
            Self::Lock => LockState::Locked,
        }
    }
}

impl FromStr for SetLockState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lock" => Ok(Self::Lock),
            "unlock" => Ok(Self::Unlock),
            other => Err(format!("unknown lock action '{}' (expected lock or unlock)", other)),
        }
    }
}

/// The first active subscription, projected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub sid: String,
    pub alarm_state: Option<String>,
    pub is_alarming: bool,
}

impl Subscription {
    pub fn state(&self) -> AlarmState {
        if self.is_alarming {
            return AlarmState::Alarm;
        }
        self.alarm_state
            .as_deref()
            .map(AlarmState::from_api)
            .unwrap_or(AlarmState::Unknown)
    }
}

/// The first door lock, projected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub serial: String,
    pub lock_state: Option<i64>,
    pub jam_state: Option<i64>,
}

impl Lock {
    pub fn state(&self) -> LockState {
        LockState::from_status(self.lock_state, self.jam_state)
    }
}
