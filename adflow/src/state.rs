//! Session states and the outcomes façade operations complete with.

use adflow_bus::Reward;

/// Why a show session completed successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseReason {
    /// Interstitial closed by the user
    Dismissed,
    /// Interstitial clicked through
    Clicked,
    /// Rewarded video closed after playing, with the reward granted during
    /// the show if the SDK reported one
    Closed { reward: Option<Reward> },
}

impl CloseReason {
    pub fn label(&self) -> &'static str {
        match self {
            CloseReason::Dismissed => "dismissed",
            CloseReason::Clicked => "clicked",
            CloseReason::Closed { .. } => "closed",
        }
    }
}

/// Why a session failed. All of these are recoverable by loading again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The SDK reported a load failure
    Load(String),
    /// The ad expired before it finished
    Expired,
    /// The video could not be played
    FailedToPlay(String),
    /// The wait was cancelled by shutdown
    Cancelled,
}

impl Failure {
    pub fn label(&self) -> &'static str {
        match self {
            Failure::Load(_) => "load_failed",
            Failure::Expired => "expired",
            Failure::FailedToPlay(_) => "failed_to_play",
            Failure::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Load(error) => write!(f, "load failed: {error}"),
            Failure::FailedToPlay(error) => write!(f, "failed to play: {error}"),
            other => f.write_str(other.label()),
        }
    }
}

/// State of one ad slot.
///
/// ```text
/// Idle -> Initializing -> Ready -> LoadPending -> Loaded -> ShowPending -> Shown
///                                      |                        |            |
///                                      v                        v            v
///                                   Failed                 Failed   Completed / Failed
/// ```
///
/// Completed and Failed accept a new load, like Ready.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Initializing,
    Ready,
    LoadPending,
    Loaded,
    ShowPending,
    Shown,
    Completed(CloseReason),
    Failed(Failure),
}

impl SessionState {
    /// Completed or Failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed(_) | SessionState::Failed(_))
    }

    /// A session is running for the slot
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SessionState::Initializing
                | SessionState::LoadPending
                | SessionState::ShowPending
                | SessionState::Shown
        )
    }

    /// Whether the slot accepts a load request.
    pub fn accepts_load(&self) -> bool {
        matches!(self, SessionState::Ready) || self.is_terminal()
    }

    /// Whether the slot accepts a show request.
    pub fn accepts_show(&self) -> bool {
        matches!(self, SessionState::Loaded)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Initializing => f.write_str("initializing"),
            SessionState::Ready => f.write_str("ready"),
            SessionState::LoadPending => f.write_str("load_pending"),
            SessionState::Loaded => f.write_str("loaded"),
            SessionState::ShowPending => f.write_str("show_pending"),
            SessionState::Shown => f.write_str("shown"),
            SessionState::Completed(reason) => write!(f, "completed({})", reason.label()),
            SessionState::Failed(failure) => write!(f, "failed({failure})"),
        }
    }
}

/// What an initialize, load or show operation ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ready,
    Loaded,
    Completed(CloseReason),
    Failed(Failure),
}

/// The state a slot rests in once a session ends with this outcome.
impl From<Outcome> for SessionState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Ready => SessionState::Ready,
            Outcome::Loaded => SessionState::Loaded,
            Outcome::Completed(reason) => SessionState::Completed(reason),
            Outcome::Failed(failure) => SessionState::Failed(failure),
        }
    }
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed(_))
    }

    /// Short label suitable for display, e.g. `"dismissed"` or `"expired"`
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Ready => "ready",
            Outcome::Loaded => "loaded",
            Outcome::Completed(reason) => reason.label(),
            Outcome::Failed(failure) => failure.label(),
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Failed(failure) => write!(f, "{failure}"),
            Outcome::Completed(CloseReason::Closed {
                reward: Some(reward),
            }) => write!(f, "closed ({reward})"),
            other => f.write_str(other.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SessionState::Idle, false, false)]
    #[case(SessionState::Initializing, false, false)]
    #[case(SessionState::Ready, true, false)]
    #[case(SessionState::LoadPending, false, false)]
    #[case(SessionState::Loaded, false, true)]
    #[case(SessionState::ShowPending, false, false)]
    #[case(SessionState::Shown, false, false)]
    #[case(SessionState::Completed(CloseReason::Dismissed), true, false)]
    #[case(SessionState::Failed(Failure::Expired), true, false)]
    fn test_accepted_requests(
        #[case] state: SessionState,
        #[case] load: bool,
        #[case] show: bool,
    ) {
        assert_eq!(state.accepts_load(), load, "load in {state}");
        assert_eq!(state.accepts_show(), show, "show in {state}");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Completed(CloseReason::Clicked).label(), "clicked");
        assert_eq!(Outcome::Failed(Failure::Load("timeout".into())).label(), "load_failed");
        assert!(!Outcome::Failed(Failure::Cancelled).is_success());
        assert!(Outcome::Loaded.is_success());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            SessionState::Failed(Failure::Load("timeout".into())).to_string(),
            "failed(load failed: timeout)"
        );
        assert_eq!(
            Outcome::Completed(CloseReason::Closed {
                reward: Some(Reward::new("coins", 10.0)),
            })
            .to_string(),
            "closed (coins x10)"
        );
    }

    #[test]
    fn test_outcome_maps_to_resting_state() {
        assert_eq!(SessionState::from(Outcome::Loaded), SessionState::Loaded);
        assert!(SessionState::from(Outcome::Failed(Failure::Expired)).accepts_load());
        assert!(!SessionState::Loaded.is_in_flight());
        assert!(SessionState::Shown.is_in_flight());
    }
}
