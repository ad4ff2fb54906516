//! The "try without a password, then ask for one" flow.
//!
//! ```text
//! Unattempted --start--> Resolved(success | malformed)
//!      |
//!      +-----start--> AwaitingPassword --submit_password--> Resolved(success | malformed)
//!                        ^      |
//!                        +------+ password rejected
//!                        |
//!                        +--cancel--> Resolved(cancelled)
//! ```
//!
//! The controller never prompts. The host asks the user for a password while
//! the controller sits in `AwaitingPassword`, then feeds the answer back.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::ParseOptions;
use crate::error::{Error, Result};
use crate::outcome::{Bundle, ParseOutcome, parse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordFailure {
    PasswordRequired,
    InvalidPassword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Success(Bundle),
    Malformed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Unattempted,
    AwaitingPassword {
        /// Passwords submitted so far.
        attempts: u32,
        last_failure: PasswordFailure,
    },
    Resolved(Resolution),
}

impl ControllerState {
    fn name(&self) -> &'static str {
        match self {
            ControllerState::Unattempted => "Unattempted",
            ControllerState::AwaitingPassword { .. } => "AwaitingPassword",
            ControllerState::Resolved(_) => "Resolved",
        }
    }
}

#[derive(Debug)]
pub struct PasswordRetryController {
    input: Vec<u8>,
    options: ParseOptions,
    state: ControllerState,
}

impl PasswordRetryController {
    pub fn new(input: Vec<u8>, options: ParseOptions) -> Self {
        PasswordRetryController {
            input,
            options,
            state: ControllerState::Unattempted,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Parses with the empty password.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<&ControllerState> {
        if self.state != ControllerState::Unattempted {
            return Err(self.invalid("start"));
        }
        self.state = match parse(&self.input, "", now, &self.options) {
            ParseOutcome::Success(bundle) => ControllerState::Resolved(Resolution::Success(bundle)),
            ParseOutcome::PasswordRequired => ControllerState::AwaitingPassword {
                attempts: 0,
                last_failure: PasswordFailure::PasswordRequired,
            },
            ParseOutcome::InvalidPassword => ControllerState::AwaitingPassword {
                attempts: 0,
                last_failure: PasswordFailure::InvalidPassword,
            },
            ParseOutcome::Malformed { reason } => {
                ControllerState::Resolved(Resolution::Malformed(reason))
            }
        };
        debug!(state = self.state.name(), "started");
        Ok(&self.state)
    }

    /// Retries the parse with `password`. There is no limit on attempts.
    pub fn submit_password(
        &mut self,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<&ControllerState> {
        let ControllerState::AwaitingPassword { attempts, .. } = self.state else {
            return Err(self.invalid("submit_password"));
        };
        let attempts = attempts.saturating_add(1);
        self.state = match parse(&self.input, password, now, &self.options) {
            ParseOutcome::Success(bundle) => ControllerState::Resolved(Resolution::Success(bundle)),
            ParseOutcome::PasswordRequired | ParseOutcome::InvalidPassword => {
                ControllerState::AwaitingPassword {
                    attempts,
                    last_failure: PasswordFailure::InvalidPassword,
                }
            }
            ParseOutcome::Malformed { reason } => {
                ControllerState::Resolved(Resolution::Malformed(reason))
            }
        };
        debug!(state = self.state.name(), attempts, "password submitted");
        Ok(&self.state)
    }

    pub fn cancel(&mut self) -> Result<&ControllerState> {
        if !matches!(self.state, ControllerState::AwaitingPassword { .. }) {
            return Err(self.invalid("cancel"));
        }
        self.state = ControllerState::Resolved(Resolution::Cancelled);
        Ok(&self.state)
    }

    fn invalid(&self, event: &'static str) -> Error {
        Error::InvalidTransition {
            state: self.state.name(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    const MODERN: &[u8] = include_bytes!("../../testdata/modern.p12");
    const CERTS_ONLY: &[u8] = include_bytes!("../../testdata/certs_only.p12");

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn controller(input: &[u8]) -> PasswordRetryController {
        PasswordRetryController::new(input.to_vec(), ParseOptions::default())
    }

    fn awaiting(attempts: u32, last_failure: PasswordFailure) -> ControllerState {
        ControllerState::AwaitingPassword {
            attempts,
            last_failure,
        }
    }

    #[test]
    fn test_password_flow() {
        let mut controller = controller(MODERN);
        assert_eq!(&ControllerState::Unattempted, controller.state());

        let state = controller.start(now()).unwrap();
        assert_eq!(&awaiting(0, PasswordFailure::PasswordRequired), state);

        let state = controller.submit_password("wrong", now()).unwrap();
        assert_eq!(&awaiting(1, PasswordFailure::InvalidPassword), state);

        let state = controller.submit_password("", now()).unwrap();
        assert_eq!(&awaiting(2, PasswordFailure::InvalidPassword), state);

        let state = controller.submit_password("correct horse", now()).unwrap();
        let ControllerState::Resolved(Resolution::Success(bundle)) = state else {
            panic!("expected success, got {:?}", state);
        };
        assert_eq!(2, bundle.certificates.len());
    }

    #[test]
    fn test_start_resolves_without_password() {
        let mut controller = controller(CERTS_ONLY);
        let state = controller.start(now()).unwrap();
        assert!(matches!(
            state,
            ControllerState::Resolved(Resolution::Success(_))
        ));
    }

    #[test]
    fn test_start_resolves_malformed() {
        let mut controller = controller(&[]);
        assert_eq!(
            &ControllerState::Resolved(Resolution::Malformed("empty input".to_string())),
            controller.start(now()).unwrap()
        );
    }

    #[test]
    fn test_cancel() {
        let mut controller = controller(MODERN);
        controller.start(now()).unwrap();
        controller.submit_password("wrong", now()).unwrap();
        assert_eq!(
            &ControllerState::Resolved(Resolution::Cancelled),
            controller.cancel().unwrap()
        );
    }

    #[rstest]
    #[case::submit_before_start("submit_password")]
    #[case::cancel_before_start("cancel")]
    fn test_invalid_transition_before_start(#[case] event: &str) {
        let mut controller = controller(MODERN);
        let result = match event {
            "submit_password" => controller.submit_password("x", now()).map(|_| ()),
            _ => controller.cancel().map(|_| ()),
        };
        assert!(matches!(
            result,
            Err(Error::InvalidTransition {
                state: "Unattempted",
                ..
            })
        ));
        assert_eq!(&ControllerState::Unattempted, controller.state());
    }

    #[test]
    fn test_resolved_state_is_final() {
        let mut controller = controller(MODERN);
        controller.start(now()).unwrap();
        controller.cancel().unwrap();

        assert!(matches!(
            controller.start(now()),
            Err(Error::InvalidTransition { state: "Resolved", event: "start" })
        ));
        assert!(matches!(
            controller.submit_password("correct horse", now()),
            Err(Error::InvalidTransition { state: "Resolved", .. })
        ));
        assert!(controller.cancel().is_err());
        assert_eq!(
            &ControllerState::Resolved(Resolution::Cancelled),
            controller.state()
        );
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut controller = controller(MODERN);
        controller.start(now()).unwrap();
        assert!(controller.start(now()).is_err());
        assert_eq!(
            &awaiting(0, PasswordFailure::PasswordRequired),
            controller.state()
        );
    }
}
