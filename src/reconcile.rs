//! # Interactive Reconciliation
//!
//! Asks the operator for a server URL and credentials until the server
//! accepts them, or until the operator declines every chance to correct
//! them.
//!
//! The flow is a small state machine. [`transition`] is the whole table and
//! holds no I/O; [`Reconciler::run`] performs the prompt or check each state
//! calls for and feeds the outcome back in as an [`Event`].
//!
//! ```text
//! CollectUrl ──> ValidateUrl ──ok──> CollectCredentials ──> ValidateCredentials
//!      ^              │  bad, re-enter                            │ │ │
//!      └──────────────┘                                           │ │ └─ok──> Authorized ──> Done
//!      ^                                                          │ └─re-enter credentials ─> CollectCredentials
//!      └───────────────── re-enter URL (keep credentials) ────────┘
//! ```
//!
//! Declining both re-entry questions after a rejection ends the loop as
//! [`Authorization::Overridden`].

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::ui::Ui;

/// Checks a prospective server and credentials.
pub trait CredentialValidator {
    /// Reachability check used while the URL is typed. The error is shown
    /// to the operator as-is.
    fn check_url(&self, url: &str) -> std::result::Result<(), String>;

    /// Whether `url` is a management server we can talk to.
    fn validate_rbuilder_url(&self, url: &str) -> Result<()>;

    /// One authenticated round-trip. Failures of any kind mean "no".
    fn validate_credentials(&self, user: &str, password: &str, url: &str) -> bool;
}

/// How the session came to be considered authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// The server accepted the credentials.
    Validated,
    /// The server rejected them and the operator chose to continue.
    Overridden,
}

/// Where the reconciliation loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Ask for the server URL. `then_credentials` is false when the
    /// credentials already given should be rechecked against the new URL
    /// without asking for them again.
    CollectUrl { then_credentials: bool },
    /// Check the URL reaches an rBuilder.
    ValidateUrl { then_credentials: bool },
    /// Ask for user name and password.
    CollectCredentials,
    /// One authenticated round-trip with the collected credentials.
    ValidateCredentials,
    /// Credentials settled, either checked or overridden.
    Authorized(Authorization),
    /// Terminal.
    Done,
}

/// What happened in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    UrlCollected,
    UrlValid,
    /// The URL check failed; `reenter` is the operator's answer to trying
    /// another URL.
    UrlInvalid { reenter: bool },
    CredentialsCollected,
    CredentialsValid,
    /// The server refused the credentials. Both answers false means the
    /// operator continues anyway.
    CredentialsRejected {
        reenter_url: bool,
        reenter_credentials: bool,
    },
    Finished,
}

/// The reconciliation table.
pub fn transition(state: State, event: Event) -> Result<State> {
    use Event::*;
    use State::*;

    let next = match (state, event) {
        (CollectUrl { then_credentials }, UrlCollected) => ValidateUrl { then_credentials },
        (ValidateUrl { then_credentials }, UrlValid)
        | (ValidateUrl { then_credentials }, UrlInvalid { reenter: false }) => {
            if then_credentials {
                CollectCredentials
            } else {
                ValidateCredentials
            }
        }
        (ValidateUrl { then_credentials }, UrlInvalid { reenter: true }) => {
            CollectUrl { then_credentials }
        }
        (CollectCredentials, CredentialsCollected) => ValidateCredentials,
        (ValidateCredentials, CredentialsValid) => Authorized(Authorization::Validated),
        (ValidateCredentials, CredentialsRejected { reenter_url: true, .. }) => CollectUrl {
            then_credentials: false,
        },
        (
            ValidateCredentials,
            CredentialsRejected {
                reenter_credentials: true,
                ..
            },
        ) => CollectCredentials,
        (ValidateCredentials, CredentialsRejected { .. }) => {
            Authorized(Authorization::Overridden)
        }
        (Authorized(_), Finished) => Done,
        (state, event) => {
            return Err(Error::rbuild(format!(
                "unexpected {:?} while in {:?}",
                event, state
            )))
        }
    };
    Ok(next)
}

/// Starting answers offered at each prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDefaults {
    pub server_url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// The agreed server URL and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSession {
    pub server_url: String,
    pub user: String,
    pub password: String,
    pub authorization: Authorization,
}

pub struct Reconciler<'a> {
    ui: &'a mut dyn Ui,
    validator: &'a dyn CredentialValidator,
    defaults: SessionDefaults,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        ui: &'a mut dyn Ui,
        validator: &'a dyn CredentialValidator,
        defaults: SessionDefaults,
    ) -> Self {
        Self {
            ui,
            validator,
            defaults,
        }
    }

    /// Drive the questionnaire to completion.
    pub fn run(mut self) -> Result<ServerSession> {
        let mut state = State::CollectUrl {
            then_credentials: true,
        };
        let mut server_url = String::new();
        let mut user = self.defaults.user.clone().unwrap_or_default();
        let mut password = self.defaults.password.clone().unwrap_or_default();
        let mut authorization = Authorization::Validated;

        loop {
            debug!("reconcile state {:?}", state);
            let event = match state {
                State::CollectUrl { .. } => {
                    server_url = self.collect_url()?;
                    Event::UrlCollected
                }
                State::ValidateUrl { .. } => match self.validator.validate_rbuilder_url(&server_url) {
                    Ok(()) => Event::UrlValid,
                    Err(err) => {
                        self.ui.write(&format!(
                            "The rBuilder url is a valid server, but there was an error \
                             communicating with the rBuilder at that location: {}",
                            err
                        ));
                        Event::UrlInvalid {
                            reenter: self.ask_reenter_url()?,
                        }
                    }
                },
                State::CollectCredentials => {
                    let (new_user, new_password) = self.collect_credentials(&user, &password)?;
                    user = new_user;
                    password = new_password;
                    Event::CredentialsCollected
                }
                State::ValidateCredentials => {
                    if self.validator.validate_credentials(&user, &password, &server_url) {
                        self.ui.write("rBuilder authorized successfully.");
                        Event::CredentialsValid
                    } else {
                        self.ui.write(&format!(
                            "The specified credentials were not successfully authorized \
                             against the rBuilder at {}.",
                            server_url
                        ));
                        let reenter_url = self.ask_reenter_url()?;
                        let reenter_credentials = !reenter_url && self.ask_reenter_credentials()?;
                        Event::CredentialsRejected {
                            reenter_url,
                            reenter_credentials,
                        }
                    }
                }
                State::Authorized(how) => {
                    if how == Authorization::Overridden {
                        warn!(
                            "Continuing with credentials for {} that {} rejected",
                            user, server_url
                        );
                    }
                    authorization = how;
                    Event::Finished
                }
                State::Done => break,
            };
            state = transition(state, event)?;
        }

        Ok(ServerSession {
            server_url,
            user,
            password,
            authorization,
        })
    }

    fn collect_url(&mut self) -> Result<String> {
        let validator = self.validator;
        let check = |url: &str| validator.check_url(url);
        let url = self.ui.get_response(
            "URL to use to contact rBuilder (start with http:// or https://)",
            self.defaults.server_url.as_deref(),
            Some(&check),
        )?;
        self.ui.write("rBuilder contacted successfully.");
        let url = url.trim_end_matches('/').to_string();
        // later prompts offer what was typed last
        self.defaults.server_url = Some(url.clone());
        Ok(url)
    }

    fn collect_credentials(&mut self, user: &str, password: &str) -> Result<(String, String)> {
        let user_default = Some(user).filter(|u| !u.is_empty());
        let password_default = Some(password).filter(|p| !p.is_empty());
        let user = self
            .ui
            .get_response("Your rbuilder user name", user_default, None)?;
        let password = self
            .ui
            .get_password("Your rbuilder password", password_default, true)?;
        Ok((user, password))
    }

    fn ask_reenter_url(&mut self) -> Result<bool> {
        self.ui
            .get_yn("Would you like to re-enter the rBuilder url? (Y/N)", false)
    }

    fn ask_reenter_credentials(&mut self) -> Result<bool> {
        self.ui.get_yn(
            "Would you like to re-enter the user name and password? (Y/N)",
            false,
        )
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeValidator;
    use super::*;
    use crate::ui::testing::{Answer, Level, ScriptedUi};

    const URL_PROMPT: &str = "URL to use to contact rBuilder (start with http:// or https://)";
    const REENTER_URL: &str = "Would you like to re-enter the rBuilder url? (Y/N)";
    const REENTER_CREDENTIALS: &str =
        "Would you like to re-enter the user name and password? (Y/N)";

    fn text(s: &str) -> Answer {
        ScriptedUi::text(s)
    }

    fn password(s: &str) -> Answer {
        ScriptedUi::password(s)
    }

    fn run(
        ui: &mut ScriptedUi,
        validator: &FakeValidator,
        defaults: SessionDefaults,
    ) -> ServerSession {
        Reconciler::new(ui, validator, defaults).run().unwrap()
    }

    #[test]
    fn test_transition_table() {
        use Event::*;
        use State::*;

        let cases = [
            (CollectUrl { then_credentials: true }, UrlCollected, ValidateUrl { then_credentials: true }),
            (ValidateUrl { then_credentials: true }, UrlValid, CollectCredentials),
            (ValidateUrl { then_credentials: false }, UrlValid, ValidateCredentials),
            (ValidateUrl { then_credentials: true }, UrlInvalid { reenter: true }, CollectUrl { then_credentials: true }),
            (ValidateUrl { then_credentials: true }, UrlInvalid { reenter: false }, CollectCredentials),
            (CollectCredentials, CredentialsCollected, ValidateCredentials),
            (ValidateCredentials, CredentialsValid, Authorized(Authorization::Validated)),
            (
                ValidateCredentials,
                CredentialsRejected { reenter_url: true, reenter_credentials: false },
                CollectUrl { then_credentials: false },
            ),
            (
                ValidateCredentials,
                CredentialsRejected { reenter_url: false, reenter_credentials: true },
                CollectCredentials,
            ),
            (
                ValidateCredentials,
                CredentialsRejected { reenter_url: false, reenter_credentials: false },
                Authorized(Authorization::Overridden),
            ),
            (Authorized(Authorization::Validated), Finished, Done),
        ];
        for (state, event, expected) in cases {
            assert_eq!(transition(state, event).unwrap(), expected, "{:?} + {:?}", state, event);
        }
        assert!(transition(Done, UrlCollected).is_err());
        assert!(transition(CollectCredentials, UrlValid).is_err());
    }

    #[test]
    fn test_happy_path() {
        let mut ui = ScriptedUi::new(vec![
            text("http://rb.example.com/"),
            text("bob"),
            password("secret"),
        ]);
        let validator = FakeValidator::accepting();

        let session = run(&mut ui, &validator, SessionDefaults::default());

        assert_eq!(session.server_url, "http://rb.example.com");
        assert_eq!(session.user, "bob");
        assert_eq!(session.password, "secret");
        assert_eq!(session.authorization, Authorization::Validated);
        assert_eq!(
            ui.lines(Level::Write),
            vec!["rBuilder contacted successfully.", "rBuilder authorized successfully."]
        );
        assert_eq!(
            *validator.calls.borrow(),
            vec![
                "check_url http://rb.example.com/",
                "rbuilder http://rb.example.com",
                "credentials bob:secret@http://rb.example.com",
            ]
        );
    }

    #[test]
    fn test_defaults_are_offered() {
        let mut ui = ScriptedUi::new(vec![text(""), text(""), password("")]);
        let validator = FakeValidator::accepting();
        let defaults = SessionDefaults {
            server_url: Some("http://rb".to_string()),
            user: Some("alice".to_string()),
            password: Some("pw".to_string()),
        };

        let session = run(&mut ui, &validator, defaults);

        assert_eq!(session.server_url, "http://rb");
        assert_eq!(session.user, "alice");
        assert_eq!(session.password, "pw");
    }

    #[test]
    fn test_unreachable_url_is_asked_again() {
        let mut ui = ScriptedUi::new(vec![
            text("http://down"),
            text("http://up"),
            text("bob"),
            password("pw"),
        ]);
        let validator = FakeValidator::accepting().with_unreachable("http://down");

        let session = run(&mut ui, &validator, SessionDefaults::default());

        assert_eq!(session.server_url, "http://up");
        assert_eq!(
            ui.lines(Level::Error),
            vec!["Error contacting 'http://down': connection refused"]
        );
    }

    #[test]
    fn test_bad_rbuilder_url_reentered() {
        let mut ui = ScriptedUi::new(vec![
            text("http://old"),
            Answer::Yn(true),
            text("http://new"),
            text("bob"),
            password("pw"),
        ]);
        let validator = FakeValidator::accepting().with_rbuilder(vec![Err("boom".to_string()), Ok(())]);

        let session = run(&mut ui, &validator, SessionDefaults::default());

        assert_eq!(session.server_url, "http://new");
        assert_eq!(
            ui.lines(Level::Write)[1],
            "The rBuilder url is a valid server, but there was an error communicating \
             with the rBuilder at that location: boom"
        );
    }

    #[test]
    fn test_bad_rbuilder_url_accepted_anyway() {
        let mut ui = ScriptedUi::new(vec![
            text("http://odd"),
            Answer::Yn(false),
            text("bob"),
            password("pw"),
        ]);
        let validator = FakeValidator::accepting().with_rbuilder(vec![Err("boom".to_string())]);

        let session = run(&mut ui, &validator, SessionDefaults::default());

        assert_eq!(session.server_url, "http://odd");
        assert_eq!(session.authorization, Authorization::Validated);
        assert_eq!(ui.remaining(), 0);
    }

    #[test]
    fn test_rejected_then_reenter_url_keeps_credentials() {
        let mut ui = ScriptedUi::new(vec![
            text("http://one"),
            text("bob"),
            password("pw"),
            Answer::Yn(true),
            text("http://two"),
        ]);
        let validator = FakeValidator::accepting().with_credentials(vec![false, true]);

        let session = run(&mut ui, &validator, SessionDefaults::default());

        assert_eq!(session.server_url, "http://two");
        assert_eq!(session.user, "bob");
        assert_eq!(session.authorization, Authorization::Validated);
        // the credentials prompt appears once
        assert_eq!(
            ui.prompts.iter().filter(|p| *p == "Your rbuilder user name").count(),
            1
        );
        assert_eq!(
            validator.calls.borrow().last().unwrap(),
            "credentials bob:pw@http://two"
        );
        assert!(!ui.prompts.iter().any(|p| p == REENTER_CREDENTIALS));
    }

    #[test]
    fn test_rejected_then_reenter_credentials() {
        let mut ui = ScriptedUi::new(vec![
            text("http://rb"),
            text("bob"),
            password("wrong"),
            Answer::Yn(false),
            Answer::Yn(true),
            text(""),
            password("right"),
        ]);
        let validator = FakeValidator::accepting().with_credentials(vec![false, true]);

        let session = run(&mut ui, &validator, SessionDefaults::default());

        assert_eq!(session.user, "bob");
        assert_eq!(session.password, "right");
        assert_eq!(session.authorization, Authorization::Validated);
        assert_eq!(ui.prompts.iter().filter(|p| *p == URL_PROMPT).count(), 1);
    }

    #[test]
    fn test_declining_both_overrides() {
        let mut ui = ScriptedUi::new(vec![
            text("http://rb"),
            text("bob"),
            password("wrong"),
            Answer::Yn(false),
            Answer::Yn(false),
        ]);
        let validator = FakeValidator::accepting().with_credentials(vec![false]);

        let session = run(&mut ui, &validator, SessionDefaults::default());

        assert_eq!(session.authorization, Authorization::Overridden);
        assert_eq!(session.password, "wrong");
        assert_eq!(
            ui.lines(Level::Write).last().copied(),
            Some("The specified credentials were not successfully authorized against the rBuilder at http://rb.")
        );
        assert_eq!(
            ui.prompts[3..],
            [REENTER_URL.to_string(), REENTER_CREDENTIALS.to_string()]
        );
    }
}
