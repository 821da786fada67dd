// src/engine/lockdown.rs

//! Exam lockdown: fullscreen enforcement and navigation intercepts.
//!
//! Browser capabilities are reached through [`FullscreenController`] so the
//! state machine can run against a fake in tests and against a directive
//! queue on the server.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const REFRESH_WARNING: &str = "Page refresh is disabled during the test.";
pub const FULLSCREEN_TOGGLE_WARNING: &str = "Fullscreen toggle is disabled during the test.";
pub const FULLSCREEN_EXIT_WARNING: &str = "You must stay in fullscreen mode during the test.";
pub const LEAVE_PROMPT: &str = "Are you sure you want to leave the test? Your answers will be lost.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullscreenError(pub String);

impl fmt::Display for FullscreenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fullscreen request failed: {}", self.0)
    }
}

impl std::error::Error for FullscreenError {}

/// Access to the browser fullscreen API.
pub trait FullscreenController: Send {
    fn enter(&mut self) -> Result<(), FullscreenError>;
    fn exit(&mut self) -> Result<(), FullscreenError>;
    fn is_fullscreen(&self) -> bool;

    /// Records a fullscreen change reported by the client.
    fn observe(&mut self, _is_fullscreen: bool) {}
}

/// Browser events forwarded by the client while a test is open.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserEvent {
    BeforeUnload,
    KeyDown {
        key: String,
        #[serde(default)]
        ctrl: bool,
    },
    FullscreenChange { is_fullscreen: bool },
    FullscreenError { message: String },
    PopState,
}

/// How the client must react to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Block { warning: String },
    Confirm { prompt: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitOutcome {
    /// Exit confirmed; fullscreen released, navigation proceeds.
    Left,
    /// Exit declined or nothing pending; client restores the current route.
    Stay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockdownView {
    pub active: bool,
    pub pending_exit: bool,
}

pub struct Lockdown<C> {
    role: Role,
    active: bool,
    pending_exit: bool,
    controller: C,
}

impl<C: FullscreenController> Lockdown<C> {
    pub fn new(role: Role, controller: C) -> Self {
        Self {
            role,
            active: false,
            pending_exit: false,
            controller,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    pub fn view(&self) -> LockdownView {
        LockdownView {
            active: self.active,
            pending_exit: self.pending_exit,
        }
    }

    /// Turns the intercepts on or off. Only students are ever locked down.
    pub fn set_should_block(&mut self, should_block: bool) {
        if self.role != Role::Student || should_block == self.active {
            return;
        }

        self.active = should_block;
        self.pending_exit = false;

        let result = if should_block {
            self.controller.enter()
        } else {
            self.controller.exit()
        };
        if let Err(e) = result {
            tracing::warn!("{}; lockdown continues without it", e);
        }
    }

    pub fn handle(&mut self, event: &BrowserEvent) -> Verdict {
        if !self.active {
            return Verdict::Allow;
        }

        match event {
            BrowserEvent::BeforeUnload => Verdict::Confirm {
                prompt: LEAVE_PROMPT.to_string(),
            },
            BrowserEvent::KeyDown { key, ctrl } => {
                if key == "F5" || (*ctrl && key.eq_ignore_ascii_case("r")) {
                    Verdict::Block {
                        warning: REFRESH_WARNING.to_string(),
                    }
                } else if key == "F11" {
                    Verdict::Block {
                        warning: FULLSCREEN_TOGGLE_WARNING.to_string(),
                    }
                } else {
                    Verdict::Allow
                }
            }
            BrowserEvent::FullscreenChange { is_fullscreen } => {
                self.controller.observe(*is_fullscreen);
                if *is_fullscreen {
                    return Verdict::Allow;
                }
                if let Err(e) = self.controller.enter() {
                    tracing::warn!("{}", e);
                }
                Verdict::Block {
                    warning: FULLSCREEN_EXIT_WARNING.to_string(),
                }
            }
            BrowserEvent::FullscreenError { message } => {
                tracing::warn!(message = %message, "Client could not enter fullscreen");
                Verdict::Allow
            }
            BrowserEvent::PopState => {
                self.pending_exit = true;
                Verdict::Confirm {
                    prompt: LEAVE_PROMPT.to_string(),
                }
            }
        }
    }

    /// Answers a pending back/forward confirmation.
    pub fn resolve_exit(&mut self, confirmed: bool) -> ExitOutcome {
        if !self.pending_exit {
            return ExitOutcome::Stay;
        }
        self.pending_exit = false;
        if confirmed {
            self.set_should_block(false);
            ExitOutcome::Left
        } else {
            ExitOutcome::Stay
        }
    }
}

/// Instructions for the client, delivered with the next response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientDirective {
    EnterFullscreen,
    ExitFullscreen,
}

/// Server-side controller: fullscreen requests become queued directives and
/// the fullscreen state is whatever the client last reported.
#[derive(Debug, Default)]
pub struct DirectiveFullscreen {
    pending: Vec<ClientDirective>,
    reported: bool,
}

impl DirectiveFullscreen {
    pub fn drain(&mut self) -> Vec<ClientDirective> {
        std::mem::take(&mut self.pending)
    }
}

impl FullscreenController for DirectiveFullscreen {
    fn enter(&mut self) -> Result<(), FullscreenError> {
        self.pending.push(ClientDirective::EnterFullscreen);
        Ok(())
    }

    fn exit(&mut self) -> Result<(), FullscreenError> {
        self.pending.push(ClientDirective::ExitFullscreen);
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.reported
    }

    fn observe(&mut self, is_fullscreen: bool) {
        self.reported = is_fullscreen;
    }
}
