//! Presentation model for the sign-in screen and the image gallery.
//!
//! No widgets here: [`AuthScreen::render`] returns a [`ScreenView`] that a
//! real UI toolkit (or the demo's terminal output) draws. The screen keeps
//! its own copy of the session, updated by an observer that is only
//! registered while the screen is shown.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use authsync_gateway::AuthGateway;
use authsync_session::{ObserverScope, ScopeHandle};
use authsync_types::{AuthErrorKind, Identity, RequestToken, Session};
use parking_lot::Mutex;

use crate::{AuthSync, AuthSyncError};

/// Image locators shown once the user is signed in, in display order.
pub const GALLERY_IMAGES: [&str; 3] = [
    "https://unsplash.com/photos/red-blue-and-white-flowers-5TK1F5VfdIk",
    "https://unsplash.com/photos/a-painting-of-a-castle-on-a-hill-sJr8LDyEf7k",
    "https://unsplash.com/photos/a-painting-on-the-ceiling-of-a-building-1rBg5YSi00c",
];

// ---------------------------------------------------------------------------
// ScreenView
// ---------------------------------------------------------------------------

/// What the sign-in screen should show right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenView {
    /// The credential form. `busy` while a sign-in is in flight; `message`
    /// explains the last failure.
    CredentialEntry {
        identifier: String,
        busy: bool,
        message: Option<String>,
    },
    /// The signed-in panel with a sign-out button.
    SignedIn { identity: Identity },
}

/// User-facing text for a failed sign-in.
pub fn failure_message(kind: AuthErrorKind) -> &'static str {
    match kind {
        AuthErrorKind::InvalidCredentials => "Incorrect email or password.",
        AuthErrorKind::NetworkError => {
            "Can't reach the sign-in service. Check your connection and try again."
        }
        AuthErrorKind::ProviderUnavailable => "Sign-in is temporarily unavailable. Try again later.",
        AuthErrorKind::Unknown => "Sign-in failed. Please try again.",
    }
}

// ---------------------------------------------------------------------------
// AuthScreen
// ---------------------------------------------------------------------------

/// The sign-in screen: a form while signed out, a status panel while
/// signed in.
pub struct AuthScreen {
    scope: ObserverScope,
    visible: Option<ScopeHandle>,
    /// Last session delivered to this screen's observer.
    session: Arc<Mutex<Session>>,
    /// How many deliveries asked for a redraw.
    updates: Arc<AtomicUsize>,
    identifier: String,
    secret: String,
}

impl AuthScreen {
    /// Creates a hidden screen bound to `auth`'s session.
    pub fn new<G: AuthGateway>(auth: &AuthSync<G>, name: &str) -> Self {
        Self {
            scope: auth.scope(name),
            visible: None,
            session: Arc::new(Mutex::new(auth.current())),
            updates: Arc::new(AtomicUsize::new(0)),
            identifier: String::new(),
            secret: String::new(),
        }
    }

    /// Starts observing the session. The screen's copy is refreshed
    /// immediately.
    ///
    /// # Errors
    /// Returns [`AuthSyncError::Session`] if the screen is already shown.
    pub fn show(&mut self) -> Result<(), AuthSyncError> {
        let session = Arc::clone(&self.session);
        let updates = Arc::clone(&self.updates);
        let handle = self.scope.enter(move |s: &Session| {
            *session.lock() = s.clone();
            updates.fetch_add(1, Ordering::Relaxed);
        })?;
        self.visible = Some(handle);
        Ok(())
    }

    /// Stops observing. Returns `false` if the screen was not shown.
    pub fn hide(&mut self) -> bool {
        match self.visible.take() {
            Some(handle) => {
                handle.leave();
                true
            }
            None => false,
        }
    }

    /// `true` between [`show`](Self::show) and [`hide`](Self::hide).
    pub fn is_visible(&self) -> bool {
        self.visible.is_some()
    }

    pub fn set_identifier(&mut self, identifier: &str) {
        self.identifier = identifier.to_string();
    }

    pub fn set_secret(&mut self, secret: &str) {
        self.secret = secret.to_string();
    }

    /// Submits the form. The secret field is cleared afterwards.
    pub fn submit<G: AuthGateway>(&mut self, auth: &AuthSync<G>) -> RequestToken {
        let secret = std::mem::take(&mut self.secret);
        auth.sign_in(&self.identifier, &secret)
    }

    /// The sign-out button.
    pub fn sign_out<G: AuthGateway>(&self, auth: &AuthSync<G>) -> RequestToken {
        auth.sign_out()
    }

    /// Number of session deliveries since the screen was created.
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }

    /// Builds the view for the last session this screen observed.
    pub fn render(&self) -> ScreenView {
        match &*self.session.lock() {
            Session::Authenticated { identity } => ScreenView::SignedIn {
                identity: identity.clone(),
            },
            Session::Authenticating => ScreenView::CredentialEntry {
                identifier: self.identifier.clone(),
                busy: true,
                message: None,
            },
            Session::Failed { error } => ScreenView::CredentialEntry {
                identifier: self.identifier.clone(),
                busy: false,
                message: Some(failure_message(*error).to_string()),
            },
            Session::Unauthenticated => ScreenView::CredentialEntry {
                identifier: self.identifier.clone(),
                busy: false,
                message: None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Gallery
// ---------------------------------------------------------------------------

/// The static image list, gated on being signed in.
#[derive(Debug, Clone)]
pub struct Gallery {
    images: Vec<String>,
}

impl Gallery {
    /// A gallery over the given locators, shown in order.
    pub fn new(images: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            images: images.into_iter().map(Into::into).collect(),
        }
    }

    /// The images to show for `session`: all of them when authenticated,
    /// none otherwise.
    pub fn visible(&self, session: &Session) -> &[String] {
        if session.is_authenticated() {
            &self.images
        } else {
            &[]
        }
    }
}

impl Default for Gallery {
    fn default() -> Self {
        Self::new(GALLERY_IMAGES)
    }
}
