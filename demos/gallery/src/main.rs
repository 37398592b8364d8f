use std::sync::Arc;

use authsync::init_logging;
use authsync::prelude::*;

const ACCOUNT: &str = "ada@example.com";
const SECRET: &str = "correct horse";

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn draw(view: &ScreenView, gallery: &Gallery, session: &Session) -> String {
    let mut out = match view {
        ScreenView::CredentialEntry { identifier, busy, message } => {
            let mut s = format!("[sign in] email: {identifier:?}");
            if *busy {
                s.push_str(" (signing in...)");
            }
            if let Some(message) = message {
                s.push_str(&format!(" | {message}"));
            }
            s
        }
        ScreenView::SignedIn { identity } => format!("[signed in as {identity}] [sign out]"),
    };
    for image in gallery.visible(session) {
        out.push_str(&format!("\n    {image}"));
    }
    out
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// Waits until the in-flight sign-in has landed, then applies whatever else
/// is queued.
async fn settle(driver: &mut SessionDriver<MemoryGateway>) {
    while driver.store().current().status() == SessionStatus::Authenticating {
        if !driver.next_event().await {
            return;
        }
    }
    driver.pump();
}

/// Walks the screen through a typo, a successful sign-in, a provider-side
/// expiry, and a sign-out. Returns one rendered frame per step.
async fn run_flow(gateway: Arc<MemoryGateway>) -> Result<Vec<String>, AuthSyncError> {
    let (auth, mut driver) = AuthSync::<MemoryGateway>::builder().build(Arc::clone(&gateway))?;
    let gallery = Gallery::default();
    let mut screen = AuthScreen::new(&auth, "sign-in");
    screen.show()?;

    let mut frames = Vec::new();
    let mut frame = |screen: &AuthScreen| {
        frames.push(draw(&screen.render(), &gallery, &auth.current()));
    };

    frame(&screen);

    screen.set_identifier(ACCOUNT);
    screen.set_secret("correct hrose");
    let token = screen.submit(&auth);
    tracing::info!(%token, "submitted");
    frame(&screen);
    settle(&mut driver).await;
    frame(&screen);

    screen.set_secret(SECRET);
    screen.submit(&auth);
    settle(&mut driver).await;
    frame(&screen);

    gateway.expire_session();
    driver.pump();
    frame(&screen);

    screen.set_secret(SECRET);
    screen.submit(&auth);
    settle(&mut driver).await;
    screen.sign_out(&auth);
    frame(&screen);

    screen.hide();
    Ok(frames)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info")?;

    let gateway = Arc::new(
        MemoryGateway::new(MemoryGatewayConfig {
            latency_ms: 300,
            jitter_ms: 200,
        })
        .with_account(ACCOUNT, SECRET),
    );

    for frame in run_flow(gateway).await? {
        println!("{frame}\n");
    }
    Ok(())
}
