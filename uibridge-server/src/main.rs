mod api;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};
use uibridge::platforms::simulated::{SimNode, SimulatedPlatform};
use uibridge::AutomationEngine;

use api::AppState;

#[derive(Parser, Debug)]
#[command(name = "uibridge-server")]
#[command(about = "HTTP command server for the UI automation engine")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Bind address; loopback by default so only local clients can connect
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable CORS for all origins
    #[arg(long)]
    cors: bool,

    /// Start without an attached engine (commands answer 503)
    #[arg(long)]
    detached: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("starting uibridge-server v{}", env!("CARGO_PKG_VERSION"));

    let engine = if args.detached {
        info!("running detached; automation engine not attached");
        None
    } else {
        // The in-process simulated backend; a device build would hand the
        // engine its platform bridge here instead.
        let platform = SimulatedPlatform::with_tree(demo_tree());
        Some(Arc::new(AutomationEngine::new(Arc::new(platform))))
    };

    let state = AppState {
        engine,
        port: args.port,
    };

    let mut app = Router::new()
        .route("/ping", get(api::ping))
        .route("/status", get(api::status))
        .route("/cmd", post(api::cmd))
        .route("/element/{action}", post(api::element_action))
        .fallback(api::not_found)
        .with_state(state);

    if args.cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Small starter tree for the simulated backend so `dump`/`find_element`
/// have something to answer with out of the box.
fn demo_tree() -> SimNode {
    SimNode::new("android.widget.FrameLayout")
        .package("dev.uibridge.demo")
        .bounds(0, 0, 1080, 1920)
        .child(
            SimNode::new("android.widget.TextView")
                .text("UI Bridge demo")
                .bounds(40, 80, 1040, 160),
        )
        .child(
            SimNode::new("android.widget.EditText")
                .resource_id("dev.uibridge.demo:id/input")
                .editable()
                .bounds(40, 200, 1040, 300),
        )
        .child(
            SimNode::new("android.widget.Button")
                .text("Submit")
                .clickable()
                .bounds(40, 340, 520, 440),
        )
}
