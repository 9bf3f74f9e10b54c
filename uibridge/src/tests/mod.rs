mod dispatch_tests;

use crate::platforms::simulated::SimNode;

/// Route engine tracing into the test harness. Honors `RUST_LOG`, so a
/// failing scenario can be rerun with the engine's own instrumentation
/// visible. Safe to call from every test; only the first call installs.
pub(crate) fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A settings-style screen used by most scenarios: a title, a search field,
/// a couple of tappable rows, and a scrollable list.
pub(crate) fn settings_tree() -> SimNode {
    SimNode::new("android.widget.FrameLayout")
        .package("com.android.settings")
        .bounds(0, 0, 1080, 1920)
        .child(
            SimNode::new("android.widget.LinearLayout")
                .bounds(0, 0, 1080, 1920)
                .child(
                    SimNode::new("android.widget.TextView")
                        .text("Settings")
                        .bounds(40, 100, 400, 180),
                )
                .child(
                    SimNode::new("android.widget.EditText")
                        .resource_id("com.android.settings:id/search")
                        .description("Search settings")
                        .editable()
                        .bounds(40, 200, 1040, 300),
                )
                .child(
                    SimNode::new("android.widget.Button")
                        .text("Network & internet")
                        .clickable()
                        .bounds(40, 320, 1040, 420),
                )
                .child(
                    SimNode::new("androidx.recyclerview.widget.RecyclerView")
                        .resource_id("com.android.settings:id/list")
                        .scrollable()
                        .bounds(0, 440, 1080, 1920),
                ),
        )
}
