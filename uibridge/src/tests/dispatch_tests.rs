//! End-to-end command dispatch scenarios against the simulated platform.

use crate::dispatch::{Command, Dispatcher};
use crate::element::NodeAction;
use crate::gesture::StrokePath;
use crate::platforms::simulated::{SimNode, SimulatedPlatform};
use crate::platforms::GlobalAction;
use serde_json::json;
use std::sync::Arc;

fn dispatcher_for(platform: &SimulatedPlatform) -> Dispatcher {
    super::init_tracing();
    Dispatcher::new(Arc::new(platform.clone()))
}

fn cmd(action: &str, params: serde_json::Value) -> Command {
    Command::new(action, params)
}

#[tokio::test(start_paused = true)]
async fn unknown_action_fails_without_side_effects() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher
        .dispatch(cmd("teleport", json!({"x": 1})))
        .await;

    assert!(!result.success);
    assert_eq!(result.message, "Unknown action: teleport");
    assert!(result.data.is_none());
    assert!(platform.gestures().is_empty());
    assert!(platform.global_actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn tap_dispatches_a_short_single_point_stroke() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher.dispatch(cmd("tap", json!({"x": 540, "y": 960}))).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(platform.gestures(), vec![StrokePath::tap(540, 960)]);
}

#[tokio::test(start_paused = true)]
async fn tap_rejects_negative_coordinates_before_acting() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher.dispatch(cmd("tap", json!({"x": -5, "y": 100}))).await;

    assert!(!result.success);
    assert!(result.message.contains("non-negative"), "{}", result.message);
    assert!(platform.gestures().is_empty(), "no partial side effect");
}

#[tokio::test(start_paused = true)]
async fn tap_rejects_coordinates_beyond_the_device_range() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    // Would wrap to 0 if narrowed to i32 unchecked.
    let result = dispatcher
        .dispatch(cmd("tap", json!({"x": 4294967296i64, "y": 100})))
        .await;
    assert!(!result.success);
    assert!(result.message.contains("coordinate range"), "{}", result.message);

    // Would wrap negative.
    let result = dispatcher
        .dispatch(cmd(
            "swipe",
            json!({"startX": 3000000000i64, "startY": 0, "endX": 0, "endY": 0}),
        ))
        .await;
    assert!(!result.success);
    assert!(result.message.contains("coordinate range"), "{}", result.message);

    assert!(platform.gestures().is_empty(), "no wrapped stroke dispatched");
}

#[tokio::test(start_paused = true)]
async fn tap_with_missing_parameters_is_a_validation_failure() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher.dispatch(cmd("tap", json!({"x": 10}))).await;
    assert!(!result.success);
    assert!(result.message.starts_with("Invalid argument"), "{}", result.message);
}

#[tokio::test(start_paused = true)]
async fn swipe_keeps_the_requested_duration() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher
        .dispatch(cmd(
            "swipe",
            json!({"startX": 540, "startY": 1500, "endX": 540, "endY": 500, "duration": 300}),
        ))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(
        platform.gestures(),
        vec![StrokePath::swipe(540, 1500, 540, 500, 300)]
    );
}

#[tokio::test(start_paused = true)]
async fn long_press_uses_caller_duration() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher
        .dispatch(cmd("long_press", json!({"x": 100, "y": 200, "duration": 1500})))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(platform.gestures()[0].duration_ms, 1500);
}

#[tokio::test(start_paused = true)]
async fn tap_element_is_equivalent_to_tapping_the_match_center() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher
        .dispatch(cmd("tap_element", json!({"text": "network"})))
        .await;

    assert!(result.success, "{}", result.message);
    // "Network & internet" button occupies (40, 320, 1040, 420).
    assert_eq!(platform.gestures(), vec![StrokePath::tap(540, 370)]);
}

#[tokio::test(start_paused = true)]
async fn tap_element_index_beyond_matches_is_out_of_range() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher
        .dispatch(cmd("tap_element", json!({"text": "network", "index": 3})))
        .await;

    assert!(!result.success);
    assert!(result.message.contains("out of range"), "{}", result.message);
    assert!(platform.gestures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn tap_element_without_any_selector_is_invalid() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher.dispatch(cmd("tap_element", json!({}))).await;
    assert!(!result.success);
    assert!(result.message.contains("at least one"), "{}", result.message);
}

#[tokio::test(start_paused = true)]
async fn find_element_returns_flat_records() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher
        .dispatch(cmd("find_element", json!({"resourceId": "id/search"})))
        .await;

    assert!(result.success, "{}", result.message);
    let data = result.data.expect("match list");
    let records = data.as_array().expect("flat array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["className"], "android.widget.EditText");
    assert_eq!(records[0]["resourceId"], "com.android.settings:id/search");
    assert_eq!(records[0]["bounds"]["centerX"], 540);
}

#[tokio::test(start_paused = true)]
async fn find_element_with_no_match_reports_not_found() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher
        .dispatch(cmd("find_element", json!({"text": "no such label"})))
        .await;
    assert!(!result.success);
    assert!(result.message.starts_with("Element not found"), "{}", result.message);
}

#[tokio::test(start_paused = true)]
async fn dump_returns_the_nested_hierarchy() {
    let tree = SimNode::new("android.widget.FrameLayout")
        .bounds(0, 0, 1080, 1920)
        .child(SimNode::new("android.widget.TextView").text("A"))
        .child(SimNode::new("android.widget.TextView").text("B"));
    let platform = SimulatedPlatform::with_tree(tree);
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher.dispatch(cmd("dump", json!({}))).await;

    assert!(result.success, "{}", result.message);
    let data = result.data.expect("hierarchy");
    assert_eq!(data["depth"], 0);
    let children = data["children"].as_array().expect("children");
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["text"], "A");
    assert_eq!(children[0]["depth"], 1);
    assert_eq!(children[0]["children"].as_array().unwrap().len(), 0);
    assert_eq!(children[1]["text"], "B");
}

#[tokio::test(start_paused = true)]
async fn scroll_forward_hits_the_first_scrollable_match() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher
        .dispatch(cmd("scroll_forward", json!({"resourceId": "id/list"})))
        .await;
    assert!(result.success, "{}", result.message);
}

#[tokio::test(start_paused = true)]
async fn scroll_without_scrollable_candidates_fails() {
    let tree = SimNode::new("android.widget.FrameLayout")
        .child(SimNode::new("android.widget.TextView").text("static"));
    let platform = SimulatedPlatform::with_tree(tree);
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher.dispatch(cmd("scroll_backward", json!({}))).await;
    assert!(!result.success);
    assert!(result.message.contains("scrollable"), "{}", result.message);
}

#[tokio::test(start_paused = true)]
async fn global_actions_delegate_to_the_platform() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    for action in ["back", "home", "recent", "notifications", "quick_settings"] {
        let result = dispatcher.dispatch(cmd(action, json!({}))).await;
        assert!(result.success, "{action}: {}", result.message);
    }
    assert_eq!(
        platform.global_actions(),
        vec![
            GlobalAction::Back,
            GlobalAction::Home,
            GlobalAction::Recents,
            GlobalAction::Notifications,
            GlobalAction::QuickSettings,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn refused_global_action_is_reported_as_rejected() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    platform.set_global_accepts(false);
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher.dispatch(cmd("back", json!({}))).await;
    assert!(!result.success);
    assert!(result.message.starts_with("Action rejected"), "{}", result.message);
}

#[tokio::test(start_paused = true)]
async fn key_injects_the_raw_key_code() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher.dispatch(cmd("key", json!({"keyCode": 66}))).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(platform.keys(), vec![66]);
}

#[tokio::test(start_paused = true)]
async fn input_text_reaches_the_search_field() {
    let tree = super::settings_tree();
    let platform = SimulatedPlatform::with_tree(tree.clone());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher
        .dispatch(cmd("input_text", json!({"text": "wifi"})))
        .await;
    assert!(result.success, "{}", result.message);

    let root = tree.element();
    let field = crate::matcher::find_first_focusable(&root).expect("search field");
    assert_eq!(field.attributes().unwrap().text, Some("wifi".to_string()));
}

#[tokio::test(start_paused = true)]
async fn start_app_launches_the_package() {
    let platform = SimulatedPlatform::with_tree(super::settings_tree());
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher
        .dispatch(cmd("start_app", json!({"packageName": "com.android.chrome"})))
        .await;
    assert!(result.success, "{}", result.message);
    assert_eq!(platform.launched(), vec!["com.android.chrome".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn missing_snapshot_produces_the_diagnostic_failure() {
    let platform = SimulatedPlatform::new();
    platform.set_service_enabled(false);
    let dispatcher = dispatcher_for(&platform);

    let result = dispatcher
        .dispatch(cmd("tap_element", json!({"text": "anything"})))
        .await;

    assert!(!result.success);
    assert!(result.message.starts_with("No UI snapshot available"), "{}", result.message);
    assert!(result.message.contains("service_enabled=false"), "{}", result.message);
    assert!(result.message.contains("windows=0"), "{}", result.message);
}

#[tokio::test(start_paused = true)]
async fn scroll_records_the_node_action() {
    let list = SimNode::new("androidx.recyclerview.widget.RecyclerView")
        .resource_id("id/feed")
        .scrollable();
    let tree = SimNode::new("android.widget.FrameLayout").child(list.clone());
    let platform = SimulatedPlatform::with_tree(tree);
    let dispatcher = dispatcher_for(&platform);

    dispatcher
        .dispatch(cmd("scroll_forward", json!({"resourceId": "feed"})))
        .await;
    dispatcher
        .dispatch(cmd("scroll_backward", json!({"resourceId": "feed"})))
        .await;

    assert_eq!(
        list.performed(),
        vec![NodeAction::ScrollForward, NodeAction::ScrollBackward]
    );
}

#[test]
fn result_envelope_omits_absent_data() {
    let ok = crate::CommandResult::ok("done");
    let json = serde_json::to_value(&ok).unwrap();
    assert_eq!(json, json!({"success": true, "message": "done"}));

    let with_data = crate::CommandResult::ok_with_data("done", json!([1, 2]));
    let json = serde_json::to_value(&with_data).unwrap();
    assert_eq!(json["data"], json!([1, 2]));
}
