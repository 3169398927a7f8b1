use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use keyact_core::{MemoryPreferences, PlatformError, TransactionError, THEMES};

use super::*;
use crate::host::MockPlatformBridge;
use crate::window::ActionWindow;

// =============================================================================
// Fixtures
// =============================================================================

/// Persistent state that records cleanups and flags any that overlap an open window.
struct TrackedState {
    window_open: Arc<AtomicBool>,
    cleanups: AtomicUsize,
    overlapped_window: AtomicBool,
    fail_with: Option<&'static str>,
    delay: Option<Duration>,
}

impl TrackedState {
    fn new(window_open: Arc<AtomicBool>) -> Self {
        Self {
            window_open,
            cleanups: AtomicUsize::new(0),
            overlapped_window: AtomicBool::new(false),
            fail_with: None,
            delay: None,
        }
    }
}

#[async_trait]
impl PersistentActionState for TrackedState {
    async fn clean_up(&self) -> Result<(), ActionError> {
        if self.window_open.load(Ordering::SeqCst) {
            self.overlapped_window.store(true, Ordering::SeqCst);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(message) => Err(ActionError::Cleanup(message.to_string())),
            None => Ok(()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Window that types fed text, renames itself and can dismiss itself.
struct TrackedWindow {
    name: Mutex<String>,
    open: Arc<AtomicBool>,
    closes: Arc<AtomicUsize>,
}

impl ActionWindow for TrackedWindow {
    fn window_name(&self) -> String {
        self.name.lock().clone()
    }

    fn contents(&self, keyboard_shown: bool) -> WindowContents {
        let label = if keyboard_shown { "with keyboard" } else { "alone" };
        WindowContents::new().with(crate::window::Element::text(label))
    }

    fn on_event(&self, host: &dyn KeyboardManagerForAction, event: WindowEvent) {
        match event {
            WindowEvent::Click(id) if id == "close" => host.close_action_window(),
            WindowEvent::Click(id) => *self.name.lock() = id,
            WindowEvent::Text(text) => host.type_text(&text),
        }
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counters shared between a tracker action and the test.
#[derive(Clone, Default)]
struct Tracker {
    window_open: Arc<AtomicBool>,
    closes: Arc<AtomicUsize>,
    windows_created: Arc<AtomicUsize>,
    states_created: Arc<AtomicUsize>,
}

impl Tracker {
    fn window_action(&self, id: &'static str, can_show_keyboard: bool) -> Action {
        let tracker = self.clone();
        let for_state = self.clone();
        Action::new(id, "icon", "Tracker")
            .can_show_keyboard(can_show_keyboard)
            .with_window(move |_host, state| {
                assert!(state.and_then(|s| s.downcast_ref::<TrackedState>()).is_some());
                tracker.windows_created.fetch_add(1, Ordering::SeqCst);
                tracker.window_open.store(true, Ordering::SeqCst);
                Box::new(TrackedWindow {
                    name: Mutex::new(format!("{} window", id)),
                    open: tracker.window_open.clone(),
                    closes: tracker.closes.clone(),
                })
            })
            .with_persistent_state(move |_host| {
                for_state.states_created.fetch_add(1, Ordering::SeqCst);
                Arc::new(TrackedState::new(for_state.window_open.clone()))
            })
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

fn host_with(actions: Vec<Action>) -> KeyboardHost {
    host_with_config(actions, keyact_core::KeyboardConfig::default())
}

fn host_with_config(actions: Vec<Action>, config: keyact_core::KeyboardConfig) -> KeyboardHost {
    let registry = Arc::new(ActionRegistry::new());
    for action in actions {
        registry.register(action).unwrap();
    }
    let context = KeyboardContext::new(config, Arc::new(MemoryPreferences::new()));
    KeyboardHost::new(context, LifecycleScope::current().unwrap(), registry)
}

fn tracked_state(host: &KeyboardHost, id: &str) -> Arc<dyn PersistentActionState> {
    host.persistent_state(id).expect("state created")
}

// =============================================================================
// Invocation
// =============================================================================

#[tokio::test]
async fn test_simple_press_without_state() {
    let calls = Arc::new(AtomicUsize::new(0));
    let saw_state = Arc::new(AtomicBool::new(false));
    let (c, s) = (calls.clone(), saw_state.clone());
    let action = Action::new("undo", "undo", "Undo").with_simple_press(move |_host, state| {
        c.fetch_add(1, Ordering::SeqCst);
        s.store(state.is_some(), Ordering::SeqCst);
    });
    let host = host_with(vec![action]);

    let outcome = host.invoke("undo", PressGesture::Default).unwrap();

    assert_eq!(outcome, InvokeOutcome::SimplePress);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!saw_state.load(Ordering::SeqCst));
    assert!(host.render().is_none());
    assert!(host.surface_state().window.is_none());
}

#[tokio::test]
async fn test_window_reuses_persistent_state() {
    let tracker = Tracker::default();
    let host = host_with(vec![tracker.window_action("tracker", false)]);

    let first = host.invoke("tracker", PressGesture::Default).unwrap();
    let state = tracked_state(&host, "tracker");
    assert_eq!(host.open_window_action().as_deref(), Some("tracker"));

    assert!(host.back());
    assert_eq!(tracker.closes(), 1);
    assert!(host.open_window_action().is_none());

    let second = host.invoke("tracker", PressGesture::Default).unwrap();
    assert!(Arc::ptr_eq(&state, &tracked_state(&host, "tracker")));
    assert_ne!(first, second);
    assert_eq!(tracker.states_created.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.windows_created.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unknown_and_noop_actions() {
    let host = host_with(vec![Action::new("blank", "icon", "Blank")]);

    assert!(matches!(
        host.invoke("missing", PressGesture::Default),
        Err(ActionError::ActionNotFound(_))
    ));
    assert_eq!(
        host.invoke("blank", PressGesture::OpenWindow).unwrap(),
        InvokeOutcome::NoOp
    );
}

#[tokio::test]
async fn test_simple_press_receives_state() {
    let window_open = Arc::new(AtomicBool::new(false));
    let seen = Arc::new(AtomicBool::new(false));
    let s = seen.clone();
    let action = Action::new("stateful", "icon", "Stateful")
        .with_simple_press(move |_host, state| {
            s.store(
                state.and_then(|st| st.downcast_ref::<TrackedState>()).is_some(),
                Ordering::SeqCst,
            );
        })
        .with_persistent_state(move |_host| Arc::new(TrackedState::new(window_open.clone())));
    let host = host_with(vec![action]);

    host.invoke("stateful", PressGesture::SimplePress).unwrap();
    assert!(seen.load(Ordering::SeqCst));
}

// =============================================================================
// Window Lifecycle
// =============================================================================

#[tokio::test]
async fn test_opening_replaces_previous_window() {
    let a = Tracker::default();
    let b = Tracker::default();
    let host = host_with(vec![a.window_action("a", false), b.window_action("b", true)]);

    host.invoke("a", PressGesture::Default).unwrap();
    host.invoke("b", PressGesture::Default).unwrap();

    assert_eq!(a.closes(), 1);
    assert_eq!(b.closes(), 0);
    assert_eq!(host.open_window_action().as_deref(), Some("b"));
    assert!(host.surface_state().keyboard_shown);
}

#[tokio::test]
async fn test_close_paths_converge() {
    let tracker = Tracker::default();
    let host = host_with(vec![tracker.window_action("tracker", false)]);
    host.invoke("tracker", PressGesture::Default).unwrap();

    // Self-dismissal from inside the window
    assert!(host.dispatch_window_event(WindowEvent::Click("close".into())));
    assert_eq!(tracker.closes(), 1);

    // Later close requests find nothing to close
    assert!(!host.back());
    host.close_action_window();
    assert!(!host.dispatch_window_event(WindowEvent::Click("close".into())));
    assert_eq!(tracker.closes(), 1);
}

#[tokio::test]
async fn test_render_recomputes_name_and_visibility() {
    let tracker = Tracker::default();
    let host = host_with(vec![tracker.window_action("tracker", true)]);
    host.invoke("tracker", PressGesture::Default).unwrap();

    let rendered = host.render().unwrap();
    assert_eq!(rendered.title, "tracker window");
    assert_eq!(rendered.contents.outline(), "with keyboard");

    host.dispatch_window_event(WindowEvent::Click("Renamed".into()));
    host.set_keyboard_visible(false);

    let rendered = host.render().unwrap();
    assert_eq!(rendered.title, "Renamed");
    assert!(!rendered.keyboard_shown);
    assert_eq!(rendered.contents.outline(), "alone");
}

#[tokio::test]
async fn test_window_events_reach_host() {
    let tracker = Tracker::default();
    let host = host_with(vec![tracker.window_action("tracker", false)]).with_text("a");
    host.invoke("tracker", PressGesture::Default).unwrap();

    host.dispatch_window_event(WindowEvent::Text("bc".into()));
    assert_eq!(host.text(), "abc");
}

#[tokio::test]
async fn test_surface_broadcasts_window_changes() {
    let tracker = Tracker::default();
    let host = host_with(vec![tracker.window_action("tracker", false)]);
    let rx = host.subscribe();

    host.invoke("tracker", PressGesture::Default).unwrap();
    assert_eq!(
        rx.borrow().window.as_ref().map(|w| w.action_id.clone()),
        Some("tracker".to_string())
    );
    assert!(!rx.borrow().keyboard_shown);

    host.back();
    assert!(rx.borrow().window.is_none());
}

// =============================================================================
// Transactions
// =============================================================================

#[tokio::test]
async fn test_commit_replaces_partials() {
    let host = host_with(vec![]).with_text("note: ");
    let mut txn = host.create_input_transaction(false);

    for partial in ["h", "he", "hel", "help"] {
        txn.update_partial(partial).unwrap();
        assert_eq!(host.text(), "note: ");
        assert_eq!(host.display_text(), format!("note: {}", partial));
    }
    txn.commit("hello").unwrap();

    assert_eq!(host.text(), "note: hello");
    assert_eq!(host.composing(), None);
}

#[tokio::test]
async fn test_cancel_restores_prior_buffer() {
    let host = host_with(vec![]).with_text("abc");
    let mut txn = host.create_input_transaction(true);

    txn.update_partial("one").unwrap();
    txn.update_partial("one two").unwrap();
    assert_eq!(host.display_text(), "abc one two");

    txn.cancel().unwrap();
    assert_eq!(host.display_text(), "abc");
    assert_eq!(host.cursor(), 3);
}

#[tokio::test]
async fn test_leading_space_rules() {
    let host = host_with(vec![]).with_text("abc");
    host.create_input_transaction(true).commit("hello").unwrap();
    assert_eq!(host.text(), "abc hello");

    let host = host_with(vec![]).with_text("abc ");
    host.create_input_transaction(true).commit("hello").unwrap();
    assert_eq!(host.text(), "abc hello");

    // Creating a transaction alone never inserts the space
    let host = host_with(vec![]).with_text("abc");
    let mut txn = host.create_input_transaction(true);
    assert_eq!(host.display_text(), "abc");
    txn.cancel().unwrap();
    assert_eq!(host.display_text(), "abc");
}

#[tokio::test]
async fn test_terminal_transaction_is_flagged() {
    let host = host_with(vec![]);
    let mut txn = host.create_input_transaction(false);
    txn.commit("once").unwrap();

    assert_eq!(txn.commit("twice"), Err(TransactionError::AlreadyCommitted));
    assert_eq!(txn.cancel(), Err(TransactionError::AlreadyCommitted));
    assert_eq!(host.text(), "once");

    let notices = host.take_notices();
    assert_eq!(notices.len(), 2);
    assert!(matches!(
        &notices[0],
        HostNotice::TransactionMisuse { operation, error: TransactionError::AlreadyCommitted, .. }
            if operation == "commit"
    ));
    assert!(host.notices().is_empty());
}

#[tokio::test]
async fn test_direct_edit_supersedes_transaction() {
    let host = host_with(vec![]);
    let mut txn = host.create_input_transaction(false);
    txn.update_partial("draft").unwrap();

    host.type_text("x");
    assert_eq!(host.display_text(), "x");
    assert!(!host.has_live_transaction());
    assert_eq!(txn.commit("draft"), Err(TransactionError::Superseded));
    assert_eq!(host.text(), "x");
}

#[tokio::test]
async fn test_shortcut_keeps_transaction_live() {
    let host = host_with(vec![]).with_text("hello");
    let mut txn = host.create_input_transaction(true);
    txn.update_partial("wor").unwrap();

    host.send_key_event(keycode::Z, MetaState::CTRL_ON);
    host.send_key_event(keycode::A, MetaState::empty());
    assert!(host.has_live_transaction());
    assert_eq!(host.forwarded_keys().len(), 2);

    txn.commit("world").unwrap();
    assert_eq!(host.text(), "hello world");

    // Cursor movement edits the buffer and ends the next transaction
    let mut txn = host.create_input_transaction(false);
    txn.update_partial("!").unwrap();
    host.send_key_event(keycode::DPAD_LEFT, MetaState::empty());
    assert!(!host.has_live_transaction());
    assert_eq!(txn.commit("!"), Err(TransactionError::Superseded));
}

#[tokio::test]
async fn test_second_transaction_supersedes_first() {
    let host = host_with(vec![]);
    let mut first = host.create_input_transaction(false);
    first.update_partial("first").unwrap();

    let mut second = host.create_input_transaction(false);
    second.update_partial("second").unwrap();
    assert_eq!(host.display_text(), "second");

    assert_eq!(first.cancel(), Err(TransactionError::Superseded));
    assert_eq!(host.display_text(), "second");
    second.commit("second").unwrap();
    assert_eq!(host.text(), "second");
}

// =============================================================================
// Direct Input
// =============================================================================

#[tokio::test]
async fn test_key_and_code_point_events() {
    let host = host_with(vec![]).with_text("ac");

    host.send_key_event(keycode::DPAD_LEFT, MetaState::empty());
    host.send_code_point_event('b' as i32);
    assert_eq!(host.text(), "abc");
    assert_eq!(host.cursor(), 2);

    host.send_key_event(keycode::MOVE_END, MetaState::empty());
    host.send_code_point_event(code::DELETE);
    host.backspace(5);
    assert_eq!(host.text(), "");

    host.send_key_event(keycode::Z, MetaState::CTRL_ON);
    let forwarded = host.forwarded_keys();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].key_code, keycode::Z);
    assert_eq!(forwarded[0].meta_state, MetaState::CTRL_ON);

    // Shift changes nothing in the field
    host.send_code_point_event(code::SHIFT);
    assert_eq!(host.text(), "");
}

#[tokio::test]
async fn test_theme_and_content_update() {
    let host = host_with(vec![]);
    let rx = host.subscribe();
    assert_eq!(host.theme().key, "classic_dark");

    host.update_theme(THEMES[2]);
    host.trigger_content_update();

    assert_eq!(host.theme(), THEMES[2]);
    assert_eq!(rx.borrow().theme, THEMES[2].key);
    assert_eq!(rx.borrow().content_generation, 1);
}

#[tokio::test]
async fn test_system_voice_input_failure_is_reported() {
    let mut platform = MockPlatformBridge::new();
    platform
        .expect_launch_system_voice_input()
        .times(1)
        .returning(|| Err(PlatformError::VoiceInputUnavailable));

    let action = Action::new("system_voice_input", "mic", "Dictate")
        .with_simple_press(|host, _| host.trigger_system_voice_input());
    let host = host_with(vec![action]).with_platform(Arc::new(platform));

    host.invoke("system_voice_input", PressGesture::Default).unwrap();
    assert!(matches!(
        host.notices().as_slice(),
        [HostNotice::PlatformFailure { .. }]
    ));
}

#[tokio::test]
async fn test_system_voice_input_success() {
    let mut platform = MockPlatformBridge::new();
    platform
        .expect_launch_system_voice_input()
        .times(1)
        .returning(|| Ok(()));
    let host = host_with(vec![]).with_platform(Arc::new(platform));

    host.trigger_system_voice_input();
    assert!(host.notices().is_empty());
}

// =============================================================================
// Cleanup
// =============================================================================

#[tokio::test]
async fn test_cleanup_never_runs_while_window_open() {
    let tracker = Tracker::default();
    let host = host_with(vec![tracker.window_action("tracker", false)]);
    host.invoke("tracker", PressGesture::Default).unwrap();

    let report = host.request_cleanup().await;
    assert_eq!(report.skipped, vec!["tracker"]);
    assert!(report.cleaned.is_empty());

    let state = tracked_state(&host, "tracker");
    let counters = state.downcast_ref::<TrackedState>().unwrap();
    assert_eq!(counters.cleanups.load(Ordering::SeqCst), 0);

    host.back();
    let report = host.request_cleanup().await;
    assert_eq!(report.cleaned, vec!["tracker"]);
    assert_eq!(counters.cleanups.load(Ordering::SeqCst), 1);
    assert!(!counters.overlapped_window.load(Ordering::SeqCst));

    // Repeated cleanup is fine and the state keeps its identity
    host.request_cleanup().await;
    assert_eq!(counters.cleanups.load(Ordering::SeqCst), 2);
    assert!(Arc::ptr_eq(&state, &tracked_state(&host, "tracker")));
}

#[tokio::test]
async fn test_invoke_rejected_while_cleaning() {
    let tracker = Tracker::default();
    let host = host_with(vec![tracker.window_action("tracker", false)]);
    host.invoke("tracker", PressGesture::Default).unwrap();
    host.back();

    // Selection happens before the future is awaited
    let cleanup = host.request_cleanup();
    assert!(matches!(
        host.invoke("tracker", PressGesture::Default),
        Err(ActionError::CleanupInProgress(_))
    ));

    let report = cleanup.await;
    assert_eq!(report.cleaned, vec!["tracker"]);
    assert!(host.invoke("tracker", PressGesture::Default).is_ok());
    assert_eq!(tracker.windows_created.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_dropped_cleanup_still_releases_states() {
    let tracker = Tracker::default();
    let host = host_with(vec![tracker.window_action("tracker", false)]);
    host.invoke("tracker", PressGesture::Default).unwrap();
    host.back();

    drop(host.request_cleanup());
    assert!(matches!(
        host.invoke("tracker", PressGesture::Default),
        Err(ActionError::CleanupInProgress(_))
    ));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let state = tracked_state(&host, "tracker");
    let counters = state.downcast_ref::<TrackedState>().unwrap();
    assert_eq!(counters.cleanups.load(Ordering::SeqCst), 1);
    assert!(host.invoke("tracker", PressGesture::Default).is_ok());
    assert_eq!(host.open_window_action().as_deref(), Some("tracker"));
}

#[tokio::test]
async fn test_dropped_cleanup_still_records_failures() {
    let failing = Action::new("failing", "icon", "Failing")
        .with_simple_press(|_, _| {})
        .with_persistent_state(|_| {
            let mut state = TrackedState::new(Arc::new(AtomicBool::new(false)));
            state.fail_with = Some("disk gone");
            Arc::new(state)
        });
    let host = host_with(vec![failing]);
    host.invoke("failing", PressGesture::Default).unwrap();

    drop(host.request_cleanup());
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(matches!(
        host.notices().as_slice(),
        [HostNotice::CleanupFailure { action, .. }] if action == "failing"
    ));
    assert!(host.invoke("failing", PressGesture::Default).is_ok());
}

#[tokio::test]
async fn test_cleanup_failures_are_contained() {
    let flag = Arc::new(AtomicBool::new(false));
    let failing_flag = flag.clone();
    let failing = Action::new("failing", "icon", "Failing")
        .with_simple_press(|_, _| {})
        .with_persistent_state(move |_| {
            let mut state = TrackedState::new(failing_flag.clone());
            state.fail_with = Some("disk gone");
            Arc::new(state)
        });
    let slow = Action::new("slow", "icon", "Slow")
        .with_simple_press(|_, _| {})
        .with_persistent_state(move |_| {
            let mut state = TrackedState::new(flag.clone());
            state.delay = Some(Duration::from_secs(60));
            Arc::new(state)
        });

    let mut config = keyact_core::KeyboardConfig::default();
    config.actions.cleanup_timeout_ms = 20;
    let host = host_with_config(vec![failing, slow], config);
    host.invoke("failing", PressGesture::Default).unwrap();
    host.invoke("slow", PressGesture::Default).unwrap();

    let report = host.request_cleanup().await;
    assert!(report.cleaned.is_empty());
    let failed: Vec<_> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(failed, vec!["failing", "slow"]);
    assert!(report.failed[0].1.contains("disk gone"));
    assert!(report.failed[1].1.contains("timeout"));
    assert_eq!(host.notices().len(), 2);

    // Failed states are usable again
    assert!(host.invoke("slow", PressGesture::Default).is_ok());
}

#[tokio::test]
async fn test_shutdown_releases_everything() {
    let tracker = Tracker::default();
    let host = host_with(vec![tracker.window_action("tracker", false)]);
    host.invoke("tracker", PressGesture::Default).unwrap();
    let mut txn = host.create_input_transaction(false);
    txn.update_partial("pending").unwrap();

    host.shutdown();

    assert_eq!(tracker.closes(), 1);
    assert!(host.persistent_state("tracker").is_none());
    assert!(host.lifecycle_scope().is_cancelled());
    assert_eq!(host.display_text(), "");
    assert_eq!(txn.commit("pending"), Err(TransactionError::Superseded));
}
