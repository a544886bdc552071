// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end routing scenarios driven through the router harness.

use tiller_config::model::TrackingMode;
use tiller_core::{Category, EscalationLedger, HistoryMessage};
use tiller_router::{ActiveModel, Directive};
use tiller_test_utils::{MockSemantic, MockTracker, RouterHarness};

const SESSION: &str = "session-1";

fn harness() -> RouterHarness {
    RouterHarness::builder().build().unwrap()
}

fn scenario_e_harness() -> RouterHarness {
    RouterHarness::builder()
        .configure(|c| {
            c.routing.categories[1].models =
                vec!["opus".to_string(), "sonnet".to_string(), "flash".to_string()];
        })
        .build()
        .unwrap()
}

fn collaborative_harness() -> RouterHarness {
    RouterHarness::builder()
        .configure(|c| {
            c.collaboration.enabled = true;
            c.collaboration.channel = Some("pair".to_string());
            c.collaboration.identity = Some("agent-a".to_string());
        })
        .build()
        .unwrap()
}

async fn escalate_to_opus(h: &RouterHarness) {
    let suggest = h.turn(SESSION, "run a security audit of the login flow").await;
    assert!(matches!(suggest, Directive::Suggest { ref model, .. } if model == "opus"));
    let switch = h.turn(SESSION, "go ahead").await;
    assert!(matches!(switch, Directive::Switch { ref model, .. } if model == "opus"));
}

#[tokio::test]
async fn scenario_a_coding_text_suggests_primary_coding_model() {
    let h = harness();
    let directive = h
        .turn(SESSION, "please refactor this function ```fn main() {}```")
        .await;
    assert_eq!(
        directive,
        Directive::Suggest {
            model: "sonnet".to_string(),
            category: Category::new("coding"),
            fallbacks: vec!["gemini-pro".to_string()],
        }
    );
    let state = h.state(SESSION).await.unwrap();
    assert_eq!(state.pending.map(|p| p.model), Some("sonnet".to_string()));
}

#[tokio::test]
async fn scenario_b_approval_switches_and_clears_pending() {
    let h = harness();
    h.turn(SESSION, "threat model the payment service").await;
    let directive = h.turn(SESSION, "go ahead").await;

    assert_eq!(
        directive,
        Directive::Switch {
            model: "opus".to_string(),
            category: Category::new("security-audit"),
            work_id: None,
        }
    );
    let state = h.state(SESSION).await.unwrap();
    assert!(!state.is_pending());
    assert_eq!(state.current, ActiveModel::Named("opus".to_string()));
}

#[tokio::test]
async fn scenario_c_peer_announcement_auto_switches_to_complement() {
    let h = collaborative_harness();
    let history = vec![
        HistoryMessage::from_author("agent-b", "on it. [tiller] model: opus"),
        HistoryMessage::anonymous("what do you both think?"),
    ];
    let directive = h
        .turn_with_history(SESSION, "pair", "what do you both think?", &history)
        .await;

    assert_eq!(
        directive,
        Directive::AutoSwitch {
            model: "gemini-pro".to_string(),
            peer_model: "opus".to_string(),
        }
    );
    let state = h.state(SESSION).await.unwrap();
    assert_eq!(state.current, ActiveModel::Named("gemini-pro".to_string()));
    assert!(!state.is_pending());
}

#[tokio::test]
async fn scenario_d_completion_reverts_on_next_turn() {
    let h = harness();
    escalate_to_opus(&h).await;
    h.seed_escalation("W1", "opus", SESSION).await;

    assert!(h.complete(SESSION, "W1").await);
    assert!(h.ledger.get("W1").await.unwrap().is_none());

    let directive = h.turn(SESSION, "thanks, what next?").await;
    assert_eq!(
        directive,
        Directive::Revert {
            model: "gemini-flash".to_string(),
            work_id: Some("W1".to_string()),
        }
    );
    let state = h.state(SESSION).await.unwrap();
    assert!(state.current.is_default());
    assert!(state.active_work_id.is_none());
    assert!(!state.is_revert_armed());
}

#[tokio::test]
async fn scenario_e_fallback_cascades_then_surfaces_error() {
    let h = scenario_e_harness();
    h.turn(SESSION, "implement the parser").await;
    h.turn(SESSION, "yes").await;

    assert_eq!(
        h.capacity_error(SESSION).await,
        Some(Directive::Fallback {
            from: "opus".to_string(),
            to: "sonnet".to_string(),
        })
    );
    assert_eq!(
        h.capacity_error(SESSION).await,
        Some(Directive::Fallback {
            from: "sonnet".to_string(),
            to: "flash".to_string(),
        })
    );
    // End of the chain: the original error must be surfaced.
    assert_eq!(h.capacity_error(SESSION).await, None);
    assert_eq!(
        h.state(SESSION).await.unwrap().current,
        ActiveModel::Named("flash".to_string())
    );
}

#[tokio::test]
async fn revert_is_never_emitted_on_the_completing_turn() {
    let h = harness();
    escalate_to_opus(&h).await;
    h.seed_escalation("W9", "opus", SESSION).await;

    // The turn in which the work gets closed is already decided.
    let same_turn = h.turn(SESSION, "closing the ticket now").await;
    assert!(!matches!(same_turn, Directive::Revert { .. }));
    assert!(h.complete(SESSION, "W9").await);

    let next = h.turn(SESSION, "anything else?").await;
    assert!(matches!(next, Directive::Revert { .. }));
    // Only once.
    assert!(!matches!(h.turn(SESSION, "ok").await, Directive::Revert { .. }));
}

#[tokio::test]
async fn stay_phrase_cancels_armed_revert() {
    let h = harness();
    escalate_to_opus(&h).await;
    h.seed_escalation("W2", "opus", SESSION).await;
    assert!(h.complete(SESSION, "W2").await);

    let directive = h.turn(SESSION, "let's stay on this model for the next task").await;
    assert_eq!(directive, Directive::Noop);
    let state = h.state(SESSION).await.unwrap();
    assert_eq!(state.current, ActiveModel::Named("opus".to_string()));
    assert!(!state.is_revert_armed());
    assert!(state.active_work_id.is_none());
}

#[tokio::test]
async fn override_beats_approval_in_same_message() {
    let h = harness();
    h.turn(SESSION, "debug this crash").await;
    let directive = h.turn(SESSION, "no switch, but go ahead").await;

    assert_eq!(directive, Directive::Noop);
    let state = h.state(SESSION).await.unwrap();
    assert!(!state.is_pending());
    assert!(state.current.is_default());
}

#[tokio::test]
async fn ambiguous_answer_keeps_suggestion_pending() {
    let h = harness();
    h.turn(SESSION, "debug this crash").await;

    let directive = h.turn(SESSION, "hmm, what would that cost?").await;
    assert_eq!(directive, Directive::Noop);
    assert!(h.state(SESSION).await.unwrap().is_pending());

    // A new coding request while pending does not stack a second suggestion.
    assert_eq!(h.turn(SESSION, "also refactor the parser").await, Directive::Noop);
    let state = h.state(SESSION).await.unwrap();
    assert_eq!(state.pending.map(|p| p.model), Some("sonnet".to_string()));
}

#[tokio::test]
async fn no_resuggestion_when_already_on_primary() {
    let h = harness();
    h.turn(SESSION, "implement a cache").await;
    h.turn(SESSION, "sounds good").await;

    assert_eq!(h.turn(SESSION, "now implement eviction").await, Directive::Noop);
    assert!(!h.state(SESSION).await.unwrap().is_pending());
}

#[tokio::test]
async fn simple_text_never_suggests() {
    let h = harness();
    assert_eq!(h.turn(SESSION, "hi, how are you?").await, Directive::Noop);
    assert!(!h.state(SESSION).await.unwrap().is_pending());
}

#[tokio::test]
async fn empty_model_list_means_no_upgrade() {
    let h = RouterHarness::builder()
        .configure(|c| c.routing.categories[3].models.clear())
        .build()
        .unwrap();
    assert_eq!(h.turn(SESSION, "compare these two options").await, Directive::Noop);
}

#[tokio::test]
async fn disabled_routing_is_inert() {
    let h = RouterHarness::builder()
        .configure(|c| c.routing.enabled = false)
        .build()
        .unwrap();
    assert_eq!(h.turn(SESSION, "refactor everything").await, Directive::Noop);
    assert!(h.state(SESSION).await.is_none());
}

#[tokio::test]
async fn approval_opens_and_records_unit_of_work() {
    let h = RouterHarness::builder()
        .with_tracker(MockTracker::new())
        .build()
        .unwrap();
    h.turn(SESSION, "find the sql injection").await;
    let directive = h.turn(SESSION, "proceed").await;

    assert!(matches!(
        directive,
        Directive::Switch { ref work_id, .. } if work_id.as_deref() == Some("W1")
    ));
    let entry = h.ledger.get("W1").await.unwrap().unwrap();
    assert_eq!(entry.model, "opus");
    assert_eq!(entry.session_key, SESSION);
    assert_eq!(
        h.state(SESSION).await.unwrap().active_work_id.as_deref(),
        Some("W1")
    );
    let titles = h.tracker.as_ref().unwrap().opened().await;
    assert_eq!(titles, ["security-audit work on opus"]);

    // Closing that work reverts on the next turn.
    assert!(h.complete(SESSION, "W1").await);
    assert!(matches!(h.turn(SESSION, "next").await, Directive::Revert { .. }));
}

#[tokio::test]
async fn tracker_failure_still_switches_untracked() {
    let h = RouterHarness::builder()
        .with_tracker(MockTracker::failing())
        .build()
        .unwrap();
    h.turn(SESSION, "find the sql injection").await;
    let directive = h.turn(SESSION, "proceed").await;
    assert!(matches!(directive, Directive::Switch { work_id: None, .. }));
    assert!(h.ledger.is_empty().await);
}

#[tokio::test]
async fn ledger_failure_degrades_without_reverting() {
    let h = RouterHarness::builder()
        .with_tracker(MockTracker::new())
        .with_failing_ledger()
        .build()
        .unwrap();
    h.turn(SESSION, "find the sql injection").await;
    let directive = h.turn(SESSION, "proceed").await;
    // Recording failed but the approval itself stands.
    assert!(matches!(directive, Directive::Switch { ref model, .. } if model == "opus"));

    assert!(!h.complete(SESSION, "W1").await);
    assert_eq!(h.turn(SESSION, "next").await, Directive::Noop);
}

#[tokio::test]
async fn completion_ignored_when_model_changed_since_escalation() {
    let h = harness();
    escalate_to_opus(&h).await;
    h.seed_escalation("W3", "sonnet", SESSION).await;

    assert!(!h.complete(SESSION, "W3").await);
    assert!(h.ledger.get("W3").await.unwrap().is_some());
}

#[tokio::test]
async fn unknown_work_id_is_ignored_while_tracking_an_item() {
    let h = RouterHarness::builder()
        .with_tracker(MockTracker::new())
        .build()
        .unwrap();
    escalate_to_opus(&h).await;
    assert_eq!(h.state(SESSION).await.unwrap().active_work_id.as_deref(), Some("W1"));

    assert!(!h.complete(SESSION, "W404").await);
    assert!(!h.state(SESSION).await.unwrap().is_revert_armed());
    assert!(h.ledger.get("W1").await.unwrap().is_some());
}

#[tokio::test]
async fn default_config_reverts_after_closing_untracked_escalation() {
    // No tracker: the switch records nothing, so the closed id is unknown.
    let h = harness();
    escalate_to_opus(&h).await;
    assert!(h.ledger.is_empty().await);

    assert!(h.complete(SESSION, "bd-42").await);
    assert_eq!(
        h.turn(SESSION, "next").await,
        Directive::Revert {
            model: "gemini-flash".to_string(),
            work_id: Some("bd-42".to_string()),
        }
    );
}

#[tokio::test]
async fn closing_several_items_removes_each_and_keeps_first_revert() {
    let h = RouterHarness::builder()
        .with_tracker(MockTracker::new())
        .build()
        .unwrap();
    escalate_to_opus(&h).await;
    h.seed_escalation("W2", "opus", SESSION).await;

    assert!(h.complete(SESSION, "W1").await);
    assert!(h.complete(SESSION, "W2").await);
    assert!(h.ledger.is_empty().await);
    assert_eq!(
        h.turn(SESSION, "next").await,
        Directive::Revert {
            model: "gemini-flash".to_string(),
            work_id: Some("W1".to_string()),
        }
    );
}

#[tokio::test]
async fn events_for_unseen_sessions_leave_no_state() {
    let h = scenario_e_harness();
    assert!(!h.complete(SESSION, "W1").await);
    assert!(!h.complete_untracked(SESSION).await);
    assert_eq!(h.capacity_error(SESSION).await, None);
    assert!(!h.router.store().contains(SESSION));
    assert!(h.router.store().is_empty());
}

#[tokio::test]
async fn untracked_completion_arms_only_off_default() {
    let h = RouterHarness::builder()
        .configure(|c| c.tracking.mode = TrackingMode::Untracked)
        .build()
        .unwrap();
    assert!(!h.complete_untracked(SESSION).await);

    escalate_to_opus(&h).await;
    // In untracked mode a work id is not consulted.
    assert!(h.complete(SESSION, "whatever").await);
    assert_eq!(
        h.turn(SESSION, "next").await,
        Directive::Revert {
            model: "gemini-flash".to_string(),
            work_id: None,
        }
    );
}

#[tokio::test]
async fn fallback_onto_default_model_stores_sentinel() {
    let h = RouterHarness::builder()
        .configure(|c| {
            c.routing.categories[0].models = vec!["opus".to_string(), "gemini-flash".to_string()];
        })
        .build()
        .unwrap();
    escalate_to_opus(&h).await;

    assert_eq!(
        h.capacity_error(SESSION).await,
        Some(Directive::Fallback {
            from: "opus".to_string(),
            to: "gemini-flash".to_string(),
        })
    );
    assert!(h.state(SESSION).await.unwrap().current.is_default());
}

#[tokio::test]
async fn capacity_error_on_model_outside_every_chain_surfaces() {
    let h = harness();
    // The default model is in no category list.
    assert_eq!(h.capacity_error(SESSION).await, None);
}

#[tokio::test]
async fn fallback_after_auto_switch_uses_first_chain_containing_model() {
    let h = collaborative_harness();
    let history = vec![HistoryMessage::from_author("agent-b", "[tiller] model: gemini-pro")];
    let directive = h
        .turn_with_history(SESSION, "pair", "hello", &history)
        .await;
    // geminipro -> opus per the complement table.
    assert!(matches!(directive, Directive::AutoSwitch { ref model, .. } if model == "opus"));

    // First list containing opus is security-audit: [opus, sonnet].
    assert_eq!(
        h.capacity_error(SESSION).await,
        Some(Directive::Fallback {
            from: "opus".to_string(),
            to: "sonnet".to_string(),
        })
    );
}

#[tokio::test]
async fn collaboration_ignores_own_announcements_and_other_channels() {
    let h = collaborative_harness();
    let own = vec![HistoryMessage::from_author("agent-a", "[tiller] model: opus")];
    // Only our own announcement: fall through to classification.
    let directive = h
        .turn_with_history(SESSION, "pair", "refactor this", &own)
        .await;
    assert!(matches!(directive, Directive::Suggest { .. }));

    let peer = vec![HistoryMessage::from_author("agent-b", "[tiller] model: opus")];
    let other = h
        .turn_with_history("session-2", "solo", "hello there", &peer)
        .await;
    assert_eq!(other, Directive::Noop);
}

#[tokio::test]
async fn already_on_complement_is_noop() {
    let h = collaborative_harness();
    let history = vec![HistoryMessage::from_author("agent-b", "[tiller] model: opus")];
    h.turn_with_history(SESSION, "pair", "hi", &history).await;
    let again = h.turn_with_history(SESSION, "pair", "hi", &history).await;
    assert_eq!(again, Directive::Noop);
}

#[tokio::test]
async fn semantic_slow_path_drives_suggestion() {
    let h = RouterHarness::builder()
        .configure(|c| c.semantic.min_chars = 10)
        .with_semantic(MockSemantic::with_labels(["complex"]))
        .build()
        .unwrap();
    let directive = h
        .turn(SESSION, "can you think through how these services should talk")
        .await;
    assert!(matches!(
        directive,
        Directive::Suggest { ref category, .. } if category == &Category::new("complex")
    ));
}

#[tokio::test]
async fn semantic_outage_is_treated_as_simple() {
    let semantic = MockSemantic::new();
    semantic.push_failure().await;
    let h = RouterHarness::builder()
        .configure(|c| c.semantic.min_chars = 10)
        .with_semantic(semantic)
        .build()
        .unwrap();
    let directive = h
        .turn(SESSION, "can you think through how these services should talk")
        .await;
    assert_eq!(directive, Directive::Noop);
}

#[tokio::test]
async fn session_end_releases_state() {
    let h = harness();
    h.turn(SESSION, "debug this").await;
    assert!(h.router.end_session(SESSION));
    assert!(h.state(SESSION).await.is_none());
    assert!(!h.router.end_session(SESSION));

    // A fresh session starts idle.
    assert!(matches!(h.turn(SESSION, "go ahead").await, Directive::Noop));
}

#[tokio::test]
async fn sessions_are_independent() {
    let h = harness();
    h.turn("a", "debug this").await;
    assert_eq!(h.turn("b", "go ahead").await, Directive::Noop);
    assert!(matches!(h.turn("a", "go ahead").await, Directive::Switch { .. }));
}
