//! Property tests for frame parsing and validation.
//!
//! Verifies that:
//! - length bounds are enforced for every frame size
//! - conflicting symbol pairs are always reported, wherever they appear
//! - delegation never permits a weaker mode or a dropped forbidden constraint
//! - parsing is deterministic

use proptest::prelude::*;
use warden_frame::{parse, validate, IssueCode, MAX_FRAME_LENGTH, MIN_FRAME_LENGTH};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Glyphs that can repeat freely without tripping semantic checks.
const FILLER: &[&str] = &["⟳", "⧗", "⊡", "✓", "⊙"];

fn filler(n: usize) -> impl Strategy<Value = Vec<&'static str>> {
    proptest::collection::vec(proptest::sample::select(FILLER), n)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn out_of_bounds_length_is_always_an_error(
        glyphs in (0usize..=1).prop_union(13usize..=20).prop_flat_map(filler)
    ) {
        prop_assume!(!glyphs.is_empty());
        let frame = parse(&glyphs.join(" ")).unwrap();
        let report = validate(&frame, None);

        prop_assert!(!report.valid);
        if frame.len() < MIN_FRAME_LENGTH {
            prop_assert!(report.has_error(IssueCode::LengthTooShort));
        } else {
            prop_assert!(frame.len() > MAX_FRAME_LENGTH);
            prop_assert!(report.has_error(IssueCode::LengthTooLong));
        }
    }

    #[test]
    fn in_bounds_length_never_reports_length_errors(glyphs in (2usize..=12).prop_flat_map(filler)) {
        let frame = parse(&glyphs.join(" ")).unwrap();
        let report = validate(&frame, None);
        prop_assert!(!report.has_error(IssueCode::LengthTooShort));
        prop_assert!(!report.has_error(IssueCode::LengthTooLong));
    }

    #[test]
    fn strict_flexible_pair_always_conflicts(prefix in filler(3), suffix in filler(3), swap in any::<bool>()) {
        let (a, b) = if swap { ("◇", "◆") } else { ("◆", "◇") };
        let text = format!("{} {} Ⓓ {} {}", prefix.join(" "), a, b, suffix.join(" "));
        let report = validate(&parse(&text).unwrap(), None);
        prop_assert!(report.has_error(IssueCode::ModeConflictStrictFlexible));
        prop_assert!(!report.valid);
    }

    #[test]
    fn priority_pair_always_conflicts(prefix in filler(2), swap in any::<bool>()) {
        let (a, b) = if swap { ("▼", "▲") } else { ("▲", "▼") };
        let text = format!("◈ {} {} {} Ⓓ ◉", prefix.join(" "), a, b);
        let report = validate(&parse(&text).unwrap(), None);
        prop_assert!(report.has_error(IssueCode::PriorityConflict));
    }

    #[test]
    fn parse_is_deterministic(glyphs in (2usize..=12).prop_flat_map(filler)) {
        let text = format!("◆ Ⓓ {}", glyphs.join(""));
        let a = parse(&text).unwrap();
        let b = parse(&text).unwrap();
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
        prop_assert_eq!(a, b);
    }
}

// ---------------------------------------------------------------------------
// Delegation chain
// ---------------------------------------------------------------------------

#[test]
fn strict_parent_flexible_child_is_weakened() {
    let parent = parse("◆ Ⓓ ◉").unwrap();
    let child = parse("◇ Ⓓ ◉").unwrap();
    let report = validate(&child, Some(&parent));
    assert!(report.has_error(IssueCode::ModeStrengthWeakened));
    assert!(!report.valid);
}

#[test]
fn child_without_mode_weakens_moded_parent() {
    let parent = parse("◈ Ⓓ ◉").unwrap();
    let child = parse("Ⓓ ◉").unwrap();
    let report = validate(&child, Some(&parent));
    assert!(report.has_error(IssueCode::ModeStrengthWeakened));
}

#[test]
fn forbidden_parent_requires_forbidden_child() {
    let parent = parse("◆ ⊗ Ⓕ ⇄").unwrap();
    let child = parse("◆ ⊙ Ⓕ ⇄").unwrap();
    let report = validate(&child, Some(&parent));
    assert!(report.has_error(IssueCode::ForbiddenNotInherited));
}
