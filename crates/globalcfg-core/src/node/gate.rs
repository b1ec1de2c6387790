//! Skip decision for nodes consuming the global configuration.

use super::GlobalConfigState;

/// Returns `true` if dependents may keep their output for this pass.
///
/// Skipping is only safe when the pass was handled incrementally and no
/// absorbed change reached dependents. An untracked pass means the node either
/// recomputed in full or did nothing, and in the former case any field may
/// have changed.
#[must_use]
pub fn downstream_can_skip(state: &GlobalConfigState) -> bool {
    let data = state.tracked_data();
    state.tracked() && !data.options_changed && !data.features_changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TrackedData;

    fn state(tracked: bool, options_changed: bool, features_changed: bool) -> GlobalConfigState {
        GlobalConfigState {
            tracked,
            tracked_data: TrackedData {
                options_changed,
                features_changed,
            },
            ..GlobalConfigState::default()
        }
    }

    #[test]
    fn untracked_pass_requires_recompute() {
        assert!(!downstream_can_skip(&state(false, false, false)));
    }

    #[test]
    fn tracked_pass_without_relevant_change_can_skip() {
        assert!(downstream_can_skip(&state(true, false, false)));
    }

    #[test]
    fn any_relevant_change_requires_recompute() {
        assert!(!downstream_can_skip(&state(true, true, false)));
        assert!(!downstream_can_skip(&state(true, false, true)));
        assert!(!downstream_can_skip(&state(true, true, true)));
    }
}
