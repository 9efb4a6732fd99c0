//! Keyboard focus transfer
//!
//! Focusing a view deactivates the previous keyboard focus, raises the view,
//! activates it and moves the seat's keyboard focus to its toplevel surface.
//! Re-focusing the already focused view is not short-circuited: it is raised
//! and activated again.

use crate::backend::{SeatBackend, ShellBackend};
use crate::view::{ViewId, ViewRegistry};
use log::debug;

/// Give keyboard focus to `view`. `None` and stale ids are no-ops.
///
/// Returns true when focus was transferred.
pub fn focus_view<B>(registry: &mut ViewRegistry, backend: &mut B, view: Option<ViewId>) -> bool
where
    B: ShellBackend + SeatBackend + ?Sized,
{
    let Some(id) = view else {
        return false;
    };
    let Some(surface) = registry.get(id).map(|v| v.surface()) else {
        debug!("Ignoring focus request for stale {}", id);
        return false;
    };
    if !registry.get(id).map_or(false, |v| v.is_mapped()) {
        debug!("Ignoring focus request for unmapped {}", id);
        return false;
    }

    if let Some(previous) = backend.keyboard_focus() {
        if previous != surface {
            backend.set_activated(previous, false);
        }
    }

    registry.raise(id);
    backend.set_activated(surface, true);
    backend.keyboard_notify_enter(surface);

    debug!("Focused {} ({})", id, surface);
    true
}

/// View whose toplevel surface holds keyboard focus.
pub fn focused_view<B>(registry: &ViewRegistry, backend: &B) -> Option<ViewId>
where
    B: SeatBackend + ?Sized,
{
    backend
        .keyboard_focus()
        .and_then(|surface| registry.lookup(surface))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    fn setup(count: usize) -> (ViewRegistry, HeadlessBackend, Vec<ViewId>) {
        let mut backend = HeadlessBackend::default();
        let mut registry = ViewRegistry::new();
        let ids = (0..count)
            .map(|_| {
                let surface = backend.create_toplevel(100, 100);
                let id = registry.register(surface);
                registry.get_mut(id).unwrap().set_mapped(true);
                id
            })
            .collect();
        (registry, backend, ids)
    }

    fn surface(registry: &ViewRegistry, id: ViewId) -> crate::backend::SurfaceId {
        registry.get(id).unwrap().surface()
    }

    #[test]
    fn test_focus_none_is_noop() {
        let (mut registry, mut backend, _) = setup(2);
        let order = registry.stacking_order();
        assert!(!focus_view(&mut registry, &mut backend, None));
        assert_eq!(registry.stacking_order(), order);
        assert!(backend.keyboard_focus().is_none());
    }

    #[test]
    fn test_focus_raises_and_activates() {
        let (mut registry, mut backend, ids) = setup(3);
        assert!(focus_view(&mut registry, &mut backend, Some(ids[0])));
        assert_eq!(registry.front(), Some(ids[0]));
        let s0 = surface(&registry, ids[0]);
        assert!(backend.is_activated(s0));
        assert_eq!(backend.keyboard_focus(), Some(s0));
        assert_eq!(focused_view(&registry, &backend), Some(ids[0]));
    }

    #[test]
    fn test_focus_deactivates_previous() {
        let (mut registry, mut backend, ids) = setup(3);
        for &first in &ids {
            for &second in &ids {
                focus_view(&mut registry, &mut backend, Some(first));
                focus_view(&mut registry, &mut backend, Some(second));
                assert_eq!(registry.front(), Some(second));
                assert!(backend.is_activated(surface(&registry, second)));
                if first != second {
                    assert!(!backend.is_activated(surface(&registry, first)));
                }
            }
        }
    }

    #[test]
    fn test_refocus_reraises() {
        let (mut registry, mut backend, ids) = setup(2);
        focus_view(&mut registry, &mut backend, Some(ids[0]));
        registry.raise(ids[1]);
        assert!(focus_view(&mut registry, &mut backend, Some(ids[0])));
        assert_eq!(registry.front(), Some(ids[0]));
        assert_eq!(backend.keyboard_enter_count(surface(&registry, ids[0])), 2);
    }

    #[test]
    fn test_unmapped_view_is_not_focusable() {
        let (mut registry, mut backend, ids) = setup(1);
        registry.get_mut(ids[0]).unwrap().set_mapped(false);
        assert!(!focus_view(&mut registry, &mut backend, Some(ids[0])));
        assert!(backend.keyboard_focus().is_none());
    }
}
