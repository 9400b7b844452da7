//! Timed note events for offline rendering.

use sq_ir::NoteEvent;

/// A note event at a time offset from the start of a render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScriptEvent {
    pub at_ms: f32,
    pub event: NoteEvent,
}

impl ScriptEvent {
    pub const fn new(at_ms: f32, event: NoteEvent) -> Self {
        Self { at_ms, event }
    }
}

/// Play `note` from `start_ms` for `hold_ms`.
pub fn held_note(note: u8, start_ms: f32, hold_ms: f32) -> [ScriptEvent; 2] {
    [
        ScriptEvent::new(start_ms, NoteEvent::note_on(note)),
        ScriptEvent::new(start_ms + hold_ms.max(0.0), NoteEvent::note_off(note)),
    ]
}

/// Sort a script by time. Events at the same time keep their order.
pub(crate) fn sorted(script: &[ScriptEvent]) -> Vec<ScriptEvent> {
    let mut events = script.to_vec();
    events.sort_by(|a, b| a.at_ms.total_cmp(&b.at_ms));
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_note_orders_on_before_off() {
        let [on, off] = held_note(36, 10.0, 400.0);
        assert_eq!(on.event, NoteEvent::note_on(36));
        assert_eq!(off.event, NoteEvent::note_off(36));
        assert_eq!(off.at_ms, 410.0);
    }

    #[test]
    fn sorting_is_stable() {
        let script = [
            ScriptEvent::new(50.0, NoteEvent::note_off(1)),
            ScriptEvent::new(0.0, NoteEvent::note_on(1)),
            ScriptEvent::new(50.0, NoteEvent::note_on(2)),
        ];
        let events = sorted(&script);
        assert_eq!(events[0].event, NoteEvent::note_on(1));
        assert_eq!(events[1].event, NoteEvent::note_off(1));
        assert_eq!(events[2].event, NoteEvent::note_on(2));
    }
}
