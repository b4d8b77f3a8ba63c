//! Raw record → normalized event translation and listener dispatch.
//!
//! Runs on the worker thread, once per [`RawEvent`].  This is the hot path:
//! every key and pointer event on the desktop goes through [`EventPipeline::process`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use inputhook_core::{
    classify_button, ButtonCode, ClickState, EventKind, KeyData, KeyTranslationTable,
    ModifierMask, MouseData, NativeEvent, RawButtonEvent, RawEvent, RawKeyEvent, RawMotionEvent,
    ScrollType, VirtualKey, WheelData, WHEEL_SCROLL_AMOUNT,
};
use tracing::{trace, warn};

use super::listener::Listener;

/// Per-session translation state.
pub struct EventPipeline {
    keys: Arc<dyn KeyTranslationTable>,
    listener: Arc<dyn Listener>,
    clicks: ClickState,
    failures: Arc<AtomicU64>,
}

impl EventPipeline {
    pub fn new(
        keys: Arc<dyn KeyTranslationTable>,
        listener: Arc<dyn Listener>,
        multi_click: Duration,
    ) -> Self {
        Self {
            keys,
            listener,
            clicks: ClickState::new(multi_click),
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shares the listener failure counter with the caller.
    pub fn with_failure_counter(mut self, failures: Arc<AtomicU64>) -> Self {
        self.failures = failures;
        self
    }

    pub fn clicks(&self) -> &ClickState {
        &self.clicks
    }

    /// Number of listener calls that returned an error or panicked.
    pub fn listener_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Translates one raw record and dispatches the resulting events.
    pub fn process(&mut self, raw: RawEvent) {
        match raw {
            RawEvent::Key(key) => self.on_key(key),
            RawEvent::Button(button) if button.pressed => self.on_button_press(button),
            RawEvent::Button(button) => self.on_button_release(button),
            RawEvent::Motion(motion) => self.on_motion(motion),
        }
    }

    fn on_key(&self, key: RawKeyEvent) {
        let modifiers = ModifierMask::from_x11_state(key.state);
        let raw_code = u32::from(key.keycode);
        let resolved = self.keys.resolve(raw_code, key.state);

        let kind = if key.pressed {
            EventKind::KeyPressed
        } else {
            EventKind::KeyReleased
        };
        self.dispatch(NativeEvent::key(
            kind,
            key.time_ms,
            modifiers,
            KeyData {
                raw_code,
                keycode: resolved.keycode,
                location: resolved.location,
                key_char: None,
            },
        ));

        if !key.pressed {
            return;
        }
        if let Some(ch) = resolved.key_char {
            self.dispatch(NativeEvent::key(
                EventKind::KeyTyped,
                key.time_ms,
                modifiers,
                KeyData {
                    raw_code,
                    keycode: VirtualKey::Undefined,
                    location: resolved.location,
                    key_char: Some(ch),
                },
            ));
        }
    }

    fn on_button_press(&mut self, button: RawButtonEvent) {
        let modifiers = ModifierMask::from_x11_state(button.state);
        match classify_button(button.button) {
            ButtonCode::Button(which) => {
                let click_count = self.clicks.register_press(button.time_ms);
                self.dispatch(NativeEvent::mouse(
                    EventKind::MousePressed,
                    button.time_ms,
                    modifiers,
                    MouseData {
                        button: Some(which),
                        x: button.root_x,
                        y: button.root_y,
                        click_count,
                    },
                ));
            }
            ButtonCode::Wheel(direction) => {
                self.dispatch(NativeEvent::wheel(
                    button.time_ms,
                    modifiers,
                    WheelData {
                        x: button.root_x,
                        y: button.root_y,
                        click_count: self.clicks.click_count(),
                        scroll_type: ScrollType::Unit,
                        scroll_amount: WHEEL_SCROLL_AMOUNT,
                        rotation: direction.rotation(),
                    },
                ));
            }
            ButtonCode::Unrecognized => {
                trace!(code = button.button, "unrecognized button press ignored");
            }
        }
    }

    fn on_button_release(&self, button: RawButtonEvent) {
        // Wheel notches release immediately; only real buttons report releases.
        let ButtonCode::Button(which) = classify_button(button.button) else {
            return;
        };
        let modifiers = ModifierMask::from_x11_state(button.state);
        let data = MouseData {
            button: Some(which),
            x: button.root_x,
            y: button.root_y,
            click_count: self.clicks.click_count(),
        };

        self.dispatch(NativeEvent::mouse(EventKind::MouseReleased, button.time_ms, modifiers, data));
        if !self.clicks.is_dragging() {
            self.dispatch(NativeEvent::mouse(EventKind::MouseClicked, button.time_ms, modifiers, data));
        }
    }

    fn on_motion(&mut self, motion: RawMotionEvent) {
        let modifiers = ModifierMask::from_x11_state(motion.state);
        self.clicks.register_motion(motion.time_ms, modifiers.any_button());

        let kind = if self.clicks.is_dragging() {
            EventKind::MouseDragged
        } else {
            EventKind::MouseMoved
        };
        self.dispatch(NativeEvent::mouse(
            kind,
            motion.time_ms,
            modifiers,
            MouseData {
                button: None,
                x: motion.root_x,
                y: motion.root_y,
                click_count: self.clicks.click_count(),
            },
        ));
    }

    fn dispatch(&self, event: NativeEvent) {
        match panic::catch_unwind(AssertUnwindSafe(|| self.listener.on_event(&event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(kind = ?event.kind, error = %err, "listener returned an error");
            }
            Err(payload) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(kind = ?event.kind, panic = panic_message(payload.as_ref()), "listener panicked");
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use inputhook_core::domain::mask::x11::{BUTTON1_MASK, SHIFT_MASK};
    use inputhook_core::{KeyLocation, MouseButton, StaticKeyTable};

    use super::*;
    use crate::application::listener::ListenerError;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<NativeEvent>>,
    }

    impl Recorder {
        fn kinds(&self) -> Vec<EventKind> {
            self.events.lock().unwrap().iter().map(|e| e.kind).collect()
        }

        fn last(&self) -> NativeEvent {
            *self.events.lock().unwrap().last().expect("at least one event")
        }
    }

    impl Listener for Recorder {
        fn on_event(&self, event: &NativeEvent) -> Result<(), ListenerError> {
            self.events.lock().unwrap().push(*event);
            Ok(())
        }
    }

    fn pipeline() -> (EventPipeline, Arc<Recorder>) {
        let keys = StaticKeyTable::new()
            .with_key(38, VirtualKey::KeyA, KeyLocation::Standard, Some('a'))
            .with_key(50, VirtualKey::ShiftLeft, KeyLocation::Left, None);
        let recorder = Arc::new(Recorder::default());
        let pipeline =
            EventPipeline::new(Arc::new(keys), recorder.clone(), Duration::from_millis(300));
        (pipeline, recorder)
    }

    fn key(pressed: bool, keycode: u8, state: u16) -> RawEvent {
        RawEvent::Key(RawKeyEvent { pressed, keycode, state, root_x: 0, root_y: 0, time_ms: 1 })
    }

    fn button(pressed: bool, code: u8, time_ms: u64) -> RawEvent {
        RawEvent::Button(RawButtonEvent {
            pressed,
            button: code,
            state: 0,
            root_x: 10,
            root_y: 20,
            time_ms,
        })
    }

    fn motion(state: u16, time_ms: u64) -> RawEvent {
        RawEvent::Motion(RawMotionEvent { state, root_x: 5, root_y: 6, time_ms })
    }

    #[test]
    fn test_printable_key_press_emits_pressed_then_typed() {
        // Arrange
        let (mut pipeline, recorder) = pipeline();

        // Act
        pipeline.process(key(true, 38, SHIFT_MASK));

        // Assert
        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events.len(), 2);
        let pressed = events[0].as_key().expect("key payload");
        let typed = events[1].as_key().expect("key payload");
        assert_eq!(events[0].kind, EventKind::KeyPressed);
        assert_eq!(pressed.keycode, VirtualKey::KeyA);
        assert_eq!(pressed.key_char, None);
        assert_eq!(events[1].kind, EventKind::KeyTyped);
        assert_eq!(typed.keycode, VirtualKey::Undefined);
        assert_eq!(typed.key_char, Some('a'));
        assert!(events[1].modifiers.shift());
    }

    #[test]
    fn test_non_printable_key_emits_only_pressed() {
        let (mut pipeline, recorder) = pipeline();
        pipeline.process(key(true, 50, 0));
        assert_eq!(recorder.kinds(), vec![EventKind::KeyPressed]);
    }

    #[test]
    fn test_key_release_emits_released() {
        let (mut pipeline, recorder) = pipeline();
        pipeline.process(key(false, 38, 0));
        assert_eq!(recorder.kinds(), vec![EventKind::KeyReleased]);
        assert_eq!(recorder.last().as_key().map(|k| k.key_char), Some(None));
    }

    #[test]
    fn test_press_release_emits_clicked_with_same_count() {
        // Arrange
        let (mut pipeline, recorder) = pipeline();

        // Act
        pipeline.process(button(true, 1, 0));
        pipeline.process(button(false, 1, 50));

        // Assert
        assert_eq!(
            recorder.kinds(),
            vec![EventKind::MousePressed, EventKind::MouseReleased, EventKind::MouseClicked]
        );
        let clicked = recorder.last();
        assert_eq!(clicked.as_mouse().and_then(|m| m.button), Some(MouseButton::Left));
        assert_eq!(clicked.click_count(), Some(1));
    }

    #[test]
    fn test_quick_second_press_counts_two() {
        let (mut pipeline, recorder) = pipeline();
        pipeline.process(button(true, 1, 0));
        pipeline.process(button(false, 1, 30));
        pipeline.process(button(true, 1, 100));
        assert_eq!(recorder.last().click_count(), Some(2));
    }

    #[test]
    fn test_wheel_emits_one_event_and_leaves_clicks_alone() {
        // Arrange
        let (mut pipeline, recorder) = pipeline();
        pipeline.process(button(true, 1, 0));
        let before = pipeline.clicks().clone();

        // Act
        pipeline.process(button(true, 5, 10));
        pipeline.process(button(false, 5, 11));

        // Assert
        let wheel = recorder.last();
        let data = wheel.as_wheel().expect("wheel payload");
        assert_eq!(wheel.kind, EventKind::MouseWheel);
        assert_eq!(data.rotation, 1);
        assert_eq!(data.scroll_type, ScrollType::Unit);
        assert_eq!(data.scroll_amount, 3);
        assert_eq!(data.click_count, 1);
        assert_eq!(recorder.kinds().len(), 2, "wheel release emits nothing");
        assert_eq!(pipeline.clicks(), &before);
    }

    #[test]
    fn test_unrecognized_button_is_ignored() {
        let (mut pipeline, recorder) = pipeline();
        pipeline.process(button(true, 6, 0));
        pipeline.process(button(false, 6, 1));
        assert!(recorder.kinds().is_empty());
        assert_eq!(pipeline.clicks().click_count(), 0);
    }

    #[test]
    fn test_motion_with_button_held_is_drag_and_suppresses_click() {
        // Arrange
        let (mut pipeline, recorder) = pipeline();
        pipeline.process(button(true, 1, 0));

        // Act
        pipeline.process(motion(BUTTON1_MASK, 10));
        pipeline.process(button(false, 1, 20));

        // Assert
        assert_eq!(
            recorder.kinds(),
            vec![EventKind::MousePressed, EventKind::MouseDragged, EventKind::MouseReleased]
        );
        assert!(pipeline.clicks().is_dragging());
    }

    #[test]
    fn test_motion_without_buttons_is_move() {
        let (mut pipeline, recorder) = pipeline();
        pipeline.process(motion(0, 10));
        let moved = recorder.last();
        assert_eq!(moved.kind, EventKind::MouseMoved);
        assert_eq!(moved.as_mouse().map(|m| (m.x, m.y, m.button)), Some((5, 6, None)));
        assert!(!pipeline.clicks().is_dragging());
    }

    #[test]
    fn test_failing_and_panicking_listeners_are_contained() {
        // Arrange
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let listener = move |event: &NativeEvent| -> Result<(), ListenerError> {
            counter.fetch_add(1, Ordering::SeqCst);
            match event.kind {
                EventKind::KeyPressed => Err(ListenerError::new("rejected")),
                EventKind::KeyTyped => panic!("listener bug"),
                _ => Ok(()),
            }
        };
        let keys = StaticKeyTable::new().with_key(38, VirtualKey::KeyA, KeyLocation::Standard, Some('a'));
        let mut pipeline =
            EventPipeline::new(Arc::new(keys), Arc::new(listener), Duration::from_millis(300));

        // Act
        pipeline.process(key(true, 38, 0));
        pipeline.process(key(false, 38, 0));

        // Assert
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(pipeline.listener_failures(), 2);
    }
}
