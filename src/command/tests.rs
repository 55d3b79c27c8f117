//! Unit and property tests for the command buffer.

use super::*;
use proptest::prelude::*;

#[test]
fn test_fresh_buffer_is_clean() {
    let mut buffer = CommandBuffer::new();
    assert!(!buffer.is_dirty());
    assert!(buffer.drain().is_empty());
}

#[test]
fn test_drain_clears_only_what_was_set() {
    let mut buffer = CommandBuffer::new();
    buffer.set_rect(Rect::new(10, 20, 400, 300));
    buffer.request_focus();

    let pending = buffer.drain();
    assert_eq!(pending.rect, Some(Rect::new(10, 20, 400, 300)));
    assert!(pending.focus);
    assert_eq!(pending.title, None);
    assert_eq!(pending.style, None);
    assert_eq!(pending.texture, None);
    assert_eq!(pending.field_count(), 2);

    assert!(!buffer.is_dirty());
    assert!(buffer.drain().is_empty());
}

#[test]
fn test_settings_mark_rect_title_and_style() {
    let mut buffer = CommandBuffer::new();
    let style = WindowStyle {
        borderless: true,
        transparent: true,
        ..WindowStyle::default()
    };
    buffer.apply_settings(WindowSettings {
        rect: Rect::new(1, 2, 3, 4),
        title: Title::new("Hi"),
        style,
    });

    let pending = buffer.drain();
    assert_eq!(pending.rect, Some(Rect::new(1, 2, 3, 4)));
    assert_eq!(pending.title.as_ref().map(Title::as_str), Some("Hi"));
    assert_eq!(pending.style, Some(style));
    assert!(!pending.focus);
}

#[test]
fn test_texture_last_write_wins() {
    let mut buffer = CommandBuffer::new();
    buffer.set_texture(TextureRef::from_raw(0x1000));
    buffer.set_texture(TextureRef::from_raw(0x2000));
    buffer.set_texture(TextureRef::from_raw(0x3000));

    assert_eq!(buffer.drain().texture, Some(TextureRef::from_raw(0x3000)));
}

#[test]
fn test_null_texture_is_still_a_change() {
    let mut buffer = CommandBuffer::new();
    buffer.set_texture(TextureRef::NONE);

    let pending = buffer.drain();
    assert_eq!(pending.texture, Some(TextureRef::NONE));
    assert_eq!(pending.texture.and_then(TextureRef::non_null), None);
}

#[test]
fn test_title_truncated_to_limit() {
    let long = "x".repeat(MAX_TITLE_LEN * 3);
    let title = Title::new(&long);
    assert_eq!(title.len(), MAX_TITLE_LEN);
}

#[test]
fn test_title_truncation_respects_char_boundaries() {
    // 'é' is two bytes, so 1023 bytes falls in the middle of a char
    let long = "é".repeat(600);
    let title = Title::new(&long);
    assert!(title.len() <= MAX_TITLE_LEN);
    assert_eq!(title.len(), 1022);
    assert!(title.as_str().chars().all(|c| c == 'é'));
}

#[test]
fn test_title_drops_interior_nul() {
    let title = Title::new("ab\0cd");
    assert_eq!(title.as_str(), "abcd");
}

#[test]
fn test_default_style_matches_native_defaults() {
    let style = WindowStyle::default();
    assert!(!style.borderless);
    assert!(!style.transparent);
    assert!(style.resizable);
    assert!(style.has_min_button);
    assert!(style.has_max_button);
}

#[derive(Debug, Clone)]
enum Op {
    Rect(Rect),
    Title(String),
    Style(WindowStyle),
    Focus,
    Texture(usize),
    Drain,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let rect = (any::<i32>(), any::<i32>(), any::<i32>(), any::<i32>())
        .prop_map(|(x, y, w, h)| Op::Rect(Rect::new(x, y, w, h)));
    let style = (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>())
        .prop_map(|(b, t, r, min, max)| {
            Op::Style(WindowStyle {
                borderless: b,
                transparent: t,
                resizable: r,
                has_min_button: min,
                has_max_button: max,
            })
        });
    prop_oneof![
        rect,
        ".{0,40}".prop_map(Op::Title),
        style,
        Just(Op::Focus),
        any::<usize>().prop_map(Op::Texture),
        Just(Op::Drain),
    ]
}

proptest! {
    #[test]
    fn prop_drain_yields_last_write_since_previous_drain(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let mut buffer = CommandBuffer::new();
        let mut expected = PendingCommands::default();

        for op in ops {
            match op {
                Op::Rect(rect) => {
                    buffer.set_rect(rect);
                    expected.rect = Some(rect);
                }
                Op::Title(text) => {
                    buffer.set_title(Title::new(&text));
                    expected.title = Some(Title::new(&text));
                }
                Op::Style(style) => {
                    buffer.set_style(style);
                    expected.style = Some(style);
                }
                Op::Focus => {
                    buffer.request_focus();
                    expected.focus = true;
                }
                Op::Texture(raw) => {
                    buffer.set_texture(TextureRef::from_raw(raw));
                    expected.texture = Some(TextureRef::from_raw(raw));
                }
                Op::Drain => {
                    let drained = buffer.drain();
                    prop_assert_eq!(&drained, &expected);
                    expected = PendingCommands::default();
                    // A second drain sees nothing: each write is applied at most once.
                    prop_assert!(buffer.drain().is_empty());
                }
            }
        }

        prop_assert_eq!(buffer.drain(), expected);
    }

    #[test]
    fn prop_title_never_exceeds_limit(text in ".{0,2048}") {
        let title = Title::new(&text);
        prop_assert!(title.len() <= MAX_TITLE_LEN);
        prop_assert!(text.replace('\0', "").starts_with(title.as_str()));
    }
}
