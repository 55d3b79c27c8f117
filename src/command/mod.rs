//! Pending window changes queued by the host for the render thread.
//!
//! Every field is paired with a dirty flag. Host-side setters write the value
//! and raise the flag under the context lock; the render thread drains the
//! raised fields in one critical section and applies them afterwards. Fields
//! are independent: each one is last-write-wins and is never observed half
//! written.

use std::fmt;

/// Longest title accepted, in bytes (the native buffers hold 1024 with a NUL).
pub const MAX_TITLE_LEN: usize = 1023;

/// Window rectangle in screen pixels. `width`/`height` describe the client area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Window title bounded to [`MAX_TITLE_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Title(String);

impl Title {
    /// Builds a title, truncating on a char boundary and dropping interior NULs.
    pub fn new(text: &str) -> Self {
        let mut title: String = text.chars().filter(|c| *c != '\0').collect();
        if title.len() > MAX_TITLE_LEN {
            let mut end = MAX_TITLE_LEN;
            while !title.is_char_boundary(end) {
                end -= 1;
            }
            title.truncate(end);
        }
        Self(title)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Title {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Frame and transparency flags of a sub-window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStyle {
    pub borderless: bool,
    pub transparent: bool,
    pub resizable: bool,
    pub has_min_button: bool,
    pub has_max_button: bool,
}

impl Default for WindowStyle {
    fn default() -> Self {
        Self {
            borderless: false,
            transparent: false,
            resizable: true,
            has_min_button: true,
            has_max_button: true,
        }
    }
}

/// Non-owning reference to a texture living on the host's graphics device.
///
/// For D3D11 this is an `ID3D11Texture2D*`, for OpenGL a texture name widened
/// to pointer size. Zero means "no texture".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureRef(usize);

impl TextureRef {
    pub const NONE: TextureRef = TextureRef(0);

    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> usize {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// `None` for the null reference.
    pub fn non_null(self) -> Option<TextureRef> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

/// Combined rectangle/title/style update (the `SetConfig` payload).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowSettings {
    pub rect: Rect,
    pub title: Title,
    pub style: WindowStyle,
}

/// One value and the flag telling the consumer it changed.
#[derive(Debug, Clone, Default)]
pub struct Dirty<T> {
    value: T,
    dirty: bool,
}

impl<T: Clone> Dirty<T> {
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Latest value, dirty or not.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Copies the value out and lowers the flag, if it was raised.
    pub fn take(&mut self) -> Option<T> {
        if self.dirty {
            self.dirty = false;
            Some(self.value.clone())
        } else {
            None
        }
    }
}

/// The dirty fields captured by one [`CommandBuffer::drain`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingCommands {
    pub rect: Option<Rect>,
    pub title: Option<Title>,
    pub style: Option<WindowStyle>,
    pub focus: bool,
    pub texture: Option<TextureRef>,
}

impl PendingCommands {
    pub fn is_empty(&self) -> bool {
        self.rect.is_none()
            && self.title.is_none()
            && self.style.is_none()
            && !self.focus
            && self.texture.is_none()
    }

    /// Number of fields carried, used for frame statistics.
    pub fn field_count(&self) -> usize {
        usize::from(self.rect.is_some())
            + usize::from(self.title.is_some())
            + usize::from(self.style.is_some())
            + usize::from(self.focus)
            + usize::from(self.texture.is_some())
    }
}

/// Per-window command buffer; always accessed under the context lock.
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    rect: Dirty<Rect>,
    title: Dirty<Title>,
    style: Dirty<WindowStyle>,
    focus: Dirty<bool>,
    texture: Dirty<TextureRef>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.rect.set(rect);
    }

    pub fn set_title(&mut self, title: Title) {
        self.title.set(title);
    }

    pub fn set_style(&mut self, style: WindowStyle) {
        self.style.set(style);
    }

    pub fn request_focus(&mut self) {
        self.focus.set(true);
    }

    pub fn set_texture(&mut self, texture: TextureRef) {
        self.texture.set(texture);
    }

    /// Queues rectangle, title and style together.
    pub fn apply_settings(&mut self, settings: WindowSettings) {
        self.rect.set(settings.rect);
        self.title.set(settings.title);
        self.style.set(settings.style);
    }

    pub fn is_dirty(&self) -> bool {
        self.rect.is_dirty()
            || self.title.is_dirty()
            || self.style.is_dirty()
            || self.focus.is_dirty()
            || self.texture.is_dirty()
    }

    /// Moves every dirty field into a snapshot and clears its flag.
    pub fn drain(&mut self) -> PendingCommands {
        PendingCommands {
            rect: self.rect.take(),
            title: self.title.take(),
            style: self.style.take(),
            focus: self.focus.take().unwrap_or(false),
            texture: self.texture.take(),
        }
    }
}

#[cfg(test)]
mod tests;
