//! Generational arena backing the opaque handles given to the host.
//!
//! A handle is a slot index plus the slot's generation at insertion time.
//! Removing a value bumps the generation, so a handle that outlived its
//! window no longer resolves instead of pointing at whatever reused the slot.
//!
//! Across the C ABI a handle travels as a pointer-sized integer. On 64-bit
//! targets that is the full raw value; 32-bit targets pack a 16-bit index and
//! a 16-bit generation, and generations wrap early so they always fit.

use std::fmt;

/// Opaque sub-window handle. Packs into a non-zero `u64`; raw 0 is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle {
    index: u32,
    generation: u32,
}

impl WindowHandle {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    pub fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    /// Decodes a raw handle; `None` for the null handle.
    pub fn from_raw(raw: u64) -> Option<Self> {
        let generation = (raw >> 32) as u32;
        if generation == 0 {
            return None;
        }
        Some(Self {
            index: raw as u32,
            generation,
        })
    }
}

#[cfg(target_pointer_width = "64")]
impl WindowHandle {
    /// Pointer-sized encoding; `None` if the handle cannot be represented.
    pub fn to_bits(self) -> Option<usize> {
        usize::try_from(self.to_raw()).ok()
    }

    pub fn from_bits(bits: usize) -> Option<Self> {
        Self::from_raw(bits as u64)
    }
}

#[cfg(target_pointer_width = "32")]
impl WindowHandle {
    /// Pointer-sized encoding; `None` past 65535 simultaneous slots.
    pub fn to_bits(self) -> Option<usize> {
        let index = u16::try_from(self.index).ok()?;
        let generation = u16::try_from(self.generation).ok()?;
        Some((usize::from(generation) << 16) | usize::from(index))
    }

    pub fn from_bits(bits: usize) -> Option<Self> {
        let generation = (bits >> 16) as u32;
        if generation == 0 {
            return None;
        }
        Some(Self {
            index: (bits & 0xFFFF) as u32,
            generation,
        })
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slab of values addressed by [`WindowHandle`].
#[derive(Debug)]
pub struct HandleArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for HandleArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleArena<T> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, value: T) -> WindowHandle {
        self.insert_with(|_| value)
    }

    /// Inserts a value that needs to know its own handle.
    pub fn insert_with(&mut self, build: impl FnOnce(WindowHandle) -> T) -> WindowHandle {
        let handle = match self.free.pop() {
            Some(index) => WindowHandle {
                index,
                generation: self.slots[index as usize].generation,
            },
            None => {
                self.slots.push(Slot {
                    generation: 1,
                    value: None,
                });
                WindowHandle {
                    index: (self.slots.len() - 1) as u32,
                    generation: 1,
                }
            }
        };
        self.slots[handle.index as usize].value = Some(build(handle));
        self.len += 1;
        handle
    }

    pub fn get(&self, handle: WindowHandle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    #[cfg(test)]
    fn contains(&self, handle: WindowHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn remove(&mut self, handle: WindowHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = next_generation(slot.generation);
        self.free.push(handle.index);
        self.len -= 1;
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (WindowHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    WindowHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    /// Removes every value, invalidating all outstanding handles.
    pub fn drain(&mut self) -> Vec<(WindowHandle, T)> {
        let handles: Vec<WindowHandle> = self.iter().map(|(handle, _)| handle).collect();
        handles
            .into_iter()
            .filter_map(|handle| self.remove(handle).map(|value| (handle, value)))
            .collect()
    }
}

#[cfg(target_pointer_width = "32")]
const MAX_GENERATION: u32 = u16::MAX as u32;
#[cfg(not(target_pointer_width = "32"))]
const MAX_GENERATION: u32 = u32::MAX;

// Generation 0 is reserved for the null handle.
fn next_generation(generation: u32) -> u32 {
    if generation >= MAX_GENERATION {
        1
    } else {
        generation + 1
    }
}
