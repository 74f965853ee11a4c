//! Dirty Bits
//!
//! Every component context slot that changed since the last update is
//! recorded as one bit. Slots are packed 32 to a word; almost every component
//! fits in the first word, so the words live inline in a `SmallVec`.
//!
//! A component whose bits are [`DirtyBits::Clean`] is not in the dirty queue.
//! Moving from `Clean` to `Dirty` is what enqueues it, which is how repeated
//! scheduling within one batch collapses into a single update.

use smallvec::{smallvec, SmallVec};

const WORD_BITS: usize = 32;

/// Changed-slot set for one component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DirtyBits {
    /// Nothing pending; the component is not scheduled.
    #[default]
    Clean,

    /// Scheduled, with the set of slots that changed. An all-zero set means
    /// the component was scheduled without naming a slot.
    Dirty(SmallVec<[u32; 1]>),
}

impl DirtyBits {
    /// Bits with every one of `slots` slots marked, used for a first render.
    pub fn all(slots: usize) -> Self {
        if slots == 0 {
            return DirtyBits::Dirty(smallvec![0]);
        }
        let words = slots.div_ceil(WORD_BITS);
        let mut bits: SmallVec<[u32; 1]> = smallvec![u32::MAX; words];
        let tail = slots % WORD_BITS;
        if tail != 0 {
            if let Some(last) = bits.last_mut() {
                *last = (1u32 << tail) - 1;
            }
        }
        DirtyBits::Dirty(bits)
    }

    /// Whether nothing is pending.
    pub fn is_clean(&self) -> bool {
        matches!(self, DirtyBits::Clean)
    }

    /// Move to `Dirty` without marking a slot.
    ///
    /// Returns `true` if the bits were clean, i.e. the owner still has to be
    /// added to the dirty queue.
    pub fn mark_scheduled(&mut self) -> bool {
        if self.is_clean() {
            *self = DirtyBits::Dirty(smallvec![0]);
            true
        } else {
            false
        }
    }

    /// Mark `slot` as changed.
    ///
    /// Returns `true` if the bits were clean before the call.
    pub fn mark(&mut self, slot: usize) -> bool {
        let newly = self.mark_scheduled();
        if let DirtyBits::Dirty(words) = self {
            let word = slot / WORD_BITS;
            if words.len() <= word {
                words.resize(word + 1, 0);
            }
            words[word] |= 1 << (slot % WORD_BITS);
        }
        newly
    }

    /// Whether `slot` is marked.
    pub fn contains(&self, slot: usize) -> bool {
        match self {
            DirtyBits::Clean => false,
            DirtyBits::Dirty(words) => words
                .get(slot / WORD_BITS)
                .is_some_and(|word| word & (1 << (slot % WORD_BITS)) != 0),
        }
    }

    /// Raw words, empty when clean.
    pub fn words(&self) -> &[u32] {
        match self {
            DirtyBits::Clean => &[],
            DirtyBits::Dirty(words) => words,
        }
    }

    /// Take the current bits, leaving `Clean` behind.
    pub fn take(&mut self) -> DirtyBits {
        std::mem::take(self)
    }
}
