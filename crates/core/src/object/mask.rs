//! Fixed-size per-attribute bit masks

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AttributeMask {
    words: Vec<u64>,
    len: usize,
}

impl AttributeMask {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    #[inline]
    pub(crate) fn set(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.words[index / 64] |= 1 << (index % 64);
    }

    #[inline]
    pub(crate) fn test(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        self.words[index / 64] & (1 << (index % 64)) != 0
    }

    pub(crate) fn set_all(&mut self) {
        for (i, word) in self.words.iter_mut().enumerate() {
            let bits = (self.len - i * 64).min(64);
            *word = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        }
    }

    pub(crate) fn reset(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    pub(crate) fn any(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    pub(crate) fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.test(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_reset() {
        let mut mask = AttributeMask::new(70);
        assert!(!mask.any());
        mask.set(3);
        mask.set(65);
        assert!(mask.test(3) && mask.test(65));
        assert!(!mask.test(4));
        assert_eq!(mask.iter_ones().collect::<Vec<_>>(), vec![3, 65]);
        mask.reset();
        assert!(!mask.any());
    }

    #[test]
    fn test_set_all_respects_length() {
        let mut mask = AttributeMask::new(66);
        mask.set_all();
        assert_eq!(mask.iter_ones().count(), 66);

        let mut empty = AttributeMask::new(0);
        empty.set_all();
        assert!(!empty.any());
    }
}
