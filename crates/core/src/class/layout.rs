//! Attribute offset placement

/// Attributes smaller than a cache line never straddle one
pub const CACHE_LINE_SIZE: usize = 64;

#[inline]
fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Offset for a new attribute of `size` bytes given the current layout size
///
/// Large values start on a fresh cache line. Small values are aligned and
/// packed after the previous attribute unless that would cross into the next
/// cache line, in which case they move to it.
pub(crate) fn place(storage_size: usize, size: usize, align: usize) -> usize {
    let next_boundary = round_up(storage_size, CACHE_LINE_SIZE);
    if size >= CACHE_LINE_SIZE {
        return next_boundary;
    }

    let packed = round_up(storage_size, align.max(1));
    if packed + size <= next_boundary {
        packed
    } else {
        next_boundary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values_pack() {
        assert_eq!(place(0, 4, 4), 0);
        assert_eq!(place(4, 4, 4), 4);
        assert_eq!(place(5, 8, 8), 8);
        assert_eq!(place(1, 1, 1), 1);
    }

    #[test]
    fn test_no_cache_line_straddle() {
        // 60 + 8 would cross 64
        assert_eq!(place(60, 8, 8), 64);
        assert_eq!(place(60, 4, 4), 60);
    }

    #[test]
    fn test_large_values_start_new_line() {
        assert_eq!(place(4, 128, 8), 64);
        assert_eq!(place(64, 64, 8), 64);
        assert_eq!(place(0, 128, 16), 0);
    }
}
