//! Bit-field extraction over packed container values.
//!
//! A field occupies the inclusive bit range `start_bit..=end_bit` of one
//! container slot. Bit ranges come from the host catalog and are assumed
//! valid (`start_bit <= end_bit <= 31`).

use crate::host::FieldDescriptor;

/// Mask covering the low `width` bits.
pub fn mask(width: u32) -> u32 {
    if width >= u32::BITS {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// Extract a field value from a single container value.
pub fn extract_value(container: i32, start_bit: u8, end_bit: u8) -> i32 {
    let width = u32::from(end_bit.saturating_sub(start_bit)) + 1;
    let shifted = (container as u32).checked_shr(u32::from(start_bit)).unwrap_or(0);
    (shifted & mask(width)) as i32
}

/// Extract the field described by `descriptor` from a container array.
///
/// A container key past the end of the array reads as zero.
pub fn extract(array: &[i32], descriptor: &FieldDescriptor) -> i32 {
    let container = array
        .get(descriptor.container_key as usize)
        .copied()
        .unwrap_or(0);
    extract_value(container, descriptor.start_bit, descriptor.end_bit)
}

/// Write `value` into the field described by `descriptor`, leaving the
/// other bits of the container untouched. Bits of `value` wider than the
/// field are dropped.
pub fn insert(array: &mut [i32], descriptor: &FieldDescriptor, value: i32) {
    let Some(slot) = array.get_mut(descriptor.container_key as usize) else {
        return;
    };
    let width = u32::from(descriptor.end_bit.saturating_sub(descriptor.start_bit)) + 1;
    let shift = u32::from(descriptor.start_bit);
    let field_mask = mask(width).checked_shl(shift).unwrap_or(0);
    let bits = (value as u32).checked_shl(shift).unwrap_or(0) & field_mask;
    *slot = ((*slot as u32 & !field_mask) | bits) as i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(container_key: u32, start_bit: u8, end_bit: u8) -> FieldDescriptor {
        FieldDescriptor {
            id: 1,
            container_key,
            start_bit,
            end_bit,
        }
    }

    #[test]
    fn test_mask_widths() {
        assert_eq!(mask(1), 0b1);
        assert_eq!(mask(4), 0b1111);
        assert_eq!(mask(31), 0x7fff_ffff);
        assert_eq!(mask(32), u32::MAX);
    }

    #[test]
    fn test_extract_matches_shift_and_mask() {
        let values = [0, 1, 0x15, 0x7fff_ffff, -1, i32::MIN, 0x1234_5678];
        let ranges = [(0u8, 0u8), (0, 3), (4, 7), (3, 17), (16, 31), (31, 31), (0, 31)];

        for &v in &values {
            for &(s, e) in &ranges {
                let expected = ((v as u32) >> s) & mask(u32::from(e - s) + 1);
                assert_eq!(
                    extract_value(v, s, e),
                    expected as i32,
                    "value {v:#x} bits {s}..={e}"
                );
            }
        }
    }

    #[test]
    fn test_extract_packed_nibbles() {
        let array = [0x15];
        assert_eq!(extract(&array, &field(0, 0, 3)), 5);
        assert_eq!(extract(&array, &field(0, 4, 7)), 1);
    }

    #[test]
    fn test_extract_out_of_range_container_reads_zero() {
        let array = [0x15];
        assert_eq!(extract(&array, &field(4, 0, 3)), 0);
    }

    #[test]
    fn test_insert_preserves_neighbours() {
        let mut array = [0x15, 7];
        insert(&mut array, &field(0, 4, 7), 0xa);
        assert_eq!(array[0], 0xa5);
        assert_eq!(array[1], 7);

        insert(&mut array, &field(0, 0, 3), 0x1f);
        assert_eq!(array[0], 0xaf);
        assert_eq!(extract(&array, &field(0, 4, 7)), 0xa);
    }

    #[test]
    fn test_insert_high_bit() {
        let mut array = [0];
        insert(&mut array, &field(0, 31, 31), 1);
        assert_eq!(array[0], i32::MIN);
        assert_eq!(extract(&array, &field(0, 31, 31)), 1);
    }
}
