#[cfg(test)]
mod tests {
    use crate::array::{Array, ArrayData, Dtype};
    use anyhow::Result;

    fn ramp(rows: usize, cols: usize) -> Array {
        let data = ArrayData::I32((0..(rows * cols) as i32).collect());
        Array::new(vec![rows, cols], data).expect("valid ramp")
    }

    #[test]
    fn dtype_names_and_bitpix_agree() -> Result<()> {
        for dtype in [Dtype::U8, Dtype::I16, Dtype::I32, Dtype::I64, Dtype::F32, Dtype::F64] {
            assert_eq!(Dtype::from_bitpix(dtype.bitpix())?, dtype);
            assert_eq!(dtype.name().parse::<Dtype>()?, dtype);
        }
        assert_eq!("f64".parse::<Dtype>()?, Dtype::F64);
        assert!("complex64".parse::<Dtype>().is_err());
        Ok(())
    }

    #[test]
    fn new_rejects_mismatched_length() {
        let err = Array::new(vec![2, 3], ArrayData::U8(vec![0; 5])).unwrap_err();
        assert!(err.to_string().contains("needs 6 elements"));
    }

    #[test]
    fn big_endian_decoding() -> Result<()> {
        let data = ArrayData::from_be_bytes(Dtype::I16, &[0x01, 0x02, 0xff, 0xfe])?;
        assert_eq!(data, ArrayData::I16(vec![0x0102, -2]));
        assert_eq!(data.to_be_bytes(), vec![0x01, 0x02, 0xff, 0xfe]);
        assert!(ArrayData::from_be_bytes(Dtype::F64, &[0; 7]).is_err());
        Ok(())
    }

    #[test]
    fn section_copies_sub_rectangle() -> Result<()> {
        let array = ramp(4, 5);
        let section = array.section(&[1..3, 2..5])?;
        assert_eq!(section.shape(), &[2, 3]);
        assert_eq!(section.data(), &ArrayData::I32(vec![7, 8, 9, 12, 13, 14]));
        Ok(())
    }

    #[test]
    fn section_rejects_out_of_bounds_ranges() {
        let array = ramp(4, 5);
        assert!(array.section(&[0..5, 0..1]).is_err());
        assert!(array.section(&[0..1]).is_err());
    }

    #[test]
    fn cast_and_indexing() {
        let array = ramp(2, 2).cast(Dtype::F32);
        assert_eq!(array.dtype(), Dtype::F32);
        assert_eq!(array.get_f64(&[1, 1]), Some(3.0));
        assert_eq!(array.get_f64(&[2, 0]), None);
    }
}
