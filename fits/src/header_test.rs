#[cfg(test)]
mod tests {
    use crate::header::{Card, Header, Value};
    use crate::{BLOCK_SIZE, CARD_SIZE};
    use anyhow::Result;
    use std::io::Cursor;

    fn record(text: &str) -> Vec<u8> {
        format!("{:<80}", text).into_bytes()
    }

    #[test]
    fn parses_integer_logical_and_float_values() -> Result<()> {
        let card = Card::parse(&record("NAXIS1  =                 4096 / length of data axis 1"))?;
        assert_eq!(card.keyword, "NAXIS1");
        assert_eq!(card.value, Some(Value::Int(4096)));
        assert_eq!(card.comment.as_deref(), Some("length of data axis 1"));

        let card = Card::parse(&record("SIMPLE  =                    T"))?;
        assert_eq!(card.value, Some(Value::Logical(true)));

        let card = Card::parse(&record("EXPTIME =           2.000165D0"))?;
        assert_eq!(card.value, Some(Value::Float(2.000165)));
        Ok(())
    }

    #[test]
    fn parses_quoted_strings_with_escapes() -> Result<()> {
        let card = Card::parse(&record("ORIGIN  = 'O''Brien '           / who"))?;
        assert_eq!(card.value, Some(Value::Str("O'Brien".into())));
        assert_eq!(card.comment.as_deref(), Some("who"));
        Ok(())
    }

    #[test]
    fn commentary_cards_have_no_value() -> Result<()> {
        let card = Card::parse(&record("HISTORY written by a test"))?;
        assert_eq!(card.keyword, "HISTORY");
        assert!(card.value.is_none());
        assert_eq!(card.comment.as_deref(), Some("written by a test"));
        Ok(())
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Card::parse(&record("OBJECT  = 'never closed")).unwrap_err();
        assert!(format!("{:#}", err).contains("unterminated"));
    }

    #[test]
    fn records_are_fixed_width() {
        let card = Card::new("ZCMPTYPE", Value::Str("RICE_1".into())).with_comment("compression");
        let text = card.to_record();
        assert_eq!(text.len(), CARD_SIZE);
        assert!(text.starts_with("ZCMPTYPE= 'RICE_1  ' / compression"));

        let text = Card::new("BITPIX", Value::Int(-64)).to_record();
        assert_eq!(&text[..30], "BITPIX  =                  -64");
    }

    #[test]
    fn header_bytes_round_trip_through_reader() -> Result<()> {
        let mut header = Header::new();
        header.set("SIMPLE", Value::Logical(true));
        header.set("BITPIX", Value::Int(16));
        header.set("NAXIS", Value::Int(2));
        header.set("NAXIS1", Value::Int(300));
        header.set("NAXIS2", Value::Int(200));
        header.set("BSCALE", Value::Float(0.5));
        header.set("TELESCOP", Value::Str("SDO/AIA".into()));

        let bytes = header.to_bytes();
        assert_eq!(bytes.len() % BLOCK_SIZE, 0);

        let (parsed, consumed) = Header::read_from(&mut Cursor::new(&bytes))?.expect("header present");
        assert_eq!(consumed, bytes.len() as u64);
        assert_eq!(parsed, header);
        assert_eq!(parsed.axes("NAXIS")?, vec![200, 300]);
        assert_eq!(parsed.get_float("BSCALE"), Some(0.5));
        assert_eq!(parsed.get_str("TELESCOP"), Some("SDO/AIA"));
        Ok(())
    }

    #[test]
    fn set_replaces_existing_keyword() {
        let mut header = Header::new();
        header.set("NAXIS", Value::Int(2));
        header.set("naxis", Value::Int(3));
        assert_eq!(header.len(), 1);
        assert_eq!(header.get_int("NAXIS"), Some(3));
    }

    #[test]
    fn empty_stream_has_no_header() -> Result<()> {
        assert!(Header::read_from(&mut Cursor::new(Vec::<u8>::new()))?.is_none());
        Ok(())
    }

    #[test]
    fn header_without_end_is_truncated() {
        let mut bytes = record("SIMPLE  =                    T");
        bytes.resize(BLOCK_SIZE, b' ');
        let err = Header::read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert!(err.to_string().contains("unexpected end of file"));
    }
}
