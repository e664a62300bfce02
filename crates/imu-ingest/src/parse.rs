use crate::{ParseError, TelemetrySample};

/// Start-of-reading marker of the sensor's ASCII output.
pub const START_MARKER: u8 = b'*';

/// Extract `*<roll>,<pitch>,<yaw>` from a raw snapshot.
///
/// Only the rightmost marker is considered; bytes before it may belong to a
/// reading torn by the concurrent copy. Leading garbage and anything after the
/// third number are ignored.
pub fn parse_attitude(snapshot: &[u8]) -> Result<TelemetrySample, ParseError> {
    let star = snapshot
        .iter()
        .rposition(|&b| b == START_MARKER)
        .ok_or(ParseError::MissingMarker)?;
    let mut rest = &snapshot[star + 1..];
    let mut values = [0f32; 3];

    for (field, slot) in values.iter_mut().enumerate() {
        if field > 0 {
            match rest.split_first() {
                Some((b',', tail)) => rest = tail,
                _ => return Err(ParseError::Incomplete { fields: field }),
            }
        }
        if matches!(rest.first(), None | Some(0)) {
            return Err(ParseError::Incomplete { fields: field });
        }
        let (value, used) = scan_float(rest).ok_or(ParseError::Malformed { field })?;
        *slot = value;
        rest = &rest[used..];
    }

    Ok(TelemetrySample::new(values[0], values[1], values[2]))
}

/// Longest decimal number at the start of `bytes`, scanf style: optional
/// leading whitespace, sign, digits with an optional fraction, optional exponent.
fn scan_float(bytes: &[u8]) -> Option<(f32, usize)> {
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut i = 0;
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    let start = i;
    if matches!(bytes.get(i), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_end = digits_from(i);
    let mut digits = int_end - i;
    i = int_end;
    if bytes.get(i) == Some(&b'.') {
        let frac_end = digits_from(i + 1);
        digits += frac_end - (i + 1);
        i = frac_end;
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_end = digits_from(j);
        if exp_end > j {
            i = exp_end;
        }
    }

    let text = core::str::from_utf8(&bytes[start..i]).ok()?;
    let value: f32 = text.parse().ok()?;
    value.is_finite().then_some((value, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_before_and_after() {
        let s = parse_attitude(b"junk*10.5,-5.2,120.0trail");
        assert_eq!(s, Ok(TelemetrySample::new(10.5, -5.2, 120.0)));
    }

    #[test]
    fn test_missing_marker() {
        assert_eq!(
            parse_attitude(b"10.5,-5.2,120.0\r\n"),
            Err(ParseError::MissingMarker)
        );
    }

    #[test]
    fn test_two_fields_is_incomplete() {
        assert_eq!(
            parse_attitude(b"*1.0,2.0"),
            Err(ParseError::Incomplete { fields: 2 })
        );
        assert_eq!(
            parse_attitude(b"*1.0,2.0\r\n\0\0\0"),
            Err(ParseError::Incomplete { fields: 2 })
        );
    }

    #[test]
    fn test_last_marker_wins() {
        let s = parse_attitude(b"*1.0,2.0,3.0\r\n*4.0,5.0,6.0\r\n");
        assert_eq!(s, Ok(TelemetrySample::new(4.0, 5.0, 6.0)));
    }

    #[test]
    fn test_torn_last_reading_is_not_replaced_by_earlier_one() {
        let s = parse_attitude(b"*1.0,2.0,3.0\r\n*4.0,5");
        assert_eq!(s, Err(ParseError::Incomplete { fields: 2 }));
    }

    #[test]
    fn test_malformed_field() {
        assert_eq!(
            parse_attitude(b"*1.0,abc,3.0"),
            Err(ParseError::Malformed { field: 1 })
        );
        assert_eq!(
            parse_attitude(b"*-,2,3"),
            Err(ParseError::Malformed { field: 0 })
        );
        assert_eq!(
            parse_attitude(b"*1,2,1e39"),
            Err(ParseError::Malformed { field: 2 })
        );
    }

    #[test]
    fn test_number_forms() {
        let s = parse_attitude(b"* +1.,-.5, 2e1\r\n");
        assert_eq!(s, Ok(TelemetrySample::new(1.0, -0.5, 20.0)));
        // A dangling exponent marker is not part of the number.
        let s = parse_attitude(b"*1,2,3e");
        assert_eq!(s, Ok(TelemetrySample::new(1.0, 2.0, 3.0)));
    }
}
