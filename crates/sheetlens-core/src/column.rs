//! Column letter codec
//!
//! Column letters are a bijective base-26 numeral: `A`=1 through `Z`=26, then
//! `AA`=27. There is no digit for zero, so converting back from an index has to
//! subtract one before every division.

use crate::error::{Error, Result};

/// Convert column letters to a 0-based index (A = 0, Z = 25, AA = 26, etc.)
///
/// Letters are case-insensitive.
///
/// # Examples
/// ```
/// use sheetlens_core::column::letter_to_index;
///
/// assert_eq!(letter_to_index("A").unwrap(), 0);
/// assert_eq!(letter_to_index("aa").unwrap(), 26);
/// ```
pub fn letter_to_index(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::InvalidAddress("empty column letters".into()));
    }

    let mut col: u64 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::InvalidAddress(format!(
                "invalid column letter '{}'",
                c
            )));
        }
        col = col * 26 + (c.to_ascii_uppercase() as u64 - 'A' as u64 + 1);
        if col > u32::MAX as u64 + 1 {
            return Err(Error::InvalidAddress(format!(
                "column '{}' is too large",
                letters
            )));
        }
    }

    Ok((col - 1) as u32)
}

/// Convert a 0-based column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
pub fn index_to_letter(index: u32) -> String {
    let mut result = Vec::new();
    let mut n = index as u64 + 1;

    while n > 0 {
        n -= 1;
        result.push((n % 26) as u8 + b'A');
        n /= 26;
    }

    result.reverse();
    // Only ASCII uppercase bytes were pushed
    String::from_utf8(result).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_index_to_letter() {
        assert_eq!(index_to_letter(0), "A");
        assert_eq!(index_to_letter(1), "B");
        assert_eq!(index_to_letter(25), "Z");
        assert_eq!(index_to_letter(26), "AA");
        assert_eq!(index_to_letter(27), "AB");
        assert_eq!(index_to_letter(51), "AZ");
        assert_eq!(index_to_letter(701), "ZZ");
        assert_eq!(index_to_letter(702), "AAA");
        assert_eq!(index_to_letter(16383), "XFD");
    }

    #[test]
    fn test_letter_to_index() {
        assert_eq!(letter_to_index("A").unwrap(), 0);
        assert_eq!(letter_to_index("Z").unwrap(), 25);
        assert_eq!(letter_to_index("AA").unwrap(), 26);
        assert_eq!(letter_to_index("AZ").unwrap(), 51);
        assert_eq!(letter_to_index("ZZ").unwrap(), 701);
        assert_eq!(letter_to_index("AAA").unwrap(), 702);
        assert_eq!(letter_to_index("XFD").unwrap(), 16383);
        assert_eq!(letter_to_index("ZZZ").unwrap(), 18277);

        // Case insensitive
        assert_eq!(letter_to_index("a").unwrap(), 0);
        assert_eq!(letter_to_index("xfd").unwrap(), 16383);
    }

    #[test]
    fn test_letter_to_index_errors() {
        assert!(letter_to_index("").is_err());
        assert!(letter_to_index("A1").is_err());
        assert!(letter_to_index("Ä").is_err());
        assert!(letter_to_index("ZZZZZZZZ").is_err());
    }

    #[test]
    fn test_roundtrip_first_ten_thousand() {
        for i in 0..10_000 {
            assert_eq!(letter_to_index(&index_to_letter(i)).unwrap(), i);
        }
    }


    proptest! {
        #[test]
        fn prop_roundtrip_index(i in 0u32..5_000_000) {
            prop_assert_eq!(letter_to_index(&index_to_letter(i)).unwrap(), i);
        }

        #[test]
        fn prop_lowercase_matches_uppercase(s in "[A-Z]{1,4}") {
            prop_assert_eq!(
                letter_to_index(&s.to_lowercase()).unwrap(),
                letter_to_index(&s).unwrap()
            );
        }

        #[test]
        fn prop_roundtrip_letters(s in "[A-Z]{1,4}") {
            prop_assert_eq!(index_to_letter(letter_to_index(&s).unwrap()), s);
        }
    }
}
