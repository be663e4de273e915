//! Number format strings as reported by a source

/// Display format attached to a cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NumberFormat {
    /// General format (default)
    #[default]
    General,

    /// Built-in format by ID
    BuiltIn(u32),

    /// Custom format string
    Custom(String),
}

impl NumberFormat {
    /// 14 - mm-dd-yy
    pub const ID_DATE_SHORT: u32 = 14;
    /// 21 - h:mm:ss
    pub const ID_TIME: u32 = 21;
    /// 22 - m/d/yy h:mm
    pub const ID_DATETIME: u32 = 22;
    /// 46 - [h]:mm:ss
    pub const ID_DURATION: u32 = 46;

    /// Create a number format from a format string
    pub fn from_string<S: Into<String>>(format: S) -> Self {
        let format = format.into();
        if format.is_empty() || format.eq_ignore_ascii_case("general") {
            NumberFormat::General
        } else {
            NumberFormat::Custom(format)
        }
    }

    /// Create a built-in format by ID
    pub fn from_id(id: u32) -> Self {
        NumberFormat::BuiltIn(id)
    }

    /// Get the format string
    pub fn format_string(&self) -> &str {
        match self {
            NumberFormat::General => "General",
            NumberFormat::BuiltIn(id) => Self::builtin_format_string(*id),
            NumberFormat::Custom(s) => s,
        }
    }

    fn builtin_format_string(id: u32) -> &'static str {
        match id {
            0 => "General",
            1 => "0",
            2 => "0.00",
            3 => "#,##0",
            4 => "#,##0.00",
            9 => "0%",
            10 => "0.00%",
            11 => "0.00E+00",
            12 => "# ?/?",
            13 => "# ??/??",
            14 => "mm-dd-yy",
            15 => "d-mmm-yy",
            16 => "d-mmm",
            17 => "mmm-yy",
            18 => "h:mm AM/PM",
            19 => "h:mm:ss AM/PM",
            20 => "h:mm",
            21 => "h:mm:ss",
            22 => "m/d/yy h:mm",
            37 => "#,##0 ;(#,##0)",
            38 => "#,##0 ;[Red](#,##0)",
            39 => "#,##0.00;(#,##0.00)",
            40 => "#,##0.00;[Red](#,##0.00)",
            45 => "mm:ss",
            46 => "[h]:mm:ss",
            47 => "mmss.0",
            49 => "@",
            _ => "General",
        }
    }

    /// True if the format string carries a year or day token
    ///
    /// Pure time formats (`h:mm`) and month-only text do not count, and neither
    /// do quoted literals, escaped characters or bracketed sections such as
    /// `[Red]`. The check looks at the format alone, so a date-formatted column
    /// that actually holds plain numbers is still reported as date-like.
    pub fn has_date_token(&self) -> bool {
        if *self == NumberFormat::General {
            return false;
        }
        let mut chars = self.format_string().chars();
        let (mut quoted, mut bracketed) = (false, false);
        while let Some(c) = chars.next() {
            match c {
                '"' => quoted = !quoted,
                '\\' if !quoted => {
                    chars.next();
                }
                '[' if !quoted => bracketed = true,
                ']' if !quoted => bracketed = false,
                'y' | 'Y' | 'd' | 'D' if !quoted && !bracketed => return true,
                _ => {}
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_date_formats() {
        assert!(NumberFormat::from_id(NumberFormat::ID_DATE_SHORT).has_date_token());
        assert!(NumberFormat::from_id(NumberFormat::ID_DATETIME).has_date_token());
        assert!(NumberFormat::from_id(15).has_date_token());
        assert!(!NumberFormat::from_id(20).has_date_token());
        assert!(!NumberFormat::from_id(NumberFormat::ID_TIME).has_date_token());
        assert!(!NumberFormat::from_id(NumberFormat::ID_DURATION).has_date_token());
        assert!(!NumberFormat::from_id(4).has_date_token());
    }

    #[test]
    fn test_custom_formats() {
        assert!(NumberFormat::from_string("yyyy-mm-dd").has_date_token());
        assert!(NumberFormat::from_string("DD/MM/YYYY").has_date_token());
        assert!(!NumberFormat::from_string("#,##0.00").has_date_token());
        assert!(!NumberFormat::from_string("hh:mm:ss").has_date_token());
        assert!(!NumberFormat::from_string("0.0 \"days\"").has_date_token());
        assert!(!NumberFormat::from_string("0\\d").has_date_token());
    }

    #[test]
    fn test_color_sections_are_ignored() {
        assert!(!NumberFormat::from_id(38).has_date_token());
        assert!(!NumberFormat::from_string("[Red]#,##0.00").has_date_token());
        assert!(NumberFormat::from_string("[$-409]d-mmm-yy").has_date_token());
    }

    #[test]
    fn test_general_is_never_a_date() {
        assert_eq!(NumberFormat::from_string("General"), NumberFormat::General);
        assert_eq!(NumberFormat::from_string(""), NumberFormat::General);
        assert!(!NumberFormat::General.has_date_token());
        assert_eq!(NumberFormat::from_id(999).format_string(), "General");
    }
}
