//! Input normalization for editor fields.
//!
//! Users paste Japanese IME text into numeric and keyword fields;
//! full-width digits, periods and commas are converted before
//! validation so "１．０５" and "1.05" mean the same thing.

/// Convert full-width digits and the full-width period to their ASCII
/// forms, trimming surrounding whitespace.
pub fn to_half_width(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            '．' => '.',
            other => other,
        })
        .collect()
}

/// Normalize a comma-separated keyword field: full-width and
/// ideographic commas become `,`, parts are trimmed, empties dropped,
/// and the result rejoined as `a, b, c`.
pub fn normalize_comma_separated(value: &str) -> String {
    let value = value.replace(['，', '、'], ",");
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sanitize a pose name for use in an image file name: alphanumeric
/// characters (any script), spaces, underscores and hyphens survive.
pub fn sanitize_image_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_width_digits_and_period() {
        assert_eq!(to_half_width("１２３"), "123");
        assert_eq!(to_half_width(" １．０５ "), "1.05");
        assert_eq!(to_half_width("12.5"), "12.5");
    }

    #[test]
    fn test_comma_normalization() {
        assert_eq!(normalize_comma_separated("ミク，Miku、Append"), "ミク, Miku, Append");
        assert_eq!(normalize_comma_separated(" a , , b ,"), "a, b");
        assert_eq!(normalize_comma_separated(""), "");
    }

    #[test]
    fn test_sanitize_image_name() {
        assert_eq!(sanitize_image_name("Standing Pose_01!"), "Standing Pose_01");
        assert_eq!(sanitize_image_name("ポーズ/立ち"), "ポーズ立ち");
        assert_eq!(sanitize_image_name("  a  "), "a");
    }
}
