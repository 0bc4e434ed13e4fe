use crate::handlers::NameOptions;

/// Shorten `name` to `opts.max_length` characters, ellipsis included.
pub fn truncate_name(name: &str, opts: &NameOptions) -> String {
    let len = name.chars().count();
    if len <= opts.max_length {
        return name.to_string();
    }

    let ellipsis_len = opts.ellipsis.chars().count();
    // no room for the ellipsis: plain cut
    if opts.max_length <= ellipsis_len {
        return name.chars().take(opts.max_length).collect();
    }

    let mut out: String = name.chars().take(opts.max_length - ellipsis_len).collect();
    out.push_str(&opts.ellipsis);
    out
}

/// Render a number without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_names_unchanged() {
        assert_eq!(truncate_name("Sex", &NameOptions::default()), "Sex");
    }

    #[test]
    fn test_long_names_truncated_to_limit() {
        let opts = NameOptions {
            max_length: 10,
            ellipsis: "...".into(),
        };
        let out = truncate_name("Age at cancer diagnosis", &opts);
        assert_eq!(out, "Age at ...");
        assert_eq!(out.chars().count(), 10);
    }

    #[test]
    fn test_multibyte_safe() {
        let opts = NameOptions {
            max_length: 4,
            ellipsis: "…".into(),
        };
        assert_eq!(truncate_name("ÄÖÜßéè", &opts), "ÄÖÜ…");
    }

    #[test]
    fn test_limit_shorter_than_ellipsis_never_exceeded() {
        for max_length in 0..=3 {
            let opts = NameOptions {
                max_length,
                ellipsis: "...".into(),
            };
            let out = truncate_name("Diagnosis", &opts);
            assert_eq!(out.chars().count(), max_length);
            assert!("Diagnosis".starts_with(&out));
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-3.0), "-3");
    }
}
