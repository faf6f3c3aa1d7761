use chrono::{DateTime, Utc};

/// Reply used whenever the server index cannot be reached or answers with garbage.
pub const UPSTREAM_UNAVAILABLE: &str =
    "⚠️ The Minecraft server index is unavailable right now. Please try again later.";

#[macro_export]
macro_rules! default_struct {
    (
        $(#[$struct_meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $type:ty $(= $default:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$struct_meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $type
            ),*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field: $crate::default_struct!(@default $($default)?)
                    ),*
                }
            }
        }
    };
    (@default) => {
        Default::default()
    };
    (@default $expr:expr) => {
        $expr
    };
}

/// Discord relative timestamp, e.g. `<t:1700000000:R>`.
pub fn relative_time(at: &DateTime<Utc>) -> String {
    format!("<t:{}:R>", at.timestamp())
}

pub fn relative_time_or_unknown(at: Option<&DateTime<Utc>>) -> String {
    at.map_or_else(|| "Unknown".to_string(), relative_time)
}

/// Formats a count with comma thousands separators.
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn thousands_groups_digits() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1_000), "1,000");
        assert_eq!(thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn relative_time_uses_unix_seconds() {
        let at = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        assert_eq!(relative_time(&at), "<t:1700000000:R>");
        assert_eq!(relative_time_or_unknown(None), "Unknown");
    }
}
