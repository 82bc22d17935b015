//! Bill number generation
//!
//! Display numbers are branch-scoped and date-stamped:
//! `BIL-{branch}-{YYYYMMDD}-{seq}` with the sequence restarting at 1 per
//! branch per business day. The sequence counter lives in the counters
//! table under a `bill_seq:{branch}:{date}` scope key.

use chrono::Utc;
use chrono_tz::Tz;

/// Business date in the venue's timezone, formatted YYYYMMDD
pub fn business_date(tz: Tz) -> String {
    Utc::now().with_timezone(&tz).format("%Y%m%d").to_string()
}

/// Counter scope key for one branch and one business day
pub fn sequence_scope(branch_code: &str, date: &str) -> String {
    format!("bill_seq:{}:{}", branch_code, date)
}

/// Format a display bill number, zero-padding the sequence to 4 digits
pub fn format_bill_number(branch_code: &str, date: &str, seq: u64) -> String {
    format!("BIL-{}-{}-{:04}", branch_code, date, seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_format_and_padding() {
        assert_eq!(
            format_bill_number("HQ", "20260823", 1),
            "BIL-HQ-20260823-0001"
        );
        assert_eq!(
            format_bill_number("D1", "20260823", 42),
            "BIL-D1-20260823-0042"
        );
    }

    #[test]
    fn sequence_wider_than_padding_is_not_truncated() {
        assert_eq!(
            format_bill_number("HQ", "20260823", 12345),
            "BIL-HQ-20260823-12345"
        );
    }

    #[test]
    fn scope_key_separates_branch_and_day() {
        let a = sequence_scope("HQ", "20260823");
        let b = sequence_scope("HQ", "20260824");
        let c = sequence_scope("D1", "20260823");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, "bill_seq:HQ:20260823");
    }
}
