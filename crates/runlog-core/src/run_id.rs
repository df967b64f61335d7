use time::OffsetDateTime;

/// Allocate a new run id for the current instant.
///
/// Format: `YYYY-MM-DDTHH-MM-SS-mmmZ_<8 hex>`. Ids sort by start time; the
/// random suffix separates runs started within the same millisecond.
pub fn generate_run_id() -> String {
    run_id_at(OffsetDateTime::now_utc(), rand::random::<u32>())
}

/// Deterministic form of [`generate_run_id`].
pub fn run_id_at(at: OffsetDateTime, suffix: u32) -> String {
    let at = at.to_offset(time::UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}-{:02}-{:02}-{:03}Z_{suffix:08x}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.millisecond(),
    )
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    u64::try_from(nanos / 1_000_000).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_utc_components() {
        let at = datetime!(2026-03-04 05:06:07.089 UTC);
        assert_eq!(run_id_at(at, 0xdeadbeef), "2026-03-04T05-06-07-089Z_deadbeef");
    }

    #[test]
    fn suffix_is_zero_padded() {
        let at = datetime!(2026-01-01 00:00:00 UTC);
        assert!(run_id_at(at, 0x1f).ends_with("Z_0000001f"));
    }

    #[test]
    fn ids_sort_by_time() {
        let earlier = run_id_at(datetime!(2026-01-01 09:59:59.999 UTC), u32::MAX);
        let later = run_id_at(datetime!(2026-01-01 10:00:00 UTC), 0);
        assert!(earlier < later);
    }

    #[test]
    fn generated_ids_differ() {
        let a = generate_run_id();
        let b = generate_run_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), "2026-03-04T05-06-07-089Z_deadbeef".len());
    }

    #[test]
    fn now_ms_is_after_2020() {
        assert!(now_ms() > 1_577_836_800_000);
    }
}
