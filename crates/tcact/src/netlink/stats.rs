//! Action timestamps and generic action statistics.

use std::sync::OnceLock;

use serde::Serialize;

use super::attr::{AttrTable, get};
use super::error::Result;
use super::types::tc::GnetStatsQueue;
use super::types::tc::action::TcfT;
use super::types::tc::stats::{TCA_STATS_BASIC, TCA_STATS_MAX, TCA_STATS_QUEUE};
use crate::output::ReportWriter;

/// Fallback when `sysconf(_SC_CLK_TCK)` is unavailable.
const DEFAULT_USER_HZ: u64 = 100;

/// Clock ticks per second used by the kernel for `tcf_t` values.
pub fn user_hz() -> u64 {
    static HZ: OnceLock<u64> = OnceLock::new();
    *HZ.get_or_init(|| {
        // SAFETY: sysconf has no preconditions.
        let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if hz > 0 { hz as u64 } else { DEFAULT_USER_HZ }
    })
}

/// Render action timestamps, skipping those that were never set.
pub fn print_tm(report: &mut ReportWriter, tm: &TcfT) {
    print_tm_with_hz(report, tm, user_hz());
}

/// Render action timestamps using an explicit tick rate.
pub fn print_tm_with_hz(report: &mut ReportWriter, tm: &TcfT, hz: u64) {
    let hz = hz.max(1);
    let fields = [
        (tm.install, "installed", "installed"),
        (tm.lastuse, "last_used", "used"),
        (tm.firstuse, "first_used", "firstused"),
        (tm.expires, "expires", "expires"),
    ];

    for (ticks, key, label) in fields {
        if ticks != 0 {
            let secs = ticks / hz;
            report.field(key, format!(" {label} {secs} sec"), secs);
        }
    }
}

/// Generic counters carried in `TCA_ACT_STATS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionStats {
    pub bytes: u64,
    pub packets: u32,
    pub drops: u32,
    pub overlimits: u32,
    pub requeues: u32,
    pub backlog: u32,
    pub qlen: u32,
}

impl ActionStats {
    /// Decode the `TCA_STATS_*` attributes of a `TCA_ACT_STATS` nest.
    ///
    /// Missing sub-attributes leave their counters at zero.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let table = AttrTable::parse(data, TCA_STATS_MAX);
        let mut stats = Self::default();

        // struct gnet_stats_basic is { u64 bytes; u32 packets; } with
        // trailing padding on 64-bit kernels
        if let Some(basic) = table.get(TCA_STATS_BASIC) {
            stats.bytes = get::u64_ne(basic)?;
            stats.packets = get::u32_ne(basic.get(8..).unwrap_or_default())?;
        }

        if let Some(queue) = table.read::<GnetStatsQueue>(TCA_STATS_QUEUE) {
            let queue = queue?;
            stats.drops = queue.drops;
            stats.overlimits = queue.overlimits;
            stats.requeues = queue.requeues;
            stats.backlog = queue.backlog;
            stats.qlen = queue.qlen;
        }

        Ok(stats)
    }

    /// Render the statistics block that follows an action's parameters.
    pub fn print(&self, report: &mut ReportWriter) {
        report.text(format!(
            "\n\tAction statistics:\n\tSent {} bytes {} pkt (dropped {}, overlimits {} requeues {}) ",
            self.bytes, self.packets, self.drops, self.overlimits, self.requeues
        ));
        report.text(format!(
            "\n\tbacklog {}b {}p requeues {}",
            self.backlog, self.qlen, self.requeues
        ));
        match serde_json::to_value(self) {
            Ok(value) => report.json("stats", value),
            Err(e) => tracing::warn!(error = %e, "cannot serialize action statistics"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::{NlAttr, nla_align};
    use zerocopy::IntoBytes;

    fn attr(kind: u16, payload: &[u8]) -> Vec<u8> {
        let mut buf = NlAttr::new(kind, payload.len()).as_bytes().to_vec();
        buf.extend_from_slice(payload);
        buf.resize(nla_align(buf.len()), 0);
        buf
    }

    #[test]
    fn test_print_tm_skips_zero() {
        let tm = TcfT {
            install: 500,
            lastuse: 0,
            expires: 0,
            firstuse: 250,
        };
        let mut report = ReportWriter::new();
        print_tm_with_hz(&mut report, &tm, 100);

        assert_eq!(report.as_text(), " installed 5 sec firstused 2 sec");
        assert_eq!(report.get_json("installed"), Some(&serde_json::json!(5)));
        assert!(report.get_json("last_used").is_none());
    }

    #[test]
    fn test_print_tm_all_fields() {
        let tm = TcfT {
            install: 1000,
            lastuse: 300,
            expires: 100,
            firstuse: 200,
        };
        let mut report = ReportWriter::new();
        print_tm_with_hz(&mut report, &tm, 100);

        assert_eq!(
            report.as_text(),
            " installed 10 sec used 3 sec firstused 2 sec expires 1 sec"
        );
    }

    #[test]
    fn test_user_hz_is_positive() {
        assert!(user_hz() > 0);
    }

    #[test]
    fn test_parse_and_print_stats() {
        let mut basic = 1500u64.to_ne_bytes().to_vec();
        basic.extend_from_slice(&10u32.to_ne_bytes());
        basic.extend_from_slice(&[0; 4]);

        let queue = GnetStatsQueue {
            qlen: 0,
            backlog: 0,
            drops: 2,
            requeues: 0,
            overlimits: 1,
        };

        let mut data = attr(TCA_STATS_BASIC, &basic);
        data.extend(attr(TCA_STATS_QUEUE, queue.as_bytes()));

        let stats = ActionStats::parse(&data).unwrap();
        assert_eq!(stats.bytes, 1500);
        assert_eq!(stats.packets, 10);
        assert_eq!(stats.drops, 2);

        let mut report = ReportWriter::new();
        stats.print(&mut report);
        assert_eq!(
            report.as_text(),
            "\n\tAction statistics:\n\tSent 1500 bytes 10 pkt (dropped 2, overlimits 1 requeues 0) \n\tbacklog 0b 0p requeues 0"
        );
        assert_eq!(report.get_json("stats").unwrap()["packets"], 10);
    }

    #[test]
    fn test_parse_truncated_basic() {
        let data = attr(TCA_STATS_BASIC, &[1, 2, 3]);
        assert!(ActionStats::parse(&data).is_err());
    }
}
