//! Subtitle candidate ranking.

use super::SubtitleRecord;

/// Pick the best candidate: the most downloaded one.
///
/// Ties keep the server's original order. A record whose download count
/// does not parse ranks below every parseable one but stays eligible when
/// it is the only candidate. `None` means "no subtitle found", which is a
/// valid outcome, not an error.
pub fn select_best(records: &[SubtitleRecord]) -> Option<&SubtitleRecord> {
    let mut best: Option<(&SubtitleRecord, Option<i64>)> = None;
    for record in records {
        let count = record.sub_downloads_cnt.parse::<i64>().ok();
        let better = match &best {
            None => true,
            Some((_, best_count)) => match (count, best_count) {
                (Some(count), Some(best_count)) => count > *best_count,
                (Some(_), None) => true,
                (None, _) => false,
            },
        };
        if better {
            best = Some((record, count));
        }
    }
    best.map(|(record, _)| record)
}
