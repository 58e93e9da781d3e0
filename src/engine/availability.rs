use crate::model::{Ms, Slot, Span};

// ── Interval algebra ─────────────────────────────────────────────

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end
        {
            last.end = last.end.max(span.end);
            continue;
        }
        merged.push(span);
    }
    merged
}

/// Interval difference over sorted inputs: `base` minus `to_remove`.
pub fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Span::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(Span::new(current_start, current_end));
        }
    }

    result
}

/// Partition an open window into the finest-grained available/unavailable
/// cut against the given busy intervals (blocks + live reservations).
///
/// `busy` must be sorted by start. Pieces are cut at every busy-interval
/// boundary inside the window and adjacent pieces with the same flag are
/// not merged, so two back-to-back closures stay two entries.
pub fn cut_slots(window: Span, busy: &[Span]) -> Vec<Slot> {
    let clamped: Vec<Span> = busy
        .iter()
        .filter(|b| b.overlaps(&window))
        .map(|b| b.clamp_to(&window))
        .collect();
    if clamped.is_empty() {
        return vec![Slot { span: window, available: true }];
    }

    let mut out: Vec<Slot> = subtract_intervals(&[window], &clamped)
        .into_iter()
        .map(|span| Slot { span, available: true })
        .collect();

    let covered = merge_overlapping(&clamped);
    let mut bounds: Vec<Ms> = clamped.iter().flat_map(|s| [s.start, s.end]).collect();
    bounds.sort_unstable();
    bounds.dedup();
    for pair in bounds.windows(2) {
        let piece = Span::new(pair[0], pair[1]);
        if covered
            .iter()
            .any(|c| c.start <= piece.start && piece.end <= c.end)
        {
            out.push(Slot { span: piece, available: false });
        }
    }

    out.sort_by_key(|s| s.span.start);
    out
}
