use crate::model::*;

/// Parts of `window` not covered by any slot-holding booking in the ledger.
pub fn free_slots(ledger: &HallLedger, window: &Span) -> Vec<Span> {
    // Ledger order is by start, so the clamped spans are already sorted.
    let occupied: Vec<Span> = ledger
        .blocking(window)
        .map(|b| Span::new(b.span.start.max(window.start), b.span.end.min(window.end)))
        .collect();
    carve(window, &merge_overlapping(&occupied))
}

/// Merge sorted overlapping/adjacent spans into disjoint spans.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

/// Remove disjoint, sorted `taken` spans from `window`.
fn carve(window: &Span, taken: &[Span]) -> Vec<Span> {
    let mut free = Vec::new();
    let mut cursor = window.start;
    for t in taken {
        if t.start > cursor {
            free.push(Span::new(cursor, t.start));
        }
        cursor = cursor.max(t.end);
    }
    if cursor < window.end {
        free.push(Span::new(cursor, window.end));
    }
    free
}
