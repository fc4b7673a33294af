/// Share of starts that ended in a win, in `[0, 1]`.
///
/// Returns `None` when there are no starts, so a constructor that never raced
/// gets "N/A" instead of a NaN leaking into the cache.
pub fn compute_win_rate(wins: u32, starts: u32) -> Option<f64> {
    if starts == 0 {
        return None;
    }
    Some(f64::from(wins) / f64::from(starts))
}
