use promptstack_core::text::pad_end;
use promptstack_core::text::visible_width;

/// Zips two rendered columns into rows, padding the left column to a uniform
/// visible width. Rows past the end of either column render as that column
/// being empty.
pub(crate) fn merge_columns(left: Vec<String>, right: Vec<String>) -> Vec<String> {
    if right.is_empty() {
        return left;
    }
    let left_width = left.iter().map(|l| visible_width(l)).max().unwrap_or(0);
    let rows = left.len().max(right.len());
    (0..rows)
        .map(|i| {
            let l = left.get(i).map(String::as_str).unwrap_or("");
            let r = right.get(i).map(String::as_str).unwrap_or("");
            if r.is_empty() {
                l.to_string()
            } else {
                format!("{}  {r}", pad_end(l, left_width))
            }
        })
        .collect()
}
