//! Entry-name ordering and generation.
//!
//! Pages inside an archive are ordered by a natural (alphanumeric) comparison
//! of their entry names, so `page2.jpg` sorts before `page10.jpg`. New pages
//! inserted mid-sequence get names that continue the numbering convention
//! already in use, which keeps the sort order right without renumbering every
//! page in the archive.

use std::cmp::Ordering;

/// Compare two entry names naturally: runs of digits compare by numeric
/// value, everything else compares ASCII case-insensitively.
///
/// Digit runs that differ only in zero padding (`2` vs `02`) and letters that
/// differ only in case are ordered by a final tiebreak, so the ordering is
/// total and stable enough to sort a page index with.
pub fn compare_alphanumeric(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);
    let mut tiebreak = Ordering::Equal;
    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let run_a = digit_run(&a[i..]);
            let run_b = digit_run(&b[j..]);
            let value_a = trim_leading_zeros(run_a);
            let value_b = trim_leading_zeros(run_b);
            let ord = value_a
                .len()
                .cmp(&value_b.len())
                .then_with(|| value_a.cmp(value_b));
            if ord != Ordering::Equal {
                return ord;
            }
            if tiebreak == Ordering::Equal {
                tiebreak = run_a.len().cmp(&run_b.len());
            }
            i += run_a.len();
            j += run_b.len();
        } else {
            let ord = a[i].to_ascii_lowercase().cmp(&b[j].to_ascii_lowercase());
            if ord != Ordering::Equal {
                return ord;
            }
            if tiebreak == Ordering::Equal {
                tiebreak = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }
    }
    (a.len() - i).cmp(&(b.len() - j)).then(tiebreak)
}

fn digit_run(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(bytes.len());
    &bytes[..end]
}

fn trim_leading_zeros(run: &[u8]) -> &[u8] {
    let start = run.iter().take_while(|&&b| b == b'0').count();
    &run[start..]
}

/// Generate `count` fresh entry names continuing the numbering convention of
/// `previous`, the name of the entry the new ones should sort right after.
///
/// The anchor's stem is scanned for its trailing number; the prefix and the
/// zero-padding width are preserved and the numbering continues from the next
/// value. An anchor without any digits gets `_` appended to its whole stem, so
/// the generated names still sort after it. Without an anchor the names are
/// plain zero-padded sequences (`01`, `02`, ...), placed under `default_dir`
/// when one is given.
///
/// Returned names carry no file extension; callers append the extension that
/// fits each page.
pub fn continue_sequence(
    previous: Option<&str>,
    count: usize,
    default_dir: Option<&str>,
) -> Vec<String> {
    let mut prefix = match default_dir {
        Some(dir) if !dir.is_empty() => format!("{dir}/"),
        _ => String::new(),
    };
    let mut first_number: u64 = 1;
    let mut width = count.to_string().len().max(2);

    if let Some(previous) = previous {
        let name_start = previous.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
        let dir = &previous[..name_start];
        let stem = strip_extension(&previous[name_start..]);
        match trailing_number(stem) {
            Some((head, number, digits)) => {
                prefix = format!("{dir}{head}");
                first_number = number + 1;
                width = digits;
            }
            None => {
                // No numbers anywhere in the anchor: start a numbering scheme
                // that still sorts after it.
                prefix = format!("{dir}{stem}_");
            }
        }
    }

    (0..count as u64)
        .map(|i| {
            let number = first_number + i;
            format!("{prefix}{number:0width$}")
        })
        .collect()
}

/// Find the first position in `stem` whose remainder parses as an integer,
/// i.e. the trailing digit run. Returns the head before it, its value and its
/// width in digits.
fn trailing_number(stem: &str) -> Option<(&str, u64, usize)> {
    for (i, _) in stem.char_indices() {
        if let Ok(number) = stem[i..].parse::<u64>() {
            return Some((&stem[..i], number, stem.len() - i));
        }
    }
    None
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    }
}
