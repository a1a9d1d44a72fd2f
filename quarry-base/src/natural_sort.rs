use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Case-insensitive "natural" string ordering: runs of digits compare
/// numerically instead of lexicographically, so "item2" sorts before
/// "item10". Sibling asset lists are kept ordered by this comparator.
///
/// Ties after the case-insensitive pass are broken by an exact byte compare
/// so the ordering is total ("Foo" and "foo" do not compare equal).
pub fn natural_cmp(
    a: &str,
    b: &str,
) -> Ordering {
    let mut chars_a = a.chars().peekable();
    let mut chars_b = b.chars().peekable();

    loop {
        match (chars_a.peek().copied(), chars_b.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ch_a), Some(ch_b)) => {
                if ch_a.is_ascii_digit() && ch_b.is_ascii_digit() {
                    let value_a = take_number(&mut chars_a);
                    let value_b = take_number(&mut chars_b);
                    match value_a.cmp(&value_b) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    let lower_a = lower(ch_a);
                    let lower_b = lower(ch_b);
                    if lower_a != lower_b {
                        return lower_a.cmp(&lower_b);
                    }
                    chars_a.next();
                    chars_b.next();
                }
            }
        }
    }
}

pub fn natural_lt(
    a: &str,
    b: &str,
) -> bool {
    natural_cmp(a, b) == Ordering::Less
}

fn lower(ch: char) -> char {
    // Single-char lowercase covers everything asset names realistically use
    ch.to_lowercase().next().unwrap_or(ch)
}

fn take_number(chars: &mut Peekable<Chars>) -> u64 {
    let mut value = 0u64;
    while let Some(ch) = chars.peek() {
        if let Some(digit) = ch.to_digit(10) {
            value = value.saturating_mul(10).saturating_add(digit as u64);
            chars.next();
        } else {
            break;
        }
    }
    value
}
