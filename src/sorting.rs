use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{Periodicity, Subject};

/// Core subjects shown first on council boards and grade sheets, in this order.
pub const SUBJECT_ORDER: &[&str] = &[
    "ARTE",
    "BIOLOGIA",
    "ED. FÍSICA",
    "EDUCAÇÃO FÍSICA",
    "ESPANHOL",
    "FILOSOFIA",
    "FÍSICA",
    "GEOGRAFIA",
    "HISTÓRIA",
    "INGLÊS",
    "MATEMÁTICA",
    "PORTUGUÊS",
    "LÍNGUA PORTUGUESA",
    "QUÍMICA",
    "SOCIOLOGIA",
];

/// Sort key: trimmed, accents folded (NFD with combining marks dropped),
/// upper case. "Álvaro" keys as "ALVARO".
fn normalize(name: &str) -> String {
    name.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

fn priority(key: &str) -> Option<usize> {
    SUBJECT_ORDER.iter().position(|known| normalize(known) == key)
}

/// Accent- and case-insensitive name order, exact text as tie-break.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    normalize(a).cmp(&normalize(b)).then_with(|| a.cmp(b))
}

/// Priority list first, everything else alphabetically.
pub fn compare_subject_names(a: &str, b: &str) -> Ordering {
    let (key_a, key_b) = (normalize(a), normalize(b));
    match (priority(&key_a), priority(&key_b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => key_a.cmp(&key_b),
    }
    .then_with(|| a.cmp(b))
}

pub fn compare_subjects(a: &Subject, b: &Subject) -> Ordering {
    compare_subject_names(&a.name, &b.name).then_with(|| a.id.cmp(&b.id))
}

/// Annual subjects before semester ones, alphabetical within each group.
pub fn compare_by_periodicity(a: &Subject, b: &Subject) -> Ordering {
    let rank = |p: Periodicity| match p {
        Periodicity::Annual => 0,
        Periodicity::Semester => 1,
    };
    rank(a.periodicity)
        .cmp(&rank(b.periodicity))
        .then_with(|| normalize(&a.name).cmp(&normalize(&b.name)))
        .then_with(|| a.id.cmp(&b.id))
}

/// Case-insensitive comparison where digit runs compare by value, so
/// "1º B" < "2º A" < "10º A".
pub fn compare_natural(a: &str, b: &str) -> Ordering {
    let (a, b) = (normalize(a), normalize(b));
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let x_run = take_digits(&mut left);
                let y_run = take_digits(&mut right);
                let ordering = x_run
                    .len()
                    .cmp(&y_run.len())
                    .then_with(|| x_run.cmp(&y_run));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() && !digits.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
