use crate::names::Corrections;

pub const SUBJECT_NOT_LISTED: &str = "Subject Not Listed";
pub const GENERIC_SESSION: &str = "Class / Session";

/// Result of pulling one booking description apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDescription {
    /// Never empty; falls back to a sentinel.
    pub subject: String,
    /// Canonical teacher name, or empty when none was detected.
    pub teacher: String,
}

const PREFIX_KEYWORDS: [&str; 12] = [
    "BBA",
    "BCA",
    "MBA",
    "MSc",
    "IT",
    "Sem",
    "Semester",
    "Div",
    "Division",
    "Batch",
    "Class",
    "Group",
];

const HONORIFICS: [&str; 7] = ["Dr.", "Prof.", "Mr.", "Ms.", "Mrs.", "Ar.", "Er."];

/// Separates subject and teacher out of one free-text description.
///
/// Descriptions arrive with arbitrarily nested metadata prefixes
/// ("BBA Sem IV - Div A - Data Structures - Dr. X"), so the prefix rules run
/// in a fixed-point loop: apply each rule once, repeat until a full pass
/// changes nothing. The teacher is whoever the trailing dash segment names
/// with an honorific; the detected name goes through `corrections` before it
/// is returned.
///
/// Known limitation: only the trailing segment is tested, so a segment
/// naming two teachers ("Dr. A & Dr. B") yields at most one.
pub fn parse_description(
    desc: &str,
    course: &str,
    corrections: &Corrections,
) -> ParsedDescription {
    if desc.is_empty() {
        return ParsedDescription {
            subject: SUBJECT_NOT_LISTED.to_string(),
            teacher: String::new(),
        };
    }

    let mut d = desc.replace("&amp;", "&").trim().to_string();

    loop {
        let before = d.clone();
        if let Some(n) = strip_keyword_prefix(&d) {
            d = d[n..].to_string();
        }
        if let Some(n) = strip_roman_prefix(&d) {
            d = d[n..].to_string();
        }
        if let Some(n) = strip_letter_prefix(&d) {
            d = d[n..].to_string();
        }
        if let Some(n) = strip_leading_separators(&d) {
            d = d[n..].to_string();
        }
        if d == before {
            break;
        }
    }

    // " - " is the deliberate separator; bare "-" is the sloppy variant.
    let raw_segments: Vec<&str> = if d.contains(" - ") {
        d.split(" - ").collect()
    } else {
        d.split('-').collect()
    };
    let mut segments: Vec<String> = raw_segments
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    let mut teacher = String::new();
    if segments
        .last()
        .map(|s| starts_with_honorific(s))
        .unwrap_or(false)
    {
        let raw = segments.pop().unwrap();
        teacher = corrections.canonicalize(&raw);
    }

    let subject = if !segments.is_empty() {
        segments.join(" - ")
    } else if !teacher.is_empty() {
        GENERIC_SESSION.to_string()
    } else {
        // Everything got stripped and no teacher surfaced. Fall back to the
        // original text minus the course label.
        let base = if course.is_empty() {
            desc.to_string()
        } else {
            desc.replace(course, "")
        };
        let stripped = base
            .trim_start_matches(|c: char| c == '-' || c == ':' || c.is_whitespace())
            .to_string();
        if stripped.is_empty() {
            SUBJECT_NOT_LISTED.to_string()
        } else {
            stripped
        }
    };

    let subject = subject.trim().trim_end_matches('-').trim().to_string();

    ParsedDescription { subject, teacher }
}

fn starts_with_honorific(text: &str) -> bool {
    HONORIFICS
        .iter()
        .any(|h| text.get(..h.len()).is_some_and(|p| p.eq_ignore_ascii_case(h)))
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Word boundary between `s[..i]` and `s[i..]`: exactly one side is a word
/// character.
fn boundary_at(s: &str, i: usize) -> bool {
    let prev = s[..i].chars().next_back();
    let next = s[i..].chars().next();
    match (prev, next) {
        (Some(p), Some(n)) => is_word(p) != is_word(n),
        (Some(p), None) => is_word(p),
        (None, Some(n)) => is_word(n),
        (None, None) => false,
    }
}

fn end_of_run(s: &str, from: usize, pred: impl Fn(char) -> bool) -> usize {
    let mut end = from;
    for ch in s[from..].chars() {
        if pred(ch) {
            end += ch.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Rule 1, case-insensitive: a course/level/division keyword, an optional
/// "(...)" qualifier directly after it, optional whitespace, an optional
/// designator (digit run, roman run, or one letter) ending on a word
/// boundary, then trailing separators. Alternatives are tried in the same
/// order a backtracking matcher would: qualifier before none, longer
/// designators before shorter, empty designator last.
fn strip_keyword_prefix(s: &str) -> Option<usize> {
    for kw in PREFIX_KEYWORDS {
        let matches_kw = s
            .get(..kw.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(kw));
        if !matches_kw {
            continue;
        }
        let kw_end = kw.len();

        let mut resume_points = Vec::new();
        if s.as_bytes().get(kw_end) == Some(&b'(') {
            if let Some(close) = s[kw_end + 1..].find(')') {
                resume_points.push(kw_end + 1 + close + 1);
            }
        }
        resume_points.push(kw_end);

        for q in resume_points {
            if let Some(end) = designator_end(s, q) {
                return Some(end_of_trailing_separators(s, end));
            }
        }
    }
    None
}

/// Optional whitespace, optional designator, mandatory word boundary.
/// Whitespace backtracks from the full run; designators only ever match at
/// their full length because a shorter run would end between two word
/// characters.
fn designator_end(s: &str, from: usize) -> Option<usize> {
    let mut ws_ends = vec![from];
    for (i, ch) in s[from..].char_indices() {
        if ch.is_whitespace() {
            ws_ends.push(from + i + ch.len_utf8());
        } else {
            break;
        }
    }

    for &w in ws_ends.iter().rev() {
        let digits = end_of_run(s, w, |c| c.is_ascii_digit());
        if digits > w && boundary_at(s, digits) {
            return Some(digits);
        }
        let roman = end_of_run(s, w, |c| matches!(c.to_ascii_uppercase(), 'I' | 'V' | 'X'));
        if roman > w && boundary_at(s, roman) {
            return Some(roman);
        }
        if let Some(ch) = s[w..].chars().next() {
            if ch.is_ascii_alphabetic() {
                let letter = w + ch.len_utf8();
                if boundary_at(s, letter) {
                    return Some(letter);
                }
            }
        }
        if boundary_at(s, w) {
            return Some(w);
        }
    }
    None
}

fn end_of_trailing_separators(s: &str, from: usize) -> usize {
    let a = end_of_run(s, from, |c| c.is_whitespace());
    let b = end_of_run(s, a, |c| c == '-' || c == ':');
    end_of_run(s, b, |c| c.is_whitespace())
}

/// Rule 2, case-sensitive: a roman-numeral run followed by a separator run
/// containing at least one dash/colon, or by plain whitespace. The run
/// backtracks until a separator fits.
fn strip_roman_prefix(s: &str) -> Option<usize> {
    let run = end_of_run(s, 0, |c| matches!(c, 'I' | 'V' | 'X'));
    let mut e = run;
    while e > 0 {
        if let Some(end) = roman_separator_end(s, e) {
            return Some(end);
        }
        e -= 1;
    }
    None
}

fn roman_separator_end(s: &str, from: usize) -> Option<usize> {
    let a = end_of_run(s, from, |c| c.is_whitespace());
    let b = end_of_run(s, a, |c| c == '-' || c == ':');
    if b > a {
        return Some(end_of_run(s, b, |c| c.is_whitespace()));
    }
    if a > from {
        return Some(a);
    }
    None
}

/// Rule 3, case-sensitive: one uppercase letter, optional whitespace, at
/// least one dash/colon, optional whitespace.
fn strip_letter_prefix(s: &str) -> Option<usize> {
    let first = s.chars().next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    let a = end_of_run(s, first.len_utf8(), |c| c.is_whitespace());
    let b = end_of_run(s, a, |c| c == '-' || c == ':');
    if b == a {
        return None;
    }
    Some(end_of_run(s, b, |c| c.is_whitespace()))
}

/// Rule 4: any leading run of separators and whitespace.
fn strip_leading_separators(s: &str) -> Option<usize> {
    let e = end_of_run(s, 0, |c| c == '-' || c == ':' || c.is_whitespace());
    if e > 0 {
        Some(e)
    } else {
        None
    }
}
