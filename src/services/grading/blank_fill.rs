use super::Verdict;

const BLANK_SEPARATOR: char = '|';

/// Every blank must match one of its alternatives; a part count mismatch
/// fails the whole answer.
pub(super) fn grade_keyed(
    blanks: &[Vec<String>],
    case_sensitive: bool,
    answer_text: Option<&str>,
    marks: f64,
) -> Verdict {
    let Some(text) = answer_text.filter(|text| !text.trim().is_empty()) else {
        return Verdict::incorrect();
    };

    let parts: Vec<&str> = text.split(BLANK_SEPARATOR).collect();
    if parts.len() != blanks.len() {
        return Verdict::incorrect();
    }

    let all_match = parts.iter().zip(blanks).all(|(part, alternatives)| {
        let given = normalize(part, case_sensitive);
        alternatives.iter().any(|accepted| normalize(accepted, case_sensitive) == given)
    });

    if all_match {
        Verdict::correct(marks)
    } else {
        Verdict::incorrect()
    }
}

fn normalize(value: &str, case_sensitive: bool) -> String {
    let trimmed = value.trim();
    if case_sensitive {
        trimmed.to_string()
    } else {
        trimmed.to_lowercase()
    }
}
