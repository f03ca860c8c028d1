use super::Verdict;

/// All or nothing; a missing selection is wrong, never pending.
pub(super) fn grade(correct_option: Option<i32>, selected: Option<i32>, marks: f64) -> Verdict {
    match (selected, correct_option) {
        (Some(selected), Some(correct)) if selected == correct => Verdict::correct(marks),
        _ => Verdict::incorrect(),
    }
}
