//! Boundary detection and page lookup used by the splitter.

/// Boundary classes in order of preference.
const BREAK_RULES: [fn(&[char], usize) -> bool; 4] = [
    is_paragraph_break,
    is_line_break,
    is_sentence_break,
    is_word_break,
];

fn is_paragraph_break(chars: &[char], end: usize) -> bool {
    end >= 2 && chars[end - 1] == '\n' && chars[end - 2] == '\n'
}

fn is_line_break(chars: &[char], end: usize) -> bool {
    end >= 1 && chars[end - 1] == '\n'
}

fn is_sentence_break(chars: &[char], end: usize) -> bool {
    end >= 2 && chars[end - 1].is_whitespace() && matches!(chars[end - 2], '.' | '!' | '?')
}

fn is_word_break(chars: &[char], end: usize) -> bool {
    end >= 1 && chars[end - 1].is_whitespace()
}

/// Find the best exclusive end index in `min_end..=max_end`.
///
/// Tries each boundary class in turn and returns the latest position that
/// closes a boundary of that class. Falls back to `max_end` (a hard cut).
pub(crate) fn find_break(chars: &[char], min_end: usize, max_end: usize) -> usize {
    debug_assert!(min_end <= max_end && max_end <= chars.len());
    for rule in BREAK_RULES {
        if let Some(end) = (min_end..=max_end).rev().find(|&end| rule(chars, end)) {
            return end;
        }
    }
    max_end
}

/// 1-based page number containing `offset`, given each page's starting
/// character offset in ascending order.
pub(crate) fn page_for_offset(page_starts: &[(usize, usize)], offset: usize) -> Option<usize> {
    page_starts
        .iter()
        .take_while(|(start, _)| *start <= offset)
        .last()
        .map(|(_, page)| *page)
}
