use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

use crate::error::{IngestError, Result};
use crate::models::QuestionRecord;

/// Builds the text that gets embedded for a record.
///
/// Field order is fixed: subject, grade, question, choices, the resolved
/// answer, hint. Choices render as a Python list literal, which is the form
/// existing indexes were built from.
pub fn synthesize_document(record: &QuestionRecord) -> Result<String> {
    let answer = resolve_answer(record)?;

    Ok(format!(
        "Subject: {}. Grade: {}. Question: {} Choices: {}. Answer: {}. Hint: {}",
        record.subject.as_deref().unwrap_or_default(),
        record.grade.as_deref().unwrap_or_default(),
        record.question,
        render_choices(&record.choices),
        answer,
        record.hint.as_deref().unwrap_or_default(),
    ))
}

/// Returns `choices[answer]`. Negative and past-the-end indices are errors.
pub fn resolve_answer(record: &QuestionRecord) -> Result<&str> {
    usize::try_from(record.answer)
        .ok()
        .and_then(|index| record.choices.get(index))
        .map(String::as_str)
        .ok_or(IngestError::AnswerOutOfRange {
            index: record.answer,
            len: record.choices.len(),
        })
}

fn render_choices(choices: &[String]) -> String {
    let items: Vec<String> = choices.iter().map(|c| quote_str(c)).collect();
    format!("[{}]", items.join(", "))
}

/// Python `repr()` of a string: single quotes unless the text contains a
/// single quote and no double quote.
fn quote_str(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if !is_printable(c) => out.push_str(&escape_code_point(c)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Python's `str.isprintable()` for a single character: separators other
/// than the ASCII space and the `C*` categories are not printable.
fn is_printable(ch: char) -> bool {
    if ch == ' ' {
        return true;
    }
    !matches!(
        ch.general_category(),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::SpaceSeparator
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
    )
}

fn escape_code_point(ch: char) -> String {
    let cp = ch as u32;
    if cp <= 0xff {
        format!("\\x{:02x}", cp)
    } else if cp <= 0xffff {
        format!("\\u{:04x}", cp)
    } else {
        format!("\\U{:08x}", cp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(choices: &[&str], answer: i64) -> QuestionRecord {
        QuestionRecord {
            question: "2+2?".to_string(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
            answer,
            hint: None,
            subject: Some("Math".to_string()),
            grade: Some("3".to_string()),
        }
    }

    #[test]
    fn test_reference_document() {
        let doc = synthesize_document(&record(&["3", "4", "5"], 1)).unwrap();
        assert_eq!(
            doc,
            "Subject: Math. Grade: 3. Question: 2+2? Choices: ['3', '4', '5']. Answer: 4. Hint: "
        );
    }

    #[test]
    fn test_deterministic() {
        let r = record(&["3", "4", "5"], 2);
        assert_eq!(
            synthesize_document(&r).unwrap(),
            synthesize_document(&r.clone()).unwrap()
        );
    }

    #[test]
    fn test_missing_optionals_are_empty() {
        let r = QuestionRecord {
            question: "Which is hot?".to_string(),
            choices: vec!["ice".to_string(), "fire".to_string()],
            answer: 1,
            hint: None,
            subject: None,
            grade: None,
        };
        assert_eq!(
            synthesize_document(&r).unwrap(),
            "Subject: . Grade: . Question: Which is hot? Choices: ['ice', 'fire']. Answer: fire. Hint: "
        );
    }

    #[test]
    fn test_hint_included() {
        let mut r = record(&["3", "4"], 0);
        r.hint = Some("Count on your fingers.".to_string());
        assert!(synthesize_document(&r)
            .unwrap()
            .ends_with("Answer: 3. Hint: Count on your fingers."));
    }

    #[test]
    fn test_answer_past_end_fails() {
        let err = synthesize_document(&record(&["3", "4", "5"], 3)).unwrap_err();
        assert!(matches!(
            err,
            IngestError::AnswerOutOfRange { index: 3, len: 3 }
        ));
    }

    #[test]
    fn test_negative_answer_fails() {
        let err = synthesize_document(&record(&["3", "4", "5"], -1)).unwrap_err();
        assert!(matches!(err, IngestError::AnswerOutOfRange { index: -1, .. }));
    }

    #[test]
    fn test_empty_choices_fail() {
        assert!(synthesize_document(&record(&[], 0)).is_err());
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_str("plain"), "'plain'");
        assert_eq!(quote_str("it's"), "\"it's\"");
        assert_eq!(quote_str("it's \"x\""), "'it\\'s \"x\"'");
        assert_eq!(quote_str("a\\b"), "'a\\\\b'");
        assert_eq!(quote_str("line\nbreak"), "'line\\nbreak'");
        assert_eq!(quote_str("bell\u{7}"), "'bell\\x07'");
        assert_eq!(quote_str("température"), "'température'");
    }

    #[test]
    fn test_non_printable_escapes() {
        assert_eq!(quote_str("del\u{7f}"), "'del\\x7f'");
        assert_eq!(quote_str("a\u{85}b"), "'a\\x85b'");
        assert_eq!(quote_str("nb\u{a0}sp"), "'nb\\xa0sp'");
        assert_eq!(quote_str("zw\u{200b}j"), "'zw\\u200bj'");
        assert_eq!(quote_str("line\u{2028}sep"), "'line\\u2028sep'");
        assert_eq!(quote_str("pua\u{e000}"), "'pua\\ue000'");
        assert_eq!(quote_str("tag\u{e0001}"), "'tag\\U000e0001'");
        assert_eq!(quote_str("a b"), "'a b'");
        assert_eq!(quote_str("\u{1f600}"), "'\u{1f600}'");
    }

    #[test]
    fn test_choices_with_non_printable_characters() {
        let choices: Vec<String> = ["a\u{85}b", "nb\u{a0}sp", "zw\u{200b}j"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(
            render_choices(&choices),
            "['a\\x85b', 'nb\\xa0sp', 'zw\\u200bj']"
        );
    }
}
