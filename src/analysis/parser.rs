// ABOUTME: Extraction of nicknames, image descriptions, suggestion lists and critique sections from model text
// ABOUTME: Pure functions that always fall back to documented defaults instead of failing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # Text Response Parser
//!
//! Model output is free text with inconsistent formatting. Nothing in this
//! module returns an error: unusable input resolves to the fallback strings
//! in [`wingman_core::constants::defaults`] or to the caller's original reply.

use std::sync::LazyLock;

use regex::Regex;
use wingman_core::constants::{defaults, limits};
use wingman_core::models::{CritiqueResult, NicknameAndDescription};

/// Critique text used when the critique response cannot be split into sections
pub const CRITIQUE_FORMAT_ERROR: &str = "Format error: the critique response did not contain \
[CRITIQUE]: and [FINAL REPLY]: sections. The original reply was kept.";

/// Note appended to the critique when the final-reply section is blank
pub const EMPTY_FINAL_REPLY_WARNING: &str =
    "[WARNING]: The final reply section was empty. The original reply was kept.";

/// A line this short (in words) at the end of a block reads as a nickname
const NICKNAME_MAX_WORDS: usize = 8;

static NICKNAME_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^nickname\s*:").ok());

static SUGGESTION_SPLIT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\n\d\. |\n\* |\n- |\n\n").ok());

static SUGGESTION_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+\.|[*-])").ok());

static CRITIQUE_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\[critique\]:").ok());

static FINAL_REPLY_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\[final reply\]:").ok());

/// Trim and remove one pair of matching surrounding quotes
///
/// The text between the quotes is trimmed too, so applying the function to
/// its own output changes nothing for singly-quoted input.
#[must_use]
pub fn strip_quotes(text: &str) -> String {
    let trimmed = text.trim();
    let quoted = trimmed.len() >= 2
        && ['"', '\''].iter().any(|&quote| {
            trimmed.starts_with(quote) && trimmed.ends_with(quote)
        });

    if quoted {
        trimmed[1..trimmed.len() - 1].trim().to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn word_count(line: &str) -> usize {
    line.split_whitespace().count()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Split a combined description+nickname reply
///
/// Resolution order: an explicit `Nickname:` line; else a short last line of a
/// multi-line block; else a single short line is a nickname and a single long
/// line a description. Empty input yields the "no response" defaults.
#[must_use]
pub fn parse_image_description_and_nickname(raw: &str) -> NicknameAndDescription {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return NicknameAndDescription {
            nickname: defaults::NICKNAME_EMPTY_RESPONSE.to_owned(),
            image_description: defaults::IMAGE_RECEIVED.to_owned(),
        };
    }

    let labelled = NICKNAME_PREFIX.as_ref().and_then(|prefix| {
        lines
            .iter()
            .position(|line| prefix.is_match(line))
            .map(|index| (index, prefix.replace(lines[index], "").into_owned()))
    });

    let (nickname, description) = match (labelled, lines.as_slice()) {
        (Some((index, remainder)), _) => {
            let rest: Vec<&str> = lines
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, line)| *line)
                .collect();
            (strip_quotes(&remainder), rest.join("\n"))
        }
        (None, [single]) if word_count(single) > NICKNAME_MAX_WORDS => {
            (String::new(), (*single).to_owned())
        }
        (None, [single]) => (strip_quotes(single), String::new()),
        (None, [body @ .., last]) if word_count(last) <= NICKNAME_MAX_WORDS => {
            (strip_quotes(last), body.join("\n"))
        }
        (None, all) => (String::new(), all.join("\n")),
    };

    let image_description = if description.is_empty() || contains_ignore_case(&description, "nickname")
    {
        defaults::IMAGE_RECEIVED.to_owned()
    } else {
        description
    };

    let nickname = if nickname.is_empty() || contains_ignore_case(&nickname, "description") {
        defaults::NICKNAME.to_owned()
    } else {
        nickname
    };

    NicknameAndDescription {
        nickname,
        image_description,
    }
}

/// Split a list-style reply into individual suggestions
///
/// Fragments keep only lengths strictly between the configured bounds.
#[must_use]
pub fn parse_suggestions(raw: &str) -> Vec<String> {
    let fragments: Vec<&str> = SUGGESTION_SPLIT
        .as_ref()
        .map_or_else(|| raw.split("\n\n").collect(), |re| re.split(raw).collect());

    fragments
        .into_iter()
        .map(|fragment| {
            SUGGESTION_MARKER
                .as_ref()
                .map_or_else(|| fragment.to_owned(), |re| re.replace(fragment, "").into_owned())
                .trim()
                .to_owned()
        })
        .filter(|suggestion| {
            let length = suggestion.chars().count();
            length > limits::SUGGESTION_MIN_CHARS && length < limits::SUGGESTION_MAX_CHARS
        })
        .collect()
}

/// Split a critique response into review notes and the reply to keep
///
/// `original_reply` is returned as the final reply whenever either marker is
/// missing or the final-reply section is blank.
#[must_use]
pub fn parse_critique_response(raw: &str, original_reply: &str) -> CritiqueResult {
    let find = |marker: &LazyLock<Option<Regex>>| {
        marker.as_ref().and_then(|re| re.find(raw)).map(|m| (m.start(), m.end()))
    };

    let (Some((critique_start, critique_end)), Some((final_start, final_end))) =
        (find(&CRITIQUE_MARKER), find(&FINAL_REPLY_MARKER))
    else {
        return CritiqueResult {
            critique: CRITIQUE_FORMAT_ERROR.to_owned(),
            final_reply: original_reply.to_owned(),
        };
    };

    let critique_section = if critique_start < final_start {
        &raw[critique_end..final_start]
    } else {
        &raw[critique_end..]
    };
    let final_section = if final_start < critique_start {
        &raw[final_end..critique_start]
    } else {
        &raw[final_end..]
    };

    let critique = critique_section.trim().to_owned();
    let final_reply = final_section.trim();

    if final_reply.is_empty() {
        return CritiqueResult {
            critique: if critique.is_empty() {
                EMPTY_FINAL_REPLY_WARNING.to_owned()
            } else {
                format!("{critique}\n\n{EMPTY_FINAL_REPLY_WARNING}")
            },
            final_reply: original_reply.to_owned(),
        };
    }

    CritiqueResult {
        critique,
        final_reply: final_reply.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_quotes_removes_one_matching_pair() {
        assert_eq!(strip_quotes("  \"Sunny Smiles\"  "), "Sunny Smiles");
        assert_eq!(strip_quotes("'Captain Fun'"), "Captain Fun");
        assert_eq!(strip_quotes("\"mismatched'"), "\"mismatched'");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes("\"\""), "");
        assert_eq!(strip_quotes("\"'nested'\""), "'nested'");
    }

    #[test]
    fn test_strip_quotes_is_idempotent_on_single_layer() {
        for inner in ["Anna", "Bright Eyes", " spaced ", "it's fine"] {
            for quote in ['"', '\''] {
                let wrapped = format!("{quote}{inner}{quote}");
                let once = strip_quotes(&wrapped);
                assert_eq!(once, inner.trim());
                assert_eq!(strip_quotes(&once), once);
            }
        }
    }

    #[test]
    fn test_labelled_nickname_line() {
        let parsed = parse_image_description_and_nickname(
            "Image Description: A cat wearing a party hat.\nNickname: Anna Bright Eyes",
        );
        assert_eq!(parsed.nickname, "Anna Bright Eyes");
        assert_eq!(
            parsed.image_description,
            "Image Description: A cat wearing a party hat."
        );
    }

    #[test]
    fn test_labelled_nickname_is_case_insensitive_and_unquoted() {
        let parsed = parse_image_description_and_nickname(
            "NICKNAME : \"Trail Queen\"\nShe is hiking up a snowy ridge at sunrise.",
        );
        assert_eq!(parsed.nickname, "Trail Queen");
        assert_eq!(
            parsed.image_description,
            "She is hiking up a snowy ridge at sunrise."
        );
    }

    #[test]
    fn test_blank_input_uses_empty_response_defaults() {
        let parsed = parse_image_description_and_nickname("   ");
        assert_eq!(parsed.nickname, "Mystery Girl");
        assert_eq!(parsed.image_description, "Image(s) received.");
    }

    #[test]
    fn test_short_last_line_becomes_nickname() {
        let parsed = parse_image_description_and_nickname(
            "A woman laughing on a sailboat.\nThe sea is calm and bright.\nSailor Sunshine",
        );
        assert_eq!(parsed.nickname, "Sailor Sunshine");
        assert_eq!(
            parsed.image_description,
            "A woman laughing on a sailboat.\nThe sea is calm and bright."
        );
    }

    #[test]
    fn test_long_last_line_means_description_only() {
        let raw = "Two friends at a concert.\nThey are both holding drinks and singing along very loudly tonight.";
        let parsed = parse_image_description_and_nickname(raw);
        assert_eq!(parsed.nickname, "Chat Pal");
        assert_eq!(parsed.image_description, raw);
    }

    #[test]
    fn test_single_line_by_length() {
        let short = parse_image_description_and_nickname("Coffee Connoisseur");
        assert_eq!(short.nickname, "Coffee Connoisseur");
        assert_eq!(short.image_description, "Image(s) received.");

        let long = parse_image_description_and_nickname(
            "A person holding a latte in a bright cafe with plants everywhere",
        );
        assert_eq!(long.nickname, "Chat Pal");
        assert_eq!(
            long.image_description,
            "A person holding a latte in a bright cafe with plants everywhere"
        );
    }

    #[test]
    fn test_post_filters_reject_label_leakage() {
        let parsed =
            parse_image_description_and_nickname("Here is a nickname for you\nImage description");
        assert_eq!(parsed.nickname, "Chat Pal");
        assert_eq!(parsed.image_description, "Image(s) received.");
    }

    #[test]
    fn test_parse_suggestions_numbered_list() {
        let raw = "1. Hey there, how was the hike?\n2. Is that a golden retriever?\n3. Hi";
        assert_eq!(
            parse_suggestions(raw),
            vec![
                "Hey there, how was the hike?".to_owned(),
                "Is that a golden retriever?".to_owned(),
            ]
        );
    }

    #[test]
    fn test_parse_suggestions_bullets_and_paragraphs() {
        let raw = "* First idea here\n- Second idea here\n\nThird idea here";
        assert_eq!(
            parse_suggestions(raw),
            vec![
                "First idea here".to_owned(),
                "Second idea here".to_owned(),
                "Third idea here".to_owned(),
            ]
        );
    }

    #[test]
    fn test_parse_suggestions_length_bounds_are_exclusive() {
        let at_min = "a".repeat(5);
        let above_min = "b".repeat(6);
        let below_max = "c".repeat(499);
        let at_max = "d".repeat(500);
        let raw = [at_min, above_min.clone(), below_max.clone(), at_max].join("\n\n");
        let parsed = parse_suggestions(&raw);
        assert_eq!(parsed, vec![above_min, below_max]);
        assert!(parsed
            .iter()
            .all(|s| s.chars().count() > 5 && s.chars().count() < 500));
    }

    #[test]
    fn test_critique_with_both_markers() {
        let parsed = parse_critique_response(
            "[CRITIQUE]: Too generic.\n[FINAL REPLY]: 1. Better line here",
            "ORIGINAL",
        );
        assert_eq!(parsed.critique, "Too generic.");
        assert_eq!(parsed.final_reply, "1. Better line here");
    }

    #[test]
    fn test_critique_markers_are_case_insensitive() {
        let parsed = parse_critique_response(
            "[critique]: ok\n[Final Reply]: keep it",
            "ORIGINAL",
        );
        assert_eq!(parsed.final_reply, "keep it");
    }

    #[test]
    fn test_critique_empty_final_reply_keeps_original_with_warning() {
        let parsed = parse_critique_response("[CRITIQUE]: fine\n[FINAL REPLY]:   ", "ORIGINAL");
        assert_eq!(parsed.final_reply, "ORIGINAL");
        assert!(parsed.critique.contains("[WARNING]"));
        assert!(parsed.critique.starts_with("fine"));
    }

    #[test]
    fn test_critique_without_markers_is_format_error() {
        let parsed = parse_critique_response("unstructured text", "ORIGINAL");
        assert_eq!(parsed.final_reply, "ORIGINAL");
        assert_eq!(parsed.critique, CRITIQUE_FORMAT_ERROR);

        let only_one = parse_critique_response("[CRITIQUE]: missing the rest", "ORIGINAL");
        assert_eq!(only_one.critique, CRITIQUE_FORMAT_ERROR);
    }
}
