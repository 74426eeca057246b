use crate::models::{DecisionRecord, Outcome};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

const MAX_ISSUES: usize = 5;
const MAX_CFR_CITATIONS: usize = 10;
const MAX_MANUAL_CITATIONS: usize = 5;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Decision\s*Date\s*[:\-]\s*([A-Za-z]{3,9}\s+\d{1,2},\s+\d{4}|\d{1,2}/\d{1,2}/\d{4})")
        .expect("date pattern")
});
static DOCKET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Docket\s*No\.?\s*[:\-]?\s*([\w\s/-]+)").expect("docket pattern")
});
static GRANTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bgranted\b").expect("granted pattern"));
static DENIED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdenied\b").expect("denied pattern"));
static REMANDED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bremanded\b").expect("remanded pattern"));
static ISSUES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ISSUES?\s*[:\-]?\s*(.*)").expect("issues pattern"));
static ISSUE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\d+\.\s*|;|\n").expect("issue split pattern"));
static CFR_CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)38\s*CFR\s*§\s*([\d.]+[a-z0-9()]*)").expect("cfr citation pattern")
});
static MANUAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)M21-1[\w.\s-]*").expect("manual citation pattern"));
static REGIONAL_OFFICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Regional\s+Office\s+in\s+([A-Za-z\s,]+)").expect("regional office pattern")
});
static JUDGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Acting\s+)?Veterans\s+Law\s+Judge\s*[:\-]?\s*([A-Z][A-Za-z\s.-]+)")
        .expect("judge pattern")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%m/%d/%Y"];

/// Extract structured metadata from raw decision text. Heuristic by design:
/// each field is matched independently and unmatched patterns simply leave
/// the field absent, so this never fails.
pub fn parse_decision_text(text: &str) -> DecisionRecord {
    DecisionRecord {
        decision_date: extract_date(text),
        docket_no: extract_docket(text),
        outcome: extract_outcome(text),
        issues: extract_issues(text),
        citations: extract_citations(text),
        regional_office: extract_regional_office(text),
        judge: extract_judge(text),
    }
}

fn extract_date(text: &str) -> Option<NaiveDate> {
    let raw = DATE_RE.captures(text)?.get(1)?.as_str();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

fn extract_docket(text: &str) -> Option<String> {
    let raw = DOCKET_RE.captures(text)?.get(1)?.as_str();
    let collapsed = WHITESPACE_RE.replace_all(raw, " ").trim().to_string();
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

fn extract_outcome(text: &str) -> Option<Outcome> {
    let matched: Vec<Outcome> = [
        (&GRANTED_RE, Outcome::Granted),
        (&DENIED_RE, Outcome::Denied),
        (&REMANDED_RE, Outcome::Remanded),
    ]
    .iter()
    .filter(|(pattern, _)| pattern.is_match(text))
    .map(|(_, outcome)| *outcome)
    .collect();

    match matched.as_slice() {
        [] => None,
        [single] => Some(*single),
        _ => Some(Outcome::Mixed),
    }
}

fn extract_issues(text: &str) -> Vec<String> {
    let Some(captures) = ISSUES_RE.captures(text) else {
        return Vec::new();
    };
    let Some(line) = captures.get(1) else {
        return Vec::new();
    };
    ISSUE_SPLIT_RE
        .split(line.as_str())
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .take(MAX_ISSUES)
        .map(str::to_string)
        .collect()
}

fn extract_citations(text: &str) -> Vec<String> {
    let mut citations = BTreeSet::new();

    for captures in CFR_CITATION_RE.captures_iter(text).take(MAX_CFR_CITATIONS) {
        if let Some(id) = captures.get(1) {
            citations.insert(format!("38 CFR § {}", id.as_str()));
        }
    }

    for matched in MANUAL_RE.find_iter(text).take(MAX_MANUAL_CITATIONS) {
        let token = matched.as_str().trim();
        if !token.is_empty() {
            citations.insert(token.to_string());
        }
    }

    citations.into_iter().collect()
}

fn extract_regional_office(text: &str) -> Option<String> {
    let raw = REGIONAL_OFFICE_RE.captures(text)?.get(1)?.as_str();
    let place = raw.trim().trim_end_matches('.').trim_end().to_string();
    if place.is_empty() {
        None
    } else {
        Some(place)
    }
}

fn extract_judge(text: &str) -> Option<String> {
    let raw = JUDGE_RE.captures(text)?.get(1)?.as_str();
    let name = raw.trim().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_docket_date_and_outcome() {
        let text = "Docket No. 12-34567 ... Decision Date: January 5, 2021 ... REMANDED";
        let record = parse_decision_text(text);
        assert_eq!(record.docket_no.as_deref(), Some("12-34567"));
        assert_eq!(
            record.decision_date,
            NaiveDate::from_ymd_opt(2021, 1, 5)
        );
        assert_eq!(record.outcome, Some(Outcome::Remanded));
    }

    #[test]
    fn parses_numeric_date() {
        let record = parse_decision_text("Decision Date: 03/14/2019\n");
        assert_eq!(record.decision_date, NaiveDate::from_ymd_opt(2019, 3, 14));
    }

    #[test]
    fn unparseable_date_is_absent() {
        let record = parse_decision_text("Decision Date: Febtember 99, 2021");
        assert!(record.decision_date.is_none());
    }

    #[test]
    fn single_outcome_keyword_maps_to_label() {
        let record = parse_decision_text("Service connection for tinnitus is granted.");
        assert_eq!(record.outcome, Some(Outcome::Granted));
    }

    #[test]
    fn outcome_keyword_must_be_whole_word() {
        let record = parse_decision_text("The motion was regranted-ish, whatever that means.");
        assert_eq!(record.outcome, None);
    }

    #[test]
    fn two_distinct_keywords_mean_mixed() {
        let record = parse_decision_text(
            "Service connection is GRANTED. The claim for an increased rating is DENIED.",
        );
        assert_eq!(record.outcome, Some(Outcome::Mixed));
    }

    #[test]
    fn repeated_single_keyword_is_not_mixed() {
        let record = parse_decision_text("Denied. The appeal is denied. DENIED again.");
        assert_eq!(record.outcome, Some(Outcome::Denied));
    }

    #[test]
    fn no_outcome_keyword_leaves_field_absent() {
        let record = parse_decision_text("The Board has reviewed the evidence of record.");
        assert_eq!(record.outcome, None);
    }

    #[test]
    fn issues_split_on_numbered_markers_and_semicolons() {
        let text =
            "ISSUES: 1. Entitlement to service connection for PTSD; 2. Entitlement to TDIU";
        let record = parse_decision_text(text);
        assert_eq!(
            record.issues,
            vec![
                "Entitlement to service connection for PTSD",
                "Entitlement to TDIU",
            ]
        );
    }

    #[test]
    fn issues_are_capped_at_five() {
        let text = "ISSUES: one; two; three; four; five; six; seven";
        let record = parse_decision_text(text);
        assert_eq!(record.issues.len(), 5);
        assert_eq!(record.issues[0], "one");
        assert_eq!(record.issues[4], "five");
    }

    #[test]
    fn citations_are_deduped_and_sorted() {
        let text = "See 38 CFR § 4.130 and 38 CFR § 3.102, and again 38 CFR § 4.130, \
                    plus M21-1, Part III.";
        let record = parse_decision_text(text);
        assert_eq!(record.citations.len(), 3);
        assert!(record.citations.contains(&"38 CFR § 3.102".to_string()));
        assert!(record.citations.contains(&"38 CFR § 4.130".to_string()));
        assert!(record.citations.iter().any(|c| c.starts_with("M21-1")));
        let mut sorted = record.citations.clone();
        sorted.sort();
        assert_eq!(record.citations, sorted);
    }

    #[test]
    fn citation_family_caps_apply_before_the_union() {
        let cfr_refs: Vec<String> = (0..15).map(|n| format!("38 CFR § 3.{}", 100 + n)).collect();
        let manual_refs: Vec<String> = (b'a'..=b'h')
            .map(|letter| format!("M21-1.III.iv.4.{}", letter as char))
            .collect();
        let text = format!("{}, and {}", cfr_refs.join(", "), manual_refs.join(", "));
        let record = parse_decision_text(&text);

        let cfr_kept = record
            .citations
            .iter()
            .filter(|citation| citation.starts_with("38 CFR §"))
            .count();
        let manual_kept = record
            .citations
            .iter()
            .filter(|citation| citation.starts_with("M21-1"))
            .count();
        assert_eq!(cfr_kept, 10);
        assert_eq!(manual_kept, 5);

        // Caps keep the first matches in document order.
        assert!(record.citations.contains(&"38 CFR § 3.109".to_string()));
        assert!(!record.citations.contains(&"38 CFR § 3.110".to_string()));
        assert!(record.citations.contains(&"M21-1.III.iv.4.e".to_string()));
        assert!(!record.citations.contains(&"M21-1.III.iv.4.f".to_string()));
    }

    #[test]
    fn regional_office_drops_trailing_period() {
        let record = parse_decision_text(
            "This matter comes from the Regional Office in Waco, Texas. The veteran served...",
        );
        assert_eq!(record.regional_office.as_deref(), Some("Waco, Texas"));
    }

    #[test]
    fn judge_name_follows_label() {
        let record = parse_decision_text("Veterans Law Judge: K. Parakkal");
        assert_eq!(record.judge.as_deref(), Some("K. Parakkal"));
    }

    #[test]
    fn acting_judge_variant_is_recognized() {
        let record = parse_decision_text("Acting Veterans Law Judge M. Sorisio");
        assert_eq!(record.judge.as_deref(), Some("M. Sorisio"));
    }

    #[test]
    fn empty_text_yields_empty_record() {
        let record = parse_decision_text("");
        assert_eq!(record, DecisionRecord::default());
    }
}
