use crate::context::message::Citation;
use crate::llm::CitationRecord;
use std::collections::HashSet;

/// Collapse raw grounding records into the citation list shown to users.
///
/// Records are keyed by `uri` alone. Records without a uri (or with an empty
/// one) are dropped; among duplicates the earliest record wins, and the output
/// keeps arrival order.
pub fn dedup_citations<'a, I>(records: I) -> Vec<Citation>
where
    I: IntoIterator<Item = &'a CitationRecord>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for record in records {
        let Some(uri) = record.uri.as_deref().filter(|u| !u.is_empty()) else {
            continue;
        };
        if seen.insert(uri.to_string()) {
            out.push(Citation {
                title: record.title.clone(),
                uri: uri.to_string(),
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_wins() {
        let records = vec![
            CitationRecord::new("a"),
            CitationRecord::new("b"),
            CitationRecord::new("a").with_title("A2"),
        ];
        let citations = dedup_citations(&records);
        assert_eq!(
            citations,
            vec![
                Citation { title: None, uri: "a".into() },
                Citation { title: None, uri: "b".into() },
            ]
        );
    }

    #[test]
    fn test_missing_and_empty_uri_dropped() {
        let records = vec![
            CitationRecord {
                title: Some("no uri".into()),
                uri: None,
            },
            CitationRecord::new("").with_title("empty"),
            CitationRecord::new("https://ok.example"),
        ];
        let citations = dedup_citations(&records);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].uri, "https://ok.example");
    }

    #[test]
    fn test_same_record_twice_is_idempotent() {
        let record = CitationRecord::new("u").with_title("first");
        let again = CitationRecord::new("u").with_title("second");
        let once = dedup_citations([&record]);
        let twice = dedup_citations([&record, &again]);
        assert_eq!(once, twice);
        assert_eq!(twice[0].title.as_deref(), Some("first"));
    }

    #[test]
    fn test_empty_input() {
        assert!(dedup_citations(&Vec::<CitationRecord>::new()).is_empty());
    }
}
