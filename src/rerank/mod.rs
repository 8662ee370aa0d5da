//! Lexical reranking of graph search candidates

pub mod bm25;

pub use bm25::Bm25Okapi;

use crate::types::{RelationTriple, SearchCandidate};

/// Number of results a search returns after reranking
pub const SEARCH_RESULT_LIMIT: usize = 5;

/// Rank candidates against `query` and keep the best `n`
///
/// Each candidate is indexed as the three tokens `[source, relationship,
/// destination]`; the query is split on single spaces.
pub fn rerank_candidates(query: &str, candidates: &[SearchCandidate], n: usize) -> Vec<RelationTriple> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let corpus: Vec<Vec<String>> = candidates.iter().map(SearchCandidate::tokens).collect();
    let bm25 = Bm25Okapi::new(&corpus);
    let tokens: Vec<&str> = query.split(' ').collect();

    bm25.top_n(&tokens, n)
        .into_iter()
        .map(|i| {
            let c = &candidates[i];
            RelationTriple::new(&c.source, &c.relationship, &c.destination)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(source: &str, relationship: &str, destination: &str) -> SearchCandidate {
        SearchCandidate {
            source: source.to_string(),
            relationship: relationship.to_string(),
            destination: destination.to_string(),
            similarity: Some(0.9),
        }
    }

    #[test]
    fn test_rerank_prefers_lexical_match() {
        let candidates = vec![
            candidate("u1", "works_at", "acme"),
            candidate("u1", "lives_in", "paris"),
            candidate("u1", "likes", "pizza"),
        ];

        let results = rerank_candidates("where does u1 works_at", &candidates, SEARCH_RESULT_LIMIT);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], RelationTriple::new("u1", "works_at", "acme"));
    }

    #[test]
    fn test_rerank_limits_output() {
        let candidates: Vec<_> = (0..8)
            .map(|i| candidate("u1", "knows", &format!("friend_{}", i)))
            .collect();
        assert_eq!(rerank_candidates("u1 knows", &candidates, SEARCH_RESULT_LIMIT).len(), 5);
    }

    #[test]
    fn test_rerank_empty() {
        assert!(rerank_candidates("anything", &[], SEARCH_RESULT_LIMIT).is_empty());
    }
}
