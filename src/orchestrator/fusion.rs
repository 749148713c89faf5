/// Rank fusion for hybrid search
///
/// Combines the store's vector ranking with an orchestration-side keyword
/// ranking of the same candidates using Reciprocal Rank Fusion.
use crate::store::SearchResult;
use std::collections::HashMap;
use std::hash::Hash;

/// Standard RRF constant; dampens the weight gap between adjacent ranks
const RRF_K_CONSTANT: f32 = 60.0;

/// Reciprocal Rank Fusion over any number of ranked lists.
///
/// Each list contributes `1 / (k + rank)` per item; items appearing in
/// several lists accumulate. Returns `(id, fused score)` sorted by score
/// descending, truncated to `limit`.
pub(crate) fn reciprocal_rank_fusion<T, I, L>(ranked_lists: I, limit: usize) -> Vec<(T, f32)>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = (T, f32)>,
{
    let mut score_map: HashMap<T, f32> = HashMap::new();

    for list in ranked_lists {
        for (rank, (id, _score)) in list.into_iter().enumerate() {
            let rrf_score = 1.0 / (RRF_K_CONSTANT + (rank + 1) as f32);
            *score_map.entry(id).or_insert(0.0) += rrf_score;
        }
    }

    let mut combined: Vec<(T, f32)> = score_map.into_iter().collect();
    combined.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    combined.truncate(limit);

    combined
}

/// Rank candidates by query-token overlap.
///
/// Tokens are lowercase alphanumeric runs; a candidate's score is the
/// fraction of query tokens present in its content. Candidates with no
/// overlap are left out so they contribute nothing to the fusion.
pub(crate) fn keyword_rank(query: &str, candidates: &[SearchResult]) -> Vec<(usize, f32)> {
    let tokens: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect();

    if tokens.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(idx, candidate)| {
            let content = candidate.content.to_lowercase();
            let hits = tokens.iter().filter(|t| content.contains(t.as_str())).count();
            if hits == 0 {
                None
            } else {
                Some((idx, hits as f32 / tokens.len() as f32))
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}
