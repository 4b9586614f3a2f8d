use studionavi_common::Studio;

/// Maximum number of studios a search returns.
pub const RESULT_LIMIT: usize = 10;

/// Score of the best match between `query` and the studio's name or address:
/// exact 100, prefix 80, substring 60, none 0.
pub fn relevance(studio: &Studio, query: &str) -> u8 {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return 0;
    }
    [&studio.name, &studio.address]
        .iter()
        .map(|field| {
            let field = field.to_lowercase();
            if field == query {
                100
            } else if field.starts_with(&query) {
                80
            } else if field.contains(&query) {
                60
            } else {
                0
            }
        })
        .max()
        .unwrap_or(0)
}

/// Order candidates by relevance, keep the best `RESULT_LIMIT`. Stable, so
/// equal scores stay in the order given.
pub fn rank(candidates: Vec<Studio>, query: &str) -> Vec<Studio> {
    let mut scored: Vec<(u8, Studio)> = candidates
        .into_iter()
        .map(|s| (relevance(&s, query), s))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(RESULT_LIMIT).map(|(_, s)| s).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn studio(id: i64, name: &str, address: &str) -> Studio {
        Studio {
            id,
            name: name.to_string(),
            address: address.to_string(),
            hours: String::new(),
            self_booking_start: String::new(),
            has_availability: true,
        }
    }

    #[test]
    fn scores() {
        let s = studio(1, "PADstudio", "大阪市中央区");
        assert_eq!(relevance(&s, "padstudio"), 100);
        assert_eq!(relevance(&s, "PAD"), 80);
        assert_eq!(relevance(&s, "studio"), 60);
        assert_eq!(relevance(&s, "中央区"), 60);
        assert_eq!(relevance(&s, "大阪"), 80);
        assert_eq!(relevance(&s, "京都"), 0);
        assert_eq!(relevance(&s, "  "), 0);
    }

    #[test]
    fn rank_orders_by_score_then_input_order() {
        let candidates = vec![
            studio(1, "Green studio", "x"),
            studio(2, "studio", "y"),
            studio(3, "Studio 246", "z"),
            studio(4, "Blue studio", "w"),
        ];
        let ids: Vec<i64> = rank(candidates, "studio").iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 3, 1, 4]);
    }

    #[test]
    fn rank_truncates() {
        let candidates = (1..=15).map(|i| studio(i, &format!("studio {}", i), "")).collect();
        assert_eq!(rank(candidates, "studio").len(), RESULT_LIMIT);
    }
}
