//! Keyword-based theme grouping over search results.
//!
//! A theme matches a result when any of its keywords appears in the result
//! text, case-insensitively. Each matched theme cites up to three source
//! locations in `filename (page N)` form. Themes with no matches are
//! omitted from the output.

use crate::config::ThemeConfig;
use crate::models::{SearchResultItem, Theme};

const MAX_CITATIONS: usize = 3;

pub fn group_themes(results: &[SearchResultItem], themes: &[ThemeConfig]) -> Vec<Theme> {
    let lowered: Vec<String> = results.iter().map(|r| r.text.to_lowercase()).collect();

    themes
        .iter()
        .filter_map(|theme| {
            let mut citations = Vec::new();
            for (result, text) in results.iter().zip(&lowered) {
                let matched = theme
                    .keywords
                    .iter()
                    .any(|k| text.contains(&k.to_lowercase()));
                if matched {
                    let citation = format!("{} (page {})", result.metadata.filename, result.page);
                    if !citations.contains(&citation) {
                        citations.push(citation);
                    }
                    if citations.len() == MAX_CITATIONS {
                        break;
                    }
                }
            }

            if citations.is_empty() {
                None
            } else {
                Some(Theme {
                    name: theme.name.clone(),
                    description: theme.description.clone(),
                    citations,
                })
            }
        })
        .collect()
}
