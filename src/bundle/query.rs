//! Artifact query construction.
//!
//! The distribution service selects bundle content with AQL queries. Each
//! source pattern becomes one `items.find(...)` query; exclusion patterns
//! are folded into every query as negated matches.

use serde_json::{Value, json};

/// Split `repo/path/name` into its three parts.
///
/// A pattern with no path component (`repo/name`) matches at the repository
/// root and in any sub-directory, which mirrors how wildcard file specs are
/// resolved by the source repository.
fn split_pattern(pattern: &str) -> (String, Vec<String>, String) {
    let trimmed = pattern.trim_start_matches('/');
    let (repo, rest) = trimmed.split_once('/').unwrap_or((trimmed, "*"));
    let rest = if rest.is_empty() { "*" } else { rest };

    match rest.rsplit_once('/') {
        Some((path, name)) => {
            let name = if name.is_empty() { "*" } else { name };
            (repo.to_string(), vec![path.to_string()], name.to_string())
        }
        None => (
            repo.to_string(),
            vec![".".to_string(), "*".to_string()],
            rest.to_string(),
        ),
    }
}

fn exclusion_clause(pattern: &str) -> Value {
    match pattern.rsplit_once('/') {
        Some((path, name)) => json!({
            "$or": [
                { "path": { "$nmatch": path } },
                { "name": { "$nmatch": name } }
            ]
        }),
        None => json!({ "name": { "$nmatch": pattern } }),
    }
}

/// Build the AQL criteria object for one pattern
pub fn criteria(pattern: &str, exclusions: &[String]) -> Value {
    let (repo, paths, name) = split_pattern(pattern);

    let locations: Vec<Value> = paths
        .into_iter()
        .map(|path| {
            json!({
                "path": { "$match": path },
                "name": { "$match": name }
            })
        })
        .collect();

    let mut clauses = vec![json!({ "repo": repo })];
    if locations.len() == 1 {
        clauses.extend(locations);
    } else {
        clauses.push(json!({ "$or": locations }));
    }
    clauses.extend(exclusions.iter().map(|e| exclusion_clause(e)));

    json!({ "$and": clauses })
}

/// Render the full `items.find(...)` query for one pattern
pub fn to_aql(pattern: &str, exclusions: &[String]) -> String {
    format!("items.find({})", criteria(pattern, exclusions))
}
