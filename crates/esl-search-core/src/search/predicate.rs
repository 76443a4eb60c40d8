//! Filter predicates over entity rows.
//!
//! A [`Predicate`] is an engine-neutral boolean expression. Stores either
//! evaluate it directly ([`Predicate::matches`]) or render it to a
//! parameterized SQL fragment ([`Predicate::to_sql`]).

use std::borrow::Cow;

/// Boolean filter expression over named row fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// No constraint.
    MatchAll,
    /// OR over the children. Empty matches nothing.
    Any(Vec<Predicate>),
    /// AND over the children. Empty matches everything.
    All(Vec<Predicate>),
    /// Case-insensitive substring match.
    Contains { field: String, term: String },
    /// Case-insensitive equality against any of `values`.
    In { field: String, values: Vec<String> },
    /// Field is present and not just whitespace.
    NonBlank { field: String },
}

/// Whitespace ignored when deciding whether a text field is blank.
///
/// Kept to the characters SQLite's `trim` can be told about so both store
/// engines agree on which rows carry text.
pub const BLANK_CHARS: [char; 4] = [' ', '\t', '\n', '\r'];

/// Strip [`BLANK_CHARS`] from both ends.
pub fn trim_blank(text: &str) -> &str {
    text.trim_matches(BLANK_CHARS)
}

/// Read access to a row's fields for in-memory evaluation.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;
}

/// A rendered SQL `WHERE` fragment and its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<String>,
}

/// Build the "any word in any field" predicate.
///
/// Produces one `Contains` leaf per (token, field) pair under a single flat
/// `Any`. An empty token list means no text constraint and yields
/// [`Predicate::MatchAll`]. An empty field list with tokens yields an empty
/// `Any`, which matches nothing.
pub fn build_any_word_where<S: AsRef<str>>(tokens: &[String], fields: &[S]) -> Predicate {
    if tokens.is_empty() {
        return Predicate::MatchAll;
    }

    let mut branches = Vec::with_capacity(tokens.len() * fields.len());
    for token in tokens {
        for field in fields {
            branches.push(Predicate::Contains {
                field: field.as_ref().to_string(),
                term: token.to_lowercase(),
            });
        }
    }

    Predicate::Any(branches)
}

impl Predicate {
    /// Membership constraint on one field.
    pub fn one_of<S: AsRef<str>>(field: &str, values: &[S]) -> Self {
        Predicate::In {
            field: field.to_string(),
            values: values.iter().map(|v| v.as_ref().to_lowercase()).collect(),
        }
    }

    /// Non-blank constraint on one field.
    pub fn non_blank(field: &str) -> Self {
        Predicate::NonBlank {
            field: field.to_string(),
        }
    }

    /// AND this predicate with another, dropping `MatchAll` operands.
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::MatchAll, p) | (p, Predicate::MatchAll) => p,
            (Predicate::All(mut left), Predicate::All(right)) => {
                left.extend(right);
                Predicate::All(left)
            }
            (Predicate::All(mut left), p) => {
                left.push(p);
                Predicate::All(left)
            }
            (p, other) => Predicate::All(vec![p, other]),
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Predicate::MatchAll)
    }

    /// Number of branches under the top-level OR.
    ///
    /// A lone leaf counts as one branch and `MatchAll` as none.
    pub fn or_branches(&self) -> usize {
        match self {
            Predicate::MatchAll => 0,
            Predicate::Any(children) => children.len(),
            _ => 1,
        }
    }

    /// Total number of leaf conditions in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::MatchAll => 0,
            Predicate::Any(children) | Predicate::All(children) => {
                children.iter().map(Predicate::leaf_count).sum()
            }
            Predicate::Contains { .. } | Predicate::In { .. } | Predicate::NonBlank { .. } => 1,
        }
    }

    /// Evaluate against a row held in memory.
    pub fn matches(&self, row: &impl FieldSource) -> bool {
        match self {
            Predicate::MatchAll => true,
            Predicate::Any(children) => children.iter().any(|p| p.matches(row)),
            Predicate::All(children) => children.iter().all(|p| p.matches(row)),
            Predicate::Contains { field, term } => row
                .field(field)
                .map(|value| value.to_lowercase().contains(&term.to_lowercase()))
                .unwrap_or(false),
            Predicate::In { field, values } => row
                .field(field)
                .map(|value| values.iter().any(|v| v.eq_ignore_ascii_case(&value)))
                .unwrap_or(false),
            Predicate::NonBlank { field } => row
                .field(field)
                .map(|value| !trim_blank(&value).is_empty())
                .unwrap_or(false),
        }
    }

    /// Render as a SQLite `WHERE` fragment with `?` placeholders.
    ///
    /// Substring matches use `LIKE` over the lowercased column with `\` as the
    /// escape character, so `%` and `_` in terms match literally.
    pub fn to_sql(&self) -> SqlFragment {
        let mut params = Vec::new();
        let sql = self.write_sql(&mut params);
        SqlFragment { sql, params }
    }

    fn write_sql(&self, params: &mut Vec<String>) -> String {
        match self {
            Predicate::MatchAll => "1=1".to_string(),
            Predicate::Any(children) if children.is_empty() => "0=1".to_string(),
            Predicate::All(children) if children.is_empty() => "1=1".to_string(),
            Predicate::Any(children) => join_sql(children, " OR ", params),
            Predicate::All(children) => join_sql(children, " AND ", params),
            Predicate::Contains { field, term } => {
                params.push(format!("%{}%", escape_like(&term.to_lowercase())));
                format!(
                    "lower(coalesce({}, '')) LIKE ? ESCAPE '\\'",
                    quote_ident(field)
                )
            }
            Predicate::In { values, .. } if values.is_empty() => "0=1".to_string(),
            Predicate::In { field, values } => {
                params.extend(values.iter().map(|v| v.to_lowercase()));
                let placeholders = vec!["?"; values.len()].join(", ");
                format!("lower({}) IN ({})", quote_ident(field), placeholders)
            }
            Predicate::NonBlank { field } => format!(
                "trim(coalesce({}, ''), ' ' || char(9, 10, 13)) <> ''",
                quote_ident(field)
            ),
        }
    }
}

fn join_sql(children: &[Predicate], sep: &str, params: &mut Vec<String>) -> String {
    let parts: Vec<String> = children.iter().map(|c| c.write_sql(params)).collect();
    format!("({})", parts.join(sep))
}

/// Escape `LIKE` wildcards and the escape character itself.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Row(HashMap<&'static str, &'static str>);

    impl FieldSource for Row {
        fn field(&self, name: &str) -> Option<Cow<'_, str>> {
            self.0.get(name).map(|v| Cow::Borrowed(*v))
        }
    }

    fn row(pairs: &[(&'static str, &'static str)]) -> Row {
        Row(pairs.iter().copied().collect())
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_any_word_branch_count() {
        let predicate =
            build_any_word_where(&tokens(&["english", "grammar"]), &["title", "description"]);
        assert!(predicate.or_branches() >= 2);
        assert_eq!(predicate.or_branches(), 4);
        assert_eq!(predicate.leaf_count(), 4);
    }

    #[test]
    fn test_empty_tokens_match_everything() {
        let predicate = build_any_word_where(&[], &["title"]);
        assert!(predicate.is_match_all());
        assert!(predicate.matches(&row(&[("title", "anything")])));
        assert_eq!(predicate.to_sql().sql, "1=1");
    }

    #[test]
    fn test_empty_fields_match_nothing() {
        let fields: [&str; 0] = [];
        let predicate = build_any_word_where(&tokens(&["english"]), &fields);
        assert!(!predicate.matches(&row(&[("title", "english")])));
        assert_eq!(predicate.to_sql().sql, "0=1");
    }

    #[test]
    fn test_matches_any_token_in_any_field() {
        let predicate =
            build_any_word_where(&tokens(&["grammar", "phonics"]), &["title", "description"]);

        assert!(predicate.matches(&row(&[("title", "Everyday GRAMMAR"), ("description", "")])));
        assert!(predicate.matches(&row(&[
            ("title", "Course"),
            ("description", "Intro to Phonics")
        ])));
        assert!(!predicate.matches(&row(&[("title", "Vocabulary"), ("description", "Words")])));
        // Fields outside the list are not consulted.
        assert!(!predicate.matches(&row(&[("title", "x"), ("content", "grammar")])));
    }

    #[test]
    fn test_and_with_level_filter() {
        let text = build_any_word_where(&tokens(&["story"]), &["title"]);
        let predicate = text.and(Predicate::one_of("level", &["A1", "b1"]));

        assert!(predicate.matches(&row(&[("title", "Short story"), ("level", "a1")])));
        assert!(!predicate.matches(&row(&[("title", "Short story"), ("level", "c2")])));
        assert!(!predicate.matches(&row(&[("title", "Podcast"), ("level", "a1")])));
    }

    #[test]
    fn test_and_drops_match_all() {
        let level = Predicate::one_of("level", &["a2"]);
        assert_eq!(Predicate::MatchAll.and(level.clone()), level);
        assert_eq!(level.clone().and(Predicate::MatchAll), level);
    }

    #[test]
    fn test_to_sql_shape_and_params() {
        let predicate = build_any_word_where(&tokens(&["ielts"]), &["title", "tags"])
            .and(Predicate::one_of("level", &["B2"]));
        let fragment = predicate.to_sql();

        assert_eq!(
            fragment.sql,
            "((lower(coalesce(\"title\", '')) LIKE ? ESCAPE '\\' OR \
             lower(coalesce(\"tags\", '')) LIKE ? ESCAPE '\\') AND lower(\"level\") IN (?))"
        );
        assert_eq!(fragment.params, vec!["%ielts%", "%ielts%", "b2"]);
    }

    #[test]
    fn test_non_blank() {
        let predicate = Predicate::non_blank("excerpt");
        assert!(predicate.matches(&row(&[("excerpt", " Once upon a time ")])));
        assert!(!predicate.matches(&row(&[("excerpt", " \t\n ")])));
        assert!(!predicate.matches(&row(&[("title", "No excerpt")])));
        assert_eq!(
            predicate.to_sql().sql,
            "trim(coalesce(\"excerpt\", ''), ' ' || char(9, 10, 13)) <> ''"
        );
        assert!(predicate.to_sql().params.is_empty());
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        let predicate = Predicate::Contains {
            field: "title".into(),
            term: "100%_x".into(),
        };
        assert_eq!(predicate.to_sql().params, vec!["%100\\%\\_x%"]);
    }
}
