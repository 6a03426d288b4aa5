//! Filter-expression construction and literal escaping.
//!
//! Two string-literal syntaxes are in play, and they nest. The filter
//! expression itself uses single-quoted literals with embedded `'` doubled.
//! The host-document formula that hands the expression to the query facility
//! uses double-quoted literals with embedded `"` doubled, plus single-quoted
//! sheet references. A raw value passing through both layers is escaped
//! independently by each.

/// Render a value as a filter-expression string literal (`'...'`, `'`
/// doubled).
pub fn query_string_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

/// Render a value as a host-formula string literal (`"..."`, `"` doubled).
pub fn formula_string_literal(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

/// Render a sheet name for use in a host-formula range reference.
pub fn sheet_name_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

/// Compose the host-document formula that hands `query` to the query facility
/// over all columns of `sheet`.
pub fn query_formula(sheet: &str, query: &str) -> String {
    format!(
        "=QUERY({}!A:Z, {})",
        sheet_name_literal(sheet),
        formula_string_literal(query),
    )
}

/// Builds filter expressions from structured predicates.
///
/// Column numbers are 1-indexed over the query facility's view of a sheet,
/// where `Col1` is the synthetic row address and data columns start at
/// `Col2`. Literals are escaped here; they are not otherwise validated. An
/// empty or nonsensical value renders fine and simply matches nothing
/// downstream.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    clauses: Vec<String>,
    order_by: Option<u32>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `ColN = 'value'` clause.
    pub fn eq_text(mut self, col: u32, value: &str) -> Self {
        self.clauses
            .push(format!("Col{col} = {}", query_string_literal(value)));
        self
    }

    /// Add a `ColN > value` clause over a numeric column.
    pub fn gt_number(mut self, col: u32, value: i64) -> Self {
        self.clauses.push(format!("Col{col} > {value}"));
        self
    }

    /// Sort results ascending by the given column.
    pub fn order_by(mut self, col: u32) -> Self {
        self.order_by = Some(col);
        self
    }

    /// Render the expression. With no clauses the filter matches every row.
    pub fn build(self) -> String {
        let mut out = String::from("select *");
        if !self.clauses.is_empty() {
            out.push_str(" where ");
            out.push_str(&self.clauses.join(" and "));
        }
        if let Some(col) = self.order_by {
            out.push_str(&format!(" order by Col{col}"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_literals_double_single_quotes() {
        assert_eq!(query_string_literal("plain"), "'plain'");
        assert_eq!(query_string_literal("it's"), "'it''s'");
        assert_eq!(query_string_literal(""), "''");
    }

    #[test]
    fn formula_literals_double_double_quotes() {
        assert_eq!(formula_string_literal("plain"), "\"plain\"");
        assert_eq!(formula_string_literal("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn sheet_names_double_single_quotes() {
        assert_eq!(sheet_name_literal("routes"), "'routes'");
        assert_eq!(sheet_name_literal("bob's"), "'bob''s'");
    }

    #[test]
    fn nested_escaping_is_independent_per_layer() {
        // A value containing both quote kinds: the inner layer doubles `'`,
        // the outer layer doubles `"`, including the ones the inner layer
        // left untouched.
        let query = format!("select * where Col4 = {}", query_string_literal("a'b\"c"));
        assert_eq!(query, "select * where Col4 = 'a''b\"c'");

        let formula = query_formula("routes", &query);
        assert_eq!(
            formula,
            "=QUERY('routes'!A:Z, \"select * where Col4 = 'a''b\"\"c'\")"
        );
    }

    #[test]
    fn builder_renders_the_route_fetch_shape() {
        let query = QueryBuilder::new()
            .eq_text(2, "route")
            .eq_text(3, "u1")
            .gt_number(10, 0)
            .order_by(10)
            .build();
        assert_eq!(
            query,
            "select * where Col2 = 'route' and Col3 = 'u1' and Col10 > 0 order by Col10"
        );
    }

    #[test]
    fn builder_without_clauses_selects_everything() {
        assert_eq!(QueryBuilder::new().build(), "select *");
        assert_eq!(
            QueryBuilder::new().order_by(10).build(),
            "select * order by Col10"
        );
    }

    #[test]
    fn builder_escapes_clause_values() {
        let query = QueryBuilder::new().eq_text(4, "it's").build();
        assert_eq!(query, "select * where Col4 = 'it''s'");
    }
}
