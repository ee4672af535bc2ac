//! Leaf comparison nodes and their operator-to-SQL translation.
//!
//! A [`Comparison`] is a single column/operator/operand triple. Operator
//! methods are fluent and last-write-wins: re-invoking one overwrites the
//! previous operator. A comparison whose operator was never set compiles to
//! nothing and is silently skipped by its owning group.

use crate::joins::TableAlias;
use crate::value::Value;
use regex::Regex;

/// A compiled SQL fragment: predicate text plus its bound params in
/// placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
enum MatchArg {
    Pattern(String),
    Regex(String),
}

#[derive(Debug, Clone, PartialEq)]
enum CmpOp {
    /// Equality; the operand shape (scalar, list, null) selects the SQL form.
    Eq(Value),
    Match(MatchArg),
    Between(Value, Value),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Contains(Value),
}

/// A single column comparison.
#[derive(Debug, Clone)]
pub struct Comparison {
    column: String,
    op: Option<CmpOp>,
    negated: bool,
    alias: Option<TableAlias>,
}

impl Comparison {
    pub(crate) fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: None,
            negated: false,
            alias: None,
        }
    }

    /// column = value, column IN (?) for a list operand, column IS NULL for
    /// a null operand.
    pub fn eq(&mut self, value: impl Into<Value>) -> &mut Self {
        self.op = Some(CmpOp::Eq(value.into()));
        self
    }

    /// Identity equality. Translates exactly like [`eq`](Self::eq).
    pub fn is(&mut self, value: impl Into<Value>) -> &mut Self {
        self.op = Some(CmpOp::Eq(value.into()));
        self
    }

    /// column LIKE pattern
    pub fn matches(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.op = Some(CmpOp::Match(MatchArg::Pattern(pattern.into())));
        self
    }

    /// column REGEXP pattern; binds the regex's source text.
    pub fn matches_regex(&mut self, re: &Regex) -> &mut Self {
        self.op = Some(CmpOp::Match(MatchArg::Regex(re.as_str().to_string())));
        self
    }

    /// column BETWEEN lo AND hi
    pub fn between(&mut self, lo: impl Into<Value>, hi: impl Into<Value>) -> &mut Self {
        self.op = Some(CmpOp::Between(lo.into(), hi.into()));
        self
    }

    /// column < value
    pub fn lt(&mut self, value: impl Into<Value>) -> &mut Self {
        self.op = Some(CmpOp::Lt(value.into()));
        self
    }

    /// column <= value
    pub fn lte(&mut self, value: impl Into<Value>) -> &mut Self {
        self.op = Some(CmpOp::Lte(value.into()));
        self
    }

    /// column > value
    pub fn gt(&mut self, value: impl Into<Value>) -> &mut Self {
        self.op = Some(CmpOp::Gt(value.into()));
        self
    }

    /// column >= value
    pub fn gte(&mut self, value: impl Into<Value>) -> &mut Self {
        self.op = Some(CmpOp::Gte(value.into()));
        self
    }

    /// column LIKE %value%
    pub fn contains(&mut self, value: impl Into<Value>) -> &mut Self {
        self.op = Some(CmpOp::Contains(value.into()));
        self
    }

    /// Toggle negation; double negation cancels.
    pub fn negate(&mut self) -> &mut Self {
        self.negated = !self.negated;
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub(crate) fn set_alias(&mut self, alias: Option<TableAlias>) {
        self.alias = alias;
    }

    /// Column reference, qualified when alias metadata was assigned.
    pub fn full_name(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{alias}.{}", self.column),
            None => self.column.clone(),
        }
    }

    /// Compile to a predicate fragment. `None` if no operator was set.
    pub fn to_sql(&self) -> Option<SqlFragment> {
        let op = self.op.as_ref()?;
        let col = self.full_name();
        let (sql, params) = match op {
            CmpOp::Eq(Value::Null) => (format!("{col} IS NULL"), vec![]),
            CmpOp::Eq(Value::List(items)) => {
                (format!("{col} IN (?)"), vec![Value::List(items.clone())])
            }
            CmpOp::Eq(v) => (format!("{col} = ?"), vec![v.clone()]),
            CmpOp::Match(MatchArg::Pattern(p)) => {
                (format!("{col} LIKE ?"), vec![Value::Text(p.clone())])
            }
            CmpOp::Match(MatchArg::Regex(src)) => {
                (format!("{col} REGEXP ?"), vec![Value::Text(src.clone())])
            }
            CmpOp::Between(lo, hi) => (
                format!("{col} BETWEEN ? AND ?"),
                vec![lo.clone(), hi.clone()],
            ),
            CmpOp::Lt(v) => (format!("{col} < ?"), vec![v.clone()]),
            CmpOp::Lte(v) => (format!("{col} <= ?"), vec![v.clone()]),
            CmpOp::Gt(v) => (format!("{col} > ?"), vec![v.clone()]),
            CmpOp::Gte(v) => (format!("{col} >= ?"), vec![v.clone()]),
            CmpOp::Contains(v) => (
                format!("{col} LIKE ?"),
                vec![Value::Text(format!("%{v}%"))],
            ),
        };
        let sql = if self.negated {
            format!("NOT ({sql})")
        } else {
            sql
        };
        Some(SqlFragment { sql, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliased(column: &str) -> Comparison {
        let mut cmp = Comparison::new(column);
        cmp.set_alias(Some(TableAlias::new("addresses")));
        cmp
    }

    fn frag(cmp: &Comparison) -> SqlFragment {
        cmp.to_sql().unwrap()
    }

    #[test]
    fn scalar_equality() {
        let mut cmp = aliased("id");
        cmp.eq(1i64);
        assert_eq!(
            frag(&cmp),
            SqlFragment {
                sql: "addresses.id = ?".into(),
                params: vec![Value::Int(1)],
            }
        );
    }

    #[test]
    fn list_equality_compiles_to_in() {
        let mut cmp = aliased("id");
        cmp.is(vec![2i64, 3, 4]);
        assert_eq!(
            frag(&cmp),
            SqlFragment {
                sql: "addresses.id IN (?)".into(),
                params: vec![Value::from(vec![2i64, 3, 4])],
            }
        );
    }

    #[test]
    fn range_equality_compiles_to_in() {
        let mut cmp = aliased("id");
        cmp.eq(2i64..=4);
        assert_eq!(frag(&cmp).sql, "addresses.id IN (?)");
        assert_eq!(frag(&cmp).params, vec![Value::from(vec![2i64, 3, 4])]);
    }

    #[test]
    fn null_equality_compiles_to_is_null() {
        let mut cmp = aliased("city");
        cmp.eq(None::<&str>);
        assert_eq!(
            frag(&cmp),
            SqlFragment {
                sql: "addresses.city IS NULL".into(),
                params: vec![],
            }
        );
    }

    #[test]
    fn string_pattern_compiles_to_like() {
        let mut cmp = aliased("city");
        cmp.matches("Cam%");
        assert_eq!(frag(&cmp).sql, "addresses.city LIKE ?");
        assert_eq!(frag(&cmp).params, vec![Value::from("Cam%")]);
    }

    #[test]
    fn regex_pattern_compiles_to_regexp() {
        let mut cmp = aliased("city");
        cmp.matches_regex(&Regex::new("bridge").unwrap());
        assert_eq!(frag(&cmp).sql, "addresses.city REGEXP ?");
        assert_eq!(frag(&cmp).params, vec![Value::from("bridge")]);
    }

    #[test]
    fn between_binds_both_bounds() {
        let mut cmp = aliased("id");
        cmp.between(1i64, 3i64);
        assert_eq!(frag(&cmp).sql, "addresses.id BETWEEN ? AND ?");
        assert_eq!(frag(&cmp).params, vec![Value::Int(1), Value::Int(3)]);
    }

    #[test]
    fn relational_operators() {
        let mut cmp = aliased("zip");
        cmp.gt("02143");
        assert_eq!(frag(&cmp).sql, "addresses.zip > ?");

        let mut cmp = aliased("id");
        cmp.lt(4i64);
        assert_eq!(frag(&cmp).sql, "addresses.id < ?");

        let mut cmp = aliased("id");
        cmp.lte(4i64);
        assert_eq!(frag(&cmp).sql, "addresses.id <= ?");

        let mut cmp = aliased("id");
        cmp.gte(4i64);
        assert_eq!(frag(&cmp).sql, "addresses.id >= ?");
    }

    #[test]
    fn contains_wraps_with_wildcards() {
        let mut cmp = aliased("city");
        cmp.contains("bridge");
        assert_eq!(frag(&cmp).sql, "addresses.city LIKE ?");
        assert_eq!(frag(&cmp).params, vec![Value::from("%bridge%")]);
    }

    #[test]
    fn negation_wraps_and_double_negation_cancels() {
        let mut cmp = aliased("id");
        cmp.eq(1i64).negate();
        assert_eq!(frag(&cmp).sql, "NOT (addresses.id = ?)");

        cmp.negate();
        assert_eq!(frag(&cmp).sql, "addresses.id = ?");
    }

    #[test]
    fn unqualified_without_alias() {
        let mut cmp = Comparison::new("id");
        cmp.eq(1i64);
        assert_eq!(frag(&cmp).sql, "id = ?");
    }

    #[test]
    fn operator_less_node_compiles_to_nothing() {
        let cmp = Comparison::new("id");
        assert!(cmp.to_sql().is_none());
    }

    #[test]
    fn reinvocation_overwrites_operator() {
        let mut cmp = aliased("id");
        cmp.eq(1i64);
        cmp.gt(5i64);
        assert_eq!(frag(&cmp).sql, "addresses.id > ?");
        assert_eq!(frag(&cmp).params, vec![Value::Int(5)]);
    }
}
