use chrono::NaiveDate;

/// Value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArg {
    Int(i32),
    Text(String),
    Date(NaiveDate),
    IntList(Vec<i32>),
    TextList(Vec<String>),
}

/// A finished query: SQL text with numbered placeholders and their values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub args: Vec<SqlArg>,
}

/// Schema qualification for table names. The schema is validated as an SQL
/// identifier when configuration loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qualifier {
    schema: String,
}

impl Qualifier {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    pub fn table(&self, name: &str) -> String {
        if self.schema.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.schema, name)
        }
    }
}

/// Collects bind values and hands out their placeholders. A value bound once
/// can be referenced any number of times in the SQL.
#[derive(Debug, Default)]
pub struct Binds {
    args: Vec<SqlArg>,
}

impl Binds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, arg: SqlArg) -> String {
        if let Some(pos) = self.args.iter().position(|a| *a == arg) {
            return format!("${}", pos + 1);
        }
        self.args.push(arg);
        format!("${}", self.args.len())
    }

    pub fn int(&mut self, value: i32) -> String {
        self.bind(SqlArg::Int(value))
    }

    pub fn text(&mut self, value: &str) -> String {
        self.bind(SqlArg::Text(value.to_string()))
    }

    pub fn date(&mut self, value: NaiveDate) -> String {
        self.bind(SqlArg::Date(value))
    }

    pub fn ints(&mut self, values: &[i32]) -> String {
        self.bind(SqlArg::IntList(values.to_vec()))
    }

    pub fn texts(&mut self, values: &[&str]) -> String {
        self.bind(SqlArg::TextList(values.iter().map(|v| v.to_string()).collect()))
    }

    pub fn finish(self, sql: String) -> SqlQuery {
        SqlQuery {
            sql,
            args: self.args,
        }
    }
}

/// `WHERE a AND b AND ...`, or nothing when there are no predicates.
pub fn where_all(predicates: &[String]) -> String {
    if predicates.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", predicates.join("\n  AND "))
    }
}
