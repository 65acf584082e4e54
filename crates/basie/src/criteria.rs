//! Query criteria: equality maps and literal predicates.

use crate::value::Value;

/// An ordered equality map from property name to value.
///
/// Every entry becomes `column = $n` (or `column IS NULL`), joined with `AND`.
/// Values are always bound, so `%` and `_` in strings match themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pairs: Vec<(String, Value)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) `field = value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == field) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((field, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut criteria = Criteria::new();
        for (k, v) in iter {
            criteria.insert(k, v);
        }
        criteria
    }
}

/// Build a [`Criteria`] map.
///
/// ```ignore
/// let adults = User::filter(&conn, criteria! { "age" => 30, "name" => "Ann" }).await?;
/// ```
#[macro_export]
macro_rules! criteria {
    () => { $crate::Criteria::new() };
    ($($field:expr => $value:expr),+ $(,)?) => {
        $crate::Criteria::new()$(.eq($field, $value))+
    };
}

/// The argument of `where`: either an equality map or a literal predicate with
/// positional `?` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Match(Criteria),
    Raw { predicate: String, args: Vec<Value> },
}

impl Filter {
    /// A literal predicate; each `?` is bound to the next argument.
    ///
    /// `?` inside quotes, comments or dollar quotes is left alone. Write `??`
    /// for the jsonb `?` operator.
    pub fn raw<I, V>(predicate: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::Raw {
            predicate: predicate.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Criteria> for Filter {
    fn from(criteria: Criteria) -> Self {
        Filter::Match(criteria)
    }
}

impl From<&str> for Filter {
    fn from(predicate: &str) -> Self {
        Filter::Raw {
            predicate: predicate.to_string(),
            args: Vec::new(),
        }
    }
}

impl From<String> for Filter {
    fn from(predicate: String) -> Self {
        Filter::Raw {
            predicate,
            args: Vec::new(),
        }
    }
}

impl<V: Into<Value>> From<(&str, Vec<V>)> for Filter {
    fn from((predicate, args): (&str, Vec<V>)) -> Self {
        Filter::raw(predicate, args)
    }
}
