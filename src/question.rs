//! Questions
//!
//! Ternary predicates over [`Properties`]. A question is bound to one key and
//! answers whether the record's value for that key is accepted. Records without
//! a value for the key get [`Answer::Undef`].
use crate::errors::CartError;
use crate::properties::{KeyIndex, Properties, PropertyMap, ValueIndex};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::rc::Rc;

pub type QuestionIndex = usize;

/// Shared handle on a question, questions are reused by many nodes.
pub type QuestionRef = Rc<Question>;

/// Answer of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Answer {
    True,
    False,
    Undef,
}

impl Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Answer::True => write!(f, "Yes!"),
            Answer::False => write!(f, "No!"),
            Answer::Undef => write!(f, "Maybe, maybe not ..."),
        }
    }
}

/// How a tree walk treats [`Answer::Undef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndefPolicy {
    /// Follow the false branch; used for classification.
    AssumeFalse,
    /// Follow both branches.
    FollowBoth,
}

/// Branches a tree walk follows for an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branches {
    True,
    False,
    Both,
}

impl Answer {
    pub fn branches(self, policy: UndefPolicy) -> Branches {
        match (self, policy) {
            (Answer::True, _) => Branches::True,
            (Answer::False, _) => Branches::False,
            (Answer::Undef, UndefPolicy::AssumeFalse) => Branches::False,
            (Answer::Undef, UndefPolicy::FollowBoth) => Branches::Both,
        }
    }
}

/// Accepted values of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuestionKindDef", into = "QuestionKindDef")]
pub enum QuestionKind {
    /// A single accepted value.
    Scalar(ValueIndex),
    /// Sorted, deduplicated accepted values.
    Set(Vec<ValueIndex>),
}

// Wire form of QuestionKind; sets are normalised when read back.
#[derive(Serialize, Deserialize)]
enum QuestionKindDef {
    Scalar(ValueIndex),
    Set(Vec<ValueIndex>),
}

impl TryFrom<QuestionKindDef> for QuestionKind {
    type Error = CartError;
    fn try_from(def: QuestionKindDef) -> Result<Self, Self::Error> {
        match def {
            QuestionKindDef::Scalar(v) => Ok(QuestionKind::Scalar(v)),
            QuestionKindDef::Set(mut vs) => {
                if vs.is_empty() {
                    return Err(CartError::EmptyValueSet(String::from("set")));
                }
                vs.sort_unstable();
                vs.dedup();
                Ok(QuestionKind::Set(vs))
            }
        }
    }
}

impl From<QuestionKind> for QuestionKindDef {
    fn from(kind: QuestionKind) -> Self {
        match kind {
            QuestionKind::Scalar(v) => QuestionKindDef::Scalar(v),
            QuestionKind::Set(vs) => QuestionKindDef::Set(vs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    key: KeyIndex,
    kind: QuestionKind,
    #[serde(default)]
    description: String,
}

impl Question {
    /// Does the value of `key` equal `value`?
    pub fn scalar(map: &PropertyMap, key: &str, value: &str, description: &str) -> Result<Self, CartError> {
        let (key, value) = map.require_value(key, value)?;
        Ok(Question {
            key,
            kind: QuestionKind::Scalar(value),
            description: description.to_string(),
        })
    }

    /// Is the value of `key` one of `values`?
    pub fn set<S: AsRef<str>>(map: &PropertyMap, key: &str, values: &[S], description: &str) -> Result<Self, CartError> {
        if values.is_empty() {
            return Err(CartError::EmptyValueSet(key.to_string()));
        }
        let mut indices = Vec::with_capacity(values.len());
        let mut key_index = 0;
        for v in values {
            let (k, v) = map.require_value(key, v.as_ref())?;
            key_index = k;
            indices.push(v);
        }
        indices.sort_unstable();
        indices.dedup();
        Ok(Question {
            key: key_index,
            kind: QuestionKind::Set(indices),
            description: description.to_string(),
        })
    }

    /// Check the question's indices against a map.
    pub fn validate(&self, map: &PropertyMap) -> Result<(), CartError> {
        let values = map.values(self.key)?;
        let out_of_range = match &self.kind {
            QuestionKind::Scalar(v) => (*v >= values.len()).then_some(*v),
            QuestionKind::Set(vs) => vs.iter().copied().find(|v| *v >= values.len()),
        };
        match out_of_range {
            Some(v) => Err(CartError::ValueIndexOutOfRange(map.key_name(self.key).to_string(), v)),
            None => Ok(()),
        }
    }

    pub fn key(&self) -> KeyIndex {
        self.key
    }

    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn accepts(&self, value: ValueIndex) -> bool {
        match &self.kind {
            QuestionKind::Scalar(v) => *v == value,
            QuestionKind::Set(vs) => vs.binary_search(&value).is_ok(),
        }
    }

    pub fn evaluate(&self, properties: &dyn Properties) -> Answer {
        match properties.value(self.key) {
            None => Answer::Undef,
            Some(v) if self.accepts(v) => Answer::True,
            Some(_) => Answer::False,
        }
    }

    /// Human readable form, resolved against `map`.
    pub fn describe<'a>(&'a self, map: &'a PropertyMap) -> QuestionDisplay<'a> {
        QuestionDisplay { question: self, map }
    }
}

pub struct QuestionDisplay<'a> {
    question: &'a Question,
    map: &'a PropertyMap,
}

impl<'a> Display for QuestionDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let q = self.question;
        if !q.description.is_empty() {
            write!(f, "[{}] ", q.description)?;
        }
        let key = self.map.key_name(q.key);
        let symbol = |v: ValueIndex| match self.map.values(q.key) {
            Ok(values) => values.symbol(v).to_string(),
            Err(_) => v.to_string(),
        };
        match &q.kind {
            QuestionKind::Scalar(v) => write!(f, "Does the value of \"{}\" equal \"{}\"?", key, symbol(*v)),
            QuestionKind::Set(vs) => {
                let symbols: Vec<String> = vs.iter().map(|v| symbol(*v)).collect();
                write!(f, "Is the value of \"{}\" in {{{}}}?", key, symbols.join(" "))
            }
        }
    }
}

/// Ordered pool of questions.
///
/// The index of a question in the pool is kept in a side table keyed by the
/// question's identity, so the same question may sit in several pools under
/// different indices.
#[derive(Debug, Clone, Default)]
pub struct QuestionList {
    questions: Vec<QuestionRef>,
    indices: HashMap<usize, QuestionIndex>,
}

impl QuestionList {
    pub fn new() -> Self {
        QuestionList::default()
    }

    /// Add a question, returning the index assigned to it.
    pub fn push(&mut self, question: QuestionRef) -> QuestionIndex {
        let index = self.questions.len();
        self.indices.entry(identity(&question)).or_insert(index);
        self.questions.push(question);
        index
    }

    /// Index assigned to a question when it was added.
    pub fn index_of(&self, question: &QuestionRef) -> Option<QuestionIndex> {
        self.indices.get(&identity(question)).copied()
    }

    pub fn get(&self, index: QuestionIndex) -> Option<&QuestionRef> {
        self.questions.get(index)
    }

    /// Question at `index`, an error if the index is out of range.
    pub fn require(&self, index: QuestionIndex) -> Result<&QuestionRef, CartError> {
        self.questions
            .get(index)
            .ok_or(CartError::InvalidQuestionIndex(index, self.questions.len()))
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QuestionRef> {
        self.questions.iter()
    }

    /// Render the pool, one numbered question per line.
    pub fn write(&self, f: &mut dyn fmt::Write, map: &PropertyMap) -> fmt::Result {
        writeln!(f, "questions:")?;
        for (i, q) in self.questions.iter().enumerate() {
            writeln!(f, "{:>3}. {}", i, q.describe(map))?;
        }
        Ok(())
    }
}

impl FromIterator<QuestionRef> for QuestionList {
    fn from_iter<T: IntoIterator<Item = QuestionRef>>(iter: T) -> Self {
        let mut list = QuestionList::new();
        for q in iter {
            list.push(q);
        }
        list
    }
}

impl<'a> IntoIterator for &'a QuestionList {
    type Item = &'a QuestionRef;
    type IntoIter = std::slice::Iter<'a, QuestionRef>;
    fn into_iter(self) -> Self::IntoIter {
        self.questions.iter()
    }
}

fn identity(question: &QuestionRef) -> usize {
    Rc::as_ptr(question) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::UNDEFINED_INDEX;
    use crate::properties::StoredProperties;

    fn map() -> Rc<PropertyMap> {
        Rc::new(
            PropertyMap::new(
                vec!["central".to_string(), "boundary".to_string()],
                vec![
                    vec!["a".to_string(), "e".to_string(), "i".to_string()],
                    vec!["yes".to_string(), "no".to_string()],
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_set_question_answers() {
        let map = map();
        let q = Question::set(&map, "central", &["i", "e"], "front").unwrap();
        assert_eq!(q.kind(), &QuestionKind::Set(vec![1, 2]));
        let e = StoredProperties::from_pairs(map.clone(), &[("central", "e")]).unwrap();
        let i = StoredProperties::from_pairs(map.clone(), &[("central", "i")]).unwrap();
        let a = StoredProperties::from_pairs(map.clone(), &[("central", "a")]).unwrap();
        let none = StoredProperties::from_pairs(map.clone(), &[("boundary", "yes")]).unwrap();
        assert_eq!(q.evaluate(&e), Answer::True);
        assert_eq!(q.evaluate(&i), Answer::True);
        assert_eq!(q.evaluate(&a), Answer::False);
        assert_eq!(q.evaluate(&none), Answer::Undef);
    }

    #[test]
    fn test_undef_iff_key_undefined() {
        let map = map();
        let questions = vec![
            Question::scalar(&map, "central", "a", "").unwrap(),
            Question::set(&map, "central", &["a", "e", "i"], "").unwrap(),
            Question::scalar(&map, "boundary", "no", "").unwrap(),
        ];
        for c in [None, Some("a"), Some("e"), Some("i")] {
            for b in [None, Some("yes"), Some("no")] {
                let mut p = StoredProperties::new(map.clone()).unwrap();
                if let Some(c) = c {
                    p.set("central", c).unwrap();
                }
                if let Some(b) = b {
                    p.set("boundary", b).unwrap();
                }
                for q in &questions {
                    let undefined = p.index(q.key()) == UNDEFINED_INDEX;
                    assert_eq!(q.evaluate(&p) == Answer::Undef, undefined);
                }
            }
        }
    }

    #[test]
    fn test_question_validation() {
        let map = map();
        assert!(matches!(
            Question::scalar(&map, "central", "u", ""),
            Err(CartError::UnknownValue(_, _, _))
        ));
        assert!(matches!(
            Question::scalar(&map, "stress", "yes", ""),
            Err(CartError::UnknownKey(_))
        ));
        let empty: [&str; 0] = [];
        assert!(matches!(
            Question::set(&map, "central", &empty, ""),
            Err(CartError::EmptyValueSet(_))
        ));
        let q = Question::scalar(&map, "boundary", "no", "").unwrap();
        assert!(q.validate(&map).is_ok());
        let small = PropertyMap::new(
            vec!["boundary".to_string(), "x".to_string()],
            vec![
                vec!["yes".to_string(), "maybe".to_string()],
                vec!["0".to_string(), "1".to_string()],
            ],
        )
        .unwrap();
        let wide = Question::scalar(&map, "central", "i", "").unwrap();
        assert!(wide.validate(&small).is_err());
    }

    #[test]
    fn test_question_display() {
        let map = map();
        let q = Question::scalar(&map, "central", "a", "").unwrap();
        assert_eq!(q.describe(&map).to_string(), "Does the value of \"central\" equal \"a\"?");
        let q = Question::set(&map, "central", &["e", "a"], "vowels").unwrap();
        assert_eq!(
            q.describe(&map).to_string(),
            "[vowels] Is the value of \"central\" in {a e}?"
        );
        assert_eq!(Answer::Undef.to_string(), "Maybe, maybe not ...");
    }

    #[test]
    fn test_question_list_indices() {
        let map = map();
        let a = Rc::new(Question::scalar(&map, "central", "a", "").unwrap());
        let a_again = Rc::new(Question::scalar(&map, "central", "a", "").unwrap());
        let mut list = QuestionList::new();
        assert_eq!(list.push(a.clone()), 0);
        assert_eq!(list.push(a_again.clone()), 1);
        assert_eq!(list.index_of(&a), Some(0));
        assert_eq!(list.index_of(&a_again), Some(1));
        assert_eq!(list.len(), 2);
        assert!(matches!(list.require(2), Err(CartError::InvalidQuestionIndex(2, 2))));

        let mut other = QuestionList::new();
        other.push(a_again.clone());
        assert_eq!(other.index_of(&a_again), Some(0));
        assert_eq!(other.index_of(&a), None);

        let mut out = String::new();
        list.write(&mut out, &map).unwrap();
        assert!(out.starts_with("questions:\n  0. Does"));
    }

    #[test]
    fn test_set_values_normalised_when_read() {
        let q: Question = serde_json::from_str(r#"{"key":0,"kind":{"Set":[2,0,2]}}"#).unwrap();
        assert_eq!(q.kind(), &QuestionKind::Set(vec![0, 2]));
        assert!(q.accepts(2));
        assert!(q.accepts(0));
        assert!(!q.accepts(1));
        assert!(serde_json::from_str::<Question>(r#"{"key":0,"kind":{"Set":[]}}"#).is_err());
    }

    #[test]
    fn test_answer_branches() {
        assert_eq!(Answer::Undef.branches(UndefPolicy::AssumeFalse), Branches::False);
        assert_eq!(Answer::Undef.branches(UndefPolicy::FollowBoth), Branches::Both);
        assert_eq!(Answer::True.branches(UndefPolicy::FollowBoth), Branches::True);
    }
}
