//! Errors
//!
//! Custom error types used throughout the `cartree` crate.
use thiserror::Error;

/// Errors that can occur while building schemas, trees and training plans.
#[derive(Debug, Error)]
pub enum CartError {
    /// An operation needed a property map, but the map has no keys.
    #[error("The property map is not set.")]
    UnsetPropertyMap,
    /// Keys and vocabularies must come in pairs.
    #[error("Got {0} keys but {1} value lists.")]
    MismatchedKeyValueCounts(usize, usize),
    /// A key must be able to take at least two values.
    #[error("Key \"{0}\" has {1} values, at least 2 are required.")]
    InvalidVocabulary(String, usize),
    /// The same key was defined twice.
    #[error("Key \"{0}\" is defined more than once.")]
    DuplicateKey(String),
    /// The same symbol appears twice in one vocabulary.
    #[error("Value \"{1}\" is defined more than once for key \"{0}\".")]
    DuplicateValue(String, String),
    /// Key name is not part of the property map.
    #[error("Key \"{0}\" is not defined in the property map.")]
    UnknownKey(String),
    /// Value name is not part of the key's vocabulary.
    #[error("Value \"{1}\" is not defined for key \"{0}\", available values: {2}.")]
    UnknownValue(String, String, String),
    /// Key index out of the property map's range.
    #[error("Key index {0} is out of range for a property map with {1} keys.")]
    KeyIndexOutOfRange(usize, usize),
    /// Value index out of the vocabulary range of a key.
    #[error("Value index {1} is out of range for key \"{0}\".")]
    ValueIndexOutOfRange(String, usize),
    /// A set question needs at least one value.
    #[error("Question on key \"{0}\" has no values.")]
    EmptyValueSet(String),
    /// The decision tree has no root node.
    #[error("The decision tree is empty.")]
    EmptyTree,
    /// Internal node references a question outside of the tree's question list.
    #[error("Question index {0} is out of range for a question list of size {1}.")]
    InvalidQuestionIndex(usize, usize),
    /// The training plan and the examples were built against different schemas.
    #[error("Differences in property maps of training plan and example list: {0}")]
    PropertyMapMismatch(String),
    /// Observation storage could not be allocated.
    #[error("Unable to allocate observation matrix of {0} values.")]
    AllocationFailed(usize),
    /// Observation matrix dimensions do not match the data.
    #[error("Observation matrix of shape {0}x{1} cannot hold {2} values.")]
    InvalidShape(usize, usize, usize),
    /// The same example handle was added to a list twice.
    #[error("Example at position {0} is already a member of the list.")]
    DuplicateExample(usize),
    /// Unable to write to file.
    #[error("Unable to write to file: {0}")]
    UnableToWrite(String),
    /// Unable to read from file.
    #[error("Unable to read from a file {0}")]
    UnableToRead(String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
}
