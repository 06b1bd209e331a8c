#![forbid(unsafe_code)]

//! `State<E, A>`: a five-state lifecycle tag for a remotely-loaded value.
//!
//! `State` never performs I/O and never raises. It is the leaf type of the
//! `tea` workspace — [`tea_promise`](https://docs.rs/tea-promise) and
//! [`tea_queue`](https://docs.rs/tea-queue) are built entirely out of
//! values of this type.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The lifecycle of a remotely-loaded value of type `A`, with errors typed as `E`.
///
/// Exactly one variant is ever held at a time; payloads appear only for the
/// variants listed here. `E` and `A` are opaque to every combinator below.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum State<E, A> {
    /// Never requested. The initial value of every fresh slot.
    Empty,
    /// In flight. May carry the last-known-good value for continuity.
    Pending(Option<A>),
    /// Usable, but flagged for refresh.
    Stale(A),
    /// Fresh and authoritative.
    Done(A),
    /// Failed, with a classified error payload.
    Error(E),
}

impl<E, A> State<E, A> {
    /// `Empty`.
    pub fn empty() -> Self {
        State::Empty
    }

    /// `Pending`, optionally carrying a previous value.
    pub fn pending(previous: Option<A>) -> Self {
        State::Pending(previous)
    }

    /// `Stale(a)`.
    pub fn stale(a: A) -> Self {
        State::Stale(a)
    }

    /// `Done(a)`.
    pub fn done(a: A) -> Self {
        State::Done(a)
    }

    /// `Error(e)`.
    pub fn error(e: E) -> Self {
        State::Error(e)
    }

    /// Lifts a `Result` into `Done`/`Error`.
    pub fn from_result(result: Result<A, E>) -> Self {
        match result {
            Ok(a) => State::Done(a),
            Err(e) => State::Error(e),
        }
    }

    /// Lifts an `Option` into `Done`/`Empty`.
    pub fn from_maybe(maybe: Option<A>) -> Self {
        match maybe {
            Some(a) => State::Done(a),
            None => State::Empty,
        }
    }

    /// The usable value, if any: `Pending(Some(a))`, `Stale(a)`, and `Done(a)`
    /// all yield `Some(a)`; everything else yields `None`.
    pub fn to_maybe(&self) -> Option<&A> {
        match self {
            State::Pending(Some(a)) | State::Stale(a) | State::Done(a) => Some(a),
            _ => None,
        }
    }

    /// Consumes `self`, returning the usable value by value.
    pub fn into_maybe(self) -> Option<A> {
        match self {
            State::Pending(Some(a)) | State::Stale(a) | State::Done(a) => Some(a),
            _ => None,
        }
    }

    /// The error payload, present only for `Error`.
    pub fn get_error(&self) -> Option<&E> {
        match self {
            State::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Converts to a `Result`, using `default` for `Empty`/`Pending(None)`.
    pub fn to_result(self, default: A) -> Result<A, E> {
        match self {
            State::Empty | State::Pending(None) => Ok(default),
            State::Pending(Some(a)) | State::Stale(a) | State::Done(a) => Ok(a),
            State::Error(e) => Err(e),
        }
    }

    /// Maps the payload under every variant, preserving the tag.
    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> State<E, B> {
        match self {
            State::Empty => State::Empty,
            State::Pending(prev) => State::Pending(prev.map(f)),
            State::Stale(a) => State::Stale(f(a)),
            State::Done(a) => State::Done(f(a)),
            State::Error(e) => State::Error(e),
        }
    }

    /// Maps the error payload, leaving every other variant untouched.
    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> State<F, A> {
        match self {
            State::Empty => State::Empty,
            State::Pending(prev) => State::Pending(prev),
            State::Stale(a) => State::Stale(a),
            State::Done(a) => State::Done(a),
            State::Error(e) => State::Error(f(e)),
        }
    }

    /// `Empty`→`Pending(None)`; `Stale(a)`/`Done(a)`→`Pending(Some(a))`;
    /// `Pending` is left unchanged; `Error`→`Pending(None)`.
    pub fn set_pending(self) -> Self {
        match self {
            State::Empty => State::Pending(None),
            State::Pending(prev) => State::Pending(prev),
            State::Stale(a) | State::Done(a) => State::Pending(Some(a)),
            State::Error(_) => State::Pending(None),
        }
    }

    /// `Done(a)`→`Stale(a)`; every other variant is left unchanged.
    pub fn mark_stale(self) -> Self {
        match self {
            State::Done(a) => State::Stale(a),
            other => other,
        }
    }

    /// True for `Empty`.
    pub fn is_empty(&self) -> bool {
        matches!(self, State::Empty)
    }

    /// True for both `Pending` forms.
    pub fn is_pending(&self) -> bool {
        matches!(self, State::Pending(_))
    }

    /// True for `Stale`.
    pub fn is_stale(&self) -> bool {
        matches!(self, State::Stale(_))
    }

    /// True for `Done`.
    pub fn is_done(&self) -> bool {
        matches!(self, State::Done(_))
    }

    /// True for `Error`.
    pub fn is_error(&self) -> bool {
        matches!(self, State::Error(_))
    }

    /// A stable, CSS-class-friendly string for the variant, for the view layer.
    pub fn code(&self) -> &'static str {
        match self {
            State::Empty => "state-empty",
            State::Pending(_) => "state-pending",
            State::Stale(_) => "state-stale",
            State::Done(_) => "state-done",
            State::Error(_) => "state-error",
        }
    }
}

/// The applicative product `andMap(sf, sa)`, combining a state-of-function
/// with a state-of-argument.
///
/// | sf ↓ / sa → | `Pending(None)` | `Pending(Some a)` | `Done a` | `Error e` |
/// |---|---|---|---|---|
/// | `Pending(None)` | `Pending(None)` | `Pending(None)` | `Pending(None)` | `Error e` |
/// | `Pending(Some f)` | `Pending(None)` | `Pending(Some f a)` | `Pending(Some f a)` | `Error e` |
/// | `Done f` | `Pending(None)` | `Pending(Some f a)` | `Done (f a)` | `Error e` |
/// | `Error e` | `Error e` | `Error e` | `Error e` | `Error e` (left wins) |
///
/// `Empty` behaves like `Pending(None)`; `Stale a` behaves like `Done a` for
/// this table, but unary [`State::map`] preserves `Stale` as `Stale`.
///
/// The leftmost `Error` always wins: `sa` is never even inspected once `sf`
/// is already an `Error`.
pub fn and_map<E, A, B>(sf: State<E, impl FnOnce(A) -> B>, sa: State<E, A>) -> State<E, B> {
    match sf {
        State::Error(e) => State::Error(e),
        State::Empty | State::Pending(None) => match sa {
            State::Error(e) => State::Error(e),
            _ => State::Pending(None),
        },
        State::Pending(Some(f)) => match sa {
            State::Error(e) => State::Error(e),
            State::Empty | State::Pending(None) => State::Pending(None),
            State::Pending(Some(a)) | State::Stale(a) | State::Done(a) => {
                State::Pending(Some(f(a)))
            }
        },
        State::Stale(f) | State::Done(f) => match sa {
            State::Error(e) => State::Error(e),
            State::Empty | State::Pending(None) => State::Pending(None),
            State::Pending(Some(a)) => State::Pending(Some(f(a))),
            State::Stale(a) | State::Done(a) => State::Done(f(a)),
        },
    }
}

impl<E, A> fmt::Display for State<E, A>
where
    E: fmt::Display,
    A: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Empty => write!(f, "Empty"),
            State::Pending(Some(a)) => write!(f, "Pending({a})"),
            State::Pending(None) => write!(f, "Pending"),
            State::Stale(a) => write!(f, "Stale({a})"),
            State::Done(a) => write!(f, "Done({a})"),
            State::Error(e) => write!(f, "Error({e})"),
        }
    }
}

/// The JSON decoder's tag-dispatch failure: `"Unknown tag: {tag}"`.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Unknown tag: {tag}")]
pub struct DecodeError {
    /// The offending tag string found in the decoded object.
    pub tag: String,
}

const TAG_EMPTY: &str = "Empty";
const TAG_PENDING: &str = "Pending";
const TAG_STALE: &str = "Stale";
const TAG_DONE: &str = "Done";
const TAG_ERROR: &str = "Error";

impl<E, A> State<E, A>
where
    A: Serialize,
    E: Serialize,
{
    /// Serializes to the compact JSON string form of [`State`]'s codec.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<E, A> State<E, A>
where
    A: for<'de> Deserialize<'de>,
    E: for<'de> Deserialize<'de>,
{
    /// Parses the JSON string form produced by [`State::to_json`].
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

impl<E, A> Serialize for State<E, A>
where
    A: Serialize,
    E: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            State::Empty => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("tag", TAG_EMPTY)?;
                map.end()
            }
            State::Pending(value) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("tag", TAG_PENDING)?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            State::Stale(a) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("tag", TAG_STALE)?;
                map.serialize_entry("value", a)?;
                map.end()
            }
            State::Done(a) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("tag", TAG_DONE)?;
                map.serialize_entry("value", a)?;
                map.end()
            }
            State::Error(e) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("tag", TAG_ERROR)?;
                map.serialize_entry("value", e)?;
                map.end()
            }
        }
    }
}

impl<'de, E, A> Deserialize<'de> for State<E, A>
where
    A: Deserialize<'de>,
    E: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StateVisitor<E, A> {
            marker: std::marker::PhantomData<(E, A)>,
        }

        impl<'de, E, A> Visitor<'de> for StateVisitor<E, A>
        where
            A: Deserialize<'de>,
            E: Deserialize<'de>,
        {
            type Value = State<E, A>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "an object with a \"tag\" field")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut tag: Option<String> = None;
                let mut value: Option<serde_json::Value> = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "tag" => tag = Some(map.next_value()?),
                        "value" => value = Some(map.next_value()?),
                        _ => {
                            let _ = map.next_value::<serde_json::Value>()?;
                        }
                    }
                }
                let tag = tag.ok_or_else(|| de::Error::missing_field("tag"))?;

                let decode_a = |value: serde_json::Value| -> Result<A, M::Error> {
                    serde_json::from_value(value).map_err(de::Error::custom)
                };
                let decode_e = |value: serde_json::Value| -> Result<E, M::Error> {
                    serde_json::from_value(value).map_err(de::Error::custom)
                };

                match tag.as_str() {
                    TAG_EMPTY => Ok(State::Empty),
                    TAG_PENDING => match value {
                        None | Some(serde_json::Value::Null) => Ok(State::Pending(None)),
                        Some(v) => Ok(State::Pending(Some(decode_a(v)?))),
                    },
                    TAG_STALE => {
                        let v = value.ok_or_else(|| de::Error::missing_field("value"))?;
                        Ok(State::Stale(decode_a(v)?))
                    }
                    TAG_DONE => {
                        let v = value.ok_or_else(|| de::Error::missing_field("value"))?;
                        Ok(State::Done(decode_a(v)?))
                    }
                    TAG_ERROR => {
                        let v = value.ok_or_else(|| de::Error::missing_field("value"))?;
                        Ok(State::Error(decode_e(v)?))
                    }
                    other => Err(de::Error::custom(DecodeError {
                        tag: other.to_string(),
                    })),
                }
            }
        }

        deserializer.deserialize_map(StateVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_state() -> impl Strategy<Value = State<String, i32>> {
        prop_oneof![
            Just(State::Empty),
            any::<Option<i32>>().prop_map(State::Pending),
            any::<i32>().prop_map(State::Stale),
            any::<i32>().prop_map(State::Done),
            any::<String>().prop_map(State::Error),
        ]
    }

    #[test]
    fn constructors_round_trip_predicates() {
        assert!(State::<String, i32>::empty().is_empty());
        assert!(State::<String, i32>::pending(None).is_pending());
        assert!(State::<String, i32>::pending(Some(1)).is_pending());
        assert!(State::<String, i32>::stale(1).is_stale());
        assert!(State::<String, i32>::done(1).is_done());
        assert!(State::<i32, i32>::error(1).is_error());
    }

    #[test]
    fn to_maybe_matches_spec_table() {
        assert_eq!(State::<String, i32>::empty().to_maybe(), None);
        assert_eq!(State::<String, i32>::pending(None).to_maybe(), None);
        assert_eq!(State::<String, i32>::pending(Some(5)).to_maybe(), Some(&5));
        assert_eq!(State::<String, i32>::stale(5).to_maybe(), Some(&5));
        assert_eq!(State::<String, i32>::done(5).to_maybe(), Some(&5));
        assert_eq!(State::<i32, i32>::error(5).to_maybe(), None);
    }

    #[test]
    fn to_result_uses_default_for_empty_and_pending_none() {
        assert_eq!(State::<String, i32>::empty().to_result(0), Ok(0));
        assert_eq!(State::<String, i32>::pending(None).to_result(0), Ok(0));
        assert_eq!(State::<String, i32>::pending(Some(5)).to_result(0), Ok(5));
        assert_eq!(State::<String, i32>::stale(5).to_result(0), Ok(5));
        assert_eq!(State::<String, i32>::done(5).to_result(0), Ok(5));
        assert_eq!(
            State::<String, i32>::error("boom".into()).to_result(0),
            Err("boom".to_string())
        );
    }

    #[test]
    fn set_pending_matches_table() {
        assert_eq!(State::<String, i32>::empty().set_pending(), State::Pending(None));
        assert_eq!(
            State::<String, i32>::stale(1).set_pending(),
            State::Pending(Some(1))
        );
        assert_eq!(
            State::<String, i32>::done(1).set_pending(),
            State::Pending(Some(1))
        );
        assert_eq!(
            State::<String, i32>::pending(Some(1)).set_pending(),
            State::Pending(Some(1))
        );
        assert_eq!(State::<String, i32>::pending(None).set_pending(), State::Pending(None));
        assert_eq!(
            State::<String, i32>::error("e".into()).set_pending(),
            State::Pending(None)
        );
    }

    proptest! {
        #[test]
        fn set_pending_is_idempotent(s in arb_state()) {
            let once = s.clone().set_pending();
            let twice = once.clone().set_pending();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn mark_stale_is_idempotent_except_done(s in arb_state()) {
            let once = s.clone().mark_stale();
            let twice = once.clone().mark_stale();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn map_identity_law(s in arb_state()) {
            let mapped = s.clone().map(|a| a);
            prop_assert_eq!(mapped, s);
        }

        #[test]
        fn map_composition_law(s in arb_state()) {
            let f = |a: i32| a + 1;
            let g = |a: i32| a * 2;
            let left = s.clone().map(f).map(g);
            let right = s.map(move |a| g(f(a)));
            prop_assert_eq!(left, right);
        }
    }

    #[test]
    fn mark_stale_done_becomes_stale() {
        assert_eq!(State::<String, i32>::done(1).mark_stale(), State::Stale(1));
    }

    #[test]
    fn and_map_applicative_table() {
        let inc = |a: i32| a + 1;

        assert_eq!(
            and_map::<String, i32, i32>(State::Pending(None), State::Pending(None)),
            State::Pending(None)
        );
        assert_eq!(
            and_map::<String, i32, i32>(State::Pending(Some(inc)), State::Pending(Some(1))),
            State::Pending(Some(2))
        );
        assert_eq!(
            and_map::<String, i32, i32>(State::Done(inc), State::Done(1)),
            State::Done(2)
        );
        assert_eq!(
            and_map::<String, i32, i32>(State::Done(inc), State::Pending(Some(1))),
            State::Pending(Some(2))
        );
    }

    #[test]
    fn and_map_short_circuits_on_error() {
        let result: State<&str, i32> = and_map(
            State::<&str, fn(i32) -> i32>::Error("E"),
            State::<&str, i32>::done(1),
        );
        assert_eq!(result, State::Error("E"));
    }

    #[test]
    fn and_map_left_biased_error() {
        let result: State<&str, i32> = and_map(
            State::<&str, fn(i32) -> i32>::Error("L"),
            State::<&str, i32>::Error("R"),
        );
        assert_eq!(result, State::Error("L"));
    }

    #[test]
    fn code_mapping_is_stable() {
        assert_eq!(State::<String, i32>::empty().code(), "state-empty");
        assert_eq!(State::<String, i32>::pending(None).code(), "state-pending");
        assert_eq!(State::<String, i32>::stale(1).code(), "state-stale");
        assert_eq!(State::<String, i32>::done(1).code(), "state-done");
        assert_eq!(State::<String, i32>::error("e".into()).code(), "state-error");
    }

    #[test]
    fn json_round_trip_done() {
        let s = State::<String, i32>::done(5);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json, serde_json::json!({"tag": "Done", "value": 5}));
        let back: State<String, i32> = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn json_empty_omits_value() {
        let s = State::<String, i32>::empty();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json, serde_json::json!({"tag": "Empty"}));
    }

    #[test]
    fn json_pending_none_is_null() {
        let s = State::<String, i32>::pending(None);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json, serde_json::json!({"tag": "Pending", "value": null}));
    }

    #[test]
    fn json_unknown_tag_fails_with_precise_message() {
        let err = serde_json::from_value::<State<String, i32>>(
            serde_json::json!({"tag": "Unknown", "value": null}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unknown tag: Unknown"));
    }

    proptest! {
        #[test]
        fn json_round_trips_for_any_state(s in arb_state()) {
            let json = s.to_json().unwrap();
            let back = State::<String, i32>::from_json_str(&json).unwrap();
            prop_assert_eq!(back, s);
        }
    }
}
